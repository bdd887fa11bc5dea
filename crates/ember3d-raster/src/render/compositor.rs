//! Turns the sorted polygon list into the per-band pass sequence.

use core::ops::Range;

use crate::framebuffer::Band;
use crate::scene::{ClearAttributes, DrawClass, RenderList, RenderRegisters};

use super::state::{translucent_stencil, DrawState};

/// One backend instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassCmd {
    /// Switches fixed-function state for subsequent draws.
    SetState { state: DrawState, stencil_ref: u8 },
    /// Draws a sub-range of the index buffer.
    Draw(Range<u32>),
    /// Makes attribute writes so far visible to the shadow program.
    Barrier,
}

/// Ordered backend work for one band.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandList {
    pub band: Band,
    /// Clear planes, present for the first band of a frame only.
    pub clear: Option<ClearAttributes>,
    pub cmds: Vec<PassCmd>,
}

impl CommandList {
    fn set(&mut self, state: DrawState, stencil_ref: u8) {
        let redundant = matches!(
            self.cmds.iter().rev().find(|c| matches!(c, PassCmd::SetState { .. })),
            Some(PassCmd::SetState { state: s, stencil_ref: r }) if *s == state && *r == stencil_ref
        );
        if !redundant {
            self.cmds.push(PassCmd::SetState { state, stencil_ref });
        }
    }

    fn draw(&mut self, range: Range<u32>) {
        if !range.is_empty() {
            self.cmds.push(PassCmd::Draw(range));
        }
    }

    /// Number of draw calls.
    pub fn draw_count(&self) -> usize {
        self.cmds.iter().filter(|c| matches!(c, PassCmd::Draw(_))).count()
    }
}

/// Builds the command list for `band`. `first_band` requests the clear.
pub fn plan(list: &RenderList, regs: &RenderRegisters, band: Band, first_band: bool) -> CommandList {
    let clear = regs.clear();
    let w = regs.w_buffer;
    let mut out = CommandList { band, clear: first_band.then_some(clear), cmds: Vec::new() };

    if list.is_empty() {
        return out;
    }

    // Opaque pass over every triangle: texels at full alpha land here whatever
    // the polygon's class.
    out.set(DrawState::opaque(w), 0xFF);
    out.draw(list.all_indices());

    if list.translucent().is_empty() {
        return out;
    }

    if clear.alpha_is_zero() {
        for batch in list.batches() {
            if matches!(batch.key.class(), DrawClass::Shadow | DrawClass::ShadowMask) {
                continue;
            }
            let id = batch.key.polygon_id();
            out.set(DrawState::edge(w, batch.key.depth_write(), id), 0);
            out.draw(batch.indices);
        }
    }

    let mut after_mask = false;
    for batch in list.batches() {
        match batch.key.class() {
            DrawClass::ShadowMask => {
                out.set(DrawState::shadow_mask(w), 0);
                after_mask = true;
            }
            class => {
                let shadow = class == DrawClass::Shadow;
                if shadow {
                    out.cmds.push(PassCmd::Barrier);
                }
                let state = DrawState::translucent(w, shadow, batch.key.depth_write(), after_mask);
                out.set(state, translucent_stencil(batch.key.polygon_id()));
            }
        }
        log::trace!("batch {:08x}: {:?}", batch.key.raw(), batch.indices);
        out.draw(batch.indices);
    }

    out
}

#[cfg(test)]
mod tests {
    use smallvec::smallvec;

    use super::*;
    use crate::render::state::StencilMode;
    use crate::scene::{attr, clear_attr1, Polygon, PolygonFlags, PolygonVertex, Vertex};
    use crate::render::Assembler;
    use crate::shading::Program;

    fn poly(attr: u32, flags: PolygonFlags) -> Polygon {
        Polygon { attr, flags, vertices: smallvec![PolygonVertex::default(); 3], ..Default::default() }
    }

    fn opaque(id: u32) -> Polygon {
        poly(attr::pack(0, 31, id), PolygonFlags::empty())
    }

    fn trans(id: u32) -> Polygon {
        poly(attr::pack(0, 16, id), PolygonFlags::TRANSLUCENT)
    }

    fn mask() -> Polygon {
        poly(attr::pack(3, 16, 0), PolygonFlags::TRANSLUCENT | PolygonFlags::SHADOW_MASK)
    }

    fn shadow(id: u32) -> Polygon {
        poly(attr::pack(3, 16, id), PolygonFlags::TRANSLUCENT | PolygonFlags::SHADOW)
    }

    fn regs(clear_alpha: u8) -> RenderRegisters {
        RenderRegisters { clear_attr1: clear_attr1([0, 0, 0], clear_alpha, 0), ..Default::default() }
    }

    fn plan_for(polys: &[Polygon], regs: &RenderRegisters) -> CommandList {
        let mut list = RenderList::new();
        list.build(polys).unwrap();
        Assembler::new().assemble(&mut list, polys, &[Vertex::default()], 0).unwrap();
        plan(&list, regs, Band::FULL, true)
    }

    fn programs(cl: &CommandList) -> Vec<Program> {
        cl.cmds
            .iter()
            .filter_map(|c| match c {
                PassCmd::SetState { state, .. } => Some(state.program),
                _ => None,
            })
            .collect()
    }

    // ── opaque ────────────────────────────────────────────────────────────

    #[test]
    fn opaque_pass_draws_every_triangle() {
        let cl = plan_for(&[trans(2), opaque(1)], &regs(31));
        assert_eq!(cl.cmds[0], PassCmd::SetState { state: DrawState::opaque(false), stencil_ref: 0xFF });
        assert_eq!(cl.cmds[1], PassCmd::Draw(0..6));
    }

    #[test]
    fn empty_frame_only_clears() {
        let cl = plan_for(&[], &regs(31));
        assert!(cl.clear.is_some());
        assert!(cl.cmds.is_empty());
    }

    #[test]
    fn later_bands_do_not_clear() {
        let mut list = RenderList::new();
        list.build(&[]).unwrap();
        assert!(plan(&list, &regs(31), Band::chunk(1), false).clear.is_none());
    }

    // ── edge pass ─────────────────────────────────────────────────────────

    #[test]
    fn edge_pass_runs_only_over_zero_alpha_clear() {
        let with = plan_for(&[opaque(1), trans(2)], &regs(0));
        let without = plan_for(&[opaque(1), trans(2)], &regs(31));
        assert_eq!(programs(&with), vec![Program::Opaque, Program::Translucent, Program::Translucent]);
        assert_eq!(programs(&without), vec![Program::Opaque, Program::Translucent]);

        let PassCmd::SetState { state, stencil_ref } = &with.cmds[2] else { panic!() };
        assert!(!state.blend);
        assert_eq!(*stencil_ref, 0);
        assert_eq!(state.stencil, StencilMode::EqualZeroInvert { write_mask: 0x42 });
    }

    #[test]
    fn edge_pass_skips_shadow_batches() {
        let cl = plan_for(&[mask(), shadow(4)], &regs(0));
        assert_eq!(programs(&cl), vec![Program::Opaque, Program::ShadowMask, Program::Shadow]);
    }

    // ── translucent pass ──────────────────────────────────────────────────

    #[test]
    fn barrier_precedes_every_shadow_batch() {
        let cl = plan_for(&[mask(), shadow(4), trans(1), shadow(5)], &regs(31));
        let barriers: Vec<usize> = cl
            .cmds
            .iter()
            .enumerate()
            .filter(|(_, c)| **c == PassCmd::Barrier)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(barriers.len(), 2);
        for i in barriers {
            let PassCmd::SetState { state, .. } = &cl.cmds[i + 1] else { panic!("barrier not followed by state") };
            assert_eq!(state.program, Program::Shadow);
        }
    }

    #[test]
    fn shadow_id_writes_start_after_first_mask() {
        let cl = plan_for(&[trans(1), mask(), trans(2)], &regs(31));
        let states: Vec<&DrawState> = cl
            .cmds
            .iter()
            .filter_map(|c| match c {
                PassCmd::SetState { state, .. } => Some(state),
                _ => None,
            })
            .collect();

        assert!(states[1].attr_writes.is_empty());
        assert_eq!(states[2].program, Program::ShadowMask);
        assert!(!states[2].color_write);
        assert!(!states[3].attr_writes.is_empty());
    }

    #[test]
    fn equal_key_polygons_draw_in_one_call() {
        let cl = plan_for(&[trans(3), trans(3), trans(3)], &regs(31));
        assert_eq!(cl.draw_count(), 2);
        assert_eq!(cl.cmds.last(), Some(&PassCmd::Draw(0..9)));
    }

    #[test]
    fn translucent_stencil_ref_tags_polygon_id() {
        let cl = plan_for(&[trans(9)], &regs(31));
        let PassCmd::SetState { state, stencil_ref } = &cl.cmds[2] else { panic!() };
        assert_eq!(*stencil_ref, 0x49);
        assert!(state.blend);
    }
}
