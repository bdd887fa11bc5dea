//! Frame driver owning every per-frame structure and one backend.

use crate::config::{validate_scale, RendererConfig};
use crate::error::{RenderError, RenderResult};
use crate::framebuffer::{Band, Framebuffer, BAND_HEIGHT, SCREEN_HEIGHT};
use crate::render::{plan, Assembler, FrameUniforms, PreparedFrame, RasterBackend};
use crate::scene::{FrameInput, RenderList, RenderRegisters};
use crate::texture::TextureMemory;

/// Renders frames through a [`RasterBackend`] into a linear framebuffer.
///
/// Single-threaded: every call blocks until the backend has finished and the
/// affected rows are read back.
pub struct Renderer<B: RasterBackend> {
    backend: B,
    config: RendererConfig,
    memory: TextureMemory,
    list: RenderList,
    assembler: Assembler,
    framebuffer: Framebuffer,
    /// Registers of the last rendered frame, used for lazily rendered bands.
    regs: RenderRegisters,
    has_frame: bool,
}

impl<B: RasterBackend> Renderer<B> {
    pub fn new(mut backend: B, config: RendererConfig) -> RenderResult<Self> {
        config.validate()?;
        backend.resize(config.scale)?;
        log::info!("renderer using {} backend at scale {}", backend.name(), config.scale);

        Ok(Self {
            backend,
            config,
            memory: TextureMemory::new(),
            list: RenderList::new(),
            assembler: Assembler::new(),
            framebuffer: Framebuffer::new(config.scale),
            regs: RenderRegisters::default(),
            has_frame: false,
        })
    }

    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[inline]
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Changes the upscale exponent and recreates all targets.
    ///
    /// The framebuffer is emptied; the next frame renders at the new size.
    pub fn set_scale(&mut self, scale: u32) -> RenderResult<()> {
        validate_scale(scale)?;
        if scale == self.config.scale {
            return Ok(());
        }
        self.backend.resize(scale)?;
        self.framebuffer.resize(scale);
        self.config.scale = scale;
        self.has_frame = false;
        log::debug!("scale set to {scale}");
        Ok(())
    }

    /// Renders one frame.
    ///
    /// In chunked mode only the first band is rendered here; the others are
    /// rendered on first access through [`Renderer::scanline`].
    pub fn render_frame(&mut self, input: &FrameInput<'_>) -> RenderResult<()> {
        self.has_frame = false;
        self.framebuffer.invalidate();

        self.memory.load(&input.vram);

        let built = self
            .list
            .build(input.polygons)
            .and_then(|()| self.assembler.assemble(&mut self.list, input.polygons, input.vertices, self.config.scale));
        if let Err(e) = built {
            if matches!(e, RenderError::CapacityExceeded { .. }) {
                log::warn!("frame rejected: {e}");
            }
            return Err(e);
        }

        let uniforms = FrameUniforms::new(input.regs, self.config.scale, self.config.filtering);
        self.backend.prepare_frame(&PreparedFrame {
            vertices: self.assembler.vertices(),
            indices: self.assembler.indices(),
            uniforms: &uniforms,
            memory: &self.memory,
        })?;

        self.regs.clone_from(input.regs);
        let first = if self.config.chunked { Band::chunk(0) } else { Band::FULL };
        self.render_band(first, true)?;
        self.has_frame = true;

        log::debug!(
            "frame: {} polygons ({} opaque), {} vertices, {} triangles",
            self.list.len(),
            self.list.opaque_count(),
            self.assembler.vertices().len(),
            self.assembler.indices().len() / 3
        );
        Ok(())
    }

    /// Pixels of native line `line`: `256 << scale` per target row, all
    /// `1 << scale` target rows of the line back to back, color-reduced.
    pub fn scanline(&mut self, line: u32) -> RenderResult<&[u32]> {
        if line >= SCREEN_HEIGHT {
            return Err(RenderError::InvalidInput(format!("scanline {line} out of range")));
        }
        if self.has_frame && !self.framebuffer.is_ready(line) {
            self.render_band(Band::chunk((line / BAND_HEIGHT) as usize), false)?;
        }
        Ok(self.framebuffer.line(line))
    }

    fn render_band(&mut self, band: Band, first_band: bool) -> RenderResult<()> {
        let cmds = plan(&self.list, &self.regs, band, first_band);
        log::trace!("band {}..{}: {} draws", band.y, band.y + band.height, cmds.draw_count());

        self.backend.execute(&cmds)?;
        self.backend.read_band(band, self.framebuffer.band_mut(band))?;
        self.framebuffer.reduce_band(band);
        self.framebuffer.mark_ready(band);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use smallvec::smallvec;

    use super::*;
    use crate::framebuffer::{reduce_pixel, SCREEN_WIDTH};
    use crate::render::SoftwareBackend;
    use crate::scene::{attr, clear_attr1, Polygon, PolygonFlags, PolygonVertex, Vertex};
    use crate::texture::{pack, TexFormat, VramSnapshot, TEXTURE_BANK_SIZE};

    const FAR: u32 = 0xC000;
    const MID: u32 = 0x8000;
    const NEAR: u32 = 0x4000;

    /// Appends an axis-aligned rectangle's corners to `verts` and returns a
    /// polygon over them at depth `z`.
    fn rect(verts: &mut Vec<Vertex>, [x0, y0, x1, y1]: [i32; 4], rgb: [u8; 3], z: u32) -> Polygon {
        let base = verts.len() as u16;
        for (x, y) in [(x0, y0), (x1, y0), (x1, y1), (x0, y1)] {
            verts.push(Vertex::at(x, y).rgb5(rgb[0], rgb[1], rgb[2]));
        }
        Polygon {
            vertices: (0..4).map(|i| PolygonVertex { vertex: base + i, z, w: 0x1000 }).collect(),
            ..Default::default()
        }
    }

    fn full(verts: &mut Vec<Vertex>, rgb: [u8; 3], z: u32) -> Polygon {
        rect(verts, [0, 0, SCREEN_WIDTH as i32, SCREEN_HEIGHT as i32], rgb, z)
    }

    fn opaque(mut p: Polygon, id: u32) -> Polygon {
        p.attr = attr::pack(0, 31, id);
        p
    }

    fn translucent(mut p: Polygon, alpha: u32, id: u32) -> Polygon {
        p.attr = attr::pack(0, alpha, id);
        p.flags |= PolygonFlags::TRANSLUCENT;
        p
    }

    fn regs(clear_rgb: [u8; 3], clear_alpha: u8) -> RenderRegisters {
        RenderRegisters { clear_attr1: clear_attr1(clear_rgb, clear_alpha, 0), ..Default::default() }
    }

    fn renderer(config: RendererConfig) -> Renderer<SoftwareBackend> {
        Renderer::new(SoftwareBackend::default(), config).unwrap()
    }

    fn snapshot(r: &mut Renderer<SoftwareBackend>) -> Vec<u32> {
        (0..SCREEN_HEIGHT).flat_map(|y| r.scanline(y).unwrap().to_vec()).collect()
    }

    // ── scenarios ─────────────────────────────────────────────────────────

    #[test]
    fn opaque_quad_covers_red_clear() {
        let mut verts = Vec::new();
        let polys = [opaque(full(&mut verts, [0, 0, 31], MID), 1)];
        let regs = regs([31, 0, 0], 31);

        let mut r = renderer(RendererConfig::default());
        r.render_frame(&FrameInput::new(&polys, &verts, &regs)).unwrap();

        let blue = reduce_pixel(u32::from_le_bytes([0, 0, 255, 255]));
        for y in [0, 95, 191] {
            assert!(r.scanline(y).unwrap().iter().all(|&p| p == blue), "line {y}");
        }
        for (x, y) in [(0, 0), (255, 0), (128, 96), (255, 191)] {
            assert_eq!(r.backend().attribute(x, y), [1, 1, 0, 0]);
        }
    }

    #[test]
    fn translucent_blends_over_opaque_and_keeps_edge_id() {
        let mut verts = Vec::new();
        let polys = [
            opaque(full(&mut verts, [0, 0, 31], MID), 1),
            translucent(full(&mut verts, [31, 0, 0], NEAR), 16, 2),
        ];
        let regs = regs([0, 0, 0], 31);

        let mut r = renderer(RendererConfig::default());
        r.render_frame(&FrameInput::new(&polys, &verts, &regs)).unwrap();

        // 16/31 red over blue.
        let [red, green, blue, alpha] = r.backend().pixel(100, 100);
        assert!((131..=133).contains(&red), "red {red}");
        assert_eq!(green, 0);
        assert!((122..=124).contains(&blue), "blue {blue}");
        assert_eq!(alpha, 255);
        assert_eq!(r.backend().attribute(100, 100)[0], 1);
    }

    #[test]
    fn zero_alpha_clear_replaces_without_double_blend() {
        let mut verts = Vec::new();
        let polys = [translucent(full(&mut verts, [31, 0, 0], NEAR), 16, 2)];
        let regs = regs([0, 0, 0], 0);

        let mut r = renderer(RendererConfig::default());
        r.render_frame(&FrameInput::new(&polys, &verts, &regs)).unwrap();

        let [red, green, blue, alpha] = r.backend().pixel(10, 10);
        assert_eq!([red, green, blue], [255, 0, 0]);
        assert!((131..=133).contains(&alpha), "alpha {alpha}");
        assert_eq!(r.backend().stencil(10, 10), 0x42);
    }

    #[test]
    fn shadow_skips_pixels_of_its_own_id() {
        let mut verts = Vec::new();
        let mask_flags = PolygonFlags::TRANSLUCENT | PolygonFlags::SHADOW_MASK;
        let shadow_flags = PolygonFlags::TRANSLUCENT | PolygonFlags::SHADOW;

        let mut mask = full(&mut verts, [0, 0, 0], FAR);
        mask.attr = attr::pack(3, 8, 0);
        mask.flags = mask_flags;
        let mut shadow = full(&mut verts, [0, 0, 0], NEAR);
        shadow.attr = attr::pack(3, 16, 5);
        shadow.flags = shadow_flags;

        let polys = [
            opaque(rect(&mut verts, [0, 0, 128, 192], [31, 31, 31], MID), 5),
            opaque(rect(&mut verts, [128, 0, 256, 192], [31, 31, 31], MID), 3),
            mask,
            shadow,
        ];
        let regs = regs([0, 0, 0], 31);

        let mut r = renderer(RendererConfig::default());
        r.render_frame(&FrameInput::new(&polys, &verts, &regs)).unwrap();

        assert_eq!(r.backend().pixel(20, 50), [255, 255, 255, 255]);
        let [red, ..] = r.backend().pixel(200, 50);
        assert!((122..=124).contains(&red), "red {red}");
        assert_eq!(r.backend().attribute(200, 50)[1], 0xFF);
    }

    #[test]
    fn textured_quad_reads_vram_snapshot() {
        // 8×8 direct-color texture, every texel opaque green.
        let mut bank = vec![0u8; TEXTURE_BANK_SIZE];
        for texel in bank[..128].chunks_exact_mut(2) {
            texel.copy_from_slice(&(0x8000u16 | (31 << 5)).to_le_bytes());
        }
        let vram = VramSnapshot { texture_banks: [Some(&bank), None, None, None], ..Default::default() };

        let mut verts = Vec::new();
        let mut quad = opaque(full(&mut verts, [31, 31, 31], MID), 1);
        quad.tex_param = pack(TexFormat::Direct, 0, 0, 0);
        let regs = regs([0, 0, 0], 31);

        let mut r = renderer(RendererConfig::default());
        r.render_frame(&FrameInput::new(&[quad], &verts, &regs).with_vram(vram)).unwrap();
        assert_eq!(r.backend().pixel(64, 64), [0, 255, 0, 255]);
    }

    // ── w-buffer ──────────────────────────────────────────────────────────

    const RAMP_NEAR: (u32, u32) = (0x2000, 0x1000);
    const RAMP_FAR: (u32, u32) = (0xA000, 0x4000);

    /// Full-screen quad whose depth and W run from `RAMP_NEAR` on the left
    /// edge to `RAMP_FAR` on the right.
    fn ramp(verts: &mut Vec<Vertex>, rgb: [u8; 3]) -> Polygon {
        let mut p = full(verts, rgb, 0);
        for (i, v) in p.vertices.iter_mut().enumerate() {
            let (z, w) = if i == 1 || i == 2 { RAMP_FAR } else { RAMP_NEAR };
            v.z = z;
            v.w = w;
        }
        p
    }

    /// Depth expected at horizontal fraction `t` of [`ramp`].
    fn ramp_depth(t: f32, w_buffer: bool) -> f32 {
        let (z0, w0) = (RAMP_NEAR.0 as f32, RAMP_NEAR.1 as f32);
        let (z1, w1) = (RAMP_FAR.0 as f32, RAMP_FAR.1 as f32);
        let z = if w_buffer {
            (z0 * (1.0 - t) / w0 + z1 * t / w1) / ((1.0 - t) / w0 + t / w1)
        } else {
            z0 + (z1 - z0) * t
        };
        z / 16_777_216.0
    }

    fn render_ramp(w_buffer: bool) -> Renderer<SoftwareBackend> {
        let mut verts = Vec::new();
        let polys = [opaque(ramp(&mut verts, [31, 0, 0]), 2)];
        let regs = RenderRegisters { w_buffer, ..regs([0, 0, 0], 31) };
        let mut r = renderer(RendererConfig::default());
        r.render_frame(&FrameInput::new(&polys, &verts, &regs)).unwrap();
        r
    }

    #[test]
    fn w_buffer_interpolates_depth_with_perspective() {
        for w_buffer in [false, true] {
            let r = render_ramp(w_buffer);
            for x in [0, 64, 128, 200, 255] {
                let t = (x as f32 + 0.5) / SCREEN_WIDTH as f32;
                let want = ramp_depth(t, w_buffer);
                let got = r.backend().depth(x, 96);
                assert!((got - want).abs() <= want * 1e-4, "w_buffer={w_buffer} x={x}: {got} vs {want}");
            }
        }
        // Perspective pulls the midpoint toward the low-W edge.
        assert!(render_ramp(true).backend().depth(128, 96) < render_ramp(false).backend().depth(128, 96));
    }

    #[test]
    fn w_buffer_changes_which_surface_wins() {
        let run = |w_buffer: bool| {
            let mut verts = Vec::new();
            let polys = [
                opaque(full(&mut verts, [0, 0, 31], MID), 1),
                opaque(ramp(&mut verts, [31, 0, 0]), 2),
            ];
            let regs = RenderRegisters { w_buffer, ..regs([0, 0, 0], 31) };
            let mut r = renderer(RendererConfig::default());
            r.render_frame(&FrameInput::new(&polys, &verts, &regs)).unwrap();
            [20, 200].map(|x| r.backend().attribute(x, 96)[0])
        };

        // At x = 200 the linear depth is behind MID but the perspective one is in front.
        assert_eq!(run(false), [2, 1]);
        assert_eq!(run(true), [2, 2]);
    }

    // ── frame handling ────────────────────────────────────────────────────

    #[test]
    fn identical_input_renders_identically() {
        let mut verts = Vec::new();
        let polys = [
            opaque(rect(&mut verts, [10, 20, 200, 150], [12, 31, 3], MID), 1),
            translucent(rect(&mut verts, [50, 0, 256, 100], [31, 8, 0], NEAR), 20, 2),
        ];
        let regs = regs([2, 4, 8], 31);
        let input = FrameInput::new(&polys, &verts, &regs);

        let mut r = renderer(RendererConfig::default());
        r.render_frame(&input).unwrap();
        let first = snapshot(&mut r);
        r.render_frame(&input).unwrap();
        assert_eq!(first, snapshot(&mut r));
    }

    #[test]
    fn chunked_mode_renders_later_bands_on_demand() {
        let mut verts = Vec::new();
        let polys = [opaque(rect(&mut verts, [0, 30, 256, 170], [31, 0, 31], MID), 1)];
        let regs = regs([0, 31, 0], 31);
        let input = FrameInput::new(&polys, &verts, &regs);

        let mut whole = renderer(RendererConfig::default());
        whole.render_frame(&input).unwrap();
        let expected = snapshot(&mut whole);

        let mut chunked = renderer(RendererConfig::default().with_chunked(true));
        chunked.render_frame(&input).unwrap();
        assert!(chunked.framebuffer.is_ready(0));
        assert!(!chunked.framebuffer.is_ready(100));
        assert_eq!(snapshot(&mut chunked), expected);
    }

    #[test]
    fn upscaled_scanline_spans_all_target_rows() {
        let mut verts = Vec::new();
        let polys = [opaque(full(&mut verts, [31, 31, 31], MID), 1)];
        let regs = regs([0, 0, 0], 31);

        let mut r = renderer(RendererConfig::default().with_scale(1));
        r.render_frame(&FrameInput::new(&polys, &verts, &regs)).unwrap();
        let line = r.scanline(191).unwrap();
        assert_eq!(line.len(), 512 * 2);
        assert!(line.iter().all(|&p| p == reduce_pixel(0xFFFF_FFFF)));
    }

    #[test]
    fn set_scale_resizes_and_discards_frame() {
        let mut r = renderer(RendererConfig::default());
        r.set_scale(2).unwrap();
        assert_eq!(r.config().scale, 2);
        assert_eq!(r.scanline(0).unwrap().len(), 1024 * 4);
        assert!(matches!(r.set_scale(5), Err(RenderError::InvalidConfig(_))));
    }

    #[test]
    fn invalid_scale_is_rejected_at_construction() {
        let err = Renderer::new(SoftwareBackend::default(), RendererConfig::default().with_scale(9)).err();
        assert!(matches!(err, Some(RenderError::InvalidConfig(_))));
    }

    #[test]
    fn too_many_polygons_aborts_the_frame() {
        let mut verts = Vec::new();
        let quad = opaque(full(&mut verts, [31, 31, 31], MID), 1);
        let polys = vec![quad; crate::scene::MAX_POLYGONS + 1];
        let regs = regs([0, 0, 0], 31);

        let mut r = renderer(RendererConfig::default());
        let err = r.render_frame(&FrameInput::new(&polys, &verts, &regs)).unwrap_err();
        assert!(matches!(err, RenderError::CapacityExceeded { what: "polygon", .. }));
    }

    #[test]
    fn scanline_past_bottom_is_invalid() {
        let mut r = renderer(RendererConfig::default());
        assert!(matches!(r.scanline(SCREEN_HEIGHT), Err(RenderError::InvalidInput(_))));
    }

    #[test]
    fn empty_frame_shows_clear_color() {
        let regs = regs([31, 31, 0], 31);
        let mut r = renderer(RendererConfig::default());
        r.render_frame(&FrameInput::new(&[], &[], &regs)).unwrap();
        let yellow = reduce_pixel(u32::from_le_bytes([255, 255, 0, 255]));
        assert!(r.scanline(50).unwrap().iter().all(|&p| p == yellow));
        assert_eq!(r.backend().attribute(0, 0), [0, 0, 0, 0]);
    }
}
