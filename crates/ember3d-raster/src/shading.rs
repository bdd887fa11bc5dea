//! Per-fragment color combination and the alpha rules of each fragment program.

use crate::color::Color;
use crate::scene::{attr, DisplayControl, PolygonMode};
use crate::texture::{sample, TextureFiltering, TextureMemory, TextureParams};

/// Frame-constant inputs to the shading stage.
#[derive(Debug, Clone, Copy)]
pub struct ShadingContext<'a> {
    pub disp_cnt: DisplayControl,
    pub toon: &'a [Color; 32],
    pub memory: &'a TextureMemory,
    pub filtering: TextureFiltering,
}

/// Decodes the 5-5-5 toon table.
pub fn toon_colors(table: &[u16; 32]) -> [Color; 32] {
    table.map(|c| Color::from_rgb555(c, 1.0))
}

/// Interpolated inputs of one fragment.
#[derive(Debug, Clone, Copy)]
pub struct Fragment {
    /// Vertex color, alpha already replaced by the polygon alpha.
    pub color: Color,
    /// Texel-space coordinates.
    pub texcoord: [f32; 2],
}

/// Combines vertex color and texture according to the polygon's blend mode.
pub fn final_color(ctx: &ShadingContext<'_>, poly_attr: u32, tex: &TextureParams, frag: &Fragment) -> Color {
    let mode = PolygonMode::from_attr(poly_attr);
    let highlight = ctx.disp_cnt.contains(DisplayControl::HIGHLIGHT_SHADING);
    let mut vcol = frag.color;

    if mode == PolygonMode::ToonHighlight {
        if highlight {
            vcol = Color::new(vcol.r, vcol.r, vcol.r, vcol.a);
        } else {
            let toon = toon_entry(ctx, vcol.r);
            vcol = Color::new(toon.r, toon.g, toon.b, vcol.a);
        }
    }

    let mut col = if tex.is_textured() && ctx.disp_cnt.contains(DisplayControl::TEXTURE_MAPPING) {
        let t = sample(ctx.memory, tex, frag.texcoord[0], frag.texcoord[1], ctx.filtering);
        if mode == PolygonMode::Decal {
            Color::new(
                t.r * t.a + vcol.r * (1.0 - t.a),
                t.g * t.a + vcol.g * (1.0 - t.a),
                t.b * t.a + vcol.b * (1.0 - t.a),
                vcol.a,
            )
        } else {
            Color::new(vcol.r * t.r, vcol.g * t.g, vcol.b * t.b, vcol.a * t.a)
        }
    } else {
        vcol
    };

    if mode == PolygonMode::ToonHighlight && highlight {
        let toon = toon_entry(ctx, vcol.r);
        col.r = (col.r + toon.r).min(1.0);
        col.g = (col.g + toon.g).min(1.0);
        col.b = (col.b + toon.b).min(1.0);
    }

    col
}

#[inline]
fn toon_entry(ctx: &ShadingContext<'_>, r: f32) -> Color {
    ctx.toon[((r * 31.0) as usize).min(31)]
}

/// Fragment program family. Each exists in a Z-buffer and a W-buffer variant.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Program {
    Opaque,
    Translucent,
    ShadowMask,
    Shadow,
}

impl Program {
    pub const ALL: [Program; 4] = [Self::Opaque, Self::Translucent, Self::ShadowMask, Self::Shadow];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Opaque => "opaque",
            Self::Translucent => "translucent",
            Self::ShadowMask => "shadow_mask",
            Self::Shadow => "shadow",
        }
    }

    /// Whether a fragment with this alpha survives the program's discard rule.
    #[inline]
    pub fn accepts_alpha(self, a: f32) -> bool {
        let c = Color::new(0.0, 0.0, 0.0, a);
        match self {
            Self::Opaque => c.is_opaque(),
            Self::Translucent | Self::Shadow => !c.is_transparent() && !c.is_opaque(),
            Self::ShadowMask => true,
        }
    }

    /// Runs the program for one fragment.
    ///
    /// `snapshot` is the attribute snapshot texel under the fragment, read only
    /// by the shadow program. Returns `None` when the fragment is discarded.
    pub fn shade(
        self,
        ctx: &ShadingContext<'_>,
        poly_attr: u32,
        tex: &TextureParams,
        frag: &Fragment,
        snapshot: [u8; 4],
    ) -> Option<FragmentOutput> {
        let id = ((poly_attr & attr::ID_MASK) >> attr::ID_SHIFT) as u8;

        if self == Self::ShadowMask {
            return Some(FragmentOutput { color: Color::BLACK, attr: [0, 0xFF, 1, 0] });
        }

        let color = final_color(ctx, poly_attr, tex, frag);
        if !self.accepts_alpha(color.a) {
            return None;
        }

        let attr = match self {
            Self::Opaque => [id, id, 0, 0],
            Self::Shadow => {
                if snapshot[2] != 1 || snapshot[1] == id {
                    return None;
                }
                [0, 0xFF, 0, 0]
            }
            _ => [0, 0xFF, 0, 0],
        };
        Some(FragmentOutput { color, attr })
    }
}

/// Color and attribute values produced by a fragment program, before write masks.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FragmentOutput {
    pub color: Color,
    pub attr: [u8; 4],
}
