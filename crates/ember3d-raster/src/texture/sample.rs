use crate::color::Color;

use super::decode::fetch;
use super::memory::TextureMemory;
use super::param::TextureParams;

/// Texture filtering applied by the sampler.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum TextureFiltering {
    /// One texel per fragment, as on hardware.
    #[default]
    Nearest,
    /// 2×2 weighted average with transparent-pair suppression.
    Bilinear,
}

impl TextureFiltering {
    /// Value passed to the shaders.
    #[inline]
    pub const fn as_u32(self) -> u32 {
        match self {
            Self::Nearest => 0,
            Self::Bilinear => 1,
        }
    }
}

/// Samples at texel-space coordinate `(s, t)`.
pub fn sample(mem: &TextureMemory, tex: &TextureParams, s: f32, t: f32, filtering: TextureFiltering) -> Color {
    match filtering {
        TextureFiltering::Nearest => sample_nearest(mem, tex, s, t),
        TextureFiltering::Bilinear => sample_bilinear(mem, tex, s, t),
    }
}

pub fn sample_nearest(mem: &TextureMemory, tex: &TextureParams, s: f32, t: f32) -> Color {
    fetch(mem, tex, s.floor() as i32, t.floor() as i32)
}

pub fn sample_bilinear(mem: &TextureMemory, tex: &TextureParams, s: f32, t: f32) -> Color {
    let (s0, t0) = (s.floor(), t.floor());
    let (fs, ft) = (s - s0, t - t0);
    let (s0, t0) = (s0 as i32, t0 as i32);

    let a = fetch(mem, tex, s0, t0);
    let b = fetch(mem, tex, s0 + 1, t0);
    let c = fetch(mem, tex, s0, t0 + 1);
    let d = fetch(mem, tex, s0 + 1, t0 + 1);

    let ab = mix_pair(a, b, fs);
    let cd = mix_pair(c, d, fs);
    mix_pair(ab, cd, ft)
}

/// Blends two texels, collapsing to transparent black when both are transparent.
#[inline]
fn mix_pair(a: Color, b: Color, t: f32) -> Color {
    if a.is_transparent() && b.is_transparent() {
        Color::TRANSPARENT
    } else {
        a.mix(b, t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::param::{bits, pack, TexFormat};

    /// 8×8 direct-color texture at address 0 with texel (1, 0) transparent.
    fn fixture() -> (TextureMemory, TextureParams) {
        let mut mem = TextureMemory::new();
        for i in 0..64usize {
            let c: u16 = 0x8000 | 31;
            mem.texels_mut()[i * 2..i * 2 + 2].copy_from_slice(&c.to_le_bytes());
        }
        mem.texels_mut()[2..4].copy_from_slice(&0u16.to_le_bytes());
        let tex = TextureParams::decode(pack(TexFormat::Direct, 0, 0, 0) | bits::REPEAT_S | bits::REPEAT_T, 0);
        (mem, tex)
    }

    #[test]
    fn nearest_floors_coordinates() {
        let (mem, tex) = fixture();
        assert_eq!(sample_nearest(&mem, &tex, 1.9, 0.2).a, 0.0);
        assert_eq!(sample_nearest(&mem, &tex, 0.9, 0.2).a, 1.0);
        // floor, not truncation toward zero
        assert_eq!(sample_nearest(&mem, &tex, -0.5, 0.0).a, 1.0);
        assert_eq!(sample_nearest(&mem, &tex, -6.5, 0.0).a, 0.0);
    }

    #[test]
    fn bilinear_weights_horizontal_then_vertical() {
        let (mem, tex) = fixture();
        let c = sample_bilinear(&mem, &tex, 0.25, 0.0);
        assert!((c.a - 0.75).abs() < 1e-6);
        assert!((c.r - 0.75).abs() < 1e-6);
    }

    #[test]
    fn transparent_pair_collapses_to_black() {
        let mut mem = TextureMemory::new();
        mem.texels_mut()[0..2].copy_from_slice(&31u16.to_le_bytes());
        let tex = TextureParams::decode(pack(TexFormat::Direct, 0, 0, 0), 0);
        let c = sample_bilinear(&mem, &tex, 0.5, 0.5);
        assert_eq!(c, Color::TRANSPARENT);
    }

    #[test]
    fn faint_rows_collapse_in_the_vertical_mix() {
        // Each row pairs a transparent red texel with an opaque green one.
        let mut mem = TextureMemory::new();
        let red: u16 = 31;
        let green: u16 = 0x8000 | (31 << 5);
        for texel in [0usize, 8] {
            mem.texels_mut()[texel * 2..texel * 2 + 2].copy_from_slice(&red.to_le_bytes());
            mem.texels_mut()[texel * 2 + 2..texel * 2 + 4].copy_from_slice(&green.to_le_bytes());
        }
        let tex = TextureParams::decode(pack(TexFormat::Direct, 0, 0, 0), 0);

        // Both row mixes land under the zero-alpha threshold with red still showing.
        let row = mix_pair(fetch(&mem, &tex, 0, 0), fetch(&mem, &tex, 1, 0), 0.01);
        assert!(row.is_transparent() && row.r > 0.9);

        assert_eq!(sample_bilinear(&mem, &tex, 0.01, 0.5), Color::TRANSPARENT);
        assert!(!sample_bilinear(&mem, &tex, 0.5, 0.5).is_transparent());
    }

    #[test]
    fn integer_coordinates_match_nearest() {
        let (mem, tex) = fixture();
        for s in 0..8 {
            let s = s as f32;
            assert_eq!(sample_bilinear(&mem, &tex, s, 3.0), sample_nearest(&mem, &tex, s, 3.0));
        }
    }
}
