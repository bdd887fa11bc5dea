/// Straight-alpha RGBA color with channels normalized to `[0, 1]`.
///
/// Texels, vertex colors and fragment results all travel through the CPU
/// pipeline in this form. The math mirrors the WGSL shaders, so values stay
/// as `f32` rather than being re-quantized between stages.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

/// Alpha below this is treated as fully transparent (half a 5-bit step).
pub const ALPHA_ZERO_THRESHOLD: f32 = 0.5 / 31.0;

/// Alpha at or above this is treated as fully opaque.
pub const ALPHA_OPAQUE_THRESHOLD: f32 = 30.5 / 31.0;

impl Color {
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Builds a color from 5-bit channels and a 5-bit alpha.
    #[inline]
    pub fn from_rgb5(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::new(
            f32::from(r & 0x1F) / 31.0,
            f32::from(g & 0x1F) / 31.0,
            f32::from(b & 0x1F) / 31.0,
            f32::from(a & 0x1F) / 31.0,
        )
    }

    /// Decodes a 15-bit `0bBBBBBGGGGGRRRRR` word, ignoring bit 15.
    #[inline]
    pub fn from_rgb555(c: u16, a: f32) -> Self {
        Self::new(
            f32::from(c & 0x1F) / 31.0,
            f32::from((c >> 5) & 0x1F) / 31.0,
            f32::from((c >> 10) & 0x1F) / 31.0,
            a,
        )
    }

    /// Linear interpolation of all four channels, `t = 0` yields `self`.
    #[inline]
    pub fn mix(self, other: Self, t: f32) -> Self {
        Self::new(
            self.r + (other.r - self.r) * t,
            self.g + (other.g - self.g) * t,
            self.b + (other.b - self.b) * t,
            self.a + (other.a - self.a) * t,
        )
    }

    #[inline]
    pub fn is_transparent(self) -> bool {
        self.a < ALPHA_ZERO_THRESHOLD
    }

    #[inline]
    pub fn is_opaque(self) -> bool {
        self.a >= ALPHA_OPAQUE_THRESHOLD
    }

    /// Quantizes to 8-bit unorm, the way a `Rgba8Unorm` target stores it.
    #[inline]
    pub fn to_unorm8(self) -> [u8; 4] {
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }

    #[inline]
    pub fn from_unorm8(p: [u8; 4]) -> Self {
        Self::new(
            f32::from(p[0]) / 255.0,
            f32::from(p[1]) / 255.0,
            f32::from(p[2]) / 255.0,
            f32::from(p[3]) / 255.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb555_decodes_channels_in_order() {
        let c = Color::from_rgb555(0x001F | (0x10 << 5) | (0x01 << 10), 1.0);
        assert_eq!(c.r, 1.0);
        assert_eq!(c.g, 16.0 / 31.0);
        assert_eq!(c.b, 1.0 / 31.0);
    }

    #[test]
    fn unorm8_round_trips_exact_bytes() {
        let p = [0, 17, 128, 255];
        assert_eq!(Color::from_unorm8(p).to_unorm8(), p);
    }

    #[test]
    fn thresholds_split_alpha_range() {
        assert!(Color::from_rgb5(0, 0, 0, 0).is_transparent());
        assert!(!Color::from_rgb5(0, 0, 0, 1).is_transparent());
        assert!(Color::from_rgb5(0, 0, 0, 31).is_opaque());
        assert!(!Color::from_rgb5(0, 0, 0, 30).is_opaque());
    }
}
