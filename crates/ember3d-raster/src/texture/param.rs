/// Native texel formats, attribute bits 26–28 of the texture parameter word.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TexFormat {
    None = 0,
    A3I5 = 1,
    I2 = 2,
    I4 = 3,
    I8 = 4,
    Compressed = 5,
    A5I3 = 6,
    Direct = 7,
}

impl TexFormat {
    #[inline]
    pub const fn from_bits(bits: u32) -> Self {
        match bits & 0x7 {
            0 => Self::None,
            1 => Self::A3I5,
            2 => Self::I2,
            3 => Self::I4,
            4 => Self::I8,
            5 => Self::Compressed,
            6 => Self::A5I3,
            _ => Self::Direct,
        }
    }
}

/// Out-of-range coordinate handling for one axis.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum WrapMode {
    Clamp,
    Repeat,
    /// Repeat with every odd tile flipped.
    Mirror,
}

impl WrapMode {
    /// Decodes a `(repeat, mirror)` bit pair. Mirror without repeat clamps.
    #[inline]
    pub const fn from_bits(repeat: bool, mirror: bool) -> Self {
        match (repeat, mirror) {
            (false, _) => Self::Clamp,
            (true, false) => Self::Repeat,
            (true, true) => Self::Mirror,
        }
    }
}

/// Bit positions inside the texture parameter word.
pub mod bits {
    pub const ADDRESS_MASK: u32 = 0xFFFF;
    pub const REPEAT_S: u32 = 1 << 16;
    pub const REPEAT_T: u32 = 1 << 17;
    pub const MIRROR_S: u32 = 1 << 18;
    pub const MIRROR_T: u32 = 1 << 19;
    pub const WIDTH_SHIFT: u32 = 20;
    pub const HEIGHT_SHIFT: u32 = 23;
    pub const FORMAT_SHIFT: u32 = 26;
    pub const COLOR0_TRANSPARENT: u32 = 1 << 29;
}

/// A decoded texture parameter word plus palette base.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TextureParams {
    pub format: TexFormat,
    /// Byte address of texel data in texture memory.
    pub address: u32,
    /// Palette base as written by the game; each format scales it differently.
    pub palette: u32,
    pub width: u32,
    pub height: u32,
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
    /// Palette index 0 yields alpha 0 in the indexed formats.
    pub color0_transparent: bool,
}

impl TextureParams {
    pub fn decode(tex_param: u32, tex_palette: u32) -> Self {
        Self {
            format: TexFormat::from_bits(tex_param >> bits::FORMAT_SHIFT),
            address: (tex_param & bits::ADDRESS_MASK) << 3,
            palette: tex_palette & 0x1FFF,
            width: 8 << ((tex_param >> bits::WIDTH_SHIFT) & 0x7),
            height: 8 << ((tex_param >> bits::HEIGHT_SHIFT) & 0x7),
            wrap_s: WrapMode::from_bits(tex_param & bits::REPEAT_S != 0, tex_param & bits::MIRROR_S != 0),
            wrap_t: WrapMode::from_bits(tex_param & bits::REPEAT_T != 0, tex_param & bits::MIRROR_T != 0),
            color0_transparent: tex_param & bits::COLOR0_TRANSPARENT != 0,
        }
    }

    #[inline]
    pub fn is_textured(&self) -> bool {
        self.format != TexFormat::None
    }
}

/// Packs a texture parameter word. `width_log`/`height_log` select `8 << n`.
pub const fn pack(format: TexFormat, address: u32, width_log: u32, height_log: u32) -> u32 {
    ((address >> 3) & bits::ADDRESS_MASK)
        | ((width_log & 0x7) << bits::WIDTH_SHIFT)
        | ((height_log & 0x7) << bits::HEIGHT_SHIFT)
        | ((format as u32) << bits::FORMAT_SHIFT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_extracts_all_fields() {
        let word = pack(TexFormat::I4, 0x1_0000, 3, 1)
            | bits::REPEAT_S
            | bits::MIRROR_S
            | bits::MIRROR_T
            | bits::COLOR0_TRANSPARENT;
        let p = TextureParams::decode(word, 0x12);

        assert_eq!(p.format, TexFormat::I4);
        assert_eq!(p.address, 0x1_0000);
        assert_eq!(p.palette, 0x12);
        assert_eq!((p.width, p.height), (64, 16));
        assert_eq!(p.wrap_s, WrapMode::Mirror);
        assert_eq!(p.wrap_t, WrapMode::Clamp);
        assert!(p.color0_transparent);
    }

    #[test]
    fn format_zero_disables_texturing() {
        assert!(!TextureParams::decode(0, 0).is_textured());
    }
}
