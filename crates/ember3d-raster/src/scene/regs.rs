use bitflags::bitflags;

bitflags! {
    /// 3D display control bits consumed by the fragment stage.
    #[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
    pub struct DisplayControl: u32 {
        const TEXTURE_MAPPING   = 1 << 0;
        /// Blend mode 2 means highlight instead of toon.
        const HIGHLIGHT_SHADING = 1 << 1;
    }
}

/// Global registers latched for one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRegisters {
    pub disp_cnt: DisplayControl,
    /// Clear color (0–14), fog (15), alpha (16–20), polygon ID (24–29).
    pub clear_attr1: u32,
    /// Clear depth (0–14).
    pub clear_attr2: u32,
    /// Toon table, 5-5-5 entries.
    pub toon_table: [u16; 32],
    /// W-buffering for the whole frame.
    pub w_buffer: bool,
}

impl Default for RenderRegisters {
    fn default() -> Self {
        Self {
            disp_cnt: DisplayControl::TEXTURE_MAPPING,
            clear_attr1: 0,
            clear_attr2: 0x7FFF,
            toon_table: [0; 32],
            w_buffer: false,
        }
    }
}

impl RenderRegisters {
    /// Decodes the two clear attribute words.
    pub fn clear(&self) -> ClearAttributes {
        let a1 = self.clear_attr1;
        ClearAttributes {
            rgb: [
                (a1 & 0x1F) as u8,
                ((a1 >> 5) & 0x1F) as u8,
                ((a1 >> 10) & 0x1F) as u8,
            ],
            fog: (a1 >> 15) & 1 != 0,
            alpha: ((a1 >> 16) & 0x1F) as u8,
            polygon_id: ((a1 >> 24) & 0x3F) as u8,
            depth: ((self.clear_attr2 & 0x7FFF) * 0x200) + 0x1FF,
        }
    }
}

/// Decoded clear-plane values.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ClearAttributes {
    pub rgb: [u8; 3],
    pub fog: bool,
    pub alpha: u8,
    pub polygon_id: u8,
    /// 24-bit depth.
    pub depth: u32,
}

impl ClearAttributes {
    /// Depth as stored in a `[0, 1]` depth buffer.
    #[inline]
    pub fn depth_unorm(&self) -> f32 {
        self.depth as f32 / 16_777_216.0
    }

    /// Translucent pixels over a zero-alpha background are drawn without blending.
    #[inline]
    pub fn alpha_is_zero(&self) -> bool {
        self.alpha == 0
    }
}

/// Packs a clear attribute word 1.
pub const fn clear_attr1(rgb: [u8; 3], alpha: u8, polygon_id: u8) -> u32 {
    (rgb[0] as u32 & 0x1F)
        | ((rgb[1] as u32 & 0x1F) << 5)
        | ((rgb[2] as u32 & 0x1F) << 10)
        | ((alpha as u32 & 0x1F) << 16)
        | ((polygon_id as u32 & 0x3F) << 24)
}
