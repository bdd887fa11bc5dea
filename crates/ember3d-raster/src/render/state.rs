use bitflags::bitflags;

use crate::shading::Program;

bitflags! {
    /// Writable channels of the attribute target.
    #[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
    pub struct AttrWrites: u8 {
        /// R: opaque polygon ID for edge marking.
        const EDGE_ID      = 1 << 0;
        /// G: polygon ID compared by shadows.
        const SHADOW_ID    = 1 << 1;
        /// B: shadow-mask pending flag.
        const STENCIL_FLAG = 1 << 2;
    }
}

impl AttrWrites {
    pub fn to_color_writes(self) -> wgpu::ColorWrites {
        let mut w = wgpu::ColorWrites::empty();
        if self.contains(Self::EDGE_ID) {
            w |= wgpu::ColorWrites::RED;
        }
        if self.contains(Self::SHADOW_ID) {
            w |= wgpu::ColorWrites::GREEN;
        }
        if self.contains(Self::STENCIL_FLAG) {
            w |= wgpu::ColorWrites::BLUE;
        }
        w
    }

    /// Whether channel `i` (0 = R) is written.
    #[inline]
    pub fn writes_channel(self, i: usize) -> bool {
        i < 3 && self.bits() & (1 << i) != 0
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum DepthCompare {
    Less,
    GreaterEqual,
}

impl DepthCompare {
    #[inline]
    pub fn passes(self, fragment: f32, stored: f32) -> bool {
        match self {
            Self::Less => fragment < stored,
            Self::GreaterEqual => fragment >= stored,
        }
    }

    pub fn to_wgpu(self) -> wgpu::CompareFunction {
        match self {
            Self::Less => wgpu::CompareFunction::Less,
            Self::GreaterEqual => wgpu::CompareFunction::GreaterEqual,
        }
    }
}

/// Stencil configurations used by the compositor. The reference value is
/// dynamic and travels with [`super::PassCmd::SetState`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum StencilMode {
    /// Test always passes, nothing written.
    Ignore,
    /// Always pass, write the reference.
    AlwaysReplace,
    /// Pass where the stored value is 0, then invert the bits in `write_mask`.
    EqualZeroInvert { write_mask: u8 },
    /// Pass where the stored value differs from the reference, then write it.
    NotEqualReplace,
}

impl StencilMode {
    /// Applies the test and, on a depth pass, the write. Returns whether the
    /// stencil test passed.
    pub fn apply(self, stored: &mut u8, reference: u8, depth_passed: bool) -> bool {
        let pass = match self {
            Self::Ignore | Self::AlwaysReplace => true,
            Self::EqualZeroInvert { .. } => *stored == 0,
            Self::NotEqualReplace => *stored != reference,
        };
        if pass && depth_passed {
            match self {
                Self::Ignore => {}
                Self::AlwaysReplace | Self::NotEqualReplace => *stored = reference,
                Self::EqualZeroInvert { write_mask } => {
                    *stored = (*stored & !write_mask) | (!*stored & write_mask);
                }
            }
        }
        pass
    }

    pub fn to_wgpu(self) -> wgpu::StencilState {
        let (compare, pass_op, write_mask) = match self {
            Self::Ignore => (wgpu::CompareFunction::Always, wgpu::StencilOperation::Keep, 0),
            Self::AlwaysReplace => (wgpu::CompareFunction::Always, wgpu::StencilOperation::Replace, 0xFF),
            Self::EqualZeroInvert { write_mask } => {
                (wgpu::CompareFunction::Equal, wgpu::StencilOperation::Invert, u32::from(write_mask))
            }
            Self::NotEqualReplace => (wgpu::CompareFunction::NotEqual, wgpu::StencilOperation::Replace, 0xFF),
        };
        let face = wgpu::StencilFaceState {
            compare,
            fail_op: wgpu::StencilOperation::Keep,
            depth_fail_op: wgpu::StencilOperation::Keep,
            pass_op,
        };
        wgpu::StencilState { front: face, back: face, read_mask: 0xFF, write_mask }
    }
}

/// Fixed-function state of one draw. Also the pipeline cache key.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct DrawState {
    pub program: Program,
    pub w_buffer: bool,
    pub blend: bool,
    pub color_write: bool,
    pub attr_writes: AttrWrites,
    pub depth_compare: DepthCompare,
    pub depth_write: bool,
    pub stencil: StencilMode,
}

impl DrawState {
    /// Opaque pass state.
    pub fn opaque(w_buffer: bool) -> Self {
        Self {
            program: Program::Opaque,
            w_buffer,
            blend: false,
            color_write: true,
            attr_writes: AttrWrites::EDGE_ID | AttrWrites::SHADOW_ID,
            depth_compare: DepthCompare::Less,
            depth_write: true,
            stencil: StencilMode::AlwaysReplace,
        }
    }

    /// Translucent pixels drawn unblended over a zero-alpha clear plane.
    pub fn edge(w_buffer: bool, depth_write: bool, polygon_id: u8) -> Self {
        Self {
            program: Program::Translucent,
            w_buffer,
            blend: false,
            color_write: true,
            attr_writes: AttrWrites::empty(),
            depth_compare: DepthCompare::Less,
            depth_write,
            stencil: StencilMode::EqualZeroInvert { write_mask: translucent_stencil(polygon_id) },
        }
    }

    pub fn shadow_mask(w_buffer: bool) -> Self {
        Self {
            program: Program::ShadowMask,
            w_buffer,
            blend: false,
            color_write: false,
            attr_writes: AttrWrites::STENCIL_FLAG,
            depth_compare: DepthCompare::GreaterEqual,
            depth_write: false,
            stencil: StencilMode::Ignore,
        }
    }

    /// Blended translucent or shadow draw.
    pub fn translucent(w_buffer: bool, shadow: bool, depth_write: bool, after_mask: bool) -> Self {
        Self {
            program: if shadow { Program::Shadow } else { Program::Translucent },
            w_buffer,
            blend: true,
            color_write: true,
            attr_writes: if after_mask { AttrWrites::SHADOW_ID } else { AttrWrites::empty() },
            depth_compare: DepthCompare::Less,
            depth_write,
            stencil: StencilMode::NotEqualReplace,
        }
    }

    /// Color blend: RGB source-over by source alpha, alpha keeps the maximum.
    pub fn blend_state(&self) -> Option<wgpu::BlendState> {
        self.blend.then_some(wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::SrcAlpha,
                dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Max,
            },
        })
    }
}

/// Stencil value tagging pixels already covered by a translucent polygon ID.
#[inline]
pub const fn translucent_stencil(polygon_id: u8) -> u8 {
    0x40 | (polygon_id & 0x3F)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invert_touches_only_masked_bits() {
        let mut s = 0u8;
        assert!(StencilMode::EqualZeroInvert { write_mask: 0x45 }.apply(&mut s, 0, true));
        assert_eq!(s, 0x45);
        assert!(!StencilMode::EqualZeroInvert { write_mask: 0x45 }.apply(&mut s, 0, true));
        assert_eq!(s, 0x45);
    }

    #[test]
    fn not_equal_replace_blocks_same_id_twice() {
        let mut s = 0xFF;
        let tag = translucent_stencil(7);
        assert!(StencilMode::NotEqualReplace.apply(&mut s, tag, true));
        assert_eq!(s, tag);
        assert!(!StencilMode::NotEqualReplace.apply(&mut s, tag, true));
    }

    #[test]
    fn depth_failure_keeps_stencil() {
        let mut s = 0;
        assert!(StencilMode::AlwaysReplace.apply(&mut s, 0xFF, false));
        assert_eq!(s, 0);
    }

    #[test]
    fn attr_writes_map_to_channels() {
        let w = AttrWrites::EDGE_ID | AttrWrites::STENCIL_FLAG;
        assert_eq!(w.to_color_writes(), wgpu::ColorWrites::RED | wgpu::ColorWrites::BLUE);
        assert!(w.writes_channel(0));
        assert!(!w.writes_channel(1));
        assert!(!w.writes_channel(3));
    }
}
