use super::polygon::{attr, Polygon, PolygonFlags};

/// Draw-order class, the most significant part of a [`RenderKey`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum DrawClass {
    Opaque = 0,
    Translucent = 1,
    ShadowMask = 2,
    Shadow = 3,
}

/// Composite batch key for one polygon.
///
/// Layout, most significant first:
/// - bits 16–17: [`DrawClass`]
/// - bits 8–13: polygon ID (translucent and shadow polygons only)
/// - bit 1: translucent depth write, or the alpha-zero marker for opaque polygons
/// - bit 0: depth-test-equal
///
/// Consecutive polygons with equal keys are drawn by one call; any differing
/// bit starts a new batch.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct RenderKey(u32);

const CLASS_SHIFT: u32 = 16;
const ID_SHIFT: u32 = 8;
const DEPTH_WRITE: u32 = 1 << 1;
const DEPTH_EQUAL: u32 = 1 << 0;

impl RenderKey {
    pub fn for_polygon(p: &Polygon) -> Self {
        let mut key = (p.attr >> 14) & DEPTH_EQUAL;

        let class = if p.flags.contains(PolygonFlags::SHADOW_MASK) {
            DrawClass::ShadowMask
        } else if p.flags.contains(PolygonFlags::TRANSLUCENT) {
            if p.writes_translucent_depth() {
                key |= DEPTH_WRITE;
            }
            key |= u32::from(p.id()) << ID_SHIFT;
            if p.flags.contains(PolygonFlags::SHADOW) {
                DrawClass::Shadow
            } else {
                DrawClass::Translucent
            }
        } else {
            if p.attr & attr::ALPHA_MASK == 0 {
                key |= DEPTH_WRITE;
            }
            DrawClass::Opaque
        };

        Self(key | ((class as u32) << CLASS_SHIFT))
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn class(self) -> DrawClass {
        match (self.0 >> CLASS_SHIFT) & 0x3 {
            0 => DrawClass::Opaque,
            1 => DrawClass::Translucent,
            2 => DrawClass::ShadowMask,
            _ => DrawClass::Shadow,
        }
    }

    #[inline]
    pub const fn polygon_id(self) -> u8 {
        ((self.0 >> ID_SHIFT) & 0x3F) as u8
    }

    /// Depth write flag for translucent and shadow batches.
    #[inline]
    pub const fn depth_write(self) -> bool {
        self.0 & DEPTH_WRITE != 0
    }

    #[inline]
    pub const fn depth_equal(self) -> bool {
        self.0 & DEPTH_EQUAL != 0
    }
}
