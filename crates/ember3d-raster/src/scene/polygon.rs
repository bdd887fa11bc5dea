use bitflags::bitflags;
use smallvec::SmallVec;

bitflags! {
    /// Per-polygon classification computed by the geometry engine.
    #[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
    pub struct PolygonFlags: u8 {
        const TRANSLUCENT = 1 << 0;
        const SHADOW      = 1 << 1;
        const SHADOW_MASK = 1 << 2;
        const W_BUFFER    = 1 << 3;
        const FACING_VIEW = 1 << 4;
        const DEGENERATE  = 1 << 5;
    }
}

/// Bit positions inside the polygon attribute word.
pub mod attr {
    pub const MODE_SHIFT: u32 = 4;
    pub const DEPTH_WRITE_TRANSLUCENT: u32 = 1 << 11;
    pub const DEPTH_TEST_EQUAL: u32 = 1 << 14;
    pub const FOG: u32 = 1 << 15;
    pub const ALPHA_SHIFT: u32 = 16;
    pub const ALPHA_MASK: u32 = 0x1F << ALPHA_SHIFT;
    pub const ID_SHIFT: u32 = 24;
    pub const ID_MASK: u32 = 0x3F << ID_SHIFT;

    /// Packs mode, alpha and polygon ID into an attribute word.
    pub const fn pack(mode: u32, alpha: u32, id: u32) -> u32 {
        ((mode & 0x3) << MODE_SHIFT) | ((alpha & 0x1F) << ALPHA_SHIFT) | ((id & 0x3F) << ID_SHIFT)
    }
}

/// Fragment color combination selected by attribute bits 4–5.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PolygonMode {
    Modulate,
    Decal,
    ToonHighlight,
    Shadow,
}

impl PolygonMode {
    #[inline]
    pub const fn from_attr(attr: u32) -> Self {
        match (attr >> attr::MODE_SHIFT) & 0x3 {
            0 => Self::Modulate,
            1 => Self::Decal,
            2 => Self::ToonHighlight,
            _ => Self::Shadow,
        }
    }
}

/// One corner of a polygon: a shared vertex plus the polygon's own depth values.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct PolygonVertex {
    /// Index into the frame's vertex array.
    pub vertex: u16,
    /// Final Z (24-bit range, may exceed 16 bits).
    pub z: u32,
    /// Final W (16-bit).
    pub w: u32,
}

/// A polygon ready for rasterization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Polygon {
    pub attr: u32,
    pub tex_param: u32,
    pub tex_palette: u32,
    pub vertices: SmallVec<[PolygonVertex; 10]>,
    pub flags: PolygonFlags,
}

impl Polygon {
    #[inline]
    pub fn alpha(&self) -> u8 {
        ((self.attr & attr::ALPHA_MASK) >> attr::ALPHA_SHIFT) as u8
    }

    #[inline]
    pub fn id(&self) -> u8 {
        ((self.attr & attr::ID_MASK) >> attr::ID_SHIFT) as u8
    }

    #[inline]
    pub fn mode(&self) -> PolygonMode {
        PolygonMode::from_attr(self.attr)
    }

    /// Whether a translucent fragment of this polygon updates the depth buffer.
    #[inline]
    pub fn writes_translucent_depth(&self) -> bool {
        self.attr & attr::DEPTH_WRITE_TRANSLUCENT != 0
    }

    /// Fewer than three usable corners, or flagged by the geometry engine.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.flags.contains(PolygonFlags::DEGENERATE) || self.vertices.len() < 3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attr_accessors_extract_fields() {
        let p = Polygon {
            attr: attr::pack(2, 16, 45) | attr::DEPTH_WRITE_TRANSLUCENT,
            ..Default::default()
        };
        assert_eq!(p.alpha(), 16);
        assert_eq!(p.id(), 45);
        assert_eq!(p.mode(), PolygonMode::ToonHighlight);
        assert!(p.writes_translucent_depth());
    }

    #[test]
    fn short_vertex_list_is_degenerate() {
        let mut p = Polygon::default();
        p.vertices.extend([PolygonVertex::default(); 2]);
        assert!(p.is_degenerate());
        p.vertices.push(PolygonVertex::default());
        assert!(!p.is_degenerate());
        p.flags |= PolygonFlags::DEGENERATE;
        assert!(p.is_degenerate());
    }
}
