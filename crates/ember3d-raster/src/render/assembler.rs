use bytemuck::{Pod, Zeroable};

use crate::error::{RenderError, RenderResult};
use crate::scene::{Polygon, PolygonFlags, RenderList, Vertex};

/// Hardware vertex RAM size.
pub const MAX_VERTICES: usize = 10240;
/// Index capacity: every polygon fanned into at most 8 triangles.
pub const MAX_INDICES: usize = 2048 * 8 * 3;

/// Polygon attribute bits carried through to the shaders.
const ATTR_KEEP_MASK: u32 = 0x3F00_C8F0;
const ATTR_FACING_SHIFT: u32 = 8;
const ATTR_WBUFFER_SHIFT: u32 = 9;
const ATTR_ZSHIFT_SHIFT: u32 = 16;

/// One vertex as laid out in the vertex buffer.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct PackedVertex {
    /// x, y in target pixels; z (shifted to 16 bits); w (16-bit).
    pub position: [u16; 4],
    /// 8-bit RGB plus the 5-bit polygon alpha.
    pub color: [u8; 4],
    /// 12.4 fixed point.
    pub texcoord: [i16; 2],
    /// Polygon attribute word, texture parameter word, palette base.
    pub attr: [u32; 3],
}

impl PackedVertex {
    const ATTRS: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        0 => Uint16x4, // position
        1 => Uint8x4,  // color
        2 => Sint16x2, // texcoord
        3 => Uint32x3  // attr
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<PackedVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }

    /// Number of right shifts applied to fit Z into 16 bits.
    #[inline]
    pub fn zshift(&self) -> u32 {
        (self.attr[0] >> ATTR_ZSHIFT_SHIFT) & 0x1F
    }

    /// Depth in `[0, 1]`, as both vertex shader variants compute it.
    #[inline]
    pub fn depth(&self) -> f32 {
        (u32::from(self.position[2]) << self.zshift()) as f32 / 16_777_216.0
    }

    #[inline]
    pub fn w(&self) -> f32 {
        f32::from(self.position[3]) / 65536.0
    }
}

/// Packs the sorted polygon list into vertex and index arrays.
///
/// Buffers are kept between frames and only grow up to the hardware limits.
#[derive(Debug, Default)]
pub struct Assembler {
    vertices: Vec<PackedVertex>,
    indices: Vec<u16>,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits vertices and fan indices for every list item in draw order and
    /// records each item's index range.
    ///
    /// `scale` is the upscale exponent (0 = native resolution).
    pub fn assemble(
        &mut self,
        list: &mut RenderList,
        polygons: &[Polygon],
        vertices: &[Vertex],
        scale: u32,
    ) -> RenderResult<()> {
        self.vertices.clear();
        self.indices.clear();

        for item in list.items_mut() {
            let poly = &polygons[item.source];
            let n = poly.vertices.len();

            if self.vertices.len() + n > MAX_VERTICES {
                return Err(RenderError::CapacityExceeded { what: "vertex", limit: MAX_VERTICES });
            }
            if self.indices.len() + (n - 2) * 3 > MAX_INDICES {
                return Err(RenderError::CapacityExceeded { what: "index", limit: MAX_INDICES });
            }

            let first = self.vertices.len() as u16;
            for corner in &poly.vertices {
                let vtx = vertices.get(usize::from(corner.vertex)).ok_or_else(|| {
                    RenderError::InvalidInput(format!(
                        "polygon {} references vertex {} of {}",
                        item.source,
                        corner.vertex,
                        vertices.len()
                    ))
                })?;
                self.vertices.push(pack_vertex(poly, vtx, corner.z, corner.w, scale));
            }

            let start = self.indices.len() as u32;
            for i in 2..n as u16 {
                self.indices.extend_from_slice(&[first, first + i - 1, first + i]);
            }
            item.indices = start..self.indices.len() as u32;
        }

        log::debug!(
            "assembled {} polygons: {} vertices, {} triangles",
            list.len(),
            self.vertices.len(),
            self.indices.len() / 3
        );
        Ok(())
    }

    #[inline]
    pub fn vertices(&self) -> &[PackedVertex] {
        &self.vertices
    }

    #[inline]
    pub fn indices(&self) -> &[u16] {
        &self.indices
    }
}

fn pack_vertex(poly: &Polygon, vtx: &Vertex, z: u32, w: u32, scale: u32) -> PackedVertex {
    let [x, y] = if scale > 0 {
        vtx.hires_position.map(|c| c >> (4 - scale.min(4)))
    } else {
        vtx.position
    };

    let mut z = z;
    let mut zshift = 0;
    while z > 0xFFFF {
        z >>= 1;
        zshift += 1;
    }

    let mut attr = poly.attr & ATTR_KEEP_MASK;
    attr |= u32::from(poly.flags.contains(PolygonFlags::FACING_VIEW)) << ATTR_FACING_SHIFT;
    attr |= u32::from(poly.flags.contains(PolygonFlags::W_BUFFER)) << ATTR_WBUFFER_SHIFT;
    attr |= zshift << ATTR_ZSHIFT_SHIFT;

    PackedVertex {
        position: [
            x.clamp(0, 0xFFFF) as u16,
            y.clamp(0, 0xFFFF) as u16,
            z as u16,
            // W = 0 has no perspective meaning; keep the divide finite.
            w.clamp(1, 0xFFFF) as u16,
        ],
        color: [
            (vtx.color[0] >> 1) as u8,
            (vtx.color[1] >> 1) as u8,
            (vtx.color[2] >> 1) as u8,
            poly.alpha(),
        ],
        texcoord: vtx.texcoord,
        attr: [attr, poly.tex_param, poly.tex_palette],
    }
}
