use crate::texture::VramSnapshot;

use super::polygon::Polygon;
use super::regs::RenderRegisters;
use super::vertex::Vertex;

/// Everything the rasterizer consumes for one frame.
///
/// Borrowed from the caller for the duration of `render_frame`; nothing here is
/// retained afterwards except the decoded texture memory.
#[derive(Debug, Clone, Copy)]
pub struct FrameInput<'a> {
    pub polygons: &'a [Polygon],
    pub vertices: &'a [Vertex],
    pub regs: &'a RenderRegisters,
    pub vram: VramSnapshot<'a>,
}

impl<'a> FrameInput<'a> {
    pub fn new(polygons: &'a [Polygon], vertices: &'a [Vertex], regs: &'a RenderRegisters) -> Self {
        Self { polygons, vertices, regs, vram: VramSnapshot::default() }
    }

    pub fn with_vram(mut self, vram: VramSnapshot<'a>) -> Self {
        self.vram = vram;
        self
    }
}
