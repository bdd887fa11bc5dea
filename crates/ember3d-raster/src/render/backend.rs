use bytemuck::{Pod, Zeroable};

use crate::error::RenderResult;
use crate::framebuffer::{Band, SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::scene::RenderRegisters;
use crate::texture::{TextureFiltering, TextureMemory};

use super::assembler::PackedVertex;
use super::compositor::CommandList;

/// Per-frame shader constants. Layout matches `Config` in `raster.wgsl`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct FrameUniforms {
    pub screen_size: [f32; 2],
    pub disp_cnt: u32,
    pub filtering: u32,
    pub toon_colors: [[f32; 4]; 32],
}

impl FrameUniforms {
    pub fn new(regs: &RenderRegisters, scale: u32, filtering: TextureFiltering) -> Self {
        let toon_colors = regs.toon_table.map(|c| {
            [
                f32::from(c & 0x1F) / 31.0,
                f32::from((c >> 5) & 0x1F) / 31.0,
                f32::from((c >> 10) & 0x1F) / 31.0,
                1.0,
            ]
        });
        Self {
            screen_size: [(SCREEN_WIDTH << scale) as f32, (SCREEN_HEIGHT << scale) as f32],
            disp_cnt: regs.disp_cnt.bits(),
            filtering: filtering.as_u32(),
            toon_colors,
        }
    }
}

/// Everything a backend uploads once per frame.
#[derive(Debug, Clone, Copy)]
pub struct PreparedFrame<'a> {
    pub vertices: &'a [PackedVertex],
    pub indices: &'a [u16],
    pub uniforms: &'a FrameUniforms,
    pub memory: &'a TextureMemory,
}

/// Executes compositor command lists against color, depth/stencil and
/// attribute targets.
///
/// Call order per frame: `prepare_frame`, then `execute` and `read_band` once
/// per band. Targets persist across bands of the same frame.
pub trait RasterBackend {
    fn name(&self) -> &'static str;

    /// Recreates render targets for upscale exponent `scale`.
    fn resize(&mut self, scale: u32) -> RenderResult<()>;

    fn prepare_frame(&mut self, frame: &PreparedFrame<'_>) -> RenderResult<()>;

    fn execute(&mut self, cmds: &CommandList) -> RenderResult<()>;

    /// Copies the band's color rows into `out` as RGBA8 words, R in the low byte.
    fn read_band(&mut self, band: Band, out: &mut [u32]) -> RenderResult<()>;
}
