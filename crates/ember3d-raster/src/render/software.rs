//! CPU executor for compositor command lists.
//!
//! Rasterizes with integer edge functions and a top-left fill rule, and runs
//! the same decoder, sampler and shading code as the rest of the crate. Used
//! for tests and on hosts without a usable GPU adapter.

use crate::color::Color;
use crate::error::{RenderError, RenderResult};
use crate::framebuffer::{Band, SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::scene::{ClearAttributes, DisplayControl};
use crate::shading::{Fragment, ShadingContext};
use crate::texture::{TextureFiltering, TextureMemory, TextureParams};

use super::assembler::PackedVertex;
use super::backend::{FrameUniforms, PreparedFrame, RasterBackend};
use super::compositor::{CommandList, PassCmd};
use super::state::DrawState;

/// Render targets, one entry per target pixel.
#[derive(Debug)]
struct Targets {
    width: u32,
    height: u32,
    color: Vec<[u8; 4]>,
    depth: Vec<f32>,
    stencil: Vec<u8>,
    attr: Vec<[u8; 4]>,
    /// Attribute copy read by the shadow program, refreshed at each barrier.
    snapshot: Vec<[u8; 4]>,
}

impl Targets {
    fn new(scale: u32) -> Self {
        let width = SCREEN_WIDTH << scale;
        let height = SCREEN_HEIGHT << scale;
        let n = (width * height) as usize;
        Self {
            width,
            height,
            color: vec![[0; 4]; n],
            depth: vec![1.0; n],
            stencil: vec![0; n],
            attr: vec![[0; 4]; n],
            snapshot: vec![[0; 4]; n],
        }
    }

    fn clear(&mut self, clear: &ClearAttributes) {
        let [r, g, b] = clear.rgb;
        self.color.fill(Color::from_rgb5(r, g, b, clear.alpha).to_unorm8());
        self.depth.fill(clear.depth_unorm());
        self.stencil.fill(0);
        self.attr.fill([0, clear.polygon_id, 0, 0]);
    }
}

/// Frame data copied in by `prepare_frame`.
#[derive(Debug, Default)]
struct FrameData {
    vertices: Vec<PackedVertex>,
    indices: Vec<u16>,
    disp_cnt: DisplayControl,
    filtering: TextureFiltering,
    toon: [Color; 32],
    memory: TextureMemory,
}

impl FrameData {
    fn shading(&self) -> ShadingContext<'_> {
        ShadingContext { disp_cnt: self.disp_cnt, toon: &self.toon, memory: &self.memory, filtering: self.filtering }
    }
}

/// Reference backend running entirely on the CPU.
#[derive(Debug)]
pub struct SoftwareBackend {
    scale: u32,
    targets: Targets,
    frame: FrameData,
}

impl Default for SoftwareBackend {
    fn default() -> Self {
        Self::new(0)
    }
}

impl SoftwareBackend {
    pub fn new(scale: u32) -> Self {
        Self { scale, targets: Targets::new(scale), frame: FrameData::default() }
    }

    /// Attribute target texel at target pixel `(x, y)`: edge ID, shadow ID,
    /// shadow-mask flag, unused.
    pub fn attribute(&self, x: u32, y: u32) -> [u8; 4] {
        self.targets.attr[self.index(x, y)]
    }

    /// Color target texel at target pixel `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.targets.color[self.index(x, y)]
    }

    #[cfg(test)]
    pub(crate) fn depth(&self, x: u32, y: u32) -> f32 {
        self.targets.depth[self.index(x, y)]
    }

    #[cfg(test)]
    pub(crate) fn stencil(&self, x: u32, y: u32) -> u8 {
        self.targets.stencil[self.index(x, y)]
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        (y * self.targets.width + x) as usize
    }
}

impl RasterBackend for SoftwareBackend {
    fn name(&self) -> &'static str {
        "software"
    }

    fn resize(&mut self, scale: u32) -> RenderResult<()> {
        self.scale = scale;
        self.targets = Targets::new(scale);
        Ok(())
    }

    fn prepare_frame(&mut self, frame: &PreparedFrame<'_>) -> RenderResult<()> {
        let f = &mut self.frame;
        f.vertices.clear();
        f.vertices.extend_from_slice(frame.vertices);
        f.indices.clear();
        f.indices.extend_from_slice(frame.indices);
        f.memory.clone_from(frame.memory);
        apply_uniforms(f, frame.uniforms);
        Ok(())
    }

    fn execute(&mut self, cmds: &CommandList) -> RenderResult<()> {
        if let Some(clear) = &cmds.clear {
            self.targets.clear(clear);
        }

        let rows = cmds.band.rows(self.scale);
        let rows = rows.start.min(self.targets.height)..rows.end.min(self.targets.height);

        let mut current = None;
        for cmd in &cmds.cmds {
            match cmd {
                PassCmd::SetState { state, stencil_ref } => current = Some((*state, *stencil_ref)),
                PassCmd::Draw(range) => {
                    let Some((state, stencil_ref)) = current else {
                        return Err(RenderError::Backend("draw issued before any state".into()));
                    };
                    let indices = self
                        .frame
                        .indices
                        .get(range.start as usize..range.end as usize)
                        .ok_or_else(|| RenderError::Backend(format!("index range {range:?} out of bounds")))?;
                    for tri in indices.chunks_exact(3) {
                        let v = [tri[0], tri[1], tri[2]].map(|i| self.frame.vertices.get(usize::from(i)).copied());
                        let [Some(a), Some(b), Some(c)] = v else {
                            return Err(RenderError::Backend("index past vertex buffer".into()));
                        };
                        draw_triangle(&self.frame, &mut self.targets, [a, b, c], &state, stencil_ref, rows.clone());
                    }
                }
                PassCmd::Barrier => {
                    let t = &mut self.targets;
                    t.snapshot.copy_from_slice(&t.attr);
                }
            }
        }
        Ok(())
    }

    fn read_band(&mut self, band: Band, out: &mut [u32]) -> RenderResult<()> {
        let w = self.targets.width as usize;
        let rows = band.rows(self.scale);
        let src = self
            .targets
            .color
            .get(rows.start as usize * w..rows.end as usize * w)
            .ok_or_else(|| RenderError::Readback(format!("band {band:?} outside target")))?;
        if out.len() != src.len() {
            return Err(RenderError::Readback(format!("expected {} pixels, got {}", src.len(), out.len())));
        }
        for (d, s) in out.iter_mut().zip(src) {
            *d = u32::from_le_bytes(*s);
        }
        Ok(())
    }
}

fn apply_uniforms(f: &mut FrameData, u: &FrameUniforms) {
    f.disp_cnt = DisplayControl::from_bits_truncate(u.disp_cnt);
    f.filtering = if u.filtering == TextureFiltering::Bilinear.as_u32() {
        TextureFiltering::Bilinear
    } else {
        TextureFiltering::Nearest
    };
    f.toon = u.toon_colors.map(|[r, g, b, a]| Color::new(r, g, b, a));
}

/// Signed doubled area of `(a, b, p)`; positive when `p` lies right of `a → b`
/// on a y-down screen.
#[inline]
fn edge(a: [i64; 2], b: [i64; 2], p: [i64; 2]) -> i64 {
    (b[0] - a[0]) * (p[1] - a[1]) - (b[1] - a[1]) * (p[0] - a[0])
}

/// Top and left edges own the pixels that lie exactly on them.
#[inline]
fn is_top_left(a: [i64; 2], b: [i64; 2]) -> bool {
    let (dx, dy) = (b[0] - a[0], b[1] - a[1]);
    (dy == 0 && dx > 0) || dy < 0
}

#[inline]
fn covers(e: i64, top_left: bool) -> bool {
    e > 0 || (e == 0 && top_left)
}

fn draw_triangle(
    frame: &FrameData,
    t: &mut Targets,
    mut v: [PackedVertex; 3],
    state: &DrawState,
    stencil_ref: u8,
    rows: core::ops::Range<u32>,
) {
    // Doubled coordinates put pixel centers on odd integers.
    let pos = |v: &PackedVertex| [i64::from(v.position[0]) * 2, i64::from(v.position[1]) * 2];
    let mut p = [pos(&v[0]), pos(&v[1]), pos(&v[2])];

    let mut area = edge(p[0], p[1], p[2]);
    if area == 0 {
        return;
    }
    if area < 0 {
        p.swap(1, 2);
        v.swap(1, 2);
        area = -area;
    }

    let tl = [is_top_left(p[1], p[2]), is_top_left(p[2], p[0]), is_top_left(p[0], p[1])];

    let min_x = (v.iter().map(|v| v.position[0]).min().unwrap_or(0) as u32).saturating_sub(1);
    let max_x = (v.iter().map(|v| v.position[0]).max().unwrap_or(0) as u32).min(t.width);
    let min_y = (v.iter().map(|v| v.position[1]).min().unwrap_or(0) as u32).saturating_sub(1).max(rows.start);
    let max_y = (v.iter().map(|v| v.position[1]).max().unwrap_or(0) as u32).min(rows.end);

    let ctx = frame.shading();
    let poly_attr = v[0].attr[0];
    let tex = TextureParams::decode(v[0].attr[1], v[0].attr[2]);
    let inv_w = v.map(|v| 1.0 / v.w());
    let depth = v.map(|v| v.depth());
    let color = v.map(|v| {
        Color::new(
            f32::from(v.color[0]) / 255.0,
            f32::from(v.color[1]) / 255.0,
            f32::from(v.color[2]) / 255.0,
            f32::from(v.color[3]) / 31.0,
        )
    });
    let uv = v.map(|v| [f32::from(v.texcoord[0]) / 16.0, f32::from(v.texcoord[1]) / 16.0]);
    let inv_area = 1.0 / area as f64;

    for py in min_y..max_y {
        for px in min_x..max_x {
            let s = [i64::from(px) * 2 + 1, i64::from(py) * 2 + 1];
            let e = [edge(p[1], p[2], s), edge(p[2], p[0], s), edge(p[0], p[1], s)];
            if !(covers(e[0], tl[0]) && covers(e[1], tl[1]) && covers(e[2], tl[2])) {
                continue;
            }

            let l = e.map(|e| (e as f64 * inv_area) as f32);
            let pw = [l[0] * inv_w[0], l[1] * inv_w[1], l[2] * inv_w[2]];
            let norm = 1.0 / (pw[0] + pw[1] + pw[2]);
            let persp = |a: [f32; 3]| (a[0] * pw[0] + a[1] * pw[1] + a[2] * pw[2]) * norm;

            let frag_depth = if state.w_buffer {
                persp(depth)
            } else {
                l[0] * depth[0] + l[1] * depth[1] + l[2] * depth[2]
            };

            let frag = Fragment {
                color: Color::new(
                    persp(color.map(|c| c.r)),
                    persp(color.map(|c| c.g)),
                    persp(color.map(|c| c.b)),
                    persp(color.map(|c| c.a)),
                ),
                texcoord: [persp(uv.map(|t| t[0])), persp(uv.map(|t| t[1]))],
            };

            let i = (py * t.width + px) as usize;
            let Some(out) = state.program.shade(&ctx, poly_attr, &tex, &frag, t.snapshot[i]) else {
                continue;
            };

            let depth_pass = state.depth_compare.passes(frag_depth, t.depth[i]);
            let stencil_pass = state.stencil.apply(&mut t.stencil[i], stencil_ref, depth_pass);
            if !(stencil_pass && depth_pass) {
                continue;
            }

            if state.depth_write {
                t.depth[i] = frag_depth;
            }
            if state.color_write {
                t.color[i] = if state.blend {
                    blend(out.color, Color::from_unorm8(t.color[i])).to_unorm8()
                } else {
                    out.color.to_unorm8()
                };
            }
            for ch in 0..3 {
                if state.attr_writes.writes_channel(ch) {
                    t.attr[i][ch] = out.attr[ch];
                }
            }
        }
    }
}

/// RGB source-over by source alpha; alpha keeps the larger value.
#[inline]
fn blend(src: Color, dst: Color) -> Color {
    let a = src.a.clamp(0.0, 1.0);
    Color::new(
        src.r * a + dst.r * (1.0 - a),
        src.g * a + dst.g * (1.0 - a),
        src.b * a + dst.b * (1.0 - a),
        src.a.max(dst.a),
    )
}
