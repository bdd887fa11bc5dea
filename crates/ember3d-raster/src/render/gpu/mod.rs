//! wgpu executor for compositor command lists.
//!
//! One pipeline per distinct [`DrawState`], built lazily on top of eight
//! validated shader variants. Barriers end the render pass and copy the
//! attribute target into the snapshot the shadow program samples.

mod pipelines;
mod targets;

pub use pipelines::{variant_for, ShaderVariant, VARIANTS};

use crate::device::Gpu;
use crate::error::{RenderError, RenderResult};
use crate::framebuffer::Band;
use crate::scene::ClearAttributes;
use crate::texture::{MEMORY_WIDTH, PALETTE_ROWS, TEXEL_ROWS};

use super::assembler::{PackedVertex, MAX_INDICES, MAX_VERTICES};
use super::backend::{FrameUniforms, PreparedFrame, RasterBackend};
use super::compositor::{CommandList, PassCmd};
use super::state::DrawState;

use pipelines::Pipelines;
use targets::{padded_row_bytes, MemoryTextures, Targets};

/// Hardware-accelerated backend.
pub struct GpuBackend {
    gpu: Gpu,
    scale: u32,
    pipelines: Pipelines,
    targets: Targets,
    memory: MemoryTextures,
    uniforms: wgpu::Buffer,
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl GpuBackend {
    /// Builds all shader variants and targets for upscale exponent `scale`.
    ///
    /// Fails with [`RenderError::ShaderBuild`] naming the first variant that
    /// does not validate.
    pub fn new(gpu: Gpu, scale: u32) -> RenderResult<Self> {
        let device = gpu.device();
        let pipelines = Pipelines::new(device)?;
        let targets = Targets::new(device, scale);
        let memory = MemoryTextures::new(device);

        let uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("ember3d frame uniforms"),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let vertices = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("ember3d vertex buffer"),
            size: (MAX_VERTICES * std::mem::size_of::<PackedVertex>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let indices = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("ember3d index buffer"),
            size: (MAX_INDICES * std::mem::size_of::<u16>()).next_multiple_of(4) as u64,
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = create_bind_group(device, &pipelines, &uniforms, &memory, &targets);
        log::debug!("gpu backend ready at {}x{}", targets.width, targets.height);

        Ok(Self { gpu, scale, pipelines, targets, memory, uniforms, vertices, indices, bind_group })
    }

    pub fn gpu(&self) -> &Gpu {
        &self.gpu
    }

    fn upload_memory(&self, frame: &PreparedFrame<'_>) {
        let queue = self.gpu.queue();
        let extent = |rows| wgpu::Extent3d { width: MEMORY_WIDTH, height: rows, depth_or_array_layers: 1 };

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.memory.texels,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            frame.memory.texels(),
            wgpu::TexelCopyBufferLayout { offset: 0, bytes_per_row: Some(MEMORY_WIDTH), rows_per_image: Some(TEXEL_ROWS) },
            extent(TEXEL_ROWS),
        );
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.memory.palette,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(frame.memory.palette()),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(MEMORY_WIDTH * 2),
                rows_per_image: Some(PALETTE_ROWS),
            },
            extent(PALETTE_ROWS),
        );
    }

    fn bind_state(&self, pass: &mut wgpu::RenderPass<'_>, state: &DrawState, stencil_ref: u8) -> RenderResult<()> {
        let pipeline = self
            .pipelines
            .get(state)
            .ok_or_else(|| RenderError::Backend(format!("no pipeline for {state:?}")))?;
        pass.set_pipeline(pipeline);
        pass.set_stencil_reference(u32::from(stencil_ref));
        Ok(())
    }

    /// Creates missing pipelines, then encodes and submits the frame.
    fn record(&mut self, cmds: &CommandList) -> RenderResult<()> {
        // Pipelines are created up front; the pass below only borrows them.
        for cmd in &cmds.cmds {
            if let PassCmd::SetState { state, .. } = cmd {
                self.pipelines.ensure(self.gpu.device(), *state);
            }
        }

        let mut encoder = self
            .gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("ember3d raster encoder") });

        let mut clear = cmds.clear.as_ref();
        let mut current = None;
        let mut segments = cmds.cmds.split(|c| matches!(c, PassCmd::Barrier)).peekable();
        while let Some(segment) = segments.next() {
            current = self.encode_pass(&mut encoder, cmds.band, clear.take(), segment, current)?;
            if segments.peek().is_some() {
                encoder.copy_texture_to_texture(
                    self.targets.attr.as_image_copy(),
                    self.targets.snapshot.as_image_copy(),
                    self.targets.extent(),
                );
            }
        }

        self.gpu.submit(encoder);
        Ok(())
    }

    /// Encodes one render pass over `cmds`. Returns the state active at its end.
    fn encode_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        band: Band,
        clear: Option<&ClearAttributes>,
        cmds: &[PassCmd],
        mut current: Option<(DrawState, u8)>,
    ) -> RenderResult<Option<(DrawState, u8)>> {
        let t = &self.targets;
        let (color_load, attr_load, depth_load, stencil_load) = match clear {
            Some(c) => (
                wgpu::LoadOp::Clear(wgpu::Color {
                    r: f64::from(c.rgb[0]) / 31.0,
                    g: f64::from(c.rgb[1]) / 31.0,
                    b: f64::from(c.rgb[2]) / 31.0,
                    a: f64::from(c.alpha) / 31.0,
                }),
                wgpu::LoadOp::Clear(wgpu::Color { r: 0.0, g: f64::from(c.polygon_id), b: 0.0, a: 0.0 }),
                wgpu::LoadOp::Clear(c.depth_unorm()),
                wgpu::LoadOp::Clear(0),
            ),
            None => (wgpu::LoadOp::Load, wgpu::LoadOp::Load, wgpu::LoadOp::Load, wgpu::LoadOp::Load),
        };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("ember3d raster pass"),
            color_attachments: &[
                Some(wgpu::RenderPassColorAttachment {
                    view: &t.color_view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations { load: color_load, store: wgpu::StoreOp::Store },
                }),
                Some(wgpu::RenderPassColorAttachment {
                    view: &t.attr_view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations { load: attr_load, store: wgpu::StoreOp::Store },
                }),
            ],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &t.depth_view,
                depth_ops: Some(wgpu::Operations { load: depth_load, store: wgpu::StoreOp::Store }),
                stencil_ops: Some(wgpu::Operations { load: stencil_load, store: wgpu::StoreOp::Store }),
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        let rows = band.rows(self.scale);
        let rows = rows.start.min(t.height)..rows.end.min(t.height);
        if rows.is_empty() {
            return Ok(current);
        }
        pass.set_scissor_rect(0, rows.start, t.width, rows.end - rows.start);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertices.slice(..));
        pass.set_index_buffer(self.indices.slice(..), wgpu::IndexFormat::Uint16);

        if let Some((state, stencil_ref)) = &current {
            self.bind_state(&mut pass, state, *stencil_ref)?;
        }

        for cmd in cmds {
            match cmd {
                PassCmd::SetState { state, stencil_ref } => {
                    self.bind_state(&mut pass, state, *stencil_ref)?;
                    current = Some((*state, *stencil_ref));
                }
                PassCmd::Draw(range) => {
                    if current.is_none() {
                        return Err(RenderError::Backend("draw issued before any state".into()));
                    }
                    pass.draw_indexed(range.clone(), 0, 0..1);
                }
                // Split out by `execute`.
                PassCmd::Barrier => {}
            }
        }
        Ok(current)
    }
}

impl RasterBackend for GpuBackend {
    fn name(&self) -> &'static str {
        "wgpu"
    }

    fn resize(&mut self, scale: u32) -> RenderResult<()> {
        let device = self.gpu.device();
        self.scale = scale;
        self.targets = Targets::new(device, scale);
        self.bind_group = create_bind_group(device, &self.pipelines, &self.uniforms, &self.memory, &self.targets);
        log::debug!("gpu targets resized to {}x{}", self.targets.width, self.targets.height);
        Ok(())
    }

    fn prepare_frame(&mut self, frame: &PreparedFrame<'_>) -> RenderResult<()> {
        if frame.vertices.len() > MAX_VERTICES {
            return Err(RenderError::CapacityExceeded { what: "vertex", limit: MAX_VERTICES });
        }
        if frame.indices.len() > MAX_INDICES {
            return Err(RenderError::CapacityExceeded { what: "index", limit: MAX_INDICES });
        }

        let queue = self.gpu.queue();
        queue.write_buffer(&self.uniforms, 0, bytemuck::bytes_of(frame.uniforms));
        if !frame.vertices.is_empty() {
            queue.write_buffer(&self.vertices, 0, bytemuck::cast_slice(frame.vertices));
        }
        if !frame.indices.is_empty() {
            queue.write_buffer(&self.indices, 0, &index_bytes(frame.indices));
        }
        self.upload_memory(frame);
        Ok(())
    }

    fn execute(&mut self, cmds: &CommandList) -> RenderResult<()> {
        self.gpu.push_error_scopes();
        let recorded = self.record(cmds);
        let captured = self.gpu.pop_error_scopes();
        recorded?;
        scope_result("frame", captured)
    }

    fn read_band(&mut self, band: Band, out: &mut [u32]) -> RenderResult<()> {
        let t = &self.targets;
        let rows = band.rows(self.scale);
        if rows.end > t.height {
            return Err(RenderError::Readback(format!("band {band:?} outside target")));
        }
        let height = rows.end - rows.start;
        let expected = (t.width * height) as usize;
        if out.len() != expected {
            return Err(RenderError::Readback(format!("expected {expected} pixels, got {}", out.len())));
        }
        if height == 0 {
            return Ok(());
        }

        let pitch = padded_row_bytes(t.width);
        self.gpu.push_error_scopes();
        let mut encoder = self
            .gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("ember3d readback encoder") });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &t.color,
                mip_level: 0,
                origin: wgpu::Origin3d { x: 0, y: rows.start, z: 0 },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &t.readback,
                layout: wgpu::TexelCopyBufferLayout { offset: 0, bytes_per_row: Some(pitch), rows_per_image: Some(height) },
            },
            wgpu::Extent3d { width: t.width, height, depth_or_array_layers: 1 },
        );
        self.gpu.submit(encoder);
        scope_result("readback copy", self.gpu.pop_error_scopes())?;

        let size = u64::from(pitch) * u64::from(height);
        let slice = t.readback.slice(..size);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |res| {
            let _ = tx.send(res);
        });
        self.gpu
            .device()
            .poll(wgpu::PollType::Wait { submission_index: None, timeout: None })
            .map_err(|e| RenderError::Readback(format!("device poll failed: {e}")))?;
        rx.recv()
            .map_err(|e| RenderError::Readback(format!("map callback dropped: {e}")))?
            .map_err(|e| RenderError::Readback(format!("map failed: {e}")))?;

        {
            let data = slice.get_mapped_range();
            let row_pixels = t.width as usize;
            for (dst, src) in out.chunks_exact_mut(row_pixels).zip(data.chunks_exact(pitch as usize)) {
                for (d, s) in dst.iter_mut().zip(src.chunks_exact(4)) {
                    *d = u32::from_le_bytes([s[0], s[1], s[2], s[3]]);
                }
            }
        }
        t.readback.unmap();
        Ok(())
    }
}

fn create_bind_group(
    device: &wgpu::Device,
    pipelines: &Pipelines,
    uniforms: &wgpu::Buffer,
    memory: &MemoryTextures,
    targets: &Targets,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("ember3d raster bind group"),
        layout: &pipelines.bind_group_layout,
        entries: &[
            wgpu::BindGroupEntry { binding: 0, resource: uniforms.as_entire_binding() },
            wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::TextureView(&memory.texels_view) },
            wgpu::BindGroupEntry { binding: 2, resource: wgpu::BindingResource::TextureView(&memory.palette_view) },
            wgpu::BindGroupEntry { binding: 3, resource: wgpu::BindingResource::TextureView(&targets.snapshot_view) },
        ],
    })
}

/// Turns an error captured by a device error scope into a backend failure.
fn scope_result(stage: &str, captured: Option<wgpu::Error>) -> RenderResult<()> {
    match captured {
        Some(e) => Err(RenderError::Backend(format!("{stage}: {e}"))),
        None => Ok(()),
    }
}

/// Index data padded to a 4-byte multiple, as buffer writes require.
fn index_bytes(indices: &[u16]) -> Vec<u8> {
    let mut bytes: Vec<u8> = bytemuck::cast_slice(indices).to_vec();
    bytes.resize(bytes.len().next_multiple_of(4), 0);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_bytes_are_word_aligned() {
        assert_eq!(index_bytes(&[0, 1, 2]).len(), 8);
        assert_eq!(index_bytes(&[0, 1, 2, 0, 2, 3]).len(), 12);
    }

    #[test]
    fn readback_rows_are_copy_aligned() {
        assert_eq!(padded_row_bytes(256), 1024);
        assert_eq!(padded_row_bytes(100), 512);
    }

    // ── error scopes ──

    #[test]
    fn empty_scope_is_success() {
        assert!(scope_result("frame", None).is_ok());
    }

    #[test]
    fn captured_validation_error_fails_the_stage() {
        let captured = wgpu::Error::Validation {
            source: Box::new(std::fmt::Error),
            description: "pipeline layout mismatch".into(),
        };
        match scope_result("frame", Some(captured)) {
            Err(RenderError::Backend(msg)) => assert!(msg.starts_with("frame: "), "{msg}"),
            other => panic!("expected backend error, got {other:?}"),
        }
    }
}
