use std::collections::HashMap;

use crate::error::{RenderError, RenderResult};
use crate::render::assembler::PackedVertex;
use crate::render::state::DrawState;
use crate::shading::Program;

use super::targets::{ATTR_FORMAT, COLOR_FORMAT, DEPTH_FORMAT};

/// One shader entry-point pair.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ShaderVariant {
    pub program: Program,
    pub w_buffer: bool,
    pub vs_entry: &'static str,
    pub fs_entry: &'static str,
}

impl ShaderVariant {
    pub fn label(&self) -> String {
        format!("{}_{}", self.program.name(), if self.w_buffer { "w" } else { "z" })
    }

    /// State used to validate the variant when the table is built.
    fn representative_state(&self) -> DrawState {
        let w = self.w_buffer;
        match self.program {
            Program::Opaque => DrawState::opaque(w),
            Program::Translucent => DrawState::translucent(w, false, false, false),
            Program::ShadowMask => DrawState::shadow_mask(w),
            Program::Shadow => DrawState::translucent(w, true, false, false),
        }
    }
}

/// {Z-buffer, W-buffer} × {opaque, translucent, shadow mask, shadow}.
pub static VARIANTS: [ShaderVariant; 8] = [
    ShaderVariant { program: Program::Opaque, w_buffer: false, vs_entry: "vs_zbuffer", fs_entry: "fs_opaque_z" },
    ShaderVariant { program: Program::Translucent, w_buffer: false, vs_entry: "vs_zbuffer", fs_entry: "fs_translucent_z" },
    ShaderVariant { program: Program::ShadowMask, w_buffer: false, vs_entry: "vs_zbuffer", fs_entry: "fs_shadow_mask_z" },
    ShaderVariant { program: Program::Shadow, w_buffer: false, vs_entry: "vs_zbuffer", fs_entry: "fs_shadow_z" },
    ShaderVariant { program: Program::Opaque, w_buffer: true, vs_entry: "vs_wbuffer", fs_entry: "fs_opaque_w" },
    ShaderVariant { program: Program::Translucent, w_buffer: true, vs_entry: "vs_wbuffer", fs_entry: "fs_translucent_w" },
    ShaderVariant { program: Program::ShadowMask, w_buffer: true, vs_entry: "vs_wbuffer", fs_entry: "fs_shadow_mask_w" },
    ShaderVariant { program: Program::Shadow, w_buffer: true, vs_entry: "vs_wbuffer", fs_entry: "fs_shadow_w" },
];

pub fn variant_for(program: Program, w_buffer: bool) -> &'static ShaderVariant {
    let i = match program {
        Program::Opaque => 0,
        Program::Translucent => 1,
        Program::ShadowMask => 2,
        Program::Shadow => 3,
    };
    &VARIANTS[i + if w_buffer { 4 } else { 0 }]
}

/// Shader module, layouts and the lazily filled pipeline cache.
pub struct Pipelines {
    shader: wgpu::ShaderModule,
    pub bind_group_layout: wgpu::BindGroupLayout,
    layout: wgpu::PipelineLayout,
    cache: HashMap<DrawState, wgpu::RenderPipeline>,
}

impl Pipelines {
    /// Compiles the shader module and validates every variant.
    pub fn new(device: &wgpu::Device) -> RenderResult<Self> {
        let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("ember3d raster shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/raster.wgsl").into()),
        });
        if let Some(e) = pollster::block_on(scope.pop()) {
            return Err(RenderError::ShaderBuild { variant: "module".into(), message: e.to_string() });
        }

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("ember3d raster bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                uint_texture_entry(1),
                uint_texture_entry(2),
                uint_texture_entry(3),
            ],
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("ember3d raster pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let mut pipelines = Self { shader, bind_group_layout, layout, cache: HashMap::new() };

        for variant in &VARIANTS {
            let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);
            pipelines.ensure(device, variant.representative_state());
            if let Some(e) = pollster::block_on(scope.pop()) {
                return Err(RenderError::ShaderBuild { variant: variant.label(), message: e.to_string() });
            }
        }
        log::debug!("built {} shader variants", VARIANTS.len());

        Ok(pipelines)
    }

    /// Creates the pipeline for `state` on first use.
    pub fn ensure(&mut self, device: &wgpu::Device, state: DrawState) {
        if self.cache.contains_key(&state) {
            return;
        }
        let pipeline = self.create(device, &state);
        log::trace!("created pipeline #{} for {:?}", self.cache.len(), state);
        self.cache.insert(state, pipeline);
    }

    pub fn get(&self, state: &DrawState) -> Option<&wgpu::RenderPipeline> {
        self.cache.get(state)
    }

    fn create(&self, device: &wgpu::Device, state: &DrawState) -> wgpu::RenderPipeline {
        let variant = variant_for(state.program, state.w_buffer);
        let label = format!("ember3d {} pipeline", variant.label());

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&label),
            layout: Some(&self.layout),

            vertex: wgpu::VertexState {
                module: &self.shader,
                entry_point: Some(variant.vs_entry),
                compilation_options: Default::default(),
                buffers: &[PackedVertex::layout()],
            },

            fragment: Some(wgpu::FragmentState {
                module: &self.shader,
                entry_point: Some(variant.fs_entry),
                compilation_options: Default::default(),
                targets: &[
                    Some(wgpu::ColorTargetState {
                        format: COLOR_FORMAT,
                        blend: state.blend_state(),
                        write_mask: if state.color_write { wgpu::ColorWrites::ALL } else { wgpu::ColorWrites::empty() },
                    }),
                    // Integer target: never blended.
                    Some(wgpu::ColorTargetState {
                        format: ATTR_FORMAT,
                        blend: None,
                        write_mask: state.attr_writes.to_color_writes(),
                    }),
                ],
            }),

            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: state.depth_write,
                depth_compare: state.depth_compare.to_wgpu(),
                stencil: state.stencil.to_wgpu(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        })
    }
}

fn uint_texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Uint,
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_lookup_matches_table() {
        for v in &VARIANTS {
            assert_eq!(variant_for(v.program, v.w_buffer), v);
        }
    }

    #[test]
    fn entry_points_follow_naming() {
        let v = variant_for(Program::ShadowMask, true);
        assert_eq!(v.fs_entry, "fs_shadow_mask_w");
        assert_eq!(v.label(), "shadow_mask_w");
    }
}
