use crate::framebuffer::{SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::texture::{MEMORY_WIDTH, PALETTE_ROWS, TEXEL_ROWS};

pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
pub const ATTR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Uint;
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;

/// Row pitch of buffer copies, rounded up to the copy alignment.
pub fn padded_row_bytes(width: u32) -> u32 {
    (width * 4).next_multiple_of(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
}

/// Size-dependent render targets plus the readback buffer.
pub struct Targets {
    pub width: u32,
    pub height: u32,
    pub color: wgpu::Texture,
    pub color_view: wgpu::TextureView,
    pub attr: wgpu::Texture,
    pub attr_view: wgpu::TextureView,
    /// Copy of `attr` sampled by the shadow program.
    pub snapshot: wgpu::Texture,
    pub snapshot_view: wgpu::TextureView,
    pub depth_view: wgpu::TextureView,
    pub readback: wgpu::Buffer,
}

impl Targets {
    pub fn new(device: &wgpu::Device, scale: u32) -> Self {
        let width = SCREEN_WIDTH << scale;
        let height = SCREEN_HEIGHT << scale;
        let attachment = wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC;

        let color = texture(device, "ember3d color target", width, height, COLOR_FORMAT, attachment);
        let attr = texture(device, "ember3d attribute target", width, height, ATTR_FORMAT, attachment);
        let snapshot = texture(
            device,
            "ember3d attribute snapshot",
            width,
            height,
            ATTR_FORMAT,
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        );
        let depth = texture(
            device,
            "ember3d depth/stencil target",
            width,
            height,
            DEPTH_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT,
        );

        let readback = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("ember3d readback"),
            size: u64::from(padded_row_bytes(width)) * u64::from(height),
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            width,
            height,
            color_view: color.create_view(&wgpu::TextureViewDescriptor::default()),
            color,
            attr_view: attr.create_view(&wgpu::TextureViewDescriptor::default()),
            attr,
            snapshot_view: snapshot.create_view(&wgpu::TextureViewDescriptor::default()),
            snapshot,
            depth_view: depth.create_view(&wgpu::TextureViewDescriptor::default()),
            readback,
        }
    }

    pub fn extent(&self) -> wgpu::Extent3d {
        wgpu::Extent3d { width: self.width, height: self.height, depth_or_array_layers: 1 }
    }
}

/// Texel and palette memory mirrored as integer textures.
pub struct MemoryTextures {
    pub texels: wgpu::Texture,
    pub texels_view: wgpu::TextureView,
    pub palette: wgpu::Texture,
    pub palette_view: wgpu::TextureView,
}

impl MemoryTextures {
    pub fn new(device: &wgpu::Device) -> Self {
        let texels = texture(
            device,
            "ember3d texture memory",
            MEMORY_WIDTH,
            TEXEL_ROWS,
            wgpu::TextureFormat::R8Uint,
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        );
        let palette = texture(
            device,
            "ember3d palette memory",
            MEMORY_WIDTH,
            PALETTE_ROWS,
            wgpu::TextureFormat::R16Uint,
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        );
        Self {
            texels_view: texels.create_view(&wgpu::TextureViewDescriptor::default()),
            texels,
            palette_view: palette.create_view(&wgpu::TextureViewDescriptor::default()),
            palette,
        }
    }
}

fn texture(
    device: &wgpu::Device,
    label: &str,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
    usage: wgpu::TextureUsages,
) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage,
        view_formats: &[],
    })
}
