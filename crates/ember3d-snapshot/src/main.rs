use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use ember3d_raster::framebuffer::SCREEN_HEIGHT;
use ember3d_raster::logging::{init_logging, LoggingConfig};
use ember3d_raster::texture::TextureFiltering;
use ember3d_raster::{FrameInput, Gpu, GpuBackend, GpuInit, RasterBackend, Renderer, RendererConfig, SoftwareBackend};

mod demo;

use demo::DemoScene;

#[derive(Parser)]
#[command(name = "ember3d-snapshot")]
#[command(about = "Render the built-in demo frame and write it as a PNG", long_about = None)]
#[command(version)]
struct Cli {
    /// Use the CPU backend instead of wgpu
    #[arg(long)]
    software: bool,

    /// Upscale exponent, 0 (256×192) to 4 (4096×3072)
    #[arg(long, default_value = "0")]
    scale: u32,

    /// Render in four 48-line bands
    #[arg(long)]
    chunked: bool,

    /// Bilinear texture filtering
    #[arg(long)]
    bilinear: bool,

    /// Output PNG path
    #[arg(short, long, default_value = "snapshot.png")]
    out: PathBuf,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(LoggingConfig::default().with_verbosity(cli.verbose));

    let filtering = if cli.bilinear { TextureFiltering::Bilinear } else { TextureFiltering::Nearest };
    let config = RendererConfig::default()
        .with_scale(cli.scale)
        .with_chunked(cli.chunked)
        .with_filtering(filtering);
    config.validate().context("invalid renderer options")?;

    let scene = DemoScene::build();
    let (width, height, pixels) = if cli.software {
        render(SoftwareBackend::new(config.scale), config, &scene)?
    } else {
        match gpu_backend(config.scale) {
            Ok(backend) => render(backend, config, &scene)?,
            Err(e) => {
                log::warn!("falling back to the software backend: {e:#}");
                render(SoftwareBackend::new(config.scale), config, &scene)?
            }
        }
    };

    let image = image::RgbaImage::from_raw(width, height, pixels).context("pixel buffer does not match image size")?;
    image.save(&cli.out).with_context(|| format!("failed to write {}", cli.out.display()))?;
    log::info!("wrote {}x{} snapshot to {}", width, height, cli.out.display());
    Ok(())
}

fn gpu_backend(scale: u32) -> Result<GpuBackend> {
    let gpu = Gpu::new_blocking(GpuInit { allow_fallback_adapter: true, ..Default::default() })
        .context("failed to initialise GPU")?;
    GpuBackend::new(gpu, scale).context("failed to build GPU pipelines")
}

/// Renders the demo frame and returns it as 8-bit RGBA rows.
fn render<B: RasterBackend>(backend: B, config: RendererConfig, scene: &DemoScene) -> Result<(u32, u32, Vec<u8>)> {
    let mut renderer = Renderer::new(backend, config).context("failed to create renderer")?;
    let input = FrameInput::new(&scene.polygons, &scene.vertices, &scene.regs).with_vram(scene.vram());
    renderer.render_frame(&input).context("frame rendering failed")?;

    let mut pixels = Vec::new();
    for line in 0..SCREEN_HEIGHT {
        let row = renderer.scanline(line).with_context(|| format!("failed to read scanline {line}"))?;
        pixels.extend(row.iter().flat_map(|&p| expand_pixel(p)));
    }

    let width = 256 << config.scale;
    let height = SCREEN_HEIGHT << config.scale;
    Ok((width, height, pixels))
}

/// Widens a reduced 6-bit color / 5-bit alpha pixel back to 8 bits per channel.
fn expand_pixel(p: u32) -> [u8; 4] {
    let six = |shift: u32| {
        let c = ((p >> shift) & 0x3F) as u8;
        (c << 2) | (c >> 4)
    };
    let a = ((p >> 24) & 0x1F) as u8;
    [six(0), six(8), six(16), (a << 3) | (a >> 2)]
}

#[cfg(test)]
mod tests {
    use ember3d_raster::framebuffer::reduce_pixel;

    use super::*;

    #[test]
    fn expand_restores_full_range() {
        assert_eq!(expand_pixel(0x1F3F_3F3F), [255; 4]);
        assert_eq!(expand_pixel(0), [0; 4]);
    }

    #[test]
    fn software_render_produces_full_frame() {
        let scene = DemoScene::build();
        let (w, h, pixels) = render(SoftwareBackend::default(), RendererConfig::default(), &scene).unwrap();
        assert_eq!((w, h), (256, 192));
        assert_eq!(pixels.len(), 256 * 192 * 4);
        // Top-left corner shows the clear color, 5-bit (6, 12, 24) at full alpha.
        let clear = expand_pixel(reduce_pixel(u32::from_le_bytes([49, 99, 197, 255])));
        assert_eq!(pixels[..4], clear);
        // Bottom row is floor, not sky.
        let last = pixels.len() - 4;
        assert_ne!(pixels[last..], clear);
    }
}
