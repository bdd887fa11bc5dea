//! ember3d rasterization core.
//!
//! Takes a transformed and lit polygon list from the geometry engine and
//! produces the finished 256×192 frame (optionally upscaled) together with the
//! attribute buffer used for edge marking and shadows. Rendering runs on wgpu
//! through [`GpuBackend`] or on the CPU through [`SoftwareBackend`].

pub mod color;
pub mod config;
pub mod device;
pub mod error;
pub mod framebuffer;
pub mod logging;
pub mod render;
pub mod renderer;
pub mod scene;
pub mod shading;
pub mod texture;

pub use config::RendererConfig;
pub use device::{Gpu, GpuInit};
pub use error::{RenderError, RenderResult};
pub use render::{GpuBackend, RasterBackend, SoftwareBackend};
pub use renderer::Renderer;
pub use scene::FrameInput;
