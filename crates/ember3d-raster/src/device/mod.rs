//! GPU device management.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue
//! - submitting encoded work

mod gpu;
mod init;

pub use gpu::Gpu;
pub use init::GpuInit;
