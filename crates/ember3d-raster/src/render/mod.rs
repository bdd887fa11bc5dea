//! Backend-facing half of the pipeline.
//!
//! The assembler packs the sorted polygon list into vertex/index arrays, the
//! compositor turns it into per-band command lists, and a [`RasterBackend`]
//! executes them.
//!
//! Convention:
//! - Target pixels are `(256 << scale) × (192 << scale)`, top-left origin, +Y down.
//! - Depth is stored in `[0, 1]`; lower is nearer.

mod assembler;
mod backend;
mod compositor;
mod gpu;
mod software;
mod state;

pub use assembler::{Assembler, PackedVertex, MAX_INDICES, MAX_VERTICES};
pub use backend::{FrameUniforms, PreparedFrame, RasterBackend};
pub use compositor::{plan, CommandList, PassCmd};
pub use gpu::{variant_for, GpuBackend, ShaderVariant, VARIANTS};
pub use software::SoftwareBackend;
pub use state::{translucent_stencil, AttrWrites, DepthCompare, DrawState, StencilMode};
