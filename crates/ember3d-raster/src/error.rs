use thiserror::Error;

/// Errors surfaced by the rasterization core.
///
/// Steady-state frame rendering has no recoverable errors: degenerate polygons
/// are skipped and empty batches are no-ops, neither reaches this type.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Adapter or device acquisition failed. Nothing can be rendered.
    #[error("backend initialisation failed: {0}")]
    BackendInit(String),

    /// A shader variant failed validation while building the variant table.
    #[error("shader build failed for {variant}: {message}")]
    ShaderBuild { variant: String, message: String },

    /// The caller submitted more geometry than the hardware can hold.
    #[error("{what} capacity exceeded (limit {limit})")]
    CapacityExceeded { what: &'static str, limit: usize },

    /// A polygon references data the frame does not contain.
    #[error("invalid frame input: {0}")]
    InvalidInput(String),

    /// Rejected renderer configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Mapping the read-back buffer failed.
    #[error("framebuffer readback failed: {0}")]
    Readback(String),

    /// A draw or submission failed mid-frame. The frame is abandoned.
    #[error("backend failure: {0}")]
    Backend(String),
}

pub type RenderResult<T> = Result<T, RenderError>;
