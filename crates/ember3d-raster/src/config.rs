use crate::error::{RenderError, RenderResult};
use crate::texture::TextureFiltering;

/// Largest supported upscale exponent (16× native resolution).
pub const MAX_SCALE: u32 = 4;

/// Renderer configuration.
///
/// `scale` is an exponent: targets are `256 << scale` by `192 << scale`.
/// `chunked` renders the first 48-line band in `render_frame` and the rest on
/// first scanline access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RendererConfig {
    pub scale: u32,
    pub chunked: bool,
    pub filtering: TextureFiltering,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self { scale: 0, chunked: false, filtering: TextureFiltering::Nearest }
    }
}

impl RendererConfig {
    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_chunked(mut self, chunked: bool) -> Self {
        self.chunked = chunked;
        self
    }

    pub fn with_filtering(mut self, filtering: TextureFiltering) -> Self {
        self.filtering = filtering;
        self
    }

    pub fn validate(&self) -> RenderResult<()> {
        validate_scale(self.scale)
    }
}

pub(crate) fn validate_scale(scale: u32) -> RenderResult<()> {
    if scale > MAX_SCALE {
        return Err(RenderError::InvalidConfig(format!("scale {scale} out of range 0..={MAX_SCALE}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_native_unchunked_nearest() {
        let c = RendererConfig::default();
        assert_eq!(c.scale, 0);
        assert!(!c.chunked);
        assert_eq!(c.filtering, TextureFiltering::Nearest);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn scale_above_four_is_rejected() {
        assert!(RendererConfig::default().with_scale(MAX_SCALE).validate().is_ok());
        let err = RendererConfig::default().with_scale(5).validate().unwrap_err();
        assert!(matches!(err, RenderError::InvalidConfig(_)));
    }
}
