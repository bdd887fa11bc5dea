use std::sync::Once;

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g. "info",
/// "ember3d_raster=trace,wgpu_core=warn"). When neither it nor `RUST_LOG` is
/// set, [`LoggingConfig::level`] applies to this crate and
/// [`LoggingConfig::gpu_level`] to the wgpu internals.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub level: log::LevelFilter,
    /// wgpu, wgpu-core, wgpu-hal and naga log a lot at info level.
    pub gpu_level: log::LevelFilter,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            level: log::LevelFilter::Info,
            gpu_level: log::LevelFilter::Warn,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

impl LoggingConfig {
    /// Maps a `-v` count onto the crate level: 0 info, 1 debug, 2+ trace.
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.level = match verbosity {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };
        self
    }

    /// Filter string used when no explicit filter is configured.
    pub fn default_filter(&self) -> String {
        let gpu = self.gpu_level.as_str().to_ascii_lowercase();
        format!(
            "{},wgpu={gpu},wgpu_core={gpu},wgpu_hal={gpu},naga={gpu}",
            self.level.as_str().to_ascii_lowercase()
        )
    }
}

static INIT: Once = Once::new();

/// Initializes the global logger once.
///
/// Subsequent calls are ignored. Call early in `main`.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        if let Some(filter) = &config.env_filter {
            builder.parse_filters(filter);
        } else if let Ok(filter) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filter);
        } else {
            builder.parse_filters(&config.default_filter());
        }

        builder.write_style(config.write_style);
        builder.init();

        log::debug!("logging initialized");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_quiets_gpu_stack() {
        let f = LoggingConfig::default().default_filter();
        assert!(f.starts_with("info,"));
        assert!(f.contains("wgpu_core=warn"));
        assert!(f.contains("naga=warn"));
    }

    #[test]
    fn verbosity_raises_crate_level_only() {
        let c = LoggingConfig::default().with_verbosity(2);
        assert_eq!(c.level, log::LevelFilter::Trace);
        assert_eq!(c.gpu_level, log::LevelFilter::Warn);
        assert!(c.default_filter().starts_with("trace,"));
    }
}
