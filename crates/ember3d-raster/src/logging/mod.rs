//! Logging setup.
//!
//! The crate itself only emits through the `log` facade; binaries pick the
//! backend by calling [`init_logging`].

mod init;

pub use init::{init_logging, LoggingConfig};
