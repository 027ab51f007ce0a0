// file: src/logging/logger.rs
// version: 1.0.0
// guid: 09c4874b-30a7-47c2-8a0e-c12233a64fe6

//! Logger initialization and configuration

use crate::error::InstallError;
use crate::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter directive for the requested verbosity; quiet wins over debug
pub fn filter_directive(debug: bool, quiet: bool) -> &'static str {
    if quiet {
        "error"
    } else if debug {
        "debug"
    } else {
        "info"
    }
}

/// Initialize the logging system
pub fn init_logger(debug: bool, quiet: bool) -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::new(filter_directive(debug, quiet)))
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .try_init()
        .map_err(|e| InstallError::config(format!("Failed to initialize logger: {}", e)))?;

    Ok(())
}
