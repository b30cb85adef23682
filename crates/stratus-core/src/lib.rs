//! Application plumbing shared by Stratus binaries: configuration file
//! handling and logging setup.

pub mod config;

pub use config::{CacheSettings, Config, ConfigValidationError, ValidationResult};

use anyhow::Result;

/// Initialize logging for a Stratus process.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::debug!("stratus core initialized");
    Ok(())
}
