use crate::error::ConfigError;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{
    Config, LedgerSettings, LogFormat, LoggingSettings, MAX_DEADLINE_HOURS, ServiceSettings,
};

/// Prefix for environment overrides, e.g. `SMARTGRANT__LEDGER__RECONCILIATION_DEADLINE_HOURS=48`.
const ENV_PREFIX: &str = "SMARTGRANT";

/// Loads the application configuration from the `config.toml` file.
///
/// This function is the primary entry point for this crate. A missing file is not an
/// error: every setting has a default.
pub fn load_config() -> Result<Config, ConfigError> {
    build(config::File::with_name("config.toml").required(false))
}

/// Loads the configuration from an explicit path, which must exist.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    build(config::File::from(path).required(true))
}

fn build<S>(file: S) -> Result<Config, ConfigError>
where
    S: config::Source + Send + Sync + 'static,
{
    let builder = config::Config::builder()
        .add_source(file)
        .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()?;

    // Attempt to deserialize the entire configuration into our `Config` struct
    let config = builder.try_deserialize::<Config>()?;
    config.validate()?;

    tracing::debug!(?config, "Configuration loaded.");
    Ok(config)
}
