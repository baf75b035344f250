//! Inspector configuration.
//!
//! Editor settings are loaded via the `config` crate from environment
//! variables prefixed with `FLOWFORM`, for example
//! `FLOWFORM__TYPE_EQUALITY=strong`.

use crate::error::InspectError;
use flowform_schema::EditorSettings;
use rootcause::prelude::Report;

/// Environment prefix for all settings.
pub const ENV_PREFIX: &str = "FLOWFORM";

/// Loads editor settings from the environment.
///
/// # Errors
///
/// Returns an error if a variable is present but cannot be parsed.
pub fn settings_from_env() -> Result<EditorSettings, Report<InspectError>> {
    settings_from_source(config::Environment::with_prefix(ENV_PREFIX))
}

fn settings_from_source(
    environment: config::Environment,
) -> Result<EditorSettings, Report<InspectError>> {
    let settings = config::Config::builder()
        .add_source(
            environment
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .and_then(|config| config.try_deserialize())
        .map_err(|e| InspectError::Config {
            details: e.to_string(),
        })?;
    Ok(settings)
}
