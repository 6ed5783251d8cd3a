//! Row format configuration for converter binding and value display.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Minimum number of raw bytes shown by the display fallback.
const MIN_DISPLAY_MAX_BYTES: usize = 8;

/// Maximum number of raw bytes shown by the display fallback.
const MAX_DISPLAY_MAX_BYTES: usize = 4096;

/// Which wire message a storage description binds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProtobufFormatType {
    /// One message per table; the owner's own table message is bound.
    SingleTable,
    /// One message per group; the flagged group message is bound.
    Group,
}

/// Row format configuration.
///
/// # Validation Rules
///
/// - `display_max_bytes` must be 8-4096
///
/// # Example
///
/// ```no_run
/// # use tessera_types::config::RowFormatConfig;
/// let config = RowFormatConfig::builder()
///     .strict_column_binding(true)
///     .display_max_bytes(128)
///     .build()
///     .expect("valid row format config");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RowFormatConfig {
    /// Fail converter construction when a column has no wire field.
    ///
    /// When disabled, unmapped columns always decode as NULL.
    #[serde(default)]
    pub strict_column_binding: bool,
    /// Raw bytes shown when a stored value cannot be rendered.
    #[serde(default = "default_display_max_bytes")]
    pub display_max_bytes: usize,
}

#[bon::bon]
impl RowFormatConfig {
    /// Creates a new row format configuration with validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if `display_max_bytes` is outside 8-4096.
    #[builder]
    pub fn new(
        #[builder(default)] strict_column_binding: bool,
        #[builder(default = default_display_max_bytes())] display_max_bytes: usize,
    ) -> Result<Self, ConfigError> {
        let config = Self { strict_column_binding, display_max_bytes };
        config.validate()?;
        Ok(config)
    }
}

impl RowFormatConfig {
    /// Validates the configuration values.
    ///
    /// Call after deserialization to ensure values are within valid ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if any value is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_DISPLAY_MAX_BYTES..=MAX_DISPLAY_MAX_BYTES).contains(&self.display_max_bytes) {
            return Err(ConfigError::Validation {
                message: format!(
                    "display_max_bytes must be {}-{}, got {}",
                    MIN_DISPLAY_MAX_BYTES, MAX_DISPLAY_MAX_BYTES, self.display_max_bytes
                ),
            });
        }
        Ok(())
    }
}

impl Default for RowFormatConfig {
    fn default() -> Self {
        Self { strict_column_binding: false, display_max_bytes: default_display_max_bytes() }
    }
}

fn default_display_max_bytes() -> usize {
    64
}
