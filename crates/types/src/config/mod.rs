//! Configuration types for the Tessera row format.
//!
//! All config structs validate their values at construction time via
//! fallible builders. Post-deserialization validation is available via
//! the `validate()` method on each struct.

// The schemars `JsonSchema` derive macro internally uses `.unwrap()` in its
// expansions. Config types are declarative structs with minimal procedural code.
#![allow(clippy::disallowed_methods)]

mod row_format;

pub use row_format::*;
use snafu::Snafu;

/// Configuration validation error.
///
/// Returned when a configuration value is outside its valid range.
#[derive(Debug, Snafu)]
pub enum ConfigError {
    /// A configuration value is invalid.
    #[snafu(display("invalid config: {message}"))]
    Validation {
        /// Description of the validation failure.
        message: String,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn test_row_format_defaults_are_valid() {
        let config = RowFormatConfig::builder().build().expect("defaults should be valid");
        assert!(!config.strict_column_binding);
        assert_eq!(config.display_max_bytes, 64);
        assert_eq!(config, RowFormatConfig::default());
    }

    #[test]
    fn test_row_format_display_bounds() {
        assert!(RowFormatConfig::builder().display_max_bytes(8).build().is_ok());
        assert!(RowFormatConfig::builder().display_max_bytes(4096).build().is_ok());
        let err = RowFormatConfig::builder().display_max_bytes(7).build().unwrap_err();
        assert!(err.to_string().contains("display_max_bytes must be 8-4096, got 7"));
        assert!(RowFormatConfig::builder().display_max_bytes(4097).build().is_err());
    }

    #[test]
    fn test_row_format_deserialize_fills_defaults() {
        let config: RowFormatConfig =
            serde_json::from_str(r#"{"strict_column_binding": true}"#).expect("deserialize");
        assert!(config.strict_column_binding);
        assert_eq!(config.display_max_bytes, 64);
        config.validate().expect("valid");
    }

    #[test]
    fn test_row_format_deserialize_then_validate_rejects() {
        let config: RowFormatConfig =
            serde_json::from_str(r#"{"display_max_bytes": 1}"#).expect("deserialize");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_format_type_serde_names() {
        let json = serde_json::to_string(&ProtobufFormatType::SingleTable).expect("serialize");
        assert_eq!(json, r#""single_table""#);
        let back: ProtobufFormatType = serde_json::from_str(r#""group""#).expect("deserialize");
        assert_eq!(back, ProtobufFormatType::Group);
    }

    #[test]
    fn test_config_json_schema_lists_fields() {
        let schema = schemars::schema_for!(RowFormatConfig);
        let json = serde_json::to_string(&schema).expect("serialize schema");
        assert!(json.contains("strict_column_binding"));
        assert!(json.contains("display_max_bytes"));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Validation { message: "test error".to_string() };
        assert_eq!(err.to_string(), "invalid config: test error");
    }
}
