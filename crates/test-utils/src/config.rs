//! Row format configurations for tests.

use tessera_types::RowFormatConfig;

/// Default configuration: unmapped columns decode as NULL.
#[must_use]
pub fn test_row_format_config() -> RowFormatConfig {
    RowFormatConfig::default()
}

/// Configuration that rejects columns without a wire field and renders
/// at most `display_max_bytes` bytes in fallback displays.
#[must_use]
pub fn strict_row_format_config(display_max_bytes: usize) -> RowFormatConfig {
    RowFormatConfig::builder()
        .strict_column_binding(true)
        .display_max_bytes(display_max_bytes)
        .build()
        .expect("valid test row format config")
}
