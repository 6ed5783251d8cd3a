//! Shared test utilities for Tessera crates.
//!
//! This crate provides common test helpers to reduce boilerplate across test modules:
//!
//! - [`fixtures`] - The `orders`/`items` group and a table with every column type
//! - [`wire`] - Wire schema generation with identity annotations
//! - [`strategies`] - Proptest strategies for values and rows
//! - [`test_row_format_config`] - Default row format configuration for tests

#![deny(unsafe_code)]
// Test utilities are allowed to panic on malformed fixtures
#![allow(clippy::unwrap_used, clippy::expect_used)]

pub mod fixtures;
pub mod strategies;
pub mod wire;

mod config;
pub use config::{strict_row_format_config, test_row_format_config};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_helpers() {
        assert!(!test_row_format_config().strict_column_binding);
        let strict = strict_row_format_config(16);
        assert!(strict.strict_column_binding);
        assert_eq!(strict.display_max_bytes, 16);
    }

    #[test]
    fn test_group_members_in_join_order() {
        let group = fixtures::orders_items_group();
        let ids: Vec<_> = group.members().iter().map(|t| t.id).collect();
        assert_eq!(ids, [fixtures::ORDERS_ID, fixtures::ITEMS_ID]);
    }
}
