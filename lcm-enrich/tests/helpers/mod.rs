//! Test Helper Utilities
//!
//! Shared utilities for testing lcm-enrich

#![allow(dead_code)]

pub mod db_utils;
pub mod mock_source;

pub use db_utils::{create_test_db, enrichment_columns_blank, item_by_value, seed_assembly};
pub use mock_source::{candidate, MockPartsSource};
