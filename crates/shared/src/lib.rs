//! Shared utilities and common types for the Training Portal backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Common validation logic (numeric ranges, calendar dates)
//! - Offset pagination helpers
//! - File naming helpers for rendered exports

pub mod naming;
pub mod pagination;
pub mod validation;
