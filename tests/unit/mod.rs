//! Unit tests for core library types and internal functions.
//!
//! These tests focus on value types, response classification and helper
//! functions that don't require network access or mock servers.

mod types;

mod payload;
