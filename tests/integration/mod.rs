//! Integration tests against a live DirectAdmin panel.
//!
//! These tests require valid DirectAdmin credentials and are ignored by
//! default.
//!
//! # Running Tests
//!
//! 1. Create a `.env` file in the project root (see `.env.example`)
//! 2. Run with: `cargo test -- --ignored`

mod directadmin;
