//! Mock-based tests for the DirectAdmin provider.
//!
//! These tests use wiremock to simulate DirectAdmin responses without
//! hitting a real panel.
