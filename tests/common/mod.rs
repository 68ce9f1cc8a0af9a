//! Common test utilities shared across test modules.
//!
//! This module provides helpers for setting up mock servers, building
//! providers pointed at them, and the DirectAdmin bodies used throughout the
//! test suite.

use directadmin_mail::directadmin::{ClientConfig, DirectAdminProvider};
use directadmin_mail::HttpClientConfig;
use wiremock::MockServer;

/// Sets up a new mock server for testing.
///
/// This is the standard way to create a mock server in tests.
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Test constants used across multiple test modules.
#[allow(dead_code)]
pub mod constants {
    /// DirectAdmin login used in mock tests.
    pub const USERNAME: &str = "admin";

    /// Password matching [`USERNAME`].
    pub const PASSWORD: &str = "s3cret";

    /// Password the mock server rejects.
    pub const BAD_PASSWORD: &str = "wrong";

    /// Domain configured on the provider under test.
    pub const DOMAIN: &str = "example.com";
}

/// Returns a config pointing at the mock server with the standard credentials.
#[allow(dead_code)]
pub fn mock_config(server: &MockServer) -> ClientConfig {
    ClientConfig::new(server.uri(), constants::USERNAME, constants::PASSWORD)
        .with_domain(constants::DOMAIN)
}

/// Creates a provider for the mock server with the standard credentials.
#[allow(dead_code)]
pub fn mock_provider(server: &MockServer) -> DirectAdminProvider {
    DirectAdminProvider::new(mock_config(server)).expect("Failed to create provider")
}

/// Creates a provider for the mock server with a custom HTTP configuration.
#[allow(dead_code)]
pub fn mock_provider_with(server: &MockServer, http: HttpClientConfig) -> DirectAdminProvider {
    DirectAdminProvider::with_config(mock_config(server), http)
        .expect("Failed to create provider")
}

/// DirectAdmin response bodies.
#[allow(dead_code)]
pub mod bodies {
    /// A successful mutation.
    pub const OK: &str = "error=0&text=Success&details=";

    /// The login page DirectAdmin serves when a command is not available.
    pub const LOGIN_PAGE: &str = "<!DOCTYPE html>\n<html><head><title>DirectAdmin Login</title>\
        </head><body><form action=\"/CMD_LOGIN\"><input name=\"username\"></form></body></html>";

    /// Builds a `list[]=` body from plain values.
    pub fn list(items: &[&str]) -> String {
        items
            .iter()
            .map(|item| format!("list[]={}", urlencoding::encode(item)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Builds a URL-encoded `key=value&...` body.
    pub fn url_encoded(pairs: &[(&str, &str)]) -> String {
        pairs
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Builds a DirectAdmin error body.
    pub fn error(code: u32, text: &str, details: &str) -> String {
        url_encoded(&[
            ("error", &code.to_string()),
            ("text", text),
            ("details", details),
        ])
    }
}
