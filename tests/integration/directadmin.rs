//! Integration tests for the DirectAdmin provider.
//!
//! These tests require a DirectAdmin account and are ignored by default.
//! To run them:
//!
//! 1. Create a `.env` file in the project root (see `.env.example`)
//!
//! 2. Run with: `cargo test -- --ignored`
//!
//! # Environment Variables
//!
//! | Variable | Required | Description |
//! |----------|----------|-------------|
//! | `DIRECTADMIN_SERVER` | Yes | Panel URL, e.g. `https://panel.example.com:2222` |
//! | `DIRECTADMIN_USERNAME` | Yes | DirectAdmin login |
//! | `DIRECTADMIN_PASSWORD` | Yes | Password or login key |
//! | `DIRECTADMIN_TEST_DOMAIN` | Yes | Domain owned by the account |
//! | `DIRECTADMIN_TEST_ALIAS` | No | Alias used for the forwarder round trip |

use std::env;

use directadmin_mail::directadmin::{ClientConfig, DirectAdminProvider};
use directadmin_mail::{CreateForwarder, DeleteForwarder, ListForwarders, ListMailboxes, Provider};

/// Test configuration loaded from environment.
struct TestConfig {
    provider: DirectAdminProvider,
    /// The domain to test with (e.g., "example.com")
    domain: String,
    /// Alias created and removed by the round trip
    alias: String,
}

/// Helper to load full test configuration.
/// Returns None if credentials are not available.
fn get_test_config() -> Option<TestConfig> {
    // Load .env file if present (ignore errors if file doesn't exist)
    let _ = dotenvy::dotenv();

    let server = env::var("DIRECTADMIN_SERVER").ok()?;
    let username = env::var("DIRECTADMIN_USERNAME").ok()?;
    let password = env::var("DIRECTADMIN_PASSWORD").ok()?;
    let domain = env::var("DIRECTADMIN_TEST_DOMAIN").ok()?;
    let alias =
        env::var("DIRECTADMIN_TEST_ALIAS").unwrap_or_else(|_| "directadmin-mail-test".to_string());

    let config = ClientConfig::new(server, username, password).with_domain(&domain);
    let provider = DirectAdminProvider::new(config).ok()?;

    Some(TestConfig {
        provider,
        domain,
        alias,
    })
}

#[tokio::test]
#[ignore = "requires DIRECTADMIN credentials in .env"]
async fn test_connection() {
    let config = get_test_config().expect("DIRECTADMIN credentials not found");

    let result = config.provider.test_connection().await;
    println!("{}", result.message);
    assert!(result.success);
}

#[tokio::test]
#[ignore = "requires DIRECTADMIN credentials in .env"]
async fn test_domain_access() {
    let config = get_test_config().expect("DIRECTADMIN credentials not found");

    let result = config.provider.validate_domain_access().await;
    println!("{}", result.message);
    assert!(result.success, "Expected {} to be accessible", config.domain);
}

#[tokio::test]
async fn test_invalid_credentials() {
    let _ = dotenvy::dotenv();
    let Ok(server) = env::var("DIRECTADMIN_SERVER") else {
        return;
    };

    let config = ClientConfig::new(server, "no-such-user", "invalid-password");
    let provider = DirectAdminProvider::new(config).expect("Client creation should succeed");

    let result = provider.test_connection().await;
    assert!(!result.success, "Expected failure with invalid credentials");
    assert!(!result.message.contains("invalid-password"));
}

#[tokio::test]
#[ignore = "requires DIRECTADMIN credentials in .env"]
async fn test_list_mailboxes() {
    let config = get_test_config().expect("DIRECTADMIN credentials not found");

    let result = config.provider.list_mailboxes().await;
    assert!(result.success, "{}", result.message);

    println!("Found {} mailboxes in {}", result.value.len(), config.domain);
    for mailbox in &result.value {
        println!("  - {}", mailbox);
        assert!(mailbox.contains('@'));
    }

    let mut sorted = result.value.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted, result.value);
}

#[tokio::test]
#[ignore = "requires DIRECTADMIN credentials in .env"]
async fn test_forwarder_crud() {
    let config = get_test_config().expect("DIRECTADMIN credentials not found");
    let provider = &config.provider;
    let address = format!("{}@{}", config.alias, config.domain);

    // Cleanup a leftover from an earlier run
    let _ = provider.delete_forwarder(&address).await;

    println!("  Creating forwarder {} -> :blackhole:", address);
    let created = provider.create_forwarder(&config.alias, ":blackhole:").await;
    assert!(created.success, "{}", created.message);

    let listed = provider.list_forwarders().await;
    assert!(listed.success, "{}", listed.message);
    let found = listed
        .value
        .iter()
        .find(|f| f.address == address)
        .expect("created forwarder should be listed");
    assert_eq!(found.destination, ":blackhole:");

    let deleted = provider.delete_forwarder(&address).await;
    assert!(deleted.success, "{}", deleted.message);

    let listed = provider.list_forwarders().await;
    assert!(
        !listed.value.iter().any(|f| f.address == address),
        "Forwarder should be deleted"
    );
}
