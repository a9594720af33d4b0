//! Built-in endpoint sets used when no configuration file is supplied.
//!
//! Only keyless public endpoints are listed; providers that need an API key
//! belong in a config file.

use std::collections::BTreeMap;

use crate::config::schema::{EndpointConfig, EnvironmentConfig};

/// Default environments keyed by name.
pub fn default_environments() -> BTreeMap<String, EnvironmentConfig> {
    let mut environments = BTreeMap::new();
    environments.insert(
        "mainnet".to_string(),
        EnvironmentConfig { endpoints: mainnet_endpoints() },
    );
    environments.insert(
        "devnet".to_string(),
        EnvironmentConfig { endpoints: devnet_endpoints() },
    );
    environments
}

fn mainnet_endpoints() -> Vec<EndpointConfig> {
    vec![
        EndpointConfig {
            name: "Solana Labs".to_string(),
            http_url: "https://api.mainnet-beta.solana.com".to_string(),
            ws_url: "wss://api.mainnet-beta.solana.com".to_string(),
            priority: 50,
            max_rps: 50,
            timeout_secs: 10.0,
            cooldown_secs: 30.0,
        },
        EndpointConfig {
            name: "Alchemy Demo".to_string(),
            http_url: "https://solana-mainnet.g.alchemy.com/v2/demo".to_string(),
            ws_url: "wss://solana-mainnet.g.alchemy.com/v2/demo".to_string(),
            priority: 25,
            max_rps: 20,
            timeout_secs: 15.0,
            cooldown_secs: 120.0,
        },
    ]
}

fn devnet_endpoints() -> Vec<EndpointConfig> {
    vec![EndpointConfig {
        name: "Solana Labs Devnet".to_string(),
        http_url: "https://api.devnet.solana.com".to_string(),
        ws_url: "wss://api.devnet.solana.com".to_string(),
        priority: 50,
        max_rps: 50,
        timeout_secs: 10.0,
        cooldown_secs: 30.0,
    }]
}
