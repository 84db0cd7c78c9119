//! Application configuration loaded from environment variables.

use std::net::IpAddr;
use std::path::PathBuf;

use registry_protocol::Role;

use crate::errors::{Result, ServiceError};

#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding one JSON file per collection
    pub data_dir: PathBuf,
    /// Port for the REST API server
    pub api_port: u16,
    /// Wallet addresses acting as admins
    pub admin_addresses: Vec<String>,
    /// Wallet addresses acting as MRV verifiers
    pub verifier_addresses: Vec<String>,
    /// Sustained requests per second allowed per client IP
    pub rate_limit_per_second: u32,
    /// Burst size allowed per client IP
    pub rate_limit_burst: u32,
    /// Reverse proxies allowed to name the client via `X-Forwarded-For`
    pub trusted_proxies: Vec<IpAddr>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: PathBuf::from("./data"),
            api_port: 3001,
            admin_addresses: Vec::new(),
            verifier_addresses: Vec::new(),
            rate_limit_per_second: 10,
            rate_limit_burst: 100,
            trusted_proxies: Vec::new(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Config::default();
        Ok(Config {
            data_dir: env_var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            api_port: env_var("API_PORT")
                .unwrap_or_else(|_| "3001".to_string())
                .parse()
                .map_err(|_| ServiceError::Config("Invalid API_PORT".to_string()))?,
            admin_addresses: parse_address_list(&env_var("ADMIN_ADDRESSES").unwrap_or_default()),
            verifier_addresses: parse_address_list(
                &env_var("VERIFIER_ADDRESSES").unwrap_or_default(),
            ),
            rate_limit_per_second: env_var("RATE_LIMIT_PER_SECOND")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .map_err(|_| ServiceError::Config("Invalid RATE_LIMIT_PER_SECOND".to_string()))?,
            rate_limit_burst: env_var("RATE_LIMIT_BURST")
                .unwrap_or_else(|_| "100".to_string())
                .parse()
                .map_err(|_| ServiceError::Config("Invalid RATE_LIMIT_BURST".to_string()))?,
            trusted_proxies: parse_ip_list(&env_var("TRUSTED_PROXIES").unwrap_or_default())?,
        })
    }

    /// Resolve the role of a wallet address. Addresses compare case-insensitively.
    pub fn role_of(&self, address: &str) -> Role {
        let address = address.trim();
        if address.is_empty() {
            return Role::Stakeholder;
        }
        let listed = |list: &[String]| list.iter().any(|a| a.eq_ignore_ascii_case(address));
        if listed(&self.admin_addresses) {
            Role::Admin
        } else if listed(&self.verifier_addresses) {
            Role::Verifier
        } else {
            Role::Stakeholder
        }
    }
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| ServiceError::Config(format!("Missing env var: {key}")))
}

/// Split a comma-separated address list, dropping blanks.
pub fn parse_address_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Parse a comma-separated list of IP addresses.
pub fn parse_ip_list(raw: &str) -> Result<Vec<IpAddr>> {
    parse_address_list(raw)
        .iter()
        .map(|entry| {
            entry.parse().map_err(|_| {
                ServiceError::Config(format!("Invalid TRUSTED_PROXIES entry: {entry}"))
            })
        })
        .collect()
}
