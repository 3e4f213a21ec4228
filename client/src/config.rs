//! Configuration management for the marketplace client.
//!
//! Loads configuration from environment variables with sensible defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::types::{Address, DEFAULT_MAX_TICKETS_PER_BUYER, STATUS_COOLDOWN};

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// JSON-RPC endpoint of the node
    pub rpc_url: String,
    /// Ticket contract address
    pub event_ticket_address: Option<Address>,
    /// Marketplace contract address
    pub marketplace_address: Option<Address>,
    /// How long success and error statuses stay visible
    pub status_cooldown: Duration,
    /// File holding the persisted wallet session
    pub session_path: PathBuf,
    /// Per-buyer cap assumed when an event reports none
    pub default_max_per_buyer: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl Config {
    /// Load configuration from the process environment
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from `lookup`; unset or unparsable values fall back
    /// to defaults
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            rpc_url: lookup("TIXCHAIN_RPC_URL")
                .unwrap_or_else(|| "http://127.0.0.1:7545".to_string()),
            event_ticket_address: lookup("TIXCHAIN_EVENT_TICKET_ADDRESS")
                .and_then(|s| s.parse().ok()),
            marketplace_address: lookup("TIXCHAIN_MARKETPLACE_ADDRESS")
                .and_then(|s| s.parse().ok()),
            status_cooldown: lookup("TIXCHAIN_STATUS_COOLDOWN_MS")
                .and_then(|s| s.parse().ok())
                .map_or(STATUS_COOLDOWN, Duration::from_millis),
            session_path: lookup("TIXCHAIN_SESSION_PATH")
                .map_or_else(|| PathBuf::from(".tixchain/session.json"), PathBuf::from),
            default_max_per_buyer: lookup("TIXCHAIN_DEFAULT_MAX_PER_BUYER")
                .and_then(|s| s.parse().ok())
                .filter(|max| *max > 0)
                .unwrap_or(DEFAULT_MAX_TICKETS_PER_BUYER),
        }
    }
}
