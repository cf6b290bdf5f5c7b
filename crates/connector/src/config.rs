//! Connector configuration.
//!
//! Values are layered the same way every time: built-in defaults, then an optional
//! `kakarot.toml` in the working directory, then `KAKAROT_` prefixed environment variables.

use alloy_primitives::{Address, address};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use starknet::{core::types::Felt, macros::felt};
use std::time::Duration;

/// Kakarot core contract on Starknet Sepolia, exposing `get_starknet_address`.
pub const KAKAROT_SEPOLIA_ADDRESS: Felt =
    felt!("0x1d2e513630d8120666fc6e7d52ad0c01479fd99c183baac79fff9135f46e359");

/// EVM address of the Cairo multicall precompile.
pub const MULTICALL_CAIRO_PRECOMPILE: Address =
    address!("0x0000000000000000000000000000000000750003");

/// File name looked up in the working directory.
pub const CONFIG_FILE: &str = "kakarot.toml";

/// Prefix of the environment variables overriding the configuration.
pub const ENV_PREFIX: &str = "KAKAROT_";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    /// Starknet address of the Kakarot contract used to resolve accounts.
    pub kakarot_address: Felt,
    /// Destination of multicall transactions.
    pub multicall_precompile: Address,
    /// Upper bound, in milliseconds, on the permission revocation done by `disconnect`.
    ///
    /// Some wallets never answer `wallet_revokePermissions`.
    pub revoke_timeout: u64,
    /// Whether the connector runs where a user can interact with the wallet. Connectors report
    /// themselves unavailable otherwise.
    pub interactive: bool,
    /// Number of events buffered per subscriber before slow subscribers start lagging.
    pub event_capacity: usize,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            kakarot_address: KAKAROT_SEPOLIA_ADDRESS,
            multicall_precompile: MULTICALL_CAIRO_PRECOMPILE,
            revoke_timeout: 100,
            interactive: true,
            event_capacity: 64,
        }
    }
}

impl ConnectorConfig {
    /// Loads the configuration from the default sources.
    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    /// The [`Figment`] the configuration is extracted from.
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    /// Returns the revocation timeout as a [`Duration`].
    pub const fn revoke_timeout(&self) -> Duration {
        Duration::from_millis(self.revoke_timeout)
    }

    /// Sets [`Self::interactive`].
    pub const fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    /// Sets [`Self::revoke_timeout`] in milliseconds.
    pub const fn with_revoke_timeout(mut self, millis: u64) -> Self {
        self.revoke_timeout = millis;
        self
    }
}
