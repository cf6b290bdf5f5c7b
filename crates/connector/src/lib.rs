//! # kakarot-connector
//!
//! Lets an application written against the Starknet wallet API transact through an
//! [EIP-1193](https://eips.ethereum.org/EIPS/eip-1193) wallet, using the Kakarot zkEVM as the
//! bridge between both address spaces.
//!
//! - Accounts are the Starknet accounts Kakarot deployed for the wallet's EVM addresses.
//! - Chains are mapped through a fixed [`ChainRegistry`].
//! - Invoke transactions are sent as one EVM transaction to the Cairo multicall precompile, see
//!   [`encode_multicall`].
//!
//! Wallets are discovered through a [`DiscoveryStore`] and wrapped by [`kakarot_connectors`].

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

#[macro_use]
extern crate tracing;

pub mod adapter;
pub mod chains;
pub mod config;
pub mod discovery;
pub mod error;
pub mod events;
pub mod factory;
pub mod listeners;
pub mod multicall;
pub mod provider;
pub mod starknet_rpc;

pub use adapter::{
    AccountPair, ConnectorAdapter, ConnectorData, ConnectorIdentity, RpcCall, WalletResponse,
};
pub use chains::ChainRegistry;
pub use config::ConnectorConfig;
pub use discovery::{DiscoveryStore, ProviderDetail, ProviderInfo, ProviderStore};
pub use error::ConnectorError;
pub use events::ConnectorEvent;
pub use factory::kakarot_connectors;
pub use multicall::{Call, decode_multicall, encode_multicall};
pub use provider::{Eip1193Provider, ProviderEvent, ProviderEventKind, ProviderRpcError};
