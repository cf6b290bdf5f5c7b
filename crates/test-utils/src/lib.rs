//! Test doubles for the Kakarot connector: a scripted EIP-1193 wallet and a Starknet endpoint
//! that resolves accounts deterministically.

#![warn(unused_crate_dependencies, unreachable_pub)]

#[macro_use]
extern crate tracing;

mod endpoint;
pub use endpoint::{MockStarknetFactory, MockStarknetProvider, starknet_address_of};

mod wallet;
pub use wallet::{MOCK_TX_HASH, MockProvider, MockWallet, mock_signature};

/// Initializes tracing for tests.
pub fn init_tracing() {
    let _ = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
