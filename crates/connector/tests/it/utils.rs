use alloy_primitives::Address;
use kakarot_connector::{ConnectorAdapter, ConnectorConfig, ConnectorEvent};
use kakarot_test_utils::{MockStarknetFactory, MockWallet};
use std::sync::Arc;
use tokio::sync::broadcast;

pub fn account(byte: u8) -> Address {
    Address::repeat_byte(byte)
}

/// A wallet, the Starknet endpoint and a connector wrapping both.
pub struct Fixture {
    pub wallet: MockWallet,
    pub starknet: MockStarknetFactory,
    pub adapter: ConnectorAdapter,
}

impl Fixture {
    pub fn new(accounts: Vec<Address>, chain_id: u64) -> Self {
        Self::with_config(accounts, chain_id, ConnectorConfig::default())
    }

    pub fn with_config(accounts: Vec<Address>, chain_id: u64, config: ConnectorConfig) -> Self {
        kakarot_test_utils::init_tracing();
        let wallet = MockWallet::new(accounts, chain_id);
        let starknet = MockStarknetFactory::new();
        let adapter = adapter_for(&wallet, &starknet, config);
        Self { wallet, starknet, adapter }
    }
}

pub fn adapter_for(
    wallet: &MockWallet,
    starknet: &MockStarknetFactory,
    config: ConnectorConfig,
) -> ConnectorAdapter {
    ConnectorAdapter::new(wallet.detail("b7d6b9c1", "MetaMask"), Arc::new(starknet.clone()), config)
}

/// Every event already delivered to `rx`.
pub fn drain(rx: &mut broadcast::Receiver<ConnectorEvent>) -> Vec<ConnectorEvent> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}
