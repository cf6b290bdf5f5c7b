use alloy_primitives::Address;
use async_trait::async_trait;
use kakarot_connector::{
    chains::StarknetChain,
    starknet_rpc::{ContractCall, StarknetCallProvider, StarknetProviderFactory},
};
use parking_lot::Mutex;
use starknet::{core::types::Felt, providers::ProviderError};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// The Starknet account [`MockStarknetProvider`] resolves for `evm_address`.
pub fn starknet_address_of(evm_address: Address) -> Felt {
    let mut bytes = [0u8; 32];
    bytes[0] = 0x07;
    bytes[12..].copy_from_slice(evm_address.as_slice());
    Felt::from_bytes_be(&bytes)
}

/// Answers every call with the account derived from the first calldata felt.
#[derive(Debug, Default)]
pub struct MockStarknetProvider {
    calls: Mutex<Vec<ContractCall>>,
    empty: AtomicBool,
}

impl MockStarknetProvider {
    /// Every call received so far.
    pub fn calls(&self) -> Vec<ContractCall> {
        self.calls.lock().clone()
    }

    /// Makes calls return no felt at all.
    pub fn set_empty(&self, empty: bool) {
        self.empty.store(empty, Ordering::Relaxed);
    }
}

#[async_trait]
impl StarknetCallProvider for MockStarknetProvider {
    async fn call_contract(&self, call: ContractCall) -> Result<Vec<Felt>, ProviderError> {
        let result = match call.calldata.first() {
            Some(felt) if !self.empty.load(Ordering::Relaxed) => {
                let bytes = felt.to_bytes_be();
                vec![starknet_address_of(Address::from_slice(&bytes[12..]))]
            }
            _ => Vec::new(),
        };
        self.calls.lock().push(call);
        Ok(result)
    }
}

/// Hands out a shared [`MockStarknetProvider`] and records the chains it was asked for.
#[derive(Clone, Debug, Default)]
pub struct MockStarknetFactory {
    provider: Arc<MockStarknetProvider>,
    chains: Arc<Mutex<Vec<Felt>>>,
    unavailable: bool,
}

impl MockStarknetFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A factory that serves no chain.
    pub fn unavailable() -> Self {
        Self { unavailable: true, ..Self::default() }
    }

    pub fn starknet_provider(&self) -> &Arc<MockStarknetProvider> {
        &self.provider
    }

    /// Chains providers were requested for, in order.
    pub fn requested_chains(&self) -> Vec<Felt> {
        self.chains.lock().clone()
    }
}

impl StarknetProviderFactory for MockStarknetFactory {
    fn provider(&self, chain: &StarknetChain) -> Option<Arc<dyn StarknetCallProvider>> {
        self.chains.lock().push(chain.id);
        if self.unavailable {
            return None;
        }
        Some(self.provider.clone())
    }
}
