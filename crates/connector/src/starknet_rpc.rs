//! Read access to Starknet, used to resolve the Starknet account bound to an EVM address.

use crate::chains::StarknetChain;
use async_trait::async_trait;
use starknet::{
    core::types::{BlockId, BlockTag, Felt, FunctionCall},
    providers::{JsonRpcClient, Provider, ProviderError, Url, jsonrpc::HttpTransport},
};
use std::{fmt, sync::Arc};

/// A read-only contract call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractCall {
    pub contract_address: Felt,
    pub entry_point_selector: Felt,
    pub calldata: Vec<Felt>,
}

/// Executes read-only calls against one Starknet chain.
#[async_trait]
pub trait StarknetCallProvider: Send + Sync + fmt::Debug {
    async fn call_contract(&self, call: ContractCall) -> Result<Vec<Felt>, ProviderError>;
}

/// Builds a [`StarknetCallProvider`] for a chain, or `None` if the chain is not served.
pub trait StarknetProviderFactory: Send + Sync + fmt::Debug {
    fn provider(&self, chain: &StarknetChain) -> Option<Arc<dyn StarknetCallProvider>>;
}

#[async_trait]
impl StarknetCallProvider for JsonRpcClient<HttpTransport> {
    async fn call_contract(&self, call: ContractCall) -> Result<Vec<Felt>, ProviderError> {
        let request = FunctionCall {
            contract_address: call.contract_address,
            entry_point_selector: call.entry_point_selector,
            calldata: call.calldata,
        };
        self.call(request, BlockId::Tag(BlockTag::Latest)).await
    }
}

/// Connects to the first JSON-RPC endpoint listed for a chain, or to an explicit override.
#[derive(Clone, Debug, Default)]
pub struct JsonRpcProviderFactory {
    overrides: Vec<(Felt, Url)>,
}

impl JsonRpcProviderFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `url` for the chain `chain_id` instead of its public endpoint.
    pub fn with_endpoint(mut self, chain_id: Felt, url: Url) -> Self {
        self.overrides.retain(|(id, _)| *id != chain_id);
        self.overrides.push((chain_id, url));
        self
    }

    fn endpoint(&self, chain: &StarknetChain) -> Option<Url> {
        if let Some((_, url)) = self.overrides.iter().find(|(id, _)| *id == chain.id) {
            return Some(url.clone());
        }
        let url = chain.rpc_urls.first()?;
        match Url::parse(url) {
            Ok(url) => Some(url),
            Err(err) => {
                warn!(%err, url, chain = chain.name, "invalid starknet rpc url");
                None
            }
        }
    }
}

impl StarknetProviderFactory for JsonRpcProviderFactory {
    fn provider(&self, chain: &StarknetChain) -> Option<Arc<dyn StarknetCallProvider>> {
        let url = self.endpoint(chain)?;
        debug!(%url, chain = chain.name, "connecting to starknet rpc");
        Some(Arc::new(JsonRpcClient::new(HttpTransport::new(url))))
    }
}
