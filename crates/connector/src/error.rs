use crate::{multicall::MulticallError, provider::ProviderRpcError};
use starknet::{core::types::Felt, providers::ProviderError};
use std::fmt;

/// A chain id that is absent from the [`ChainRegistry`](crate::chains::ChainRegistry).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnknownChain {
    /// A native EVM chain id.
    Evm(u64),
    /// A Starknet chain id.
    Starknet(Felt),
}

impl fmt::Display for UnknownChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Evm(id) => write!(f, "evm chain {id}"),
            Self::Starknet(id) => write!(f, "starknet chain {}", id.to_hex_string()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    #[error("Provider not found.")]
    ProviderNotFound,
    #[error("Connector not found.")]
    ConnectorNotFound,
    #[error("Unknown chain id: {0}")]
    UnknownChainId(UnknownChain),
    #[error("Chain id invalid: {0}")]
    InvalidChainId(String),
    #[error("Unknown request type: {0}")]
    UnknownRequestType(String),
    #[error("Params are missing for {0}")]
    MissingParameters(&'static str),
    #[error("Chain switch superseded by a newer switch")]
    SwitchSuperseded,
    #[error("Wallet did not return any account")]
    NoAccounts,
    #[error("Failed to resolve starknet address for {0}")]
    AddressResolution(String),
    #[error("Invalid {method} response: {source}")]
    InvalidResponse {
        method: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid params: {0}")]
    InvalidParams(#[source] serde_json::Error),
    #[error(transparent)]
    Provider(#[from] ProviderRpcError),
    #[error(transparent)]
    Starknet(#[from] ProviderError),
    #[error(transparent)]
    Multicall(#[from] MulticallError),
}

impl ConnectorError {
    pub(crate) const fn unknown_evm_chain(id: u64) -> Self {
        Self::UnknownChainId(UnknownChain::Evm(id))
    }

    pub(crate) const fn unknown_starknet_chain(id: Felt) -> Self {
        Self::UnknownChainId(UnknownChain::Starknet(id))
    }

    /// Returns the wallet error if this error was raised by the wrapped provider.
    pub fn as_provider_error(&self) -> Option<&ProviderRpcError> {
        match self {
            Self::Provider(err) => Some(err),
            _ => None,
        }
    }
}
