//! The [EIP-1193](https://eips.ethereum.org/EIPS/eip-1193) provider surface the connector wraps.
//!
//! A wallet is reached through two capabilities: a request/response method call and an event
//! subscription interface with add/remove listener semantics. Browser-injected providers,
//! remote bridges and test doubles all implement [`Eip1193Provider`].

use alloy_primitives::Address;
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::{borrow::Cow, fmt, sync::Arc};

/// Arguments of a single `request` call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestArguments {
    pub method: Cow<'static, str>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl RequestArguments {
    /// A request without parameters.
    pub const fn new(method: &'static str) -> Self {
        Self { method: Cow::Borrowed(method), params: None }
    }

    /// A request with the given JSON parameters.
    pub fn with_params(method: &'static str, params: serde_json::Value) -> Self {
        Self { method: Cow::Borrowed(method), params: Some(params) }
    }
}

/// The events a provider exposes through `on` / `removeListener`.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::EnumIter,
)]
pub enum ProviderEventKind {
    #[strum(serialize = "connect")]
    Connect,
    #[strum(serialize = "accountsChanged")]
    AccountsChanged,
    #[strum(serialize = "chainChanged")]
    ChainChanged,
    #[strum(serialize = "disconnect")]
    Disconnect,
}

/// Payload of the `connect` event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConnectInfo {
    /// Hex encoded EVM chain id.
    pub chain_id: String,
}

/// An event emitted by the wrapped provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProviderEvent {
    Connect(ProviderConnectInfo),
    AccountsChanged(Vec<Address>),
    /// Hex encoded EVM chain id.
    ChainChanged(String),
    Disconnect(Option<ProviderRpcError>),
}

impl ProviderEvent {
    /// The listener kind this event is dispatched to.
    pub const fn kind(&self) -> ProviderEventKind {
        match self {
            Self::Connect(_) => ProviderEventKind::Connect,
            Self::AccountsChanged(_) => ProviderEventKind::AccountsChanged,
            Self::ChainChanged(_) => ProviderEventKind::ChainChanged,
            Self::Disconnect(_) => ProviderEventKind::Disconnect,
        }
    }
}

/// Handle returned by [`Eip1193Provider::on`], used to remove the listener again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

/// An event callback registered on a provider.
pub type Listener = Arc<dyn Fn(ProviderEvent) -> BoxFuture<'static, ()> + Send + Sync>;

/// An EIP-1193 compatible wallet provider.
#[async_trait]
pub trait Eip1193Provider: Send + Sync + fmt::Debug {
    /// Submits a JSON-RPC request to the wallet.
    async fn request(&self, args: RequestArguments) -> Result<serde_json::Value, ProviderRpcError>;

    /// Registers `listener` for events of `kind`.
    fn on(&self, kind: ProviderEventKind, listener: Listener) -> ListenerId;

    /// Removes a listener previously registered with [`Eip1193Provider::on`].
    fn remove_listener(&self, kind: ProviderEventKind, id: ListenerId);
}

/// Error returned by a wallet, passed through unchanged by the connector.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message} (code {code})")]
pub struct ProviderRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ProviderRpcError {
    /// New [`ProviderRpcError`] with the given [`ProviderErrorCode`].
    pub fn new(code: ProviderErrorCode) -> Self {
        Self { code: code.code(), message: code.message().to_string(), data: None }
    }

    /// Creates an error with an arbitrary code and message.
    pub fn custom(code: i64, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), data: None }
    }

    /// Creates a new `UserRejectedRequest` error.
    pub fn user_rejected() -> Self {
        Self::new(ProviderErrorCode::UserRejectedRequest)
    }

    /// Creates a new `Unsupported` error.
    pub fn unsupported() -> Self {
        Self::new(ProviderErrorCode::Unsupported)
    }

    /// Returns the known code of this error, if any.
    pub fn error_code(&self) -> Option<ProviderErrorCode> {
        ProviderErrorCode::from_code(self.code)
    }

    /// Whether the user rejected the request in the wallet UI.
    pub fn is_user_rejected(&self) -> bool {
        self.error_code() == Some(ProviderErrorCode::UserRejectedRequest)
    }
}

/// Provider error codes, see <https://eips.ethereum.org/EIPS/eip-1193#provider-errors>
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderErrorCode {
    /// The user rejected the request.
    UserRejectedRequest,
    /// The requested method and/or account has not been authorized by the user.
    Unauthorized,
    /// The provider does not support the requested method.
    Unsupported,
    /// The provider is disconnected from all chains.
    Disconnected,
    /// The provider is not connected to the requested chain.
    ChainDisconnected,
    /// MetaMask emits this on `disconnect` while it is re-establishing its connection,
    /// see <https://github.com/MetaMask/providers/pull/120>
    TryAgainLater,
}

impl ProviderErrorCode {
    /// Returns the error code as `i64`
    pub const fn code(&self) -> i64 {
        match *self {
            Self::UserRejectedRequest => 4001,
            Self::Unauthorized => 4100,
            Self::Unsupported => 4200,
            Self::Disconnected => 4900,
            Self::ChainDisconnected => 4901,
            Self::TryAgainLater => 1013,
        }
    }

    /// Returns the message associated with the error
    pub const fn message(&self) -> &'static str {
        match *self {
            Self::UserRejectedRequest => "User rejected the request",
            Self::Unauthorized => "Unauthorized",
            Self::Unsupported => "Unsupported method",
            Self::Disconnected => "Disconnected",
            Self::ChainDisconnected => "Chain disconnected",
            Self::TryAgainLater => "Try again later",
        }
    }

    /// Maps a raw code back to a known variant.
    pub const fn from_code(code: i64) -> Option<Self> {
        Some(match code {
            4001 => Self::UserRejectedRequest,
            4100 => Self::Unauthorized,
            4200 => Self::Unsupported,
            4900 => Self::Disconnected,
            4901 => Self::ChainDisconnected,
            1013 => Self::TryAgainLater,
            _ => return None,
        })
    }
}
