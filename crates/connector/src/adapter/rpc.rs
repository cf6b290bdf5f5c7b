//! Starknet wallet RPC methods, served through the wrapped EVM wallet.

use super::ConnectorAdapter;
use crate::{
    error::ConnectorError,
    multicall::{Call, encode_multicall},
    provider::RequestArguments,
};
use alloy_primitives::{Address, B256, Bytes};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use starknet::core::types::Felt;

/// A Starknet wallet request: the method name under `type` and its optional parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcCall {
    #[serde(rename = "type")]
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl RpcCall {
    pub fn new(method: impl Into<String>) -> Self {
        Self { method: method.into(), params: None }
    }

    pub fn with_params(method: impl Into<String>, params: Value) -> Self {
        Self { method: method.into(), params: Some(params) }
    }
}

/// The Starknet wallet methods a connector answers.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::EnumIter,
)]
pub enum WalletMethod {
    #[strum(serialize = "wallet_requestChainId")]
    RequestChainId,
    #[strum(serialize = "wallet_getPermissions")]
    GetPermissions,
    #[strum(serialize = "wallet_requestAccounts")]
    RequestAccounts,
    #[strum(serialize = "wallet_addStarknetChain")]
    AddStarknetChain,
    #[strum(serialize = "wallet_watchAsset")]
    WatchAsset,
    #[strum(serialize = "wallet_switchStarknetChain")]
    SwitchStarknetChain,
    #[strum(serialize = "wallet_addDeclareTransaction")]
    AddDeclareTransaction,
    #[strum(serialize = "wallet_addInvokeTransaction")]
    AddInvokeTransaction,
    #[strum(serialize = "wallet_signTypedData")]
    SignTypedData,
}

impl WalletMethod {
    /// Whether the method does something. Unsupported methods answer `false`.
    pub const fn is_supported(&self) -> bool {
        !matches!(self, Self::AddStarknetChain | Self::WatchAsset | Self::AddDeclareTransaction)
    }
}

/// Result of a wallet request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum WalletResponse {
    /// Hex encoded chain id.
    ChainId(String),
    Accounts(Vec<Address>),
    Bool(bool),
    TransactionHash(B256),
    Signature(Bytes),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchStarknetChainParameters {
    pub chain_id: Felt,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddInvokeTransactionParameters {
    pub calls: Vec<Call>,
}

/// The EVM transaction carrying a multicall to the Cairo precompile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvokeTransaction {
    pub from: Address,
    pub to: Address,
    pub data: Bytes,
}

/// A permission granted by `wallet_requestPermissions`, see EIP-2255.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    #[serde(default)]
    pub parent_capability: Option<String>,
    #[serde(default)]
    pub caveats: Vec<PermissionCaveat>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionCaveat {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: Value,
}

impl ConnectorAdapter {
    /// Serves a Starknet wallet request.
    pub async fn request(&self, call: RpcCall) -> Result<WalletResponse, ConnectorError> {
        if !self.available() {
            return Err(ConnectorError::ConnectorNotFound);
        }
        let method: WalletMethod = call
            .method
            .parse()
            .map_err(|_| ConnectorError::UnknownRequestType(call.method.clone()))?;
        trace!(%method, connector = %self.id(), "wallet request");

        match method {
            WalletMethod::RequestChainId => {
                let chain_id = self.evm_chain_id().await?;
                Ok(WalletResponse::ChainId(format!("{chain_id:#x}")))
            }
            WalletMethod::GetPermissions => {
                self.get_permissions().await.map(WalletResponse::Accounts)
            }
            WalletMethod::RequestAccounts => self
                .call("eth_requestAccounts", RequestArguments::new("eth_requestAccounts"))
                .await
                .map(WalletResponse::Accounts),
            WalletMethod::SwitchStarknetChain => {
                let params: SwitchStarknetChainParameters =
                    required_params("wallet_switchStarknetChain", call.params)?;
                self.switch_chain(params.chain_id).await?;
                Ok(WalletResponse::Bool(true))
            }
            WalletMethod::AddInvokeTransaction => {
                let params: AddInvokeTransactionParameters =
                    required_params("wallet_addInvokeTransaction", call.params)?;
                self.invoke(&params.calls).await.map(WalletResponse::TransactionHash)
            }
            WalletMethod::SignTypedData => {
                let typed_data = call
                    .params
                    .ok_or(ConnectorError::MissingParameters("wallet_signTypedData"))?;
                self.sign_typed_data(typed_data).await.map(WalletResponse::Signature)
            }
            WalletMethod::AddStarknetChain
            | WalletMethod::WatchAsset
            | WalletMethod::AddDeclareTransaction => Ok(WalletResponse::Bool(false)),
        }
    }

    /// Accounts granted through `wallet_requestPermissions`.
    async fn get_permissions(&self) -> Result<Vec<Address>, ConnectorError> {
        let permissions: Vec<Permission> = self
            .call(
                "wallet_requestPermissions",
                RequestArguments::with_params(
                    "wallet_requestPermissions",
                    json!([{ "eth_accounts": {} }]),
                ),
            )
            .await?;

        let accounts = match permissions.first().and_then(|permission| permission.caveats.first()) {
            Some(caveat) => serde_json::from_value::<Vec<Address>>(caveat.value.clone())
                .map_err(|source| ConnectorError::InvalidResponse {
                    method: "wallet_requestPermissions",
                    source,
                })?,
            None => Vec::new(),
        };

        // permissions do not preserve the wallet's account order
        if accounts.len() > 1 {
            return self.accounts().await;
        }
        Ok(accounts)
    }

    /// Sends `calls` as a single multicall transaction from the active EVM account.
    async fn invoke(&self, calls: &[Call]) -> Result<B256, ConnectorError> {
        let from = self.first_account().await?;
        let tx = InvokeTransaction {
            from,
            to: self.inner.config.multicall_precompile,
            data: encode_multicall(calls)?,
        };
        debug!(%from, calls = calls.len(), "sending multicall");
        self.call(
            "eth_sendTransaction",
            RequestArguments::with_params("eth_sendTransaction", json!([tx])),
        )
        .await
    }

    async fn sign_typed_data(&self, typed_data: Value) -> Result<Bytes, ConnectorError> {
        let _: Value = self
            .call(
                "wallet_requestPermissions",
                RequestArguments::with_params(
                    "wallet_requestPermissions",
                    json!([{ "eth_accounts": { "requiredMethods": ["signTypedData_v4"] } }]),
                ),
            )
            .await?;
        let account = self.first_account().await?;
        self.call(
            "eth_signTypedData_v4",
            RequestArguments::with_params("eth_signTypedData_v4", json!([account, typed_data])),
        )
        .await
    }

    async fn first_account(&self) -> Result<Address, ConnectorError> {
        self.accounts().await?.first().copied().ok_or(ConnectorError::NoAccounts)
    }
}

/// Decodes the parameters of `method`, which must be present.
fn required_params<T: DeserializeOwned>(
    method: &'static str,
    params: Option<Value>,
) -> Result<T, ConnectorError> {
    let params = params.ok_or(ConnectorError::MissingParameters(method))?;
    serde_json::from_value(params).map_err(ConnectorError::InvalidParams)
}
