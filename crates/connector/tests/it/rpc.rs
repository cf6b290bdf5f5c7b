use crate::utils::{Fixture, account};
use alloy_primitives::U256;
use kakarot_connector::{
    ConnectorAdapter, ConnectorConfig, ConnectorError, RpcCall, WalletResponse,
    adapter::{ConnectorIdentity, InvokeTransaction, WalletMethod},
    chains::{ETHEREUM_MAINNET_ID, KAKAROT_SEPOLIA_ID, SN_MAIN},
    config::MULTICALL_CAIRO_PRECOMPILE,
    decode_multicall,
    provider::ProviderRpcError,
};
use kakarot_test_utils::{MOCK_TX_HASH, MockStarknetFactory, mock_signature};
use serde_json::{Value, json};
use similar_asserts::assert_eq;
use starknet::core::utils::get_selector_from_name;
use std::sync::Arc;

#[tokio::test(flavor = "multi_thread")]
async fn unknown_request_type() {
    let Fixture { adapter, .. } = Fixture::new(vec![account(1)], KAKAROT_SEPOLIA_ID);
    let err = adapter.request(RpcCall::new("wallet_deploymentData")).await.unwrap_err();
    assert!(matches!(
        err,
        ConnectorError::UnknownRequestType(method) if method == "wallet_deploymentData"
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn unavailable_connectors_refuse_requests() {
    let config = ConnectorConfig::default().with_interactive(false);
    let Fixture { wallet, adapter, .. } =
        Fixture::with_config(vec![account(1)], KAKAROT_SEPOLIA_ID, config);
    assert!(!adapter.available());

    let err = adapter.request(RpcCall::new("wallet_requestAccounts")).await.unwrap_err();
    assert!(matches!(err, ConnectorError::ConnectorNotFound));
    assert!(wallet.provider().requests().is_empty());

    let identity = ConnectorIdentity {
        id: "io.metamask".to_string(),
        display_name: "MetaMask".to_string(),
        icon: None,
    };
    let adapter = ConnectorAdapter::with_provider(
        identity,
        None,
        Arc::new(MockStarknetFactory::new()),
        ConnectorConfig::default(),
    );
    let err = adapter.request(RpcCall::new("wallet_requestChainId")).await.unwrap_err();
    assert!(matches!(err, ConnectorError::ConnectorNotFound));
}

#[tokio::test(flavor = "multi_thread")]
async fn unsupported_methods_answer_false() {
    let Fixture { wallet, adapter, .. } = Fixture::new(vec![account(1)], KAKAROT_SEPOLIA_ID);
    for method in ["wallet_addStarknetChain", "wallet_watchAsset", "wallet_addDeclareTransaction"] {
        let call = RpcCall::with_params(method, json!({ "id": "0x1" }));
        assert_eq!(adapter.request(call).await.unwrap(), WalletResponse::Bool(false));
        assert!(!method.parse::<WalletMethod>().unwrap().is_supported());
    }
    assert!(wallet.provider().requests().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn request_chain_id_is_native() {
    let Fixture { adapter, .. } = Fixture::new(vec![account(1)], KAKAROT_SEPOLIA_ID);
    let response = adapter.request(RpcCall::new("wallet_requestChainId")).await.unwrap();
    assert_eq!(response, WalletResponse::ChainId("0x34550b76e4065".to_string()));
}

#[tokio::test(flavor = "multi_thread")]
async fn request_accounts() {
    let Fixture { wallet, adapter, .. } = Fixture::new(vec![account(1)], KAKAROT_SEPOLIA_ID);
    let response = adapter.request(RpcCall::new("wallet_requestAccounts")).await.unwrap();
    assert_eq!(response, WalletResponse::Accounts(vec![account(1)]));

    wallet.provider().fail("eth_requestAccounts", ProviderRpcError::user_rejected());
    let err = adapter.request(RpcCall::new("wallet_requestAccounts")).await.unwrap_err();
    assert!(err.as_provider_error().unwrap().is_user_rejected());
}

#[tokio::test(flavor = "multi_thread")]
async fn permissions_follow_wallet_account_order() {
    let Fixture { wallet, adapter, .. } = Fixture::new(vec![account(1)], KAKAROT_SEPOLIA_ID);
    let response = adapter.request(RpcCall::new("wallet_getPermissions")).await.unwrap();
    assert_eq!(response, WalletResponse::Accounts(vec![account(1)]));
    assert!(wallet.provider().requests_for("eth_accounts").is_empty());

    wallet.set_accounts(vec![account(1), account(2)]);
    wallet.provider().handle("wallet_requestPermissions", |_| {
        Ok(json!([{
            "parentCapability": "eth_accounts",
            "caveats": [{ "type": "restrictReturnedAccounts", "value": [account(2), account(1)] }]
        }]))
    });
    let response = adapter.request(RpcCall::new("wallet_getPermissions")).await.unwrap();
    assert_eq!(response, WalletResponse::Accounts(vec![account(1), account(2)]));

    wallet.provider().handle("wallet_requestPermissions", |_| Ok(json!([])));
    let response = adapter.request(RpcCall::new("wallet_getPermissions")).await.unwrap();
    assert_eq!(response, WalletResponse::Accounts(vec![]));
}

#[tokio::test(flavor = "multi_thread")]
async fn switch_starknet_chain() {
    let Fixture { wallet, adapter, .. } = Fixture::new(vec![account(1)], KAKAROT_SEPOLIA_ID);

    let err = adapter.request(RpcCall::new("wallet_switchStarknetChain")).await.unwrap_err();
    assert!(matches!(err, ConnectorError::MissingParameters("wallet_switchStarknetChain")));

    let call = RpcCall::with_params("wallet_switchStarknetChain", json!({ "chainId": SN_MAIN }));
    assert_eq!(adapter.request(call).await.unwrap(), WalletResponse::Bool(true));
    assert_eq!(wallet.chain_id(), ETHEREUM_MAINNET_ID);
}

#[tokio::test(flavor = "multi_thread")]
async fn invoke_sends_multicall() {
    let sender = account(0xaa);
    let Fixture { wallet, adapter, .. } = Fixture::new(vec![sender], KAKAROT_SEPOLIA_ID);

    let err = adapter.request(RpcCall::new("wallet_addInvokeTransaction")).await.unwrap_err();
    assert!(matches!(err, ConnectorError::MissingParameters("wallet_addInvokeTransaction")));

    let call = RpcCall::with_params(
        "wallet_addInvokeTransaction",
        json!({
            "calls": [{
                "contract_address": "0xa",
                "entry_point": "transfer",
                "calldata": ["0xb", "0xc"]
            }]
        }),
    );
    assert_eq!(adapter.request(call).await.unwrap(), WalletResponse::TransactionHash(MOCK_TX_HASH));

    let sent = wallet.provider().requests_for("eth_sendTransaction");
    assert_eq!(sent.len(), 1);
    let params = sent[0].clone().unwrap();
    let tx: InvokeTransaction = serde_json::from_value(params[0].clone()).unwrap();
    assert_eq!(tx.from, sender);
    assert_eq!(tx.to, MULTICALL_CAIRO_PRECOMPILE);

    let entries = decode_multicall(&tx.data).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].contract_address, U256::from(0xa));
    assert_eq!(
        entries[0].selector,
        U256::from_be_bytes(get_selector_from_name("transfer").unwrap().to_bytes_be())
    );
    assert_eq!(entries[0].calldata, vec![U256::from(0xb), U256::from(0xc)]);
}

#[tokio::test(flavor = "multi_thread")]
async fn invoke_without_accounts() {
    let Fixture { adapter, .. } = Fixture::new(vec![], KAKAROT_SEPOLIA_ID);
    let call = RpcCall::with_params("wallet_addInvokeTransaction", json!({ "calls": [] }));
    assert!(matches!(adapter.request(call).await, Err(ConnectorError::NoAccounts)));
}

#[tokio::test(flavor = "multi_thread")]
async fn sign_typed_data() {
    let signer = account(0xaa);
    let Fixture { wallet, adapter, .. } = Fixture::new(vec![signer], KAKAROT_SEPOLIA_ID);

    let err = adapter.request(RpcCall::new("wallet_signTypedData")).await.unwrap_err();
    assert!(matches!(err, ConnectorError::MissingParameters("wallet_signTypedData")));

    let typed_data = json!({
        "types": {
            "StarknetDomain": [{ "name": "name", "type": "shortstring" }],
            "Mail": [{ "name": "contents", "type": "shortstring" }]
        },
        "primaryType": "Mail",
        "domain": { "name": "Kakarot" },
        "message": { "contents": "gm" }
    });
    let call = RpcCall::with_params("wallet_signTypedData", typed_data.clone());
    assert_eq!(adapter.request(call).await.unwrap(), WalletResponse::Signature(mock_signature()));

    let provider = wallet.provider();
    assert_eq!(
        provider.requests_for("wallet_requestPermissions"),
        vec![Some(json!([{ "eth_accounts": { "requiredMethods": ["signTypedData_v4"] } }]))]
    );
    assert_eq!(
        provider.requests_for("eth_signTypedData_v4"),
        vec![Some(json!([signer, typed_data]))]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn wallet_errors_pass_through() {
    let Fixture { wallet, adapter, .. } = Fixture::new(vec![account(1)], KAKAROT_SEPOLIA_ID);
    let error = ProviderRpcError::custom(-32603, "internal error");
    wallet.provider().fail("eth_sendTransaction", error.clone());

    let call = RpcCall::with_params("wallet_addInvokeTransaction", json!({ "calls": [] }));
    let err = adapter.request(call).await.unwrap_err();
    assert_eq!(err.as_provider_error(), Some(&error));

    wallet.provider().handle("eth_sendTransaction", |_| Ok(Value::Bool(true)));
    let call = RpcCall::with_params("wallet_addInvokeTransaction", json!({ "calls": [] }));
    let err = adapter.request(call).await.unwrap_err();
    assert!(matches!(err, ConnectorError::InvalidResponse { method: "eth_sendTransaction", .. }));
}
