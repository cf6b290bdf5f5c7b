use crate::utils::{Fixture, account, drain};
use kakarot_connector::{
    ConnectorError, ConnectorEvent, ProviderEvent, ProviderRpcError,
    chains::{ETHEREUM_MAINNET_ID, KAKAROT_SEPOLIA_ID, SN_MAIN, SN_SEPOLIA},
    error::UnknownChain,
};
use serde_json::{Value, json};
use similar_asserts::assert_eq;
use starknet::core::types::Felt;
use std::time::Duration;

fn chain_changed(chain_id: u64) -> ProviderEvent {
    ProviderEvent::ChainChanged(format!("{chain_id:#x}"))
}

#[tokio::test(flavor = "multi_thread")]
async fn chain_ids_are_translated() {
    let Fixture { wallet, adapter, .. } = Fixture::new(vec![account(1)], KAKAROT_SEPOLIA_ID);
    assert_eq!(adapter.get_chain_id().await.unwrap(), SN_SEPOLIA);
    assert_eq!(adapter.evm_chain_id().await.unwrap(), KAKAROT_SEPOLIA_ID);

    wallet.set_chain_id(ETHEREUM_MAINNET_ID);
    assert_eq!(adapter.get_chain_id().await.unwrap(), SN_MAIN);

    wallet.set_chain_id(137);
    let err = adapter.get_chain_id().await.unwrap_err();
    assert!(matches!(err, ConnectorError::UnknownChainId(UnknownChain::Evm(137))));
}

#[tokio::test(flavor = "multi_thread")]
async fn switch_settles_on_wallet_answer() {
    let Fixture { wallet, adapter, .. } = Fixture::new(vec![account(1)], KAKAROT_SEPOLIA_ID);
    adapter.connect().await.unwrap();
    let mut events = adapter.subscribe();

    adapter.switch_chain(SN_MAIN).await.unwrap();
    assert_eq!(wallet.chain_id(), ETHEREUM_MAINNET_ID);
    assert_eq!(
        wallet.provider().requests_for("wallet_switchEthereumChain"),
        vec![Some(json!([{ "chainId": "0x1" }]))]
    );
    assert_eq!(drain(&mut events), vec![ConnectorEvent::chain_changed(SN_MAIN)]);

    // the wallet's own notification for the same switch
    wallet.provider().emit(chain_changed(ETHEREUM_MAINNET_ID)).await;
    assert!(drain(&mut events).is_empty());

    // later changes made in the wallet are reported
    wallet.set_chain_id(KAKAROT_SEPOLIA_ID);
    wallet.provider().emit(chain_changed(KAKAROT_SEPOLIA_ID)).await;
    assert_eq!(drain(&mut events), vec![ConnectorEvent::chain_changed(SN_SEPOLIA)]);
}

#[tokio::test(flavor = "multi_thread")]
async fn switch_settles_on_event_while_wallet_hangs() {
    let Fixture { wallet, adapter, .. } = Fixture::new(vec![account(1)], KAKAROT_SEPOLIA_ID);
    adapter.connect().await.unwrap();
    let mut events = adapter.subscribe();
    wallet.provider().hang("wallet_switchEthereumChain");

    let (switched, ()) = tokio::join!(adapter.switch_chain(SN_MAIN), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        wallet.provider().emit(chain_changed(ETHEREUM_MAINNET_ID)).await;
    });
    switched.unwrap();
    assert_eq!(drain(&mut events), vec![ConnectorEvent::chain_changed(SN_MAIN)]);
}

#[tokio::test(flavor = "multi_thread")]
async fn switch_waits_for_event_if_wallet_answers_early() {
    let Fixture { wallet, adapter, .. } = Fixture::new(vec![account(1)], KAKAROT_SEPOLIA_ID);
    adapter.connect().await.unwrap();
    let mut events = adapter.subscribe();
    // answers without switching yet
    wallet.provider().handle("wallet_switchEthereumChain", |_| Ok(Value::Null));

    let (switched, ()) = tokio::join!(adapter.switch_chain(SN_MAIN), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        wallet.set_chain_id(ETHEREUM_MAINNET_ID);
        wallet.provider().emit(chain_changed(ETHEREUM_MAINNET_ID)).await;
    });
    switched.unwrap();
    assert_eq!(drain(&mut events), vec![ConnectorEvent::chain_changed(SN_MAIN)]);
}

#[tokio::test(flavor = "multi_thread")]
async fn switch_to_unknown_chain() {
    let Fixture { wallet, adapter, .. } = Fixture::new(vec![account(1)], KAKAROT_SEPOLIA_ID);

    let err = adapter.switch_chain(Felt::from(0x1234u64)).await.unwrap_err();
    assert!(matches!(err, ConnectorError::UnknownChainId(UnknownChain::Starknet(_))));
    assert!(wallet.provider().requests_for("wallet_switchEthereumChain").is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn rejected_switch_propagates() {
    let Fixture { wallet, adapter, .. } = Fixture::new(vec![account(1)], KAKAROT_SEPOLIA_ID);
    adapter.connect().await.unwrap();
    let mut events = adapter.subscribe();
    wallet.provider().fail("wallet_switchEthereumChain", ProviderRpcError::user_rejected());

    let err = adapter.switch_chain(SN_MAIN).await.unwrap_err();
    assert!(err.as_provider_error().unwrap().is_user_rejected());
    assert!(drain(&mut events).is_empty());

    // no switch is pending anymore, the change is reported as an external one
    wallet.provider().emit(chain_changed(ETHEREUM_MAINNET_ID)).await;
    assert_eq!(drain(&mut events), vec![ConnectorEvent::chain_changed(SN_MAIN)]);
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_chain_changes_are_ignored() {
    let Fixture { wallet, adapter, .. } = Fixture::new(vec![account(1)], KAKAROT_SEPOLIA_ID);
    adapter.connect().await.unwrap();
    let mut events = adapter.subscribe();

    wallet.provider().emit(chain_changed(137)).await;
    wallet.provider().emit(ProviderEvent::ChainChanged("mainnet".to_string())).await;
    assert!(drain(&mut events).is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn superseded_switch_fails() {
    let Fixture { wallet, adapter, .. } = Fixture::new(vec![account(1)], KAKAROT_SEPOLIA_ID);
    adapter.connect().await.unwrap();
    let mut events = adapter.subscribe();
    // answers without switching
    wallet.provider().handle("wallet_switchEthereumChain", |_| Ok(Value::Null));

    let (first, second) = tokio::join!(adapter.switch_chain(SN_MAIN), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        adapter.switch_chain(SN_SEPOLIA).await
    });
    assert!(matches!(first, Err(ConnectorError::SwitchSuperseded)), "{first:?}");
    second.unwrap();
    assert_eq!(wallet.chain_id(), KAKAROT_SEPOLIA_ID);
    assert_eq!(drain(&mut events), vec![ConnectorEvent::chain_changed(SN_SEPOLIA)]);
}
