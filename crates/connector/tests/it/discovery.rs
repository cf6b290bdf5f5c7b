use crate::utils::account;
use kakarot_connector::{
    ConnectorConfig, DiscoveryStore, ProviderStore, chains::KAKAROT_SEPOLIA_ID, kakarot_connectors,
};
use kakarot_test_utils::{MockStarknetFactory, MockWallet};
use similar_asserts::assert_eq;
use std::sync::Arc;

#[test]
fn announcements_are_deduplicated() {
    let store = ProviderStore::new();
    let metamask = MockWallet::new(vec![account(1)], KAKAROT_SEPOLIA_ID);
    let rabby = MockWallet::new(vec![account(2)], KAKAROT_SEPOLIA_ID);

    assert!(store.announce(metamask.detail("b7d6b9c1", "MetaMask")));
    assert!(!store.announce(metamask.detail("b7d6b9c1", "MetaMask")));
    assert!(store.announce(rabby.detail("0c9d2f37", "Rabby")));

    let names: Vec<_> = store.providers().into_iter().map(|detail| detail.info.name).collect();
    assert_eq!(names, vec!["MetaMask", "Rabby"]);

    store.clear();
    assert!(store.providers().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn subscribers_follow_announcements() {
    let store = ProviderStore::new();
    let mut providers = store.subscribe();

    let wallet = MockWallet::new(vec![account(1)], KAKAROT_SEPOLIA_ID);
    store.announce(wallet.detail("b7d6b9c1", "MetaMask"));

    providers.changed().await.unwrap();
    assert_eq!(providers.borrow_and_update().len(), 1);

    // duplicates do not notify
    store.announce(wallet.detail("b7d6b9c1", "MetaMask"));
    assert!(!providers.has_changed().unwrap());
}

#[tokio::test(flavor = "multi_thread")]
async fn one_connector_per_provider() {
    let store = ProviderStore::new();
    let metamask = MockWallet::new(vec![account(1)], KAKAROT_SEPOLIA_ID);
    let rabby = MockWallet::new(vec![account(2)], KAKAROT_SEPOLIA_ID);
    store.announce(metamask.detail("b7d6b9c1", "MetaMask"));
    store.announce(rabby.detail("0c9d2f37", "Rabby"));

    let starknet = Arc::new(MockStarknetFactory::new());
    let connectors = kakarot_connectors(&store, starknet.clone(), &ConnectorConfig::default());
    assert_eq!(connectors.len(), 2);
    assert_eq!(connectors[0].id(), "io.metamask");
    assert_eq!(connectors[0].name(), "MetaMask");
    assert_eq!(connectors[1].id(), "io.rabby");
    assert!(connectors.iter().all(|connector| connector.available()));

    // connectors are a snapshot
    let late = MockWallet::new(vec![account(3)], KAKAROT_SEPOLIA_ID);
    store.announce(late.detail("5e1f0a2b", "Late"));
    assert_eq!(connectors.len(), 2);
    assert_eq!(kakarot_connectors(&store, starknet, &ConnectorConfig::default()).len(), 3);

    let data = connectors[1].connect().await.unwrap();
    assert_eq!(data.account, kakarot_test_utils::starknet_address_of(account(2)));
}
