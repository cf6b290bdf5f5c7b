//! Builds one connector per discovered wallet.

use crate::{
    adapter::ConnectorAdapter, config::ConnectorConfig, discovery::DiscoveryStore,
    starknet_rpc::StarknetProviderFactory,
};
use std::sync::Arc;

/// Returns a connector for every provider announced so far.
///
/// The list is a snapshot: providers announced afterwards are not picked up, call this again
/// (for instance when [`DiscoveryStore::subscribe`] reports a change) to include them.
pub fn kakarot_connectors(
    discovery: &dyn DiscoveryStore,
    starknet: Arc<dyn StarknetProviderFactory>,
    config: &ConnectorConfig,
) -> Vec<ConnectorAdapter> {
    let providers = discovery.providers();
    debug!(providers = providers.len(), "creating kakarot connectors");
    providers
        .into_iter()
        .map(|detail| ConnectorAdapter::new(detail, Arc::clone(&starknet), config.clone()))
        .collect()
}
