//! Events emitted by a connector to the application.

use serde::Serialize;
use starknet::core::types::Felt;
use tokio::sync::broadcast;

/// Connector event. `Change` carries partial updates, consumers merge it into their state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ConnectorEvent {
    #[serde(rename_all = "camelCase")]
    Connect { account: Felt, chain_id: Felt },
    Disconnect,
    #[serde(rename_all = "camelCase")]
    Change {
        #[serde(skip_serializing_if = "Option::is_none")]
        account: Option<Felt>,
        #[serde(skip_serializing_if = "Option::is_none")]
        chain_id: Option<Felt>,
    },
}

impl ConnectorEvent {
    /// A `Change` event for a new chain.
    pub const fn chain_changed(chain_id: Felt) -> Self {
        Self::Change { account: None, chain_id: Some(chain_id) }
    }

    /// A `Change` event for a new account.
    pub const fn account_changed(account: Felt) -> Self {
        Self::Change { account: Some(account), chain_id: None }
    }
}

/// Per-connector publish/subscribe channel.
#[derive(Debug)]
pub struct EventChannel {
    sender: broadcast::Sender<ConnectorEvent>,
}

impl EventChannel {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Returns a receiver for all events emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectorEvent> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub(crate) fn emit(&self, event: ConnectorEvent) {
        trace!(?event, "emit");
        // no subscribers is fine
        let _ = self.sender.send(event);
    }
}
