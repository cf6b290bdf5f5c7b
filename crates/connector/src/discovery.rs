//! [EIP-6963](https://eips.ethereum.org/EIPS/eip-6963) style provider discovery.
//!
//! Wallets announce themselves with a [`ProviderDetail`]. The store keeps one entry per
//! announcement `uuid` and lets consumers take a snapshot or follow later announcements.

use crate::provider::Eip1193Provider;
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};
use tokio::sync::watch;

/// Metadata announced by a wallet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
    /// Unique per announcement, used for de-duplication.
    pub uuid: String,
    /// Human readable wallet name.
    pub name: String,
    /// Icon as a data URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Reverse-DNS identifier of the wallet, e.g. `io.metamask`.
    pub rdns: String,
}

/// An announced wallet: its metadata and the provider to talk to it.
#[derive(Clone)]
pub struct ProviderDetail {
    pub info: ProviderInfo,
    pub provider: Arc<dyn Eip1193Provider>,
}

impl fmt::Debug for ProviderDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderDetail").field("info", &self.info).finish_non_exhaustive()
    }
}

/// Source of announced providers.
pub trait DiscoveryStore: Send + Sync {
    /// Returns the providers announced so far.
    fn providers(&self) -> Vec<ProviderDetail>;

    /// Follows the list of announced providers.
    fn subscribe(&self) -> watch::Receiver<Vec<ProviderDetail>>;
}

/// In-memory [`DiscoveryStore`] fed by [`ProviderStore::announce`].
#[derive(Debug)]
pub struct ProviderStore {
    providers: watch::Sender<Vec<ProviderDetail>>,
}

impl Default for ProviderStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderStore {
    pub fn new() -> Self {
        Self { providers: watch::Sender::new(Vec::new()) }
    }

    /// Records an announcement. Returns `false` if its `uuid` was already announced.
    pub fn announce(&self, detail: ProviderDetail) -> bool {
        self.providers.send_if_modified(|providers| {
            if providers.iter().any(|known| known.info.uuid == detail.info.uuid) {
                trace!(uuid = %detail.info.uuid, "ignoring duplicate announcement");
                return false;
            }
            debug!(name = %detail.info.name, rdns = %detail.info.rdns, "provider announced");
            providers.push(detail);
            true
        })
    }

    /// Forgets every announced provider.
    pub fn clear(&self) {
        self.providers.send_if_modified(|providers| {
            let modified = !providers.is_empty();
            providers.clear();
            modified
        });
    }
}

impl DiscoveryStore for ProviderStore {
    fn providers(&self) -> Vec<ProviderDetail> {
        self.providers.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Vec<ProviderDetail>> {
        self.providers.subscribe()
    }
}
