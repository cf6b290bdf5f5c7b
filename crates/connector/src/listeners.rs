//! Process-wide bookkeeping of the listeners connectors register on wallet providers.
//!
//! Injected wallets expose a single event surface that can be shared by several discovered
//! providers, and therefore by several connectors. Registering the same event twice on it would
//! fire every downstream emission twice, so registrations are tracked per provider identity
//! rather than per connector: at most one listener per event kind and provider exists at any
//! time, whichever connector installed it.

use crate::provider::{Eip1193Provider, Listener, ListenerId, ProviderEventKind};
use parking_lot::Mutex;
use std::{
    collections::HashMap,
    sync::{
        Arc, LazyLock, Weak,
        atomic::{AtomicU64, Ordering},
    },
};

/// Identifies a connector owning registrations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AdapterId(u64);

impl AdapterId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Identity of a provider object: the address of its shared allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct ProviderKey(usize);

impl ProviderKey {
    fn of(provider: &Arc<dyn Eip1193Provider>) -> Self {
        Self(Arc::as_ptr(provider).cast::<()>() as usize)
    }
}

#[derive(Debug)]
struct Registration {
    id: ListenerId,
    owner: AdapterId,
}

struct ProviderEntry {
    provider: Weak<dyn Eip1193Provider>,
    adapters: usize,
    registrations: HashMap<ProviderEventKind, Registration>,
}

impl ProviderEntry {
    fn new(provider: &Arc<dyn Eip1193Provider>) -> Self {
        Self { provider: Arc::downgrade(provider), adapters: 0, registrations: HashMap::new() }
    }

    /// An entry whose provider was dropped belongs to a previous allocation at the same address.
    fn is_stale(&self) -> bool {
        self.provider.strong_count() == 0
    }
}

/// Registry of the listeners installed on every wrapped provider.
#[derive(Default)]
pub struct ListenerRegistry {
    entries: Mutex<HashMap<ProviderKey, ProviderEntry>>,
}

static GLOBAL: LazyLock<ListenerRegistry> = LazyLock::new(ListenerRegistry::default);

impl ListenerRegistry {
    /// The registry shared by every connector in the process.
    pub fn global() -> &'static Self {
        &GLOBAL
    }

    /// Records that a connector wraps `provider`.
    pub(crate) fn attach(&self, provider: &Arc<dyn Eip1193Provider>) {
        let mut entries = self.entries.lock();
        let entry = Self::entry(&mut entries, provider);
        entry.adapters += 1;
    }

    /// Removes every listener owned by `owner` and forgets the provider once no connector wraps
    /// it anymore.
    pub(crate) fn detach(&self, provider: &Arc<dyn Eip1193Provider>, owner: AdapterId) {
        let key = ProviderKey::of(provider);
        let mut entries = self.entries.lock();
        let Some(entry) = entries.get_mut(&key) else { return };

        entry.registrations.retain(|kind, registration| {
            if registration.owner == owner {
                provider.remove_listener(*kind, registration.id);
                false
            } else {
                true
            }
        });
        entry.adapters = entry.adapters.saturating_sub(1);
        if entry.adapters == 0 {
            for (kind, registration) in entry.registrations.drain() {
                provider.remove_listener(kind, registration.id);
            }
            entries.remove(&key);
        }
    }

    /// Installs a listener for `kind` unless one is already registered on `provider`.
    ///
    /// Returns `true` if `make_listener` was called and the listener registered.
    pub fn register(
        &self,
        provider: &Arc<dyn Eip1193Provider>,
        kind: ProviderEventKind,
        owner: AdapterId,
        make_listener: impl FnOnce() -> Listener,
    ) -> bool {
        let mut entries = self.entries.lock();
        let entry = Self::entry(&mut entries, provider);
        if entry.registrations.contains_key(&kind) {
            return false;
        }
        let id = provider.on(kind, make_listener());
        trace!(%kind, ?id, ?owner, "registered provider listener");
        entry.registrations.insert(kind, Registration { id, owner });
        true
    }

    /// Removes the listener for `kind`, if any. Returns `true` if one was removed.
    pub fn unregister(&self, provider: &Arc<dyn Eip1193Provider>, kind: ProviderEventKind) -> bool {
        let mut entries = self.entries.lock();
        let Some(entry) = entries.get_mut(&ProviderKey::of(provider)) else { return false };
        if entry.is_stale() {
            return false;
        }
        match entry.registrations.remove(&kind) {
            Some(registration) => {
                provider.remove_listener(kind, registration.id);
                trace!(%kind, id = ?registration.id, "removed provider listener");
                true
            }
            None => false,
        }
    }

    /// Whether a listener for `kind` is registered on `provider`.
    pub fn is_registered(
        &self,
        provider: &Arc<dyn Eip1193Provider>,
        kind: ProviderEventKind,
    ) -> bool {
        self.entries
            .lock()
            .get(&ProviderKey::of(provider))
            .is_some_and(|entry| !entry.is_stale() && entry.registrations.contains_key(&kind))
    }

    /// Number of connectors wrapping `provider`.
    pub fn adapter_count(&self, provider: &Arc<dyn Eip1193Provider>) -> usize {
        self.entries
            .lock()
            .get(&ProviderKey::of(provider))
            .filter(|entry| !entry.is_stale())
            .map_or(0, |entry| entry.adapters)
    }

    fn entry<'a>(
        entries: &'a mut HashMap<ProviderKey, ProviderEntry>,
        provider: &Arc<dyn Eip1193Provider>,
    ) -> &'a mut ProviderEntry {
        let entry = entries
            .entry(ProviderKey::of(provider))
            .or_insert_with(|| ProviderEntry::new(provider));
        if entry.is_stale() {
            *entry = ProviderEntry::new(provider);
        }
        entry
    }
}
