//! The connector: a Starknet wallet facade over an EIP-1193 wallet.
//!
//! A [`ConnectorAdapter`] wraps one discovered provider. It keeps the connection state of the
//! EVM wallet, translates its account and chain into their Starknet counterparts and re-emits
//! wallet events as [`ConnectorEvent`]s.

use crate::{
    chains::ChainRegistry,
    config::ConnectorConfig,
    discovery::ProviderDetail,
    error::ConnectorError,
    events::{ConnectorEvent, EventChannel},
    listeners::{AdapterId, ListenerRegistry},
    provider::{
        Eip1193Provider, Listener, ProviderErrorCode, ProviderEvent, ProviderEventKind,
        ProviderRpcError, RequestArguments,
    },
    starknet_rpc::{ContractCall, StarknetProviderFactory},
};
use alloy_primitives::{Address, U64};
use futures::FutureExt;
use parking_lot::Mutex;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::json;
use starknet::{core::types::Felt, macros::selector};
use std::{fmt, sync::Arc};
use tokio::sync::{broadcast, oneshot};

mod rpc;
pub use rpc::{
    AddInvokeTransactionParameters, InvokeTransaction, Permission, PermissionCaveat, RpcCall,
    SwitchStarknetChainParameters, WalletMethod, WalletResponse,
};

/// Selector of the Kakarot entry point mapping an EVM address to its Starknet account.
const GET_STARKNET_ADDRESS: Felt = selector!("get_starknet_address");

/// Static description of a connector, taken from the provider announcement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorIdentity {
    /// Reverse-DNS id of the wrapped wallet.
    pub id: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// Result of a successful [`ConnectorAdapter::connect`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorData {
    /// Starknet address of the active account.
    pub account: Felt,
    /// Starknet chain id the wallet is on.
    pub chain_id: Felt,
}

/// The active EVM account and the Starknet account it controls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccountPair {
    pub evm_address: Address,
    pub starknet_address: Felt,
}

#[derive(Debug, Default)]
struct ConnectionState {
    connected: bool,
    account: Option<AccountPair>,
}

#[derive(Debug)]
struct PendingSwitch {
    id: u64,
    chain_id: Felt,
    notify: oneshot::Sender<()>,
}

/// Bookkeeping of an in-flight [`ConnectorAdapter::switch_chain`].
#[derive(Debug, Default)]
struct SwitchState {
    pending: Option<PendingSwitch>,
    /// Chain of a switch settled by the request path, whose `chainChanged` echo is still due.
    awaiting_echo: Option<Felt>,
    next_id: u64,
}

/// Which path observed a switched chain first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SwitchSignal {
    Request,
    Event,
}

struct Inner {
    id: AdapterId,
    identity: ConnectorIdentity,
    provider: Option<Arc<dyn Eip1193Provider>>,
    starknet: Arc<dyn StarknetProviderFactory>,
    config: ConnectorConfig,
    events: EventChannel,
    state: Mutex<ConnectionState>,
    switch: Mutex<SwitchState>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(provider) = &self.provider {
            ListenerRegistry::global().detach(provider, self.id);
        }
    }
}

/// Connector exposing an EIP-1193 wallet as a Starknet wallet through Kakarot.
///
/// Cloning is cheap, clones share their state.
#[derive(Clone)]
pub struct ConnectorAdapter {
    inner: Arc<Inner>,
}

impl fmt::Debug for ConnectorAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectorAdapter")
            .field("id", &self.inner.id)
            .field("identity", &self.inner.identity)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

impl ConnectorAdapter {
    /// Wraps an announced provider.
    pub fn new(
        detail: ProviderDetail,
        starknet: Arc<dyn StarknetProviderFactory>,
        config: ConnectorConfig,
    ) -> Self {
        let identity = ConnectorIdentity {
            id: detail.info.rdns,
            display_name: detail.info.name,
            icon: detail.info.icon,
        };
        Self::with_provider(identity, Some(detail.provider), starknet, config)
    }

    /// Creates a connector for `provider`, which may be absent.
    pub fn with_provider(
        identity: ConnectorIdentity,
        provider: Option<Arc<dyn Eip1193Provider>>,
        starknet: Arc<dyn StarknetProviderFactory>,
        config: ConnectorConfig,
    ) -> Self {
        if let Some(provider) = &provider {
            ListenerRegistry::global().attach(provider);
        }
        let events = EventChannel::new(config.event_capacity);
        let inner = Inner {
            id: AdapterId::next(),
            identity,
            provider,
            starknet,
            config,
            events,
            state: Default::default(),
            switch: Default::default(),
        };
        Self { inner: Arc::new(inner) }
    }

    pub fn id(&self) -> &str {
        &self.inner.identity.id
    }

    pub fn name(&self) -> &str {
        &self.inner.identity.display_name
    }

    pub fn icon(&self) -> Option<&str> {
        self.inner.identity.icon.as_deref()
    }

    pub fn identity(&self) -> &ConnectorIdentity {
        &self.inner.identity
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.inner.config
    }

    /// The wrapped provider, if any.
    pub fn provider(&self) -> Option<&Arc<dyn Eip1193Provider>> {
        self.inner.provider.as_ref()
    }

    /// Whether the connector can be used: a provider is present and a user can interact with it.
    pub fn available(&self) -> bool {
        self.inner.provider.is_some() && self.inner.config.interactive
    }

    /// Same as [`Self::available`].
    pub fn ready(&self) -> bool {
        self.available()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.state.lock().connected
    }

    /// The active account, while connected.
    pub fn account(&self) -> Option<AccountPair> {
        self.inner.state.lock().account
    }

    /// Subscribes to the events of this connector.
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectorEvent> {
        self.inner.events.subscribe()
    }

    /// Asks the wallet for its accounts and binds the first one.
    pub async fn connect(&self) -> Result<ConnectorData, ConnectorError> {
        let accounts: Vec<Address> =
            self.call("eth_requestAccounts", RequestArguments::new("eth_requestAccounts")).await?;
        let account = *accounts.first().ok_or(ConnectorError::NoAccounts)?;
        debug!(%account, connector = %self.id(), "wallet connected");
        self.establish(account).await
    }

    /// Disconnects from the wallet.
    ///
    /// Permissions are revoked on a best-effort basis, the `Disconnect` event is always emitted.
    pub async fn disconnect(&self) -> Result<(), ConnectorError> {
        let provider = self.require_provider()?;
        self.arm_disconnected_listeners(provider);

        let revoke = provider.request(RequestArguments::with_params(
            "wallet_revokePermissions",
            json!([{ "eth_accounts": {} }]),
        ));
        let timeout = self.inner.config.revoke_timeout();
        match tokio::time::timeout(timeout, revoke).await {
            Ok(Ok(_)) => trace!("revoked permissions"),
            Ok(Err(err)) => debug!(%err, "failed to revoke permissions"),
            Err(_) => debug!(?timeout, "revoking permissions timed out"),
        }

        self.mark_disconnected();
        Ok(())
    }

    /// Returns the EVM chain id the wallet is on.
    pub async fn evm_chain_id(&self) -> Result<u64, ConnectorError> {
        let id: U64 = self.call("eth_chainId", RequestArguments::new("eth_chainId")).await?;
        Ok(id.to())
    }

    /// Returns the Starknet chain id matching the wallet's EVM chain.
    pub async fn get_chain_id(&self) -> Result<Felt, ConnectorError> {
        let evm_chain_id = self.evm_chain_id().await?;
        ChainRegistry::starknet_chain_id(evm_chain_id)
    }

    /// Returns the accounts the wallet exposes, without prompting.
    pub async fn accounts(&self) -> Result<Vec<Address>, ConnectorError> {
        self.call("eth_accounts", RequestArguments::new("eth_accounts")).await
    }

    /// Resolves the Starknet account controlled by `evm_address` on the current chain.
    pub async fn resolve_starknet_address(
        &self,
        evm_address: Address,
    ) -> Result<Felt, ConnectorError> {
        let chain_id = self.get_chain_id().await?;
        self.resolve_on(chain_id, evm_address).await
    }

    /// Switches the wallet to the EVM chain bridging `chain_id`.
    ///
    /// Completes once the switch is observed, either by reading the chain back after the wallet
    /// answered or through a `chainChanged` event. A single `Change` event is emitted. Fails with
    /// [`ConnectorError::SwitchSuperseded`] if another switch starts before this one settles.
    pub async fn switch_chain(&self, chain_id: Felt) -> Result<(), ConnectorError> {
        let provider = self.require_provider()?;
        let evm_chain_id = ChainRegistry::evm_chain_id(chain_id)?;

        let (notify, mut switched) = oneshot::channel();
        let id = {
            let mut switch = self.inner.switch.lock();
            let id = switch.next_id;
            switch.next_id += 1;
            switch.awaiting_echo = None;
            if switch.pending.replace(PendingSwitch { id, chain_id, notify }).is_some() {
                debug!("superseding pending chain switch");
            }
            id
        };

        debug!(chain_id = %chain_id.to_hex_string(), evm_chain_id, "switching chain");
        let request = async {
            provider
                .request(RequestArguments::with_params(
                    "wallet_switchEthereumChain",
                    json!([{ "chainId": format!("{evm_chain_id:#x}") }]),
                ))
                .await?;
            self.get_chain_id().await
        };

        let current = tokio::select! {
            current = request => current,
            settled = &mut switched => {
                return settled.map_err(|_| ConnectorError::SwitchSuperseded);
            }
        };
        match current {
            Ok(current) if current == chain_id => {
                self.settle_switch(chain_id, SwitchSignal::Request);
                Ok(())
            }
            Ok(current) => {
                debug!(
                    current = %current.to_hex_string(),
                    "wallet answered before switching, waiting for chainChanged"
                );
                switched.await.map_err(|_| ConnectorError::SwitchSuperseded)
            }
            Err(err) => {
                let mut switch = self.inner.switch.lock();
                if switch.pending.as_ref().is_some_and(|pending| pending.id == id) {
                    switch.pending = None;
                }
                Err(err)
            }
        }
    }

    /// Completes the pending switch to `chain_id`. Returns `false` if no such switch is pending.
    fn settle_switch(&self, chain_id: Felt, signal: SwitchSignal) -> bool {
        let pending = {
            let mut switch = self.inner.switch.lock();
            let Some(pending) = switch.pending.take_if(|pending| pending.chain_id == chain_id)
            else {
                return false;
            };
            if signal == SwitchSignal::Request {
                switch.awaiting_echo = Some(chain_id);
            }
            pending
        };
        trace!(?signal, "chain switch settled");
        let _ = pending.notify.send(());
        self.inner.events.emit(ConnectorEvent::chain_changed(chain_id));
        true
    }

    /// Binds `account`, arms the wallet listeners and emits `Connect`.
    async fn establish(&self, account: Address) -> Result<ConnectorData, ConnectorError> {
        let provider = self.require_provider()?;
        self.arm_connected_listeners(provider);

        let chain_id = self.get_chain_id().await?;
        let starknet_address = self.resolve_on(chain_id, account).await?;
        {
            let mut state = self.inner.state.lock();
            state.connected = true;
            state.account = Some(AccountPair { evm_address: account, starknet_address });
        }
        self.inner.events.emit(ConnectorEvent::Connect { account: starknet_address, chain_id });
        Ok(ConnectorData { account: starknet_address, chain_id })
    }

    fn mark_disconnected(&self) {
        *self.inner.state.lock() = ConnectionState::default();
        self.inner.events.emit(ConnectorEvent::Disconnect);
    }

    async fn resolve_on(
        &self,
        chain_id: Felt,
        evm_address: Address,
    ) -> Result<Felt, ConnectorError> {
        let chain = ChainRegistry::starknet_chain(chain_id)
            .ok_or(ConnectorError::unknown_starknet_chain(chain_id))?;
        let Some(provider) = self.inner.starknet.provider(chain) else {
            warn!(chain = chain.name, "no starknet provider available");
            return Err(ConnectorError::AddressResolution(evm_address.to_checksum(None)));
        };

        let call = ContractCall {
            contract_address: self.inner.config.kakarot_address,
            entry_point_selector: GET_STARKNET_ADDRESS,
            calldata: vec![Felt::from_bytes_be_slice(evm_address.as_slice())],
        };
        let starknet_address = provider
            .call_contract(call)
            .await?
            .first()
            .copied()
            .ok_or_else(|| ConnectorError::AddressResolution(evm_address.to_checksum(None)))?;
        debug!(
            %evm_address,
            starknet_address = %starknet_address.to_hex_string(),
            "resolved starknet address"
        );
        Ok(starknet_address)
    }

    /// Sends `args` to the wallet and decodes the response.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &'static str,
        args: RequestArguments,
    ) -> Result<T, ConnectorError> {
        let provider = self.require_provider()?;
        let value = provider.request(args).await?;
        serde_json::from_value(value)
            .map_err(|source| ConnectorError::InvalidResponse { method, source })
    }

    /// The wrapped provider. Without user interaction the connector is inert and has none.
    fn require_provider(&self) -> Result<&Arc<dyn Eip1193Provider>, ConnectorError> {
        self.inner
            .provider
            .as_ref()
            .filter(|_| self.inner.config.interactive)
            .ok_or(ConnectorError::ProviderNotFound)
    }

    fn arm_connected_listeners(&self, provider: &Arc<dyn Eip1193Provider>) {
        let registry = ListenerRegistry::global();
        registry.unregister(provider, ProviderEventKind::Connect);
        for kind in [
            ProviderEventKind::AccountsChanged,
            ProviderEventKind::ChainChanged,
            ProviderEventKind::Disconnect,
        ] {
            registry.register(provider, kind, self.inner.id, || self.listener());
        }
    }

    fn arm_disconnected_listeners(&self, provider: &Arc<dyn Eip1193Provider>) {
        let registry = ListenerRegistry::global();
        registry.unregister(provider, ProviderEventKind::ChainChanged);
        registry.unregister(provider, ProviderEventKind::Disconnect);
        registry.register(provider, ProviderEventKind::Connect, self.inner.id, || self.listener());
    }

    /// A provider listener that forwards events to this connector while it is alive.
    fn listener(&self) -> Listener {
        let inner = Arc::downgrade(&self.inner);
        Arc::new(move |event: ProviderEvent| {
            let inner = inner.clone();
            async move {
                let Some(inner) = inner.upgrade() else { return };
                Self { inner }.handle_event(event).await;
            }
            .boxed()
        })
    }

    async fn handle_event(&self, event: ProviderEvent) {
        trace!(kind = %event.kind(), connector = %self.id(), "provider event");
        match event {
            ProviderEvent::AccountsChanged(accounts) => self.on_accounts_changed(accounts).await,
            ProviderEvent::ChainChanged(chain) => self.on_chain_changed(&chain),
            ProviderEvent::Connect(_) => self.on_connect().await,
            ProviderEvent::Disconnect(error) => self.on_disconnect(error).await,
        }
    }

    async fn on_accounts_changed(&self, accounts: Vec<Address>) {
        let Some(&account) = accounts.first() else {
            self.on_disconnect(None).await;
            return;
        };

        if !self.is_connected() {
            // connected from the wallet UI
            self.on_connect().await;
            return;
        }

        match self.resolve_starknet_address(account).await {
            Ok(starknet_address) => {
                self.inner.state.lock().account =
                    Some(AccountPair { evm_address: account, starknet_address });
                self.inner.events.emit(ConnectorEvent::account_changed(starknet_address));
            }
            Err(err) => warn!(%err, %account, "failed to resolve changed account"),
        }
    }

    fn on_chain_changed(&self, chain: &str) {
        let chain_id = match parse_chain_id(chain).and_then(ChainRegistry::starknet_chain_id) {
            Ok(chain_id) => chain_id,
            Err(err) => {
                warn!(%err, chain, "ignoring chain change");
                return;
            }
        };

        if self.settle_switch(chain_id, SwitchSignal::Event) {
            return;
        }
        {
            let mut switch = self.inner.switch.lock();
            if switch.awaiting_echo.take() == Some(chain_id) {
                trace!("chain change already reported");
                return;
            }
        }
        self.inner.events.emit(ConnectorEvent::chain_changed(chain_id));
    }

    async fn on_connect(&self) {
        let accounts = match self.accounts().await {
            Ok(accounts) => accounts,
            Err(err) => {
                debug!(%err, "failed to read accounts on connect");
                return;
            }
        };
        let Some(&account) = accounts.first() else { return };
        if let Err(err) = self.establish(account).await {
            warn!(%err, %account, "failed to reconnect");
        }
    }

    async fn on_disconnect(&self, error: Option<ProviderRpcError>) {
        // the wallet is reconnecting and still exposes accounts
        if error.as_ref().and_then(ProviderRpcError::error_code)
            == Some(ProviderErrorCode::TryAgainLater)
            && self.accounts().await.is_ok_and(|accounts| !accounts.is_empty())
        {
            debug!("ignoring transient disconnect");
            return;
        }

        if let Some(provider) = self.provider() {
            self.arm_disconnected_listeners(provider);
        }
        self.mark_disconnected();
    }
}

/// Parses a hex (or decimal) EVM chain id as carried by `chainChanged`.
fn parse_chain_id(chain: &str) -> Result<u64, ConnectorError> {
    let parsed = match chain.strip_prefix("0x").or_else(|| chain.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => chain.parse(),
    };
    parsed.map_err(|_| ConnectorError::InvalidChainId(chain.to_string()))
}
