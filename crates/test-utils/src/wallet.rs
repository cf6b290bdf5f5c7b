use alloy_primitives::{Address, B256, Bytes};
use async_trait::async_trait;
use futures::future::{self, BoxFuture, FutureExt};
use kakarot_connector::{
    discovery::{ProviderDetail, ProviderInfo},
    provider::{
        Eip1193Provider, Listener, ListenerId, ProviderEvent, ProviderEventKind, ProviderRpcError,
        RequestArguments,
    },
};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::{
    collections::HashMap,
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

/// Hash returned for every `eth_sendTransaction` of a [`MockWallet`].
pub const MOCK_TX_HASH: B256 = B256::repeat_byte(0x11);

/// Signature returned for every `eth_signTypedData_v4` of a [`MockWallet`].
pub fn mock_signature() -> Bytes {
    Bytes::from(vec![0x22; 65])
}

type Handler =
    Arc<dyn Fn(Option<Value>) -> BoxFuture<'static, Result<Value, ProviderRpcError>> + Send + Sync>;

/// An EIP-1193 provider answering from per-method handlers.
///
/// Methods without a handler fail with the `Unsupported` provider error.
#[derive(Default)]
pub struct MockProvider {
    handlers: Mutex<HashMap<String, Handler>>,
    requests: Mutex<Vec<RequestArguments>>,
    listeners: Mutex<HashMap<ProviderEventKind, Vec<(ListenerId, Listener)>>>,
    next_listener: AtomicU64,
}

impl fmt::Debug for MockProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockProvider")
            .field("methods", &self.handlers.lock().keys().collect::<Vec<_>>())
            .field("requests", &self.requests.lock().len())
            .finish_non_exhaustive()
    }
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers `method` with `handler`, replacing any previous handler.
    pub fn handle<F>(&self, method: &str, handler: F)
    where
        F: Fn(Option<Value>) -> Result<Value, ProviderRpcError> + Send + Sync + 'static,
    {
        let handler: Handler =
            Arc::new(move |params: Option<Value>| future::ready(handler(params)).boxed());
        self.handlers.lock().insert(method.to_string(), handler);
    }

    /// Makes `method` never answer.
    pub fn hang(&self, method: &str) {
        let handler: Handler = Arc::new(|_: Option<Value>| future::pending().boxed());
        self.handlers.lock().insert(method.to_string(), handler);
    }

    /// Makes `method` fail with `error`.
    pub fn fail(&self, method: &str, error: ProviderRpcError) {
        self.handle(method, move |_| Err(error.clone()));
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<RequestArguments> {
        self.requests.lock().clone()
    }

    /// Parameters of every request for `method`.
    pub fn requests_for(&self, method: &str) -> Vec<Option<Value>> {
        self.requests
            .lock()
            .iter()
            .filter(|request| request.method == method)
            .map(|request| request.params.clone())
            .collect()
    }

    /// Number of listeners registered for `kind`.
    pub fn listener_count(&self, kind: ProviderEventKind) -> usize {
        self.listeners.lock().get(&kind).map_or(0, Vec::len)
    }

    /// Delivers `event` to its listeners and waits for all of them.
    pub async fn emit(&self, event: ProviderEvent) {
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .get(&event.kind())
            .map(|listeners| listeners.iter().map(|(_, listener)| listener.clone()).collect())
            .unwrap_or_default();
        trace!(kind = %event.kind(), listeners = listeners.len(), "emitting mock event");
        for listener in listeners {
            listener(event.clone()).await;
        }
    }
}

#[async_trait]
impl Eip1193Provider for MockProvider {
    async fn request(&self, args: RequestArguments) -> Result<Value, ProviderRpcError> {
        self.requests.lock().push(args.clone());
        let handler = self.handlers.lock().get(args.method.as_ref()).cloned();
        match handler {
            Some(handler) => handler(args.params).await,
            None => Err(ProviderRpcError::unsupported()),
        }
    }

    fn on(&self, kind: ProviderEventKind, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().entry(kind).or_default().push((id, listener));
        id
    }

    fn remove_listener(&self, kind: ProviderEventKind, id: ListenerId) {
        if let Some(listeners) = self.listeners.lock().get_mut(&kind) {
            listeners.retain(|(listener, _)| *listener != id);
        }
    }
}

#[derive(Debug)]
struct WalletState {
    accounts: Vec<Address>,
    chain_id: u64,
}

/// A [`MockProvider`] behaving like an unlocked browser wallet.
#[derive(Clone, Debug)]
pub struct MockWallet {
    provider: Arc<MockProvider>,
    state: Arc<Mutex<WalletState>>,
}

impl MockWallet {
    pub fn new(accounts: Vec<Address>, chain_id: u64) -> Self {
        let wallet = Self {
            provider: Arc::new(MockProvider::new()),
            state: Arc::new(Mutex::new(WalletState { accounts, chain_id })),
        };
        wallet.install_handlers();
        wallet
    }

    fn install_handlers(&self) {
        let provider = &self.provider;

        let state = self.state.clone();
        provider.handle("eth_requestAccounts", move |_| Ok(json!(state.lock().accounts)));
        let state = self.state.clone();
        provider.handle("eth_accounts", move |_| Ok(json!(state.lock().accounts)));
        let state = self.state.clone();
        provider.handle("eth_chainId", move |_| Ok(json!(format!("{:#x}", state.lock().chain_id))));

        let state = self.state.clone();
        provider.handle("wallet_switchEthereumChain", move |params| {
            let chain_id = params
                .as_ref()
                .and_then(|params| params[0]["chainId"].as_str())
                .and_then(|chain| u64::from_str_radix(chain.trim_start_matches("0x"), 16).ok())
                .ok_or_else(|| ProviderRpcError::custom(-32602, "invalid chainId"))?;
            state.lock().chain_id = chain_id;
            Ok(Value::Null)
        });

        provider.handle("wallet_revokePermissions", |_| Ok(Value::Null));

        let state = self.state.clone();
        provider.handle("wallet_requestPermissions", move |_| {
            Ok(json!([{
                "parentCapability": "eth_accounts",
                "caveats": [{ "type": "restrictReturnedAccounts", "value": state.lock().accounts }]
            }]))
        });

        provider.handle("eth_sendTransaction", |_| Ok(json!(MOCK_TX_HASH)));
        provider.handle("eth_signTypedData_v4", |_| Ok(json!(mock_signature())));
    }

    pub fn provider(&self) -> &Arc<MockProvider> {
        &self.provider
    }

    /// The provider as handed to a connector.
    pub fn eip1193(&self) -> Arc<dyn Eip1193Provider> {
        self.provider.clone()
    }

    /// An announcement for this wallet.
    pub fn detail(&self, uuid: &str, name: &str) -> ProviderDetail {
        ProviderDetail {
            info: ProviderInfo {
                uuid: uuid.to_string(),
                name: name.to_string(),
                icon: None,
                rdns: format!("io.{}", name.to_lowercase()),
            },
            provider: self.eip1193(),
        }
    }

    pub fn chain_id(&self) -> u64 {
        self.state.lock().chain_id
    }

    pub fn set_chain_id(&self, chain_id: u64) {
        self.state.lock().chain_id = chain_id;
    }

    pub fn set_accounts(&self, accounts: Vec<Address>) {
        self.state.lock().accounts = accounts;
    }
}
