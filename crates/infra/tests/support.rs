#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;

use facturo_common::testing::SequentialKeyProvider;
use facturo_core::{CredentialStore, SessionListener};
use facturo_domain::{ApiConfig, CredentialPair, Result};
use facturo_infra::storage::SecretVault;
use facturo_infra::{ApiClient, MemoryCredentialStore};
use parking_lot::Mutex;
use serde_json::{json, Value};
use wiremock::MockServer;

/// Memory store that counts writes and clears.
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryCredentialStore,
    sets: AtomicUsize,
    clears: AtomicUsize,
}

impl CountingStore {
    pub fn with_pair(pair: CredentialPair) -> Self {
        Self { inner: MemoryCredentialStore::with_pair(pair), ..Self::default() }
    }

    pub fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    pub fn clears(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

impl CredentialStore for CountingStore {
    fn get(&self) -> CredentialPair {
        self.inner.get()
    }

    fn set(&self, pair: CredentialPair) -> Result<()> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.inner.set(pair)
    }

    fn clear(&self) -> Result<()> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        self.inner.clear()
    }
}

/// Listener recording every re-authentication signal.
#[derive(Default)]
pub struct RecordingListener {
    paths: Mutex<Vec<String>>,
}

impl RecordingListener {
    pub fn signals(&self) -> Vec<String> {
        self.paths.lock().clone()
    }
}

impl SessionListener for RecordingListener {
    fn session_expired(&self, reauth_path: &str) {
        self.paths.lock().push(reauth_path.to_string());
    }
}

/// In-memory keychain shared between store instances.
#[derive(Default)]
pub struct MemoryVault {
    secrets: Mutex<HashMap<String, String>>,
}

impl MemoryVault {
    pub fn secret(&self, key: &str) -> Option<String> {
        self.secrets.lock().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.secrets.lock().len()
    }
}

impl SecretVault for MemoryVault {
    fn get_secret(&self, key: &str) -> Result<Option<String>> {
        Ok(self.secret(key))
    }

    fn set_secret(&self, key: &str, value: &str) -> Result<()> {
        self.secrets.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete_secret(&self, key: &str) -> Result<()> {
        self.secrets.lock().remove(key);
        Ok(())
    }
}

/// Mock backend plus a client wired to observable collaborators.
pub struct Harness {
    pub server: MockServer,
    pub store: Arc<CountingStore>,
    pub listener: Arc<RecordingListener>,
    pub keys: Arc<SequentialKeyProvider>,
    pub client: ApiClient,
}

impl Harness {
    pub async fn start(pair: CredentialPair) -> Self {
        Self::start_with(pair, |_| {}).await
    }

    pub async fn start_with(pair: CredentialPair, tweak: impl FnOnce(&mut ApiConfig)) -> Self {
        init_tracing();
        let server = MockServer::start().await;
        let mut config = ApiConfig::with_base_url(server.uri());
        config.timeout = Duration::from_secs(5);
        tweak(&mut config);

        let store = Arc::new(CountingStore::with_pair(pair));
        let listener = Arc::new(RecordingListener::default());
        let keys = Arc::new(SequentialKeyProvider::new("intent"));

        let client = ApiClient::builder()
            .config(config)
            .credential_store(Arc::clone(&store) as Arc<dyn CredentialStore>)
            .session_listener(Arc::clone(&listener) as Arc<dyn SessionListener>)
            .key_provider(keys.clone())
            .build()
            .expect("api client should build");

        Self { server, store, listener, keys, client }
    }

    /// Requests received on `path`, in arrival order.
    pub async fn requests_to(&self, path: &str) -> Vec<wiremock::Request> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.url.path() == path)
            .collect()
    }
}

/// Backend success envelope.
pub fn envelope(data: Value) -> Value {
    json!({ "success": true, "message": "OK", "data": data })
}

/// Refresh endpoint success body.
pub fn refreshed(access: &str, refresh: &str) -> Value {
    envelope(json!({
        "tokens": { "accessToken": access, "refreshToken": refresh, "expiresIn": 900 }
    }))
}

pub fn header_value<'a>(request: &'a wiremock::Request, name: &str) -> Option<&'a str> {
    request.headers.get(name).and_then(|v| v.to_str().ok())
}

fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
