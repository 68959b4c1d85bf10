//! Faucet contract: one GET per funding request, no retries.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use poolkit_ledger_mock::MockLedger;
use poolkit_types::PublicKey;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::config::NetworkConfig;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FaucetError {
    #[error("faucet unreachable: {0}")]
    Unavailable(String),
    #[error("faucet returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
}

/// Successful funding response; `hash` is present when the faucet reports it.
#[derive(Debug, Clone, PartialEq)]
pub struct FundingReceipt {
    pub hash: Option<String>,
    pub raw: Value,
}

#[async_trait(?Send)]
pub trait FaucetClient {
    async fn fund(&self, account: &PublicKey) -> Result<FundingReceipt, FaucetError>;
}

/// Friendbot-style faucet: `GET <faucet_url>?addr=<G...>`.
pub struct HttpFaucetClient {
    faucet_url: String,
    http: reqwest::Client,
}

impl HttpFaucetClient {
    pub fn new(faucet_url: impl Into<String>, request_timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .unwrap_or_else(|err| {
                warn!(%err, "falling back to default HTTP client; request timeout not applied");
                reqwest::Client::new()
            });
        Self {
            faucet_url: faucet_url.into(),
            http,
        }
    }

    pub fn from_config(config: &NetworkConfig) -> Self {
        Self::new(
            config.faucet_url.clone(),
            Duration::from_millis(config.request_timeout_ms),
        )
    }

    fn request_url(&self, account: &PublicKey) -> String {
        let separator = if self.faucet_url.contains('?') { '&' } else { '?' };
        format!("{}{separator}addr={}", self.faucet_url, account.to_strkey())
    }
}

#[async_trait(?Send)]
impl FaucetClient for HttpFaucetClient {
    async fn fund(&self, account: &PublicKey) -> Result<FundingReceipt, FaucetError> {
        let url = self.request_url(account);
        debug!(%url, "faucet request");
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|err| FaucetError::Unavailable(err.to_string()))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|err| FaucetError::Unavailable(err.to_string()))?;
        if !status.is_success() {
            return Err(FaucetError::Http {
                status: status.as_u16(),
                body,
            });
        }
        let raw = serde_json::from_str::<Value>(&body).unwrap_or(Value::String(body));
        let hash = raw
            .get("hash")
            .and_then(Value::as_str)
            .map(str::to_string);
        Ok(FundingReceipt { hash, raw })
    }
}

/// Faucet backed by a shared `MockLedger`.
#[derive(Clone)]
pub struct MockFaucet {
    ledger: Arc<Mutex<MockLedger>>,
    failure: Arc<Mutex<Option<FaucetError>>>,
    gate: Arc<Mutex<Option<Arc<Notify>>>>,
    calls: Arc<AtomicUsize>,
}

impl MockFaucet {
    pub fn new(ledger: Arc<Mutex<MockLedger>>) -> Self {
        Self {
            ledger,
            failure: Arc::new(Mutex::new(None)),
            gate: Arc::new(Mutex::new(None)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every request fails with `failure` until cleared.
    pub fn set_failure(&self, failure: Option<FaucetError>) {
        if let Ok(mut slot) = self.failure.lock() {
            *slot = failure;
        }
    }

    /// Requests wait for a permit on the returned handle.
    pub fn hold_requests(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        if let Ok(mut slot) = self.gate.lock() {
            *slot = Some(Arc::clone(&notify));
        }
        notify
    }
}

#[async_trait(?Send)]
impl FaucetClient for MockFaucet {
    async fn fund(&self, account: &PublicKey) -> Result<FundingReceipt, FaucetError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.lock().ok().and_then(|slot| slot.clone());
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if let Some(failure) = self.failure.lock().ok().and_then(|slot| slot.clone()) {
            return Err(failure);
        }
        let mut ledger = self
            .ledger
            .lock()
            .map_err(|_| FaucetError::Unavailable("mutex poisoned".to_string()))?;
        match ledger.fund(*account) {
            Ok(hash) => Ok(FundingReceipt {
                hash: Some(hash.to_hex()),
                raw: json!({ "successful": true, "hash": hash.to_hex() }),
            }),
            Err(rejection) => Err(FaucetError::Http {
                status: 400,
                body: rejection.to_string(),
            }),
        }
    }
}
