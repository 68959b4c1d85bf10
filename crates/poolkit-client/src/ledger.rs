//! Ledger RPC contract: account lookup and transaction submission.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use poolkit_ledger_mock::MockLedger;
use poolkit_types::{PublicKey, SequenceNumber, TxHash};
use poolkit_xdr::xdr::{LedgerEntryData, TransactionV1Envelope};
use poolkit_xdr::{
    account_key, account_sequence, decode_base64, encode_base64, envelope as wire_envelope,
    ResultSummary, XdrError,
};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::config::NetworkConfig;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("ledger unreachable: {0}")]
    Unavailable(String),
    #[error("ledger returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("account {0} not found")]
    AccountNotFound(PublicKey),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("transaction rejected ({status}): {reason}")]
    Rejected {
        status: String,
        reason: String,
        error_result_xdr: Option<String>,
    },
    #[error(transparent)]
    Xdr(#[from] XdrError),
}

impl LedgerError {
    /// The server understood the transaction and refused it.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountInfo {
    pub account_id: PublicKey,
    pub sequence: SequenceNumber,
}

/// Accepted submission. `raw` is the server's response body.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionResult {
    pub hash: TxHash,
    pub status: String,
    pub raw: Value,
}

impl TransactionResult {
    pub fn explorer_url(&self, config: &NetworkConfig) -> String {
        config.explorer_link(&self.hash)
    }
}

#[async_trait(?Send)]
pub trait LedgerClient {
    async fn get_account(&self, account: &PublicKey) -> Result<AccountInfo, LedgerError>;

    async fn send_transaction(
        &self,
        envelope: &TransactionV1Envelope,
    ) -> Result<TransactionResult, LedgerError>;
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct LedgerEntriesResult {
    /// Missing keys come back as an empty list, and some servers send `null`.
    #[serde(default)]
    entries: Option<Vec<LedgerEntryResult>>,
}

#[derive(Debug, Deserialize)]
struct LedgerEntryResult {
    xdr: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendTransactionResult {
    status: String,
    hash: String,
    error_result_xdr: Option<String>,
}

/// JSON-RPC 2.0 client for a Soroban RPC endpoint.
pub struct RpcLedgerClient {
    rpc_url: String,
    http: reqwest::Client,
    next_id: AtomicU64,
}

impl RpcLedgerClient {
    pub fn new(rpc_url: impl Into<String>, request_timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .unwrap_or_else(|err| {
                warn!(%err, "falling back to default HTTP client; request timeout not applied");
                reqwest::Client::new()
            });
        Self {
            rpc_url: rpc_url.into(),
            http,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn from_config(config: &NetworkConfig) -> Self {
        Self::new(
            config.rpc_url.clone(),
            Duration::from_millis(config.request_timeout_ms),
        )
    }

    async fn call(&self, method: &'static str, params: Value) -> Result<Value, LedgerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!(method, id, "rpc request");
        let resp = self
            .http
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|err| LedgerError::Unavailable(err.to_string()))?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|err| LedgerError::Unavailable(err.to_string()))?;
        if !status.is_success() {
            return Err(LedgerError::Http {
                status: status.as_u16(),
                body: text,
            });
        }
        let parsed: RpcResponse =
            serde_json::from_str(&text).map_err(|err| LedgerError::Malformed(err.to_string()))?;
        if let Some(error) = parsed.error {
            return Err(LedgerError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        parsed
            .result
            .ok_or_else(|| LedgerError::Malformed(format!("{method}: missing result")))
    }
}

#[async_trait(?Send)]
impl LedgerClient for RpcLedgerClient {
    async fn get_account(&self, account: &PublicKey) -> Result<AccountInfo, LedgerError> {
        let key = encode_base64(&account_key(account))?;
        let result = self
            .call("getLedgerEntries", json!({ "keys": [key] }))
            .await?;
        let entries: LedgerEntriesResult =
            serde_json::from_value(result).map_err(|err| LedgerError::Malformed(err.to_string()))?;
        let entry = entries
            .entries
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or(LedgerError::AccountNotFound(*account))?;
        let data: LedgerEntryData = decode_base64(&entry.xdr)?;
        let (account_id, sequence) = account_sequence(&data)?;
        if account_id != *account {
            return Err(LedgerError::Malformed(format!(
                "entry for {account_id} returned for {account}"
            )));
        }
        Ok(AccountInfo {
            account_id,
            sequence,
        })
    }

    async fn send_transaction(
        &self,
        envelope: &TransactionV1Envelope,
    ) -> Result<TransactionResult, LedgerError> {
        let transaction = encode_base64(&wire_envelope(envelope.clone()))?;
        let result = self
            .call("sendTransaction", json!({ "transaction": transaction }))
            .await?;
        let sent: SendTransactionResult = serde_json::from_value(result.clone())
            .map_err(|err| LedgerError::Malformed(err.to_string()))?;
        interpret_send_result(sent, result)
    }
}

fn interpret_send_result(
    sent: SendTransactionResult,
    raw: Value,
) -> Result<TransactionResult, LedgerError> {
    match sent.status.as_str() {
        "PENDING" | "DUPLICATE" => {
            let hash = TxHash::from_hex(&sent.hash)
                .map_err(|err| LedgerError::Malformed(err.to_string()))?;
            Ok(TransactionResult {
                hash,
                status: sent.status,
                raw,
            })
        }
        "ERROR" => {
            let reason = sent
                .error_result_xdr
                .as_deref()
                .and_then(|xdr| ResultSummary::from_xdr_base64(xdr).ok())
                .map(|summary| summary.code.name().to_string())
                .unwrap_or_else(|| "transaction failed".to_string());
            warn!(hash = %sent.hash, %reason, "transaction rejected");
            Err(LedgerError::Rejected {
                status: sent.status,
                reason,
                error_result_xdr: sent.error_result_xdr,
            })
        }
        "TRY_AGAIN_LATER" => Err(LedgerError::Rejected {
            status: sent.status,
            reason: "server is busy, try again later".to_string(),
            error_result_xdr: None,
        }),
        other => Err(LedgerError::Malformed(format!(
            "unknown sendTransaction status `{other}`"
        ))),
    }
}

/// In-memory client backed by `MockLedger`, used for tests and offline runs.
#[derive(Clone)]
pub struct MockLedgerClient {
    ledger: Arc<Mutex<MockLedger>>,
    gate: Arc<Mutex<Option<Arc<Notify>>>>,
    unavailable: Arc<Mutex<Option<String>>>,
    calls: Arc<AtomicUsize>,
}

impl MockLedgerClient {
    pub fn new(ledger: MockLedger) -> Self {
        Self::shared(Arc::new(Mutex::new(ledger)))
    }

    /// Shares `ledger` with other mock transports (e.g. [`crate::MockFaucet`]).
    pub fn shared(ledger: Arc<Mutex<MockLedger>>) -> Self {
        Self {
            ledger,
            gate: Arc::new(Mutex::new(None)),
            unavailable: Arc::new(Mutex::new(None)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn ledger(&self) -> Arc<Mutex<MockLedger>> {
        Arc::clone(&self.ledger)
    }

    /// Number of requests received, including failed ones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// While set, every request fails as if the endpoint were unreachable.
    pub fn set_unavailable(&self, reason: Option<&str>) {
        if let Ok(mut slot) = self.unavailable.lock() {
            *slot = reason.map(str::to_string);
        }
    }

    /// Submissions wait for a permit on the returned handle before reaching
    /// the ledger.
    pub fn hold_submissions(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        if let Ok(mut slot) = self.gate.lock() {
            *slot = Some(Arc::clone(&notify));
        }
        notify
    }

    pub fn with_ledger<R>(&self, f: impl FnOnce(&mut MockLedger) -> R) -> Result<R, LedgerError> {
        let mut lock = self
            .ledger
            .lock()
            .map_err(|_| LedgerError::Unavailable("mutex poisoned".to_string()))?;
        Ok(f(&mut lock))
    }

    fn enter(&self) -> Result<(), LedgerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let unavailable = self
            .unavailable
            .lock()
            .map_err(|_| LedgerError::Unavailable("mutex poisoned".to_string()))?;
        match unavailable.as_ref() {
            Some(reason) => Err(LedgerError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }

    fn gate(&self) -> Option<Arc<Notify>> {
        self.gate.lock().ok().and_then(|slot| slot.clone())
    }
}

#[async_trait(?Send)]
impl LedgerClient for MockLedgerClient {
    async fn get_account(&self, account: &PublicKey) -> Result<AccountInfo, LedgerError> {
        self.enter()?;
        let entry = self
            .with_ledger(|ledger| ledger.ledger_entry(&account_key(account)))?
            .ok_or(LedgerError::AccountNotFound(*account))?;
        let (account_id, sequence) = account_sequence(&entry)?;
        Ok(AccountInfo {
            account_id,
            sequence,
        })
    }

    async fn send_transaction(
        &self,
        envelope: &TransactionV1Envelope,
    ) -> Result<TransactionResult, LedgerError> {
        self.enter()?;
        if let Some(gate) = self.gate() {
            gate.notified().await;
        }
        let outcome = self.with_ledger(|ledger| ledger.submit(envelope))?;
        match outcome {
            Ok(submission) => Ok(TransactionResult {
                hash: submission.hash,
                status: submission.status.as_str().to_string(),
                raw: json!({
                    "status": submission.status.as_str(),
                    "hash": submission.hash.to_hex(),
                    "latestLedger": submission.latest_ledger,
                    "latestLedgerCloseTime": submission.latest_ledger_close_time.to_string(),
                }),
            }),
            Err(rejection) => {
                warn!(code = %rejection.code, message = %rejection.message, "mock ledger rejected transaction");
                Err(LedgerError::Rejected {
                    status: "ERROR".to_string(),
                    reason: rejection.to_string(),
                    error_result_xdr: rejection.result_xdr_base64().ok(),
                })
            }
        }
    }
}
