//! MockLedger: in-memory ledger with envelope validation, sequence tracking,
//! and constant-product pool accounting.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use poolkit_crypto::{derive_pool_id, network_id, verify_source_signature, TESTNET_PASSPHRASE};
use poolkit_types::{
    Amount, Asset, LiquidityPoolDescriptor, NetworkId, PoolId, PublicKey, SequenceNumber, TxHash,
};
use poolkit_xdr::xdr::{
    ChangeTrustOp, LedgerEntryData, LedgerKey, LiquidityPoolDepositOp, LiquidityPoolWithdrawOp,
    OperationBody, TransactionEnvelope, TransactionV1Envelope,
};
use poolkit_xdr::{
    account_entry, decode_base64, muxed_account_key, operation_name, time_bounds, v1_envelope,
    FromXdr, ResultSummary, TransactionResultCode, TrustLine, XdrError,
};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Friendbot grants 10,000 lumens to new accounts.
pub const FRIENDBOT_STARTING_BALANCE: Amount = Amount::from_stroops(10_000 * Amount::ONE);
pub const DEFAULT_BASE_FEE: u32 = 100;

/// Transaction refused by the ledger, with the protocol result code.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct Rejection {
    pub code: TransactionResultCode,
    pub message: String,
    pub fee_charged: i64,
}

impl Rejection {
    /// Base64 `TransactionResult`, as carried in `errorResultXdr`.
    pub fn result_xdr_base64(&self) -> Result<String, XdrError> {
        ResultSummary::new(self.fee_charged, self.code).to_xdr_base64()
    }
}

fn reject(code: TransactionResultCode, message: impl Into<String>) -> Rejection {
    Rejection {
        code,
        message: message.into(),
        fee_charged: 0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitStatus {
    Pending,
    Duplicate,
}

impl SubmitStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Duplicate => "DUPLICATE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub hash: TxHash,
    pub status: SubmitStatus,
    pub latest_ledger: u32,
    pub latest_ledger_close_time: u64,
}

/// Account fields the mock tracks; served as an `AccountEntry`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountState {
    pub balance: Amount,
    pub seq_num: SequenceNumber,
    pub num_sub_entries: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolState {
    pub descriptor: LiquidityPoolDescriptor,
    pub reserve_a: i64,
    pub reserve_b: i64,
    pub total_shares: i64,
    pub trustlines: u32,
}

impl PoolState {
    fn new(descriptor: LiquidityPoolDescriptor) -> Self {
        Self {
            descriptor,
            reserve_a: 0,
            reserve_b: 0,
            total_shares: 0,
            trustlines: 0,
        }
    }
}

/// Everything an operation may touch. Cloned before applying a transaction
/// so a failing operation leaves no partial effects.
#[derive(Debug, Clone, Default)]
struct LedgerState {
    accounts: HashMap<PublicKey, AccountState>,
    trustlines: HashMap<(PublicKey, Asset), i64>,
    pool_shares: HashMap<(PublicKey, PoolId), i64>,
    pools: HashMap<PoolId, PoolState>,
}

#[derive(Debug, Clone)]
pub struct MockLedger {
    network_id: NetworkId,
    base_fee: u32,
    state: LedgerState,
    applied: HashMap<TxHash, u32>,
    ledger_seq: u32,
    close_time: u64,
}

impl MockLedger {
    pub fn new(network_id: NetworkId) -> Self {
        Self {
            network_id,
            base_fee: DEFAULT_BASE_FEE,
            state: LedgerState::default(),
            applied: HashMap::new(),
            ledger_seq: 2,
            close_time: unix_now(),
        }
    }

    pub fn testnet() -> Self {
        Self::new(network_id(TESTNET_PASSPHRASE))
    }

    pub fn network_id(&self) -> NetworkId {
        self.network_id
    }

    pub fn latest_ledger(&self) -> u32 {
        self.ledger_seq
    }

    pub fn close_time(&self) -> u64 {
        self.close_time
    }

    /// Sets the close time used for time-bound checks.
    pub fn set_clock(&mut self, unix_secs: u64) {
        self.close_time = unix_secs;
    }

    pub fn advance_clock(&mut self, secs: u64) {
        self.close_time = self.close_time.saturating_add(secs);
    }

    pub fn account(&self, account: &PublicKey) -> Option<&AccountState> {
        self.state.accounts.get(account)
    }

    /// Entry for a `getLedgerEntries` key; only account keys are served.
    pub fn ledger_entry(&self, key: &LedgerKey) -> Option<LedgerEntryData> {
        let LedgerKey::Account(key) = key else {
            return None;
        };
        let account = PublicKey::from_xdr_value(&key.account_id).ok()?;
        self.state.accounts.get(&account).map(|state| {
            account_entry(&account, state.balance, state.seq_num, state.num_sub_entries)
        })
    }

    pub fn pool(&self, pool_id: &PoolId) -> Option<&PoolState> {
        self.state.pools.get(pool_id)
    }

    pub fn pool_shares(&self, account: &PublicKey, pool_id: &PoolId) -> Option<i64> {
        self.state.pool_shares.get(&(*account, *pool_id)).copied()
    }

    pub fn is_applied(&self, hash: &TxHash) -> bool {
        self.applied.contains_key(hash)
    }

    /// Creates `account` with the friendbot starting balance. Funding an
    /// existing account is refused, matching the public faucet.
    pub fn fund(&mut self, account: PublicKey) -> Result<TxHash, Rejection> {
        if self.state.accounts.contains_key(&account) {
            return Err(reject(
                TransactionResultCode::Failed,
                "create_account: already exists",
            ));
        }
        let seq_num = i64::from(self.ledger_seq) << 32;
        self.state.accounts.insert(
            account,
            AccountState {
                balance: FRIENDBOT_STARTING_BALANCE,
                seq_num,
                num_sub_entries: 0,
            },
        );
        let mut hasher = Sha256::new();
        hasher.update(b"friendbot");
        hasher.update(account.as_bytes());
        hasher.update(self.ledger_seq.to_be_bytes());
        let hash = TxHash::new(hasher.finalize().into());
        self.close_ledger(hash);
        Ok(hash)
    }

    pub fn submit_base64(&mut self, envelope_xdr: &str) -> Result<Submission, Rejection> {
        let envelope = decode_base64::<TransactionEnvelope>(envelope_xdr)
            .map_err(|err| reject(TransactionResultCode::Malformed, err.to_string()))?;
        let envelope = v1_envelope(envelope)
            .map_err(|err| reject(TransactionResultCode::NotSupported, err.to_string()))?;
        self.submit(&envelope)
    }

    /// Validates and applies one envelope atomically.
    pub fn submit(&mut self, envelope: &TransactionV1Envelope) -> Result<Submission, Rejection> {
        let tx = &envelope.tx;
        let source = muxed_account_key(&tx.source_account);
        let hash = verify_source_signature(&self.network_id, envelope);

        if let Ok(hash) = hash.as_ref() {
            if self.applied.contains_key(hash) {
                return Ok(self.submission(*hash, SubmitStatus::Duplicate));
            }
        }

        let fee = i64::from(tx.fee);
        let tx_reject = |code: TransactionResultCode, message: &str| Rejection {
            code,
            message: message.to_string(),
            fee_charged: fee,
        };

        if tx.operations.is_empty() {
            return Err(tx_reject(
                TransactionResultCode::MissingOperation,
                "transaction has no operations",
            ));
        }
        let account = self
            .state
            .accounts
            .get(&source)
            .ok_or_else(|| tx_reject(TransactionResultCode::NoAccount, "source account not found"))?;
        let min_fee = u64::from(self.base_fee) * tx.operations.len() as u64;
        if u64::from(tx.fee) < min_fee {
            return Err(tx_reject(
                TransactionResultCode::InsufficientFee,
                "fee below base fee times operation count",
            ));
        }
        if let Some(bounds) = time_bounds(&tx.cond) {
            let (min_time, max_time) = (bounds.min_time.0, bounds.max_time.0);
            if min_time > self.close_time {
                return Err(tx_reject(TransactionResultCode::TooEarly, "before min time"));
            }
            if max_time != 0 && self.close_time > max_time {
                return Err(tx_reject(TransactionResultCode::TooLate, "after max time"));
            }
        }
        if tx.seq_num.0 != account.seq_num + 1 {
            return Err(tx_reject(
                TransactionResultCode::BadSeq,
                "sequence number does not follow account sequence",
            ));
        }
        let hash = hash.map_err(|_| {
            tx_reject(TransactionResultCode::BadAuth, "missing or invalid source signature")
        })?;
        if account.balance.stroops() < fee {
            return Err(tx_reject(
                TransactionResultCode::InsufficientBalance,
                "balance does not cover fee",
            ));
        }

        let mut staged = self.state.clone();
        for op in tx.operations.iter() {
            if op
                .source_account
                .as_ref()
                .is_some_and(|muxed| muxed_account_key(muxed) != source)
            {
                return Err(tx_reject(
                    TransactionResultCode::NotSupported,
                    "operation source accounts are not supported",
                ));
            }
            staged.apply(source, &op.body).map_err(|reason| {
                tx_reject(
                    TransactionResultCode::Failed,
                    &format!("{}: {reason}", operation_name(&op.body)),
                )
            })?;
        }
        if let Some(entry) = staged.accounts.get_mut(&source) {
            entry.balance = Amount::from_stroops(entry.balance.stroops() - fee);
            entry.seq_num = tx.seq_num.0;
        }
        self.state = staged;
        self.close_ledger(hash);
        Ok(self.submission(hash, SubmitStatus::Pending))
    }

    fn close_ledger(&mut self, hash: TxHash) {
        self.applied.insert(hash, self.ledger_seq);
        self.ledger_seq += 1;
    }

    fn submission(&self, hash: TxHash, status: SubmitStatus) -> Submission {
        Submission {
            hash,
            status,
            latest_ledger: self.ledger_seq,
            latest_ledger_close_time: self.close_time,
        }
    }
}

impl LedgerState {
    fn apply(&mut self, source: PublicKey, body: &OperationBody) -> Result<(), &'static str> {
        match body {
            OperationBody::ChangeTrust(op) => self.change_trust(source, op),
            OperationBody::LiquidityPoolDeposit(op) => self.deposit(source, op),
            OperationBody::LiquidityPoolWithdraw(op) => self.withdraw(source, op),
            _ => Err("not supported"),
        }
    }

    fn change_trust(&mut self, source: PublicKey, op: &ChangeTrustOp) -> Result<(), &'static str> {
        if op.limit < 0 {
            return Err("malformed");
        }
        match TrustLine::from_xdr_value(&op.line).map_err(|_| "malformed")? {
            TrustLine::Asset(asset) => {
                match &asset {
                    Asset::Native => return Err("malformed"),
                    Asset::Credit { issuer, .. } if *issuer == source => {
                        return Err("self not allowed")
                    }
                    Asset::Credit { .. } => {}
                }
                let key = (source, asset);
                if op.limit == 0 {
                    return match self.trustlines.get(&key).copied() {
                        Some(0) => {
                            self.trustlines.remove(&key);
                            self.adjust_sub_entries(source, -1);
                            Ok(())
                        }
                        Some(_) => Err("invalid limit"),
                        None => Ok(()),
                    };
                }
                if !self.trustlines.contains_key(&key) {
                    self.trustlines.insert(key, 0);
                    self.adjust_sub_entries(source, 1);
                }
                Ok(())
            }
            TrustLine::PoolShare(descriptor) => {
                let pool_id = derive_pool_id(&descriptor).map_err(|_| "malformed")?;
                let key = (source, pool_id);
                if op.limit == 0 {
                    return match self.pool_shares.get(&key).copied() {
                        Some(0) => {
                            self.pool_shares.remove(&key);
                            self.adjust_sub_entries(source, -2);
                            if let Some(pool) = self.pools.get_mut(&pool_id) {
                                pool.trustlines = pool.trustlines.saturating_sub(1);
                            }
                            Ok(())
                        }
                        Some(_) => Err("cannot remove trustline with outstanding shares"),
                        None => Ok(()),
                    };
                }
                if self.pool_shares.contains_key(&key) {
                    return Ok(());
                }
                for asset in [descriptor.asset_a(), descriptor.asset_b()] {
                    if !self.can_hold(source, asset) {
                        return Err("trust line missing");
                    }
                }
                self.pool_shares.insert(key, 0);
                self.adjust_sub_entries(source, 2);
                self.pools
                    .entry(pool_id)
                    .or_insert_with(|| PoolState::new(descriptor))
                    .trustlines += 1;
                Ok(())
            }
        }
    }

    fn deposit(&mut self, source: PublicKey, op: &LiquidityPoolDepositOp) -> Result<(), &'static str> {
        let (max_a, max_b) = (op.max_amount_a, op.max_amount_b);
        if max_a <= 0 || max_b <= 0 {
            return Err("malformed");
        }
        let pool_id = PoolId::from_xdr_value(&op.liquidity_pool_id).map_err(|_| "malformed")?;
        let key = (source, pool_id);
        if !self.pool_shares.contains_key(&key) {
            return Err("no trust");
        }
        let pool = self.pools.get(&pool_id).ok_or("no trust")?;
        let (reserve_a, reserve_b, total) = (
            i128::from(pool.reserve_a),
            i128::from(pool.reserve_b),
            i128::from(pool.total_shares),
        );
        let (deposit_a, deposit_b, minted) = if total == 0 {
            let (a, b) = (i128::from(max_a), i128::from(max_b));
            (a, b, isqrt(a * b))
        } else {
            let minted = (i128::from(max_a) * total / reserve_a).min(i128::from(max_b) * total / reserve_b);
            (
                ceil_div(minted * reserve_a, total),
                ceil_div(minted * reserve_b, total),
                minted,
            )
        };
        if minted <= 0 {
            return Err("deposit too small");
        }
        let to_i64 = |value: i128| i64::try_from(value).map_err(|_| "line full");
        let (deposit_a, deposit_b, minted) = (to_i64(deposit_a)?, to_i64(deposit_b)?, to_i64(minted)?);
        let (asset_a, asset_b) = (pool.descriptor.asset_a().clone(), pool.descriptor.asset_b().clone());

        self.debit(source, &asset_a, deposit_a)?;
        self.debit(source, &asset_b, deposit_b)?;
        let pool = self.pools.get_mut(&pool_id).ok_or("no trust")?;
        pool.reserve_a = pool.reserve_a.checked_add(deposit_a).ok_or("pool full")?;
        pool.reserve_b = pool.reserve_b.checked_add(deposit_b).ok_or("pool full")?;
        pool.total_shares = pool.total_shares.checked_add(minted).ok_or("pool full")?;
        if let Some(shares) = self.pool_shares.get_mut(&key) {
            *shares += minted;
        }
        Ok(())
    }

    fn withdraw(&mut self, source: PublicKey, op: &LiquidityPoolWithdrawOp) -> Result<(), &'static str> {
        let amount = op.amount;
        if amount <= 0 || op.min_amount_a < 0 || op.min_amount_b < 0 {
            return Err("malformed");
        }
        let pool_id = PoolId::from_xdr_value(&op.liquidity_pool_id).map_err(|_| "malformed")?;
        let key = (source, pool_id);
        let held = *self.pool_shares.get(&key).ok_or("no trust")?;
        if held < amount {
            return Err("underfunded");
        }
        let pool = self.pools.get(&pool_id).ok_or("no trust")?;
        let total = i128::from(pool.total_shares);
        let out_a = i128::from(amount) * i128::from(pool.reserve_a) / total;
        let out_b = i128::from(amount) * i128::from(pool.reserve_b) / total;
        // Both fit in i64: amount <= total, so out <= reserve.
        let (out_a, out_b) = (out_a as i64, out_b as i64);
        if out_a < op.min_amount_a || out_b < op.min_amount_b {
            return Err("under minimum");
        }
        let (asset_a, asset_b) = (pool.descriptor.asset_a().clone(), pool.descriptor.asset_b().clone());

        self.credit(source, &asset_a, out_a)?;
        self.credit(source, &asset_b, out_b)?;
        let pool = self.pools.get_mut(&pool_id).ok_or("no trust")?;
        pool.reserve_a -= out_a;
        pool.reserve_b -= out_b;
        pool.total_shares -= amount;
        if let Some(shares) = self.pool_shares.get_mut(&key) {
            *shares -= amount;
        }
        Ok(())
    }

    fn can_hold(&self, account: PublicKey, asset: &Asset) -> bool {
        match asset {
            Asset::Native => true,
            Asset::Credit { issuer, .. } => {
                *issuer == account || self.trustlines.contains_key(&(account, asset.clone()))
            }
        }
    }

    /// Issuers hold an unlimited supply of their own asset.
    fn debit(&mut self, account: PublicKey, asset: &Asset, amount: i64) -> Result<(), &'static str> {
        match asset {
            Asset::Native => {
                let entry = self.accounts.get_mut(&account).ok_or("no account")?;
                if entry.balance.stroops() < amount {
                    return Err("underfunded");
                }
                entry.balance = Amount::from_stroops(entry.balance.stroops() - amount);
                Ok(())
            }
            Asset::Credit { issuer, .. } if *issuer == account => Ok(()),
            Asset::Credit { .. } => {
                let balance = self
                    .trustlines
                    .get_mut(&(account, asset.clone()))
                    .ok_or("no trust")?;
                if *balance < amount {
                    return Err("underfunded");
                }
                *balance -= amount;
                Ok(())
            }
        }
    }

    fn credit(&mut self, account: PublicKey, asset: &Asset, amount: i64) -> Result<(), &'static str> {
        match asset {
            Asset::Native => {
                let entry = self.accounts.get_mut(&account).ok_or("no account")?;
                let balance = entry.balance.stroops().checked_add(amount).ok_or("line full")?;
                entry.balance = Amount::from_stroops(balance);
                Ok(())
            }
            Asset::Credit { issuer, .. } if *issuer == account => Ok(()),
            Asset::Credit { .. } => {
                let balance = self
                    .trustlines
                    .get_mut(&(account, asset.clone()))
                    .ok_or("no trust")?;
                *balance = balance.checked_add(amount).ok_or("line full")?;
                Ok(())
            }
        }
    }

    fn adjust_sub_entries(&mut self, account: PublicKey, delta: i64) {
        if let Some(entry) = self.accounts.get_mut(&account) {
            entry.num_sub_entries = (i64::from(entry.num_sub_entries) + delta).max(0) as u32;
        }
    }
}

fn isqrt(n: i128) -> i128 {
    if n < 2 {
        return n.max(0);
    }
    let mut x = n;
    let mut y = (x + 1) / 2;
    while y < x {
        x = y;
        y = (x + n / x) / 2;
    }
    x
}

fn ceil_div(n: i128, d: i128) -> i128 {
    (n + d - 1) / d
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}
