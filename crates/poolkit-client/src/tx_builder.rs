//! TxBuilder: assemble, sign, and encode pool transactions.

use std::time::{SystemTime, UNIX_EPOCH};

use poolkit_crypto::{sign_transaction, Keypair};
use poolkit_types::{
    Amount, LiquidityPoolDescriptor, NetworkId, PoolId, PublicKey, SequenceNumber, TxHash,
    ValidationError,
};
use poolkit_xdr::xdr::{
    self, ChangeTrustOp, LiquidityPoolDepositOp, LiquidityPoolWithdrawOp, Memo, Operation,
    OperationBody, Preconditions, TimeBounds, TimePoint, Transaction, TransactionExt,
    TransactionV1Envelope,
};
use poolkit_xdr::{encode_base64, envelope, muxed_account, ToXdr, TrustLine, XdrError, MAX_OPERATIONS};
use thiserror::Error;
use tracing::debug;

use crate::config::{NetworkConfig, PriceBound, WithdrawMinimums};
use crate::ledger::{LedgerClient, LedgerError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TxBuilderError {
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("transaction has no operations")]
    NoOperations,
    #[error("transaction has {0} operations, more than allowed")]
    TooManyOperations(usize),
    #[error("fee overflow: {base_fee} x {operations}")]
    FeeOverflow { base_fee: u32, operations: usize },
    #[error("account sequence exhausted")]
    SequenceOverflow,
    #[error("account lookup failed: {0}")]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Xdr(#[from] XdrError),
}

/// Signed envelope ready for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub hash: TxHash,
    pub envelope: TransactionV1Envelope,
}

impl SignedTransaction {
    /// Base64 `TransactionEnvelope`, as sent to `sendTransaction`.
    pub fn envelope_xdr(&self) -> Result<String, XdrError> {
        encode_base64(&envelope(self.envelope.clone()))
    }
}

/// Fluent builder for a single-source transaction.
#[derive(Debug, Clone)]
pub struct TxBuilder {
    source: Option<PublicKey>,
    sequence: Option<SequenceNumber>,
    base_fee: u32,
    timeout_secs: u64,
    now: Option<u64>,
    operations: Vec<Operation>,
}

impl TxBuilder {
    pub fn new(config: &NetworkConfig) -> Self {
        Self {
            source: None,
            sequence: None,
            base_fee: config.base_fee,
            timeout_secs: config.tx_timeout_secs,
            now: None,
            operations: Vec::new(),
        }
    }

    /// Sets the source account and its current (last used) sequence number.
    pub fn with_source(mut self, account: PublicKey, current_sequence: SequenceNumber) -> Self {
        self.source = Some(account);
        self.sequence = Some(current_sequence);
        self
    }

    /// Pins the clock used for the upper time bound.
    pub fn at_time(mut self, unix_secs: u64) -> Self {
        self.now = Some(unix_secs);
        self
    }

    /// Appends an operation sourced from the transaction source.
    pub fn add_operation(mut self, body: OperationBody) -> Self {
        self.operations.push(Operation {
            source_account: None,
            body,
        });
        self
    }

    /// Trustline to the pool share asset with the maximum limit.
    pub fn change_trust_pool_share(self, descriptor: &LiquidityPoolDescriptor) -> Self {
        self.add_operation(OperationBody::ChangeTrust(ChangeTrustOp {
            line: TrustLine::PoolShare(descriptor.clone()).to_xdr_value(),
            limit: Amount::MAX.stroops(),
        }))
    }

    pub fn deposit(
        self,
        pool_id: PoolId,
        max_amount_a: Amount,
        max_amount_b: Amount,
        price: PriceBound,
    ) -> Self {
        self.add_operation(OperationBody::LiquidityPoolDeposit(LiquidityPoolDepositOp {
            liquidity_pool_id: pool_id.to_xdr_value(),
            max_amount_a: max_amount_a.stroops(),
            max_amount_b: max_amount_b.stroops(),
            min_price: price.min_price.to_xdr_value(),
            max_price: price.max_price.to_xdr_value(),
        }))
    }

    pub fn withdraw(self, pool_id: PoolId, amount: Amount, minimums: WithdrawMinimums) -> Self {
        self.add_operation(OperationBody::LiquidityPoolWithdraw(LiquidityPoolWithdrawOp {
            liquidity_pool_id: pool_id.to_xdr_value(),
            amount: amount.stroops(),
            min_amount_a: minimums.min_amount_a.stroops(),
            min_amount_b: minimums.min_amount_b.stroops(),
        }))
    }

    pub fn build(self) -> Result<Transaction, TxBuilderError> {
        let source = self.source.ok_or(TxBuilderError::MissingField("source"))?;
        let sequence = self
            .sequence
            .ok_or(TxBuilderError::MissingField("sequence"))?;
        let operations = self.operations.len();
        if operations == 0 {
            return Err(TxBuilderError::NoOperations);
        }
        if operations > MAX_OPERATIONS {
            return Err(TxBuilderError::TooManyOperations(operations));
        }
        let fee = u32::try_from(operations)
            .ok()
            .and_then(|count| self.base_fee.checked_mul(count))
            .ok_or(TxBuilderError::FeeOverflow {
                base_fee: self.base_fee,
                operations,
            })?;
        let seq_num = sequence
            .checked_add(1)
            .ok_or(TxBuilderError::SequenceOverflow)?;
        let now = self.now.unwrap_or_else(unix_now);

        Ok(Transaction {
            source_account: muxed_account(&source),
            fee,
            seq_num: xdr::SequenceNumber(seq_num),
            cond: Preconditions::Time(TimeBounds {
                min_time: TimePoint(0),
                max_time: TimePoint(now.saturating_add(self.timeout_secs)),
            }),
            memo: Memo::None,
            operations: self.operations.try_into().map_err(XdrError::from)?,
            ext: TransactionExt::V0,
        })
    }

    /// Builds and signs with `keypair`, which must own the source account.
    pub fn build_signed(
        self,
        keypair: &Keypair,
        network_id: &NetworkId,
    ) -> Result<SignedTransaction, TxBuilderError> {
        if self.source.is_some_and(|source| source != keypair.public_key()) {
            return Err(TxBuilderError::Validation(ValidationError::Message(
                "signing key does not match transaction source".to_string(),
            )));
        }
        let tx = self.build()?;
        let (hash, envelope) = sign_transaction(keypair, network_id, tx)?;
        Ok(SignedTransaction { hash, envelope })
    }
}

/// Deposit inputs; assets are already in descriptor order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositParams {
    pub descriptor: LiquidityPoolDescriptor,
    pub pool_id: PoolId,
    pub max_amount_a: Amount,
    pub max_amount_b: Amount,
    pub price: PriceBound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawParams {
    pub pool_id: PoolId,
    pub amount: Amount,
    pub minimums: WithdrawMinimums,
}

/// Change trust to the pool share, then deposit both assets.
pub async fn build_deposit<L: LedgerClient + ?Sized>(
    ledger: &L,
    config: &NetworkConfig,
    keypair: &Keypair,
    params: &DepositParams,
) -> Result<SignedTransaction, TxBuilderError> {
    let account = ledger.get_account(&keypair.public_key()).await?;
    debug!(sequence = account.sequence, pool_id = %params.pool_id, "building deposit");
    TxBuilder::new(config)
        .with_source(account.account_id, account.sequence)
        .change_trust_pool_share(&params.descriptor)
        .deposit(
            params.pool_id,
            params.max_amount_a,
            params.max_amount_b,
            params.price,
        )
        .build_signed(keypair, &config.network_id())
}

/// Single withdraw operation.
pub async fn build_withdraw<L: LedgerClient + ?Sized>(
    ledger: &L,
    config: &NetworkConfig,
    keypair: &Keypair,
    params: &WithdrawParams,
) -> Result<SignedTransaction, TxBuilderError> {
    let account = ledger.get_account(&keypair.public_key()).await?;
    debug!(sequence = account.sequence, pool_id = %params.pool_id, "building withdraw");
    TxBuilder::new(config)
        .with_source(account.account_id, account.sequence)
        .withdraw(params.pool_id, params.amount, params.minimums)
        .build_signed(keypair, &config.network_id())
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}
