//! WorkflowController: keypair, faucet funding, pool deposit, pool withdrawal.
//!
//! State lives behind one `RwLock` that is never held across an await. Each
//! network action runs in three steps:
//! 1. `begin`: refuse if the same action is in flight, check preconditions and
//!    parse inputs, mark the action in flight, remember the session epoch.
//! 2. Perform I/O with no lock held.
//! 3. `finish`: if the epoch changed the result is dropped as superseded,
//!    otherwise apply it and record the action's status.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use poolkit_crypto::{derive_pool_id, KeyManager, Keypair, OsKeyManager};
use poolkit_types::{
    Amount, Asset, LiquidityPoolDescriptor, PoolId, PoolType, PublicKey, ValidationError,
};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{NetworkConfig, WorkflowPolicy};
use crate::faucet::{FaucetClient, FaucetError, FundingReceipt};
use crate::ledger::{LedgerClient, LedgerError, TransactionResult};
use crate::tx_builder::{
    build_deposit, build_withdraw, DepositParams, TxBuilderError, WithdrawParams,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    #[default]
    Idle,
    KeypairReady,
    Funded,
    PoolCreated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Action {
    GenerateKeypair,
    FundAccount,
    CreatePool,
    Withdraw,
}

impl Action {
    pub const ALL: [Action; 4] = [
        Action::GenerateKeypair,
        Action::FundAccount,
        Action::CreatePool,
        Action::Withdraw,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::GenerateKeypair => "generate_keypair",
            Self::FundAccount => "fund_account",
            Self::CreatePool => "create_pool",
            Self::Withdraw => "withdraw",
        }
    }

    fn success_notice(self) -> &'static str {
        match self {
            Self::GenerateKeypair => "Generated new keypair",
            Self::FundAccount => "Account successfully funded.",
            Self::CreatePool => "Liquidity Pool created",
            Self::Withdraw => "Withdrawal successful.",
        }
    }

    fn failure_prefix(self) -> &'static str {
        match self {
            Self::GenerateKeypair => "Error generating keypair",
            Self::FundAccount => "Error funding account",
            Self::CreatePool => "Error creating Liquidity Pool",
            Self::Withdraw => "Error withdrawing from Liquidity Pool",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Busy/result indicator for one action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ActionStatus {
    #[default]
    Idle,
    InFlight,
    Succeeded,
    Failed(String),
}

impl ActionStatus {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::InFlight)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing prior-stage data or malformed input; raised before any I/O.
    Precondition,
    /// Faucet or RPC unreachable, or a non-success response.
    Network,
    /// The ledger refused a well-formed transaction.
    SubmissionRejected,
    /// The session was reset while the action was in flight.
    Superseded,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("no keypair; generate one first")]
    MissingKeypair,
    #[error("account is not funded")]
    NotFunded,
    #[error("no liquidity pool has been created")]
    NoPool,
    #[error("{0} is required")]
    MissingInput(&'static str),
    #[error("{0} is already in progress")]
    ActionInFlight(Action),
    #[error(transparent)]
    InvalidInput(#[from] ValidationError),
    #[error(transparent)]
    Faucet(#[from] FaucetError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Build(TxBuilderError),
    #[error("session was reset while {0} was in flight")]
    Superseded(Action),
}

impl WorkflowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingKeypair
            | Self::NotFunded
            | Self::NoPool
            | Self::MissingInput(_)
            | Self::ActionInFlight(_)
            | Self::InvalidInput(_)
            | Self::Build(_) => ErrorKind::Precondition,
            Self::Faucet(_) => ErrorKind::Network,
            Self::Ledger(err) if err.is_rejection() => ErrorKind::SubmissionRejected,
            Self::Ledger(_) => ErrorKind::Network,
            Self::Superseded(_) => ErrorKind::Superseded,
        }
    }
}

impl From<TxBuilderError> for WorkflowError {
    fn from(err: TxBuilderError) -> Self {
        match err {
            TxBuilderError::Ledger(err) => Self::Ledger(err),
            TxBuilderError::Validation(err) => Self::InvalidInput(err),
            other => Self::Build(other),
        }
    }
}

/// Cross-step state owned by the controller.
#[derive(Debug, Clone, Default)]
pub struct WorkflowState {
    pub stage: Stage,
    pub keypair: Option<Keypair>,
    pub pool_id: Option<PoolId>,
    pub last_create_result: Option<TransactionResult>,
    pub last_withdraw_result: Option<TransactionResult>,
}

/// What the presentation layer sees. Carries the public key only.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowSnapshot {
    pub epoch: u64,
    pub stage: Stage,
    pub public_key: Option<PublicKey>,
    pub pool_id: Option<PoolId>,
    pub last_create_result: Option<TransactionResult>,
    pub last_withdraw_result: Option<TransactionResult>,
    pub statuses: BTreeMap<Action, ActionStatus>,
    /// Last success notice, e.g. "Liquidity Pool created".
    pub notice: Option<String>,
}

impl WorkflowSnapshot {
    pub fn status(&self, action: Action) -> ActionStatus {
        self.statuses.get(&action).cloned().unwrap_or_default()
    }

    pub fn error_message(&self, action: Action) -> Option<String> {
        match self.status(action) {
            ActionStatus::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// Raw user input for pool creation. Token A is the native asset, token B
/// the custom asset named `asset_name`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreatePoolRequest {
    pub asset_name: String,
    pub token_a_amount: String,
    pub token_b_amount: String,
}

impl CreatePoolRequest {
    pub fn new(
        asset_name: impl Into<String>,
        token_a_amount: impl Into<String>,
        token_b_amount: impl Into<String>,
    ) -> Self {
        Self {
            asset_name: asset_name.into(),
            token_a_amount: token_a_amount.into(),
            token_b_amount: token_b_amount.into(),
        }
    }
}

/// Raw user input for withdrawal. `pool_id` overrides the derived pool when
/// non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WithdrawRequest {
    pub amount: String,
    pub pool_id: Option<String>,
}

impl WithdrawRequest {
    pub fn new(amount: impl Into<String>) -> Self {
        Self {
            amount: amount.into(),
            pool_id: None,
        }
    }

    pub fn with_pool_id(mut self, pool_id: impl Into<String>) -> Self {
        self.pool_id = Some(pool_id.into());
        self
    }
}

#[derive(Debug, Default)]
struct Session {
    epoch: u64,
    state: WorkflowState,
    statuses: BTreeMap<Action, ActionStatus>,
    notice: Option<String>,
}

impl Session {
    fn status(&self, action: Action) -> ActionStatus {
        self.statuses.get(&action).cloned().unwrap_or_default()
    }

    /// Starts a new epoch. In-flight markers survive so a running action
    /// still blocks its own re-entry until it completes.
    fn reset(&mut self) {
        self.epoch += 1;
        self.state = WorkflowState::default();
        self.notice = None;
        self.statuses.retain(|_, status| status.is_in_flight());
    }

    fn record_failure(&mut self, action: Action, err: &WorkflowError) {
        let message = format!("{}: {err}", action.failure_prefix());
        warn!(action = action.label(), kind = ?err.kind(), %message, "action failed");
        self.statuses.insert(action, ActionStatus::Failed(message));
    }

    fn require_keypair(&self) -> Result<Keypair, WorkflowError> {
        self.state.keypair.clone().ok_or(WorkflowError::MissingKeypair)
    }
}

fn require_input<'a>(value: &'a str, field: &'static str) -> Result<&'a str, WorkflowError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(WorkflowError::MissingInput(field));
    }
    Ok(value)
}

/// Sequences the pool workflow over a ledger, a faucet, and a key source.
pub struct WorkflowController<L, F, K = OsKeyManager> {
    ledger: L,
    faucet: F,
    keys: K,
    config: NetworkConfig,
    policy: WorkflowPolicy,
    session: RwLock<Session>,
}

impl<L, F> WorkflowController<L, F, OsKeyManager>
where
    L: LedgerClient,
    F: FaucetClient,
{
    pub fn new(ledger: L, faucet: F, config: NetworkConfig) -> Self {
        Self {
            ledger,
            faucet,
            keys: OsKeyManager,
            config,
            policy: WorkflowPolicy::default(),
            session: RwLock::new(Session::default()),
        }
    }
}

impl<L, F, K> WorkflowController<L, F, K>
where
    L: LedgerClient,
    F: FaucetClient,
    K: KeyManager,
{
    pub fn with_key_manager<K2: KeyManager>(self, keys: K2) -> WorkflowController<L, F, K2> {
        WorkflowController {
            ledger: self.ledger,
            faucet: self.faucet,
            keys,
            config: self.config,
            policy: self.policy,
            session: RwLock::new(
                self.session
                    .into_inner()
                    .unwrap_or_else(PoisonError::into_inner),
            ),
        }
    }

    pub fn with_policy(mut self, policy: WorkflowPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn policy(&self) -> &WorkflowPolicy {
        &self.policy
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn faucet(&self) -> &F {
        &self.faucet
    }

    pub fn snapshot(&self) -> WorkflowSnapshot {
        let session = self.read();
        WorkflowSnapshot {
            epoch: session.epoch,
            stage: session.state.stage,
            public_key: session.state.keypair.as_ref().map(Keypair::public_key),
            pool_id: session.state.pool_id,
            last_create_result: session.state.last_create_result.clone(),
            last_withdraw_result: session.state.last_withdraw_result.clone(),
            statuses: Action::ALL
                .into_iter()
                .map(|action| (action, session.status(action)))
                .collect(),
            notice: session.notice.clone(),
        }
    }

    pub fn stage(&self) -> Stage {
        self.read().state.stage
    }

    pub fn status(&self, action: Action) -> ActionStatus {
        self.read().status(action)
    }

    /// Clears keypair, pool id and results, and returns to `Idle`. Actions
    /// still in flight will report `Superseded` when they complete.
    pub fn reset_workflow(&self) {
        let mut session = self.write();
        session.reset();
        info!(epoch = session.epoch, "workflow reset");
    }

    /// Replaces the session keypair. Always succeeds.
    pub fn generate_keypair(&self) -> PublicKey {
        let keypair = self.keys.generate();
        let public_key = keypair.public_key();
        let mut session = self.write();
        session.reset();
        session.state.keypair = Some(keypair);
        session.state.stage = Stage::KeypairReady;
        session
            .statuses
            .insert(Action::GenerateKeypair, ActionStatus::Succeeded);
        session.notice = Some(Action::GenerateKeypair.success_notice().to_string());
        info!(
            action = Action::GenerateKeypair.label(),
            %public_key,
            epoch = session.epoch,
            "generated keypair"
        );
        public_key
    }

    pub async fn fund_account(&self) -> Result<FundingReceipt, WorkflowError> {
        let action = Action::FundAccount;
        let (epoch, public_key) = self.begin(action, |session| {
            Ok(session.require_keypair()?.public_key())
        })?;
        info!(action = action.label(), %public_key, "requesting faucet funding");
        let outcome = self
            .faucet
            .fund(&public_key)
            .await
            .map_err(WorkflowError::from);
        self.finish(action, epoch, outcome, |state, _| {
            state.stage = state.stage.max(Stage::Funded);
        })
    }

    pub async fn create_pool(
        &self,
        request: &CreatePoolRequest,
    ) -> Result<TransactionResult, WorkflowError> {
        let action = Action::CreatePool;
        let (epoch, (keypair, params)) = self.begin(action, |session| {
            let keypair = session.require_keypair()?;
            if session.state.stage < Stage::Funded {
                return Err(WorkflowError::NotFunded);
            }
            let asset_name = require_input(&request.asset_name, "asset name")?;
            let max_amount_a =
                Amount::parse_positive(require_input(&request.token_a_amount, "token A amount")?)?;
            let max_amount_b =
                Amount::parse_positive(require_input(&request.token_b_amount, "token B amount")?)?;
            let asset = Asset::credit(asset_name, keypair.public_key())?;
            let descriptor = LiquidityPoolDescriptor::new(
                Asset::Native,
                asset,
                PoolType::ConstantProduct,
                self.policy.pool_fee_bp,
            )?;
            let pool_id = derive_pool_id(&descriptor).map_err(TxBuilderError::from)?;
            session.state.pool_id = Some(pool_id);
            Ok((
                keypair,
                DepositParams {
                    descriptor,
                    pool_id,
                    max_amount_a,
                    max_amount_b,
                    price: self.policy.deposit_price,
                },
            ))
        })?;
        info!(
            action = action.label(),
            public_key = %keypair.public_key(),
            pool_id = %params.pool_id,
            "creating liquidity pool"
        );
        let outcome = self.submit_deposit(&keypair, &params).await;
        self.finish(action, epoch, outcome, |state, result| {
            state.last_create_result = Some(result.clone());
            state.stage = Stage::PoolCreated;
        })
    }

    pub async fn withdraw(
        &self,
        request: &WithdrawRequest,
    ) -> Result<TransactionResult, WorkflowError> {
        let action = Action::Withdraw;
        let (epoch, (keypair, params)) = self.begin(action, |session| {
            let keypair = session.require_keypair()?;
            if session.state.stage < Stage::PoolCreated {
                return Err(WorkflowError::NoPool);
            }
            let pool_id = match request.pool_id.as_deref().map(str::trim) {
                Some(text) if !text.is_empty() => PoolId::from_hex(text)?,
                _ => session.state.pool_id.ok_or(WorkflowError::NoPool)?,
            };
            let amount =
                Amount::parse_positive(require_input(&request.amount, "withdraw amount")?)?;
            Ok((
                keypair,
                WithdrawParams {
                    pool_id,
                    amount,
                    minimums: self.policy.withdraw_minimums,
                },
            ))
        })?;
        info!(
            action = action.label(),
            public_key = %keypair.public_key(),
            pool_id = %params.pool_id,
            amount = %params.amount,
            "withdrawing from liquidity pool"
        );
        let outcome = self.submit_withdraw(&keypair, &params).await;
        self.finish(action, epoch, outcome, |state, result| {
            state.last_withdraw_result = Some(result.clone());
        })
    }

    async fn submit_deposit(
        &self,
        keypair: &Keypair,
        params: &DepositParams,
    ) -> Result<TransactionResult, WorkflowError> {
        let signed = build_deposit(&self.ledger, &self.config, keypair, params).await?;
        Ok(self.ledger.send_transaction(&signed.envelope).await?)
    }

    async fn submit_withdraw(
        &self,
        keypair: &Keypair,
        params: &WithdrawParams,
    ) -> Result<TransactionResult, WorkflowError> {
        let signed = build_withdraw(&self.ledger, &self.config, keypair, params).await?;
        Ok(self.ledger.send_transaction(&signed.envelope).await?)
    }

    fn begin<T>(
        &self,
        action: Action,
        check: impl FnOnce(&mut Session) -> Result<T, WorkflowError>,
    ) -> Result<(u64, T), WorkflowError> {
        let mut session = self.write();
        if session.status(action).is_in_flight() {
            warn!(action = action.label(), "action already in flight");
            return Err(WorkflowError::ActionInFlight(action));
        }
        match check(&mut session) {
            Ok(plan) => {
                session.statuses.insert(action, ActionStatus::InFlight);
                Ok((session.epoch, plan))
            }
            Err(err) => {
                session.record_failure(action, &err);
                Err(err)
            }
        }
    }

    fn finish<T>(
        &self,
        action: Action,
        epoch: u64,
        outcome: Result<T, WorkflowError>,
        apply: impl FnOnce(&mut WorkflowState, &T),
    ) -> Result<T, WorkflowError> {
        let mut session = self.write();
        if session.epoch != epoch {
            session.statuses.insert(action, ActionStatus::Idle);
            warn!(
                action = action.label(),
                started = epoch,
                current = session.epoch,
                "discarding result from a previous session"
            );
            return Err(WorkflowError::Superseded(action));
        }
        match outcome {
            Ok(value) => {
                apply(&mut session.state, &value);
                session.statuses.insert(action, ActionStatus::Succeeded);
                session.notice = Some(action.success_notice().to_string());
                info!(action = action.label(), stage = ?session.state.stage, "action succeeded");
                Ok(value)
            }
            Err(err) => {
                session.record_failure(action, &err);
                Err(err)
            }
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Session> {
        self.session.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Session> {
        self.session.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use poolkit_types::ValidationError;

    use super::{Action, ActionStatus, ErrorKind, Stage, WorkflowError};
    use crate::faucet::FaucetError;
    use crate::ledger::LedgerError;
    use crate::tx_builder::TxBuilderError;

    #[test]
    fn stages_are_ordered() {
        assert!(Stage::Idle < Stage::KeypairReady);
        assert!(Stage::KeypairReady < Stage::Funded);
        assert!(Stage::Funded < Stage::PoolCreated);
        assert_eq!(Stage::PoolCreated.max(Stage::Funded), Stage::PoolCreated);
    }

    #[test]
    fn error_kinds() {
        assert_eq!(WorkflowError::MissingKeypair.kind(), ErrorKind::Precondition);
        assert_eq!(
            WorkflowError::ActionInFlight(Action::Withdraw).kind(),
            ErrorKind::Precondition
        );
        assert_eq!(
            WorkflowError::Faucet(FaucetError::Unavailable("down".into())).kind(),
            ErrorKind::Network
        );
        assert_eq!(
            WorkflowError::Ledger(LedgerError::Http {
                status: 503,
                body: String::new()
            })
            .kind(),
            ErrorKind::Network
        );
        assert_eq!(
            WorkflowError::Ledger(LedgerError::Rejected {
                status: "ERROR".into(),
                reason: "txBAD_SEQ".into(),
                error_result_xdr: None,
            })
            .kind(),
            ErrorKind::SubmissionRejected
        );
        assert_eq!(
            WorkflowError::Superseded(Action::CreatePool).kind(),
            ErrorKind::Superseded
        );
    }

    #[test]
    fn builder_errors_are_flattened() {
        let err: WorkflowError =
            TxBuilderError::Ledger(LedgerError::Unavailable("refused".into())).into();
        assert_eq!(err.kind(), ErrorKind::Network);
        let err: WorkflowError =
            TxBuilderError::Validation(ValidationError::MissingField("x")).into();
        assert!(matches!(err, WorkflowError::InvalidInput(_)));
    }

    #[test]
    fn default_status_is_idle() {
        assert_eq!(ActionStatus::default(), ActionStatus::Idle);
        assert!(ActionStatus::InFlight.is_in_flight());
        assert_eq!(Action::CreatePool.to_string(), "create_pool");
    }
}
