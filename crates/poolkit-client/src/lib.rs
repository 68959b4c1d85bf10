//! Client library for the testnet liquidity-pool workflow.
//!
//! This crate exposes:
//! - network configuration and workflow policy (`NetworkConfig`, `WorkflowPolicy`),
//! - ledger and faucet contracts with HTTP and in-memory implementations
//!   (`LedgerClient`, `RpcLedgerClient`, `MockLedgerClient`, `FaucetClient`,
//!   `HttpFaucetClient`, `MockFaucet`),
//! - transaction construction (`TxBuilder`, `build_deposit`, `build_withdraw`),
//! - the stateful workflow facade (`WorkflowController`) sequencing keypair,
//!   funding, pool creation and withdrawal.

pub mod config;
pub mod faucet;
pub mod ledger;
pub mod tx_builder;
pub mod workflow;

pub use config::{
    NetworkConfig, PriceBound, WithdrawMinimums, WorkflowPolicy, DEFAULT_BASE_FEE,
    DEFAULT_TX_TIMEOUT_SECS, TESTNET_EXPLORER_TX_URL, TESTNET_FAUCET_URL, TESTNET_RPC_URL,
};
pub use faucet::{FaucetClient, FaucetError, FundingReceipt, HttpFaucetClient, MockFaucet};
pub use ledger::{
    AccountInfo, LedgerClient, LedgerError, MockLedgerClient, RpcLedgerClient, TransactionResult,
};
pub use tx_builder::{
    build_deposit, build_withdraw, DepositParams, SignedTransaction, TxBuilder, TxBuilderError,
    WithdrawParams,
};
pub use workflow::{
    Action, ActionStatus, CreatePoolRequest, ErrorKind, Stage, WithdrawRequest,
    WorkflowController, WorkflowError, WorkflowSnapshot, WorkflowState,
};
