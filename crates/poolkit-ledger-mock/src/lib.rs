//! In-memory ledger and faucet for workflow tests and offline runs.

pub mod mock_ledger;
pub mod scenarios;

pub use mock_ledger::{
    AccountState, MockLedger, PoolState, Rejection, SubmitStatus, Submission, DEFAULT_BASE_FEE,
    FRIENDBOT_STARTING_BALANCE,
};
pub use scenarios::{PoolScenario, SCENARIO_CLOCK};
