//! Pool workflow demo binary.
//!
//! Generates a session keypair, funds it from the faucet, creates a
//! native/custom-asset liquidity pool with an initial deposit, then withdraws
//! part of the shares. Runs against testnet by default, or against the
//! in-memory ledger with `--offline`.

use std::sync::{Arc, Mutex};

use clap::Parser;
use poolkit_client::{
    CreatePoolRequest, FaucetClient, HttpFaucetClient, LedgerClient, MockFaucet,
    MockLedgerClient, NetworkConfig, RpcLedgerClient, WithdrawRequest, WorkflowController,
    DEFAULT_BASE_FEE, DEFAULT_TX_TIMEOUT_SECS, TESTNET_EXPLORER_TX_URL, TESTNET_FAUCET_URL,
    TESTNET_RPC_URL,
};
use poolkit_crypto::TESTNET_PASSPHRASE;
use poolkit_ledger_mock::MockLedger;
use tracing::{info, warn};

/// Liquidity pool workflow demo.
#[derive(Parser, Debug)]
#[command(name = "poolkit-demo", about = "Create and withdraw from a liquidity pool")]
struct Cli {
    /// Soroban RPC endpoint.
    #[arg(long, default_value = TESTNET_RPC_URL)]
    rpc_url: String,

    /// Friendbot-style faucet endpoint.
    #[arg(long, default_value = TESTNET_FAUCET_URL)]
    faucet_url: String,

    #[arg(long, default_value = TESTNET_PASSPHRASE)]
    network_passphrase: String,

    /// Base URL for transaction links; the hash is appended.
    #[arg(long, default_value = TESTNET_EXPLORER_TX_URL)]
    explorer_tx_url: String,

    /// Per-operation fee in stroops.
    #[arg(long, default_value_t = DEFAULT_BASE_FEE)]
    base_fee: u32,

    #[arg(long, default_value_t = DEFAULT_TX_TIMEOUT_SECS)]
    tx_timeout_secs: u64,

    /// Custom asset code, issued by the session key.
    #[arg(long, default_value = "POOL")]
    asset_name: String,

    /// Native amount deposited (token A).
    #[arg(long, default_value = "100")]
    token_a: String,

    /// Custom asset amount deposited (token B).
    #[arg(long, default_value = "50")]
    token_b: String,

    /// Pool shares to withdraw after creation.
    #[arg(long, default_value = "10")]
    withdraw_amount: String,

    /// Run against the in-memory ledger instead of the network.
    #[arg(long)]
    offline: bool,
}

impl Cli {
    fn network_config(&self) -> NetworkConfig {
        NetworkConfig {
            rpc_url: self.rpc_url.clone(),
            faucet_url: self.faucet_url.clone(),
            network_passphrase: self.network_passphrase.clone(),
            explorer_tx_url: self.explorer_tx_url.clone(),
            base_fee: self.base_fee,
            tx_timeout_secs: self.tx_timeout_secs,
            ..NetworkConfig::testnet()
        }
    }
}

async fn run<L, F>(
    controller: WorkflowController<L, F>,
    cli: &Cli,
) -> Result<(), Box<dyn std::error::Error>>
where
    L: LedgerClient,
    F: FaucetClient,
{
    let public_key = controller.generate_keypair();
    info!(%public_key, "generated session keypair");

    let receipt = controller.fund_account().await?;
    info!(hash = receipt.hash.as_deref().unwrap_or("-"), "account funded");

    let created = controller
        .create_pool(&CreatePoolRequest::new(
            cli.asset_name.as_str(),
            cli.token_a.as_str(),
            cli.token_b.as_str(),
        ))
        .await?;
    let snapshot = controller.snapshot();
    if let Some(pool_id) = snapshot.pool_id {
        info!(%pool_id, "liquidity pool id");
    }
    info!(
        hash = %created.hash,
        link = %created.explorer_url(controller.config()),
        "pool created"
    );

    match controller
        .withdraw(&WithdrawRequest::new(cli.withdraw_amount.as_str()))
        .await
    {
        Ok(withdrawn) => info!(
            hash = %withdrawn.hash,
            link = %withdrawn.explorer_url(controller.config()),
            "withdrawal submitted"
        ),
        Err(err) => {
            warn!(kind = ?err.kind(), %err, "withdrawal failed");
            return Err(err.into());
        }
    }

    info!(stage = ?controller.stage(), "workflow complete");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    let config = cli.network_config();

    if cli.offline {
        info!("running against the in-memory ledger");
        let ledger = Arc::new(Mutex::new(MockLedger::new(config.network_id())));
        let controller = WorkflowController::new(
            MockLedgerClient::shared(Arc::clone(&ledger)),
            MockFaucet::new(ledger),
            config,
        );
        run(controller, &cli).await
    } else {
        info!(rpc = %config.rpc_url, faucet = %config.faucet_url, "running against network");
        let controller = WorkflowController::new(
            RpcLedgerClient::from_config(&config),
            HttpFaucetClient::from_config(&config),
            config,
        );
        run(controller, &cli).await
    }
}
