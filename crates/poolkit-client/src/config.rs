use poolkit_crypto::{network_id, TESTNET_PASSPHRASE};
use poolkit_types::{Amount, NetworkId, Price, TxHash, LIQUIDITY_POOL_FEE_V18};

pub const TESTNET_RPC_URL: &str = "https://soroban-testnet.stellar.org";
pub const TESTNET_FAUCET_URL: &str = "https://friendbot.stellar.org";
pub const TESTNET_EXPLORER_TX_URL: &str = "https://stellar.expert/explorer/testnet/tx";
pub const DEFAULT_BASE_FEE: u32 = 100;
pub const DEFAULT_TX_TIMEOUT_SECS: u64 = 30;

/// Endpoints and transaction parameters for one network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    pub rpc_url: String,
    pub faucet_url: String,
    pub network_passphrase: String,
    pub explorer_tx_url: String,
    /// Per-operation fee in stroops.
    pub base_fee: u32,
    /// Upper time bound is `now + tx_timeout_secs`.
    pub tx_timeout_secs: u64,
    pub request_timeout_ms: u64,
}

impl NetworkConfig {
    pub fn testnet() -> Self {
        Self {
            rpc_url: TESTNET_RPC_URL.to_string(),
            faucet_url: TESTNET_FAUCET_URL.to_string(),
            network_passphrase: TESTNET_PASSPHRASE.to_string(),
            explorer_tx_url: TESTNET_EXPLORER_TX_URL.to_string(),
            base_fee: DEFAULT_BASE_FEE,
            tx_timeout_secs: DEFAULT_TX_TIMEOUT_SECS,
            request_timeout_ms: 10_000,
        }
    }

    pub fn network_id(&self) -> NetworkId {
        network_id(&self.network_passphrase)
    }

    pub fn explorer_link(&self, hash: &TxHash) -> String {
        format!("{}/{}", self.explorer_tx_url.trim_end_matches('/'), hash)
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self::testnet()
    }
}

/// Price band applied to pool deposits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceBound {
    pub min_price: Price,
    pub max_price: Price,
}

impl Default for PriceBound {
    fn default() -> Self {
        Self {
            min_price: Price::ONE,
            max_price: Price::ONE,
        }
    }
}

/// Minimum reserves accepted back from a pool withdrawal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawMinimums {
    pub min_amount_a: Amount,
    pub min_amount_b: Amount,
}

impl Default for WithdrawMinimums {
    fn default() -> Self {
        Self {
            min_amount_a: Amount::ZERO,
            min_amount_b: Amount::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowPolicy {
    pub deposit_price: PriceBound,
    pub withdraw_minimums: WithdrawMinimums,
    pub pool_fee_bp: i32,
}

impl Default for WorkflowPolicy {
    fn default() -> Self {
        Self {
            deposit_price: PriceBound::default(),
            withdraw_minimums: WithdrawMinimums::default(),
            pool_fee_bp: LIQUIDITY_POOL_FEE_V18,
        }
    }
}

#[cfg(test)]
mod tests {
    use poolkit_types::{Price, TxHash};

    use super::{NetworkConfig, WorkflowPolicy};

    #[test]
    fn testnet_defaults() {
        let config = NetworkConfig::default();
        assert_eq!(config.base_fee, 100);
        assert_eq!(config.tx_timeout_secs, 30);
        assert_eq!(
            config.network_id().to_hex(),
            "cee0302d59844d32bdca915c8203dd44b33fbb7edc19051ea37abedf28ecd472"
        );
    }

    #[test]
    fn explorer_link_appends_hex_hash() {
        let mut config = NetworkConfig::testnet();
        config.explorer_tx_url.push('/');
        assert_eq!(
            config.explorer_link(&TxHash::new([0xab; 32])),
            format!("https://stellar.expert/explorer/testnet/tx/{}", "ab".repeat(32))
        );
    }

    #[test]
    fn policy_defaults_are_unit_price_and_zero_minimums() {
        let policy = WorkflowPolicy::default();
        assert_eq!(policy.deposit_price.min_price, Price::ONE);
        assert_eq!(policy.deposit_price.max_price, Price::ONE);
        assert_eq!(policy.withdraw_minimums.min_amount_a.stroops(), 0);
        assert_eq!(policy.pool_fee_bp, 30);
    }
}
