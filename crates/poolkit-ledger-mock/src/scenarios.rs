use poolkit_crypto::{derive_pool_id, Keypair};
use poolkit_types::{Asset, LiquidityPoolDescriptor, PoolId, ValidationError};

use crate::mock_ledger::MockLedger;

/// Fixed close time so time bounds in fixtures are reproducible.
pub const SCENARIO_CLOCK: u64 = 1_700_000_000;

/// A testnet ledger holding one funded account that issues `code`, plus the
/// native/`code` pool that account would create.
#[derive(Debug, Clone)]
pub struct PoolScenario {
    pub ledger: MockLedger,
    pub keypair: Keypair,
    pub asset: Asset,
    pub descriptor: LiquidityPoolDescriptor,
    pub pool_id: PoolId,
}

impl PoolScenario {
    pub fn new(seed: [u8; 32], code: &str) -> Result<Self, ValidationError> {
        let keypair = Keypair::from_seed(seed);
        let asset = Asset::credit(code, keypair.public_key())?;
        let descriptor = LiquidityPoolDescriptor::constant_product(Asset::Native, asset.clone())?;
        let pool_id =
            derive_pool_id(&descriptor).map_err(|err| ValidationError::Message(err.to_string()))?;

        let mut ledger = MockLedger::testnet();
        ledger.set_clock(SCENARIO_CLOCK);
        ledger
            .fund(keypair.public_key())
            .map_err(|err| ValidationError::Message(err.to_string()))?;

        Ok(Self {
            ledger,
            keypair,
            asset,
            descriptor,
            pool_id,
        })
    }

    /// Same issuer and code, without the faucet step.
    pub fn unfunded(seed: [u8; 32], code: &str) -> Result<Self, ValidationError> {
        let mut scenario = Self::new(seed, code)?;
        scenario.ledger = MockLedger::testnet();
        scenario.ledger.set_clock(SCENARIO_CLOCK);
        Ok(scenario)
    }
}

#[cfg(test)]
mod tests {
    use super::PoolScenario;

    #[test]
    fn scenario_funds_issuer() {
        let scenario = PoolScenario::new([7; 32], "FOO").unwrap();
        assert!(scenario.ledger.account(&scenario.keypair.public_key()).is_some());
        assert!(scenario.ledger.pool(&scenario.pool_id).is_none());

        let unfunded = PoolScenario::unfunded([7; 32], "FOO").unwrap();
        assert!(unfunded.ledger.account(&unfunded.keypair.public_key()).is_none());
        assert_eq!(unfunded.pool_id, scenario.pool_id);
    }

    #[test]
    fn rejects_bad_asset_code() {
        assert!(PoolScenario::new([7; 32], "NOT-VALID").is_err());
    }
}
