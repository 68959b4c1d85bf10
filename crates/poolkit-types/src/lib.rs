pub mod amount;
pub mod asset;
pub mod error;
pub mod ids;

pub use amount::{Amount, Price};
pub use asset::{Asset, AssetCode, LiquidityPoolDescriptor, PoolType, LIQUIDITY_POOL_FEE_V18};
pub use error::{CryptoError, ValidationError};
pub use ids::{NetworkId, PoolId, PublicKey, SequenceNumber, TxHash};
