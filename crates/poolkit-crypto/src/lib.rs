//! Crypto primitives: ed25519 session keys, network id, pool id, transaction hash
//! and envelope signing.

pub mod hashing;
pub mod keys;
pub mod signing;

pub use hashing::{
    build_signature_payload, compute_tx_hash, derive_pool_id, network_id, PUBLIC_PASSPHRASE,
    TESTNET_PASSPHRASE,
};
pub use keys::{verify_signature, KeyManager, Keypair, OsKeyManager};
pub use signing::{sign_transaction, verify_source_signature};
