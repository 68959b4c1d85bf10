use poolkit_types::{LiquidityPoolDescriptor, NetworkId, PoolId, TxHash};
use poolkit_xdr::xdr::{
    Hash, Transaction, TransactionSignaturePayload, TransactionSignaturePayloadTaggedTransaction,
};
use poolkit_xdr::{encode, ToXdr, XdrError};
use sha2::{Digest, Sha256};

/// Public test network passphrase.
pub const TESTNET_PASSPHRASE: &str = "Test SDF Network ; September 2015";
/// Public main network passphrase.
pub const PUBLIC_PASSPHRASE: &str = "Public Global Stellar Network ; September 2015";

pub fn network_id(passphrase: &str) -> NetworkId {
    NetworkId::new(sha256_32(passphrase.as_bytes()))
}

/// Pool id: SHA-256 over the XDR `LiquidityPoolParameters` of the descriptor.
/// Needs no ledger access, so it is known before the pool exists.
pub fn derive_pool_id(descriptor: &LiquidityPoolDescriptor) -> Result<PoolId, XdrError> {
    Ok(PoolId::new(sha256_32(&encode(&descriptor.to_xdr_value())?)))
}

/// `TransactionSignaturePayload`: network id, envelope type, transaction body.
pub fn build_signature_payload(
    network_id: &NetworkId,
    tx: &Transaction,
) -> Result<Vec<u8>, XdrError> {
    encode(&TransactionSignaturePayload {
        network_id: Hash(network_id.into_inner()),
        tagged_transaction: TransactionSignaturePayloadTaggedTransaction::Tx(tx.clone()),
    })
}

/// The hash that is signed and that the ledger reports back.
pub fn compute_tx_hash(network_id: &NetworkId, tx: &Transaction) -> Result<TxHash, XdrError> {
    Ok(TxHash::new(sha256_32(&build_signature_payload(network_id, tx)?)))
}

fn sha256_32(input: &[u8]) -> [u8; 32] {
    let digest: [u8; 32] = Sha256::digest(input).into();
    digest
}

#[cfg(test)]
mod tests {
    use poolkit_types::{Asset, LiquidityPoolDescriptor, PublicKey};

    use super::{derive_pool_id, network_id, TESTNET_PASSPHRASE};

    #[test]
    fn testnet_network_id() {
        assert_eq!(
            network_id(TESTNET_PASSPHRASE).to_hex(),
            "cee0302d59844d32bdca915c8203dd44b33fbb7edc19051ea37abedf28ecd472"
        );
    }

    #[test]
    fn pool_id_is_deterministic_and_sensitive_to_inputs() {
        let issuer = PublicKey::new([0x11; 32]);
        let make = |code: &str| {
            LiquidityPoolDescriptor::constant_product(
                Asset::Native,
                Asset::credit(code, issuer).unwrap(),
            )
            .unwrap()
        };
        let pool_id = |code: &str| derive_pool_id(&make(code)).unwrap();
        assert_eq!(pool_id("FOO"), pool_id("FOO"));
        assert_ne!(pool_id("FOO"), pool_id("BAR"));
    }
}
