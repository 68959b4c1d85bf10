use poolkit_types::{CryptoError, NetworkId, TxHash};
use poolkit_xdr::xdr::{
    DecoratedSignature, Signature, SignatureHint, Transaction, TransactionV1Envelope,
};
use poolkit_xdr::{muxed_account_key, XdrError};

use crate::hashing::compute_tx_hash;
use crate::keys::{verify_signature, Keypair};

/// Hashes `tx` for `network_id` and wraps it in a v1 envelope carrying one
/// decorated signature from `keypair`.
pub fn sign_transaction(
    keypair: &Keypair,
    network_id: &NetworkId,
    tx: Transaction,
) -> Result<(TxHash, TransactionV1Envelope), XdrError> {
    let hash = compute_tx_hash(network_id, &tx)?;
    let signature = DecoratedSignature {
        hint: SignatureHint(keypair.public_key().signature_hint()),
        signature: Signature(keypair.sign(hash.as_bytes()).to_vec().try_into()?),
    };
    Ok((
        hash,
        TransactionV1Envelope {
            tx,
            signatures: vec![signature].try_into()?,
        },
    ))
}

/// Checks that some signature on the envelope was made by the transaction
/// source over the network-bound hash.
pub fn verify_source_signature(
    network_id: &NetworkId,
    envelope: &TransactionV1Envelope,
) -> Result<TxHash, CryptoError> {
    let source = muxed_account_key(&envelope.tx.source_account);
    let hash = compute_tx_hash(network_id, &envelope.tx)
        .map_err(|err| CryptoError::Encoding(err.to_string()))?;
    let hint = source.signature_hint();
    let signed = envelope
        .signatures
        .iter()
        .filter(|sig| sig.hint.0 == hint)
        .any(|sig| verify_signature(&source, hash.as_bytes(), sig.signature.0.as_slice()).is_ok());
    if signed {
        Ok(hash)
    } else {
        Err(CryptoError::InvalidSignature)
    }
}
