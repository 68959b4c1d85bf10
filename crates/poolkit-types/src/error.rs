//! Validation and crypto errors shared across crates.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid length for {kind}: expected {expected}, got {actual}")]
    InvalidLength {
        kind: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("invalid hex: {0}")]
    InvalidHex(String),
    #[error("invalid strkey: {0}")]
    InvalidStrKey(String),
    #[error("invalid asset code `{0}`: expected 1-12 ASCII letters or digits")]
    InvalidAssetCode(String),
    #[error("invalid amount `{value}`: {reason}")]
    InvalidAmount { value: String, reason: &'static str },
    #[error("assets are not in canonical order")]
    AssetOrder,
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("{0}")]
    Message(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid length for {kind}: expected {expected}, got {actual}")]
    InvalidLength {
        kind: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("invalid signature")]
    InvalidSignature,
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),
    #[error("cannot encode signed payload: {0}")]
    Encoding(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}
