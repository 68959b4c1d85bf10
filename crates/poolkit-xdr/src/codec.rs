//! Encoding entry points over `stellar_xdr::curr`, with one error type for the
//! workspace.

use poolkit_types::ValidationError;
use stellar_xdr::curr::{Limits, ReadXdr, WriteXdr};
use thiserror::Error;

/// Upper bound on a decoded XDR payload. Envelopes and ledger entries the
/// workflow exchanges are a few hundred bytes.
pub const MAX_DECODE_LEN: usize = 256 * 1024;
const MAX_DECODE_DEPTH: u32 = 500;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum XdrError {
    #[error("xdr codec: {0}")]
    Codec(String),
    #[error("unsupported {kind}: {detail}")]
    Unsupported { kind: &'static str, detail: String },
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl From<stellar_xdr::curr::Error> for XdrError {
    fn from(err: stellar_xdr::curr::Error) -> Self {
        Self::Codec(err.to_string())
    }
}

fn decode_limits() -> Limits {
    Limits {
        depth: MAX_DECODE_DEPTH,
        len: MAX_DECODE_LEN,
    }
}

pub fn encode<T: WriteXdr>(value: &T) -> Result<Vec<u8>, XdrError> {
    Ok(value.to_xdr(Limits::none())?)
}

pub fn encode_base64<T: WriteXdr>(value: &T) -> Result<String, XdrError> {
    Ok(value.to_xdr_base64(Limits::none())?)
}

/// Decodes exactly one value; trailing bytes are an error.
pub fn decode<T: ReadXdr>(bytes: &[u8]) -> Result<T, XdrError> {
    Ok(T::from_xdr(bytes, decode_limits())?)
}

pub fn decode_base64<T: ReadXdr>(text: &str) -> Result<T, XdrError> {
    Ok(T::from_xdr_base64(text.trim(), decode_limits())?)
}

#[cfg(test)]
mod tests {
    use stellar_xdr::curr::{Hash, LiquidityPoolWithdrawOp, PoolId};

    use super::{decode, decode_base64, encode, encode_base64, XdrError};

    fn withdraw_op() -> LiquidityPoolWithdrawOp {
        LiquidityPoolWithdrawOp {
            liquidity_pool_id: PoolId(Hash([0x44; 32])),
            amount: 100,
            min_amount_a: 0,
            min_amount_b: 0,
        }
    }

    #[test]
    fn fixed_width_fields_are_big_endian() {
        let bytes = encode(&withdraw_op()).unwrap();
        assert_eq!(bytes.len(), 32 + 3 * 8);
        assert_eq!(&bytes[32..40], &100i64.to_be_bytes());
        assert_eq!(decode::<LiquidityPoolWithdrawOp>(&bytes).unwrap(), withdraw_op());
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut bytes = encode(&withdraw_op()).unwrap();
        bytes.extend([0, 0, 0, 0]);
        assert!(matches!(
            decode::<LiquidityPoolWithdrawOp>(&bytes),
            Err(XdrError::Codec(_))
        ));
    }

    #[test]
    fn base64_input_is_trimmed_and_validated() {
        let text = encode_base64(&withdraw_op()).unwrap();
        let padded = format!("  {text}\n");
        assert_eq!(
            decode_base64::<LiquidityPoolWithdrawOp>(&padded).unwrap(),
            withdraw_op()
        );
        assert!(decode_base64::<LiquidityPoolWithdrawOp>("not base64!").is_err());
    }
}
