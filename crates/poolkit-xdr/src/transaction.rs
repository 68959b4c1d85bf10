//! Helpers over the transaction types: envelope access, time bounds and
//! operation names used in rejection messages.

use stellar_xdr::curr as xdr;

use crate::codec::XdrError;

/// Ledger-wide cap on operations per transaction.
pub const MAX_OPERATIONS: usize = 100;

/// Wraps a v1 envelope for the wire.
pub fn envelope(v1: xdr::TransactionV1Envelope) -> xdr::TransactionEnvelope {
    xdr::TransactionEnvelope::Tx(v1)
}

/// The v1 arm of an envelope. Legacy v0 and fee-bump envelopes are refused.
pub fn v1_envelope(
    envelope: xdr::TransactionEnvelope,
) -> Result<xdr::TransactionV1Envelope, XdrError> {
    match envelope {
        xdr::TransactionEnvelope::Tx(v1) => Ok(v1),
        other => Err(XdrError::Unsupported {
            kind: "envelope type",
            detail: other.name().to_string(),
        }),
    }
}

pub fn time_bounds(cond: &xdr::Preconditions) -> Option<&xdr::TimeBounds> {
    match cond {
        xdr::Preconditions::None => None,
        xdr::Preconditions::Time(bounds) => Some(bounds),
        xdr::Preconditions::V2(v2) => v2.time_bounds.as_ref(),
    }
}

/// Snake-case operation name, e.g. `liquidity_pool_deposit`.
pub fn operation_name(body: &xdr::OperationBody) -> &'static str {
    match body {
        xdr::OperationBody::ChangeTrust(_) => "change_trust",
        xdr::OperationBody::LiquidityPoolDeposit(_) => "liquidity_pool_deposit",
        xdr::OperationBody::LiquidityPoolWithdraw(_) => "liquidity_pool_withdraw",
        other => other.name(),
    }
}

#[cfg(test)]
mod tests {
    use stellar_xdr::curr as xdr;

    use super::{envelope, operation_name, time_bounds, v1_envelope};
    use crate::codec::{decode_base64, encode, encode_base64};

    fn sample() -> xdr::TransactionV1Envelope {
        xdr::TransactionV1Envelope {
            tx: xdr::Transaction {
                source_account: xdr::MuxedAccount::Ed25519(xdr::Uint256([0x33; 32])),
                fee: 200,
                seq_num: xdr::SequenceNumber(42),
                cond: xdr::Preconditions::Time(xdr::TimeBounds {
                    min_time: xdr::TimePoint(0),
                    max_time: xdr::TimePoint(1_700_000_030),
                }),
                memo: xdr::Memo::None,
                operations: vec![xdr::Operation {
                    source_account: None,
                    body: xdr::OperationBody::LiquidityPoolWithdraw(
                        xdr::LiquidityPoolWithdrawOp {
                            liquidity_pool_id: xdr::PoolId(xdr::Hash([0x44; 32])),
                            amount: 10,
                            min_amount_a: 0,
                            min_amount_b: 0,
                        },
                    ),
                }]
                .try_into()
                .unwrap(),
                ext: xdr::TransactionExt::V0,
            },
            signatures: Default::default(),
        }
    }

    #[test]
    fn envelope_header_and_fee_positions() {
        let bytes = encode(&envelope(sample())).unwrap();
        assert_eq!(&bytes[..4], &[0, 0, 0, 2]);
        // envelope type + muxed account (4 + 32) precede the fee
        assert_eq!(&bytes[40..44], &200u32.to_be_bytes());
        assert_eq!(&bytes[44..52], &42i64.to_be_bytes());
    }

    #[test]
    fn v1_arm_is_recovered_from_the_wire() {
        let text = encode_base64(&envelope(sample())).unwrap();
        let decoded = v1_envelope(decode_base64(&text).unwrap()).unwrap();
        assert_eq!(decoded, sample());
        assert_eq!(
            time_bounds(&decoded.tx.cond).map(|bounds| bounds.max_time.0),
            Some(1_700_000_030)
        );
    }

    #[test]
    fn fee_bump_envelopes_are_refused() {
        let inner = sample();
        let bump = xdr::TransactionEnvelope::TxFeeBump(xdr::FeeBumpTransactionEnvelope {
            tx: xdr::FeeBumpTransaction {
                fee_source: inner.tx.source_account.clone(),
                fee: 400,
                inner_tx: xdr::FeeBumpTransactionInnerTx::Tx(inner),
                ext: xdr::FeeBumpTransactionExt::V0,
            },
            signatures: Default::default(),
        });
        assert!(v1_envelope(bump).is_err());
    }

    #[test]
    fn operation_names_are_snake_case() {
        assert_eq!(
            operation_name(&sample().tx.operations[0].body),
            "liquidity_pool_withdraw"
        );
    }
}
