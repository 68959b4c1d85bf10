//! Transaction result codes and the `TransactionResult` carried in
//! `errorResultXdr`.

use stellar_xdr::curr as xdr;

use crate::codec::{decode_base64, encode_base64, XdrError};

macro_rules! result_codes {
    ($($variant:ident = $value:literal => $name:literal),+ $(,)?) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum TransactionResultCode {
            $($variant),+
        }

        impl TransactionResultCode {
            pub fn value(self) -> i32 {
                match self {
                    $(Self::$variant => $value),+
                }
            }

            pub fn from_value(value: i32) -> Option<Self> {
                match value {
                    $($value => Some(Self::$variant),)+
                    _ => None,
                }
            }

            /// Canonical protocol name, e.g. `txBAD_SEQ`.
            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name),+
                }
            }
        }
    };
}

result_codes! {
    FeeBumpInnerSuccess = 1 => "txFEE_BUMP_INNER_SUCCESS",
    Success = 0 => "txSUCCESS",
    Failed = -1 => "txFAILED",
    TooEarly = -2 => "txTOO_EARLY",
    TooLate = -3 => "txTOO_LATE",
    MissingOperation = -4 => "txMISSING_OPERATION",
    BadSeq = -5 => "txBAD_SEQ",
    BadAuth = -6 => "txBAD_AUTH",
    InsufficientBalance = -7 => "txINSUFFICIENT_BALANCE",
    NoAccount = -8 => "txNO_ACCOUNT",
    InsufficientFee = -9 => "txINSUFFICIENT_FEE",
    BadAuthExtra = -10 => "txBAD_AUTH_EXTRA",
    InternalError = -11 => "txINTERNAL_ERROR",
    NotSupported = -12 => "txNOT_SUPPORTED",
    FeeBumpInnerFailed = -13 => "txFEE_BUMP_INNER_FAILED",
    BadSponsorship = -14 => "txBAD_SPONSORSHIP",
    BadMinSeqAgeOrGap = -15 => "txBAD_MIN_SEQ_AGE_OR_GAP",
    Malformed = -16 => "txMALFORMED",
    SorobanInvalid = -17 => "txSOROBAN_INVALID",
}

impl std::fmt::Display for TransactionResultCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Fee charged and top-level result code of a `TransactionResult`.
/// Per-operation results are left out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultSummary {
    pub fee_charged: i64,
    pub code: TransactionResultCode,
}

impl ResultSummary {
    pub fn new(fee_charged: i64, code: TransactionResultCode) -> Self {
        Self { fee_charged, code }
    }

    pub fn from_result(result: &xdr::TransactionResult) -> Result<Self, XdrError> {
        let value = i32::from(result.result.discriminant());
        let code = TransactionResultCode::from_value(value).ok_or(XdrError::Unsupported {
            kind: "transaction result code",
            detail: value.to_string(),
        })?;
        Ok(Self::new(result.fee_charged, code))
    }

    /// Builds the `TransactionResult` with empty operation results. Fee-bump
    /// outcomes need the inner transaction and are not produced here.
    pub fn to_result(&self) -> Result<xdr::TransactionResult, XdrError> {
        use xdr::TransactionResultResult as R;

        let result = match self.code {
            TransactionResultCode::Success => R::TxSuccess(Default::default()),
            TransactionResultCode::Failed => R::TxFailed(Default::default()),
            TransactionResultCode::TooEarly => R::TxTooEarly,
            TransactionResultCode::TooLate => R::TxTooLate,
            TransactionResultCode::MissingOperation => R::TxMissingOperation,
            TransactionResultCode::BadSeq => R::TxBadSeq,
            TransactionResultCode::BadAuth => R::TxBadAuth,
            TransactionResultCode::InsufficientBalance => R::TxInsufficientBalance,
            TransactionResultCode::NoAccount => R::TxNoAccount,
            TransactionResultCode::InsufficientFee => R::TxInsufficientFee,
            TransactionResultCode::BadAuthExtra => R::TxBadAuthExtra,
            TransactionResultCode::InternalError => R::TxInternalError,
            TransactionResultCode::NotSupported => R::TxNotSupported,
            TransactionResultCode::BadSponsorship => R::TxBadSponsorship,
            TransactionResultCode::BadMinSeqAgeOrGap => R::TxBadMinSeqAgeOrGap,
            TransactionResultCode::Malformed => R::TxMalformed,
            TransactionResultCode::SorobanInvalid => R::TxSorobanInvalid,
            TransactionResultCode::FeeBumpInnerSuccess
            | TransactionResultCode::FeeBumpInnerFailed => {
                return Err(XdrError::Unsupported {
                    kind: "transaction result code",
                    detail: self.code.name().to_string(),
                })
            }
        };
        Ok(xdr::TransactionResult {
            fee_charged: self.fee_charged,
            result,
            ext: xdr::TransactionResultExt::V0,
        })
    }

    pub fn to_xdr_base64(&self) -> Result<String, XdrError> {
        encode_base64(&self.to_result()?)
    }

    pub fn from_xdr_base64(text: &str) -> Result<Self, XdrError> {
        Self::from_result(&decode_base64::<xdr::TransactionResult>(text)?)
    }
}

#[cfg(test)]
mod tests {
    use stellar_xdr::curr as xdr;

    use super::{ResultSummary, TransactionResultCode};
    use crate::codec::{encode, encode_base64};

    #[test]
    fn bad_seq_layout() {
        let result = ResultSummary::new(100, TransactionResultCode::BadSeq)
            .to_result()
            .unwrap();
        assert_eq!(
            hex::encode(encode(&result).unwrap()),
            "0000000000000064fffffffb00000000"
        );
        let text = encode_base64(&result).unwrap();
        assert_eq!(
            ResultSummary::from_xdr_base64(&text).unwrap().code.name(),
            "txBAD_SEQ"
        );
    }

    #[test]
    fn every_plain_code_maps_to_its_own_discriminant() {
        for value in -17..=0 {
            let Some(code) = TransactionResultCode::from_value(value) else {
                continue;
            };
            if code == TransactionResultCode::FeeBumpInnerFailed {
                continue;
            }
            let result = ResultSummary::new(0, code).to_result().unwrap();
            assert_eq!(i32::from(result.result.discriminant()), value, "{code}");
        }
    }

    #[test]
    fn failed_summary_ignores_operation_results() {
        let result = xdr::TransactionResult {
            fee_charged: 200,
            result: xdr::TransactionResultResult::TxFailed(
                vec![xdr::OperationResult::OpBadAuth].try_into().unwrap(),
            ),
            ext: xdr::TransactionResultExt::V0,
        };
        let summary =
            ResultSummary::from_xdr_base64(&encode_base64(&result).unwrap()).unwrap();
        assert_eq!(summary, ResultSummary::new(200, TransactionResultCode::Failed));
    }

    #[test]
    fn fee_bump_codes_are_not_produced() {
        assert!(ResultSummary::new(0, TransactionResultCode::FeeBumpInnerFailed)
            .to_result()
            .is_err());
    }
}
