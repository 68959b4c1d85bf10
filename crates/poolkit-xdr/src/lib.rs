//! Adapter between the workspace value types and the ledger's XDR types from
//! `stellar_xdr::curr`.

pub mod codec;
pub mod convert;
pub mod ledger;
pub mod result;
pub mod transaction;

pub use codec::{decode, decode_base64, encode, encode_base64, XdrError, MAX_DECODE_LEN};
pub use convert::{muxed_account, muxed_account_key, FromXdr, ToXdr, TrustLine};
pub use ledger::{account_entry, account_key, account_sequence};
pub use result::{ResultSummary, TransactionResultCode};
pub use stellar_xdr::curr as xdr;
pub use transaction::{envelope, operation_name, time_bounds, v1_envelope, MAX_OPERATIONS};
