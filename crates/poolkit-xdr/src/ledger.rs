//! Ledger keys and account entries as exchanged with the RPC endpoint.

use poolkit_types::{Amount, PublicKey, SequenceNumber};
use stellar_xdr::curr as xdr;

use crate::codec::XdrError;
use crate::convert::{FromXdr, ToXdr};

pub fn account_key(account: &PublicKey) -> xdr::LedgerKey {
    xdr::LedgerKey::Account(xdr::LedgerKeyAccount {
        account_id: account.to_xdr_value(),
    })
}

/// A fresh account entry: no sub-entries, master weight 1, no signers.
pub fn account_entry(
    account: &PublicKey,
    balance: Amount,
    seq_num: SequenceNumber,
    num_sub_entries: u32,
) -> xdr::LedgerEntryData {
    xdr::LedgerEntryData::Account(xdr::AccountEntry {
        account_id: account.to_xdr_value(),
        balance: balance.stroops(),
        seq_num: xdr::SequenceNumber(seq_num),
        num_sub_entries,
        inflation_dest: None,
        flags: 0,
        home_domain: Default::default(),
        thresholds: xdr::Thresholds([1, 0, 0, 0]),
        signers: Default::default(),
        ext: xdr::AccountEntryExt::V0,
    })
}

/// Account id and sequence number of an account entry.
pub fn account_sequence(
    entry: &xdr::LedgerEntryData,
) -> Result<(PublicKey, SequenceNumber), XdrError> {
    match entry {
        xdr::LedgerEntryData::Account(account) => Ok((
            PublicKey::from_xdr_value(&account.account_id)?,
            account.seq_num.0,
        )),
        other => Err(XdrError::Unsupported {
            kind: "ledger entry",
            detail: other.name().to_string(),
        }),
    }
}
