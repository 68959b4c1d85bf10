//! Golden vectors pinning key, pool id, and transaction hash encodings.

use poolkit_crypto::{compute_tx_hash, derive_pool_id, network_id, Keypair, TESTNET_PASSPHRASE};
use poolkit_types::{Amount, Asset, LiquidityPoolDescriptor, PoolId, PublicKey};
use poolkit_xdr::xdr::{
    LiquidityPoolWithdrawOp, Memo, Operation, OperationBody, Preconditions, SequenceNumber,
    TimeBounds, TimePoint, Transaction, TransactionExt,
};
use poolkit_xdr::{muxed_account, ToXdr};

const SEED: [u8; 32] = [0x11; 32];

#[test]
fn keypair_strkeys() {
    let keypair = Keypair::from_seed(SEED);
    assert_eq!(
        hex::encode(keypair.public_key().as_bytes()),
        "d04ab232742bb4ab3a1368bd4615e4e6d0224ab71a016baf8520a332c9778737"
    );
    assert_eq!(
        keypair.public_key().to_strkey(),
        "GDIEVMRSOQV3JKZ2CNUL2RQV4TTNAISKW4NAC25PQUQKGMWJO6DTOAE7"
    );
    assert_eq!(
        keypair.secret_seed(),
        "SAIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRCEIRDBNT"
    );
}

#[test]
fn pool_id_for_native_and_session_asset() {
    let issuer = Keypair::from_seed(SEED).public_key();
    let descriptor = LiquidityPoolDescriptor::constant_product(
        Asset::Native,
        Asset::credit("FOO", issuer).unwrap(),
    )
    .unwrap();
    assert_eq!(
        derive_pool_id(&descriptor).unwrap().to_hex(),
        "ed8ad6712339cf33618e41f4b8eba7dd2517bf4b786434878df8f56d00352bde"
    );
}

#[test]
fn pool_id_for_two_credit_assets() {
    let arst = Asset::credit(
        "ARST",
        PublicKey::from_strkey("GB7TAYRUZGE6TVT7NHP5SMIZRNQA6PLM423EYISAOAP3MKYIQMVYP2JO").unwrap(),
    )
    .unwrap();
    let usd = Asset::credit(
        "USD",
        PublicKey::from_strkey("GDGU5OAPHNPU5UCLE5RDJHG7PXZFQYWKCFOEXSXNMR6KRQRI5T6XXCD7").unwrap(),
    )
    .unwrap();
    let descriptor = LiquidityPoolDescriptor::constant_product(arst, usd).unwrap();
    assert_eq!(
        derive_pool_id(&descriptor).unwrap().to_hex(),
        "674f1dd22b4e644bbd3121dc1d88fa3fbbeb54369a7855d929cb22208491239c"
    );
}

#[test]
fn withdraw_transaction_hash_and_signature() {
    let keypair = Keypair::from_seed(SEED);
    let tx = Transaction {
        source_account: muxed_account(&keypair.public_key()),
        fee: 100,
        seq_num: SequenceNumber(5),
        cond: Preconditions::Time(TimeBounds {
            min_time: TimePoint(0),
            max_time: TimePoint(1_700_000_030),
        }),
        memo: Memo::None,
        operations: vec![Operation {
            source_account: None,
            body: OperationBody::LiquidityPoolWithdraw(LiquidityPoolWithdrawOp {
                liquidity_pool_id: PoolId::new([0x44; 32]).to_xdr_value(),
                amount: Amount::from_stroops(100_000_000).stroops(),
                min_amount_a: Amount::ZERO.stroops(),
                min_amount_b: Amount::ZERO.stroops(),
            }),
        }]
        .try_into()
        .unwrap(),
        ext: TransactionExt::V0,
    };
    let hash = compute_tx_hash(&network_id(TESTNET_PASSPHRASE), &tx).unwrap();
    assert_eq!(
        hash.to_hex(),
        "31d6e384edc6409d2c2b47d515137bafec69031dfd3b5a40cd62525a1abb6e08"
    );
    assert_eq!(
        hex::encode(keypair.sign(hash.as_bytes())),
        "2b87f6b25c7e040a58aeec28e287be2575ad849acc2521a60f12624a38d9b6d36aa876147deda56dd5093e0e087b57e85956b663fb0da1ff9efd7cf27fd8590b"
    );
}
