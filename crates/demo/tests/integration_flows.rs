//! End-to-end pool flows over the shared in-memory ledger: multiple sessions,
//! policy overrides, and ledger-side rejections.

use std::sync::{Arc, Mutex};

use poolkit_client::{
    build_deposit, build_withdraw, Action, CreatePoolRequest, DepositParams, ErrorKind,
    LedgerClient, LedgerError, MockFaucet, MockLedgerClient, NetworkConfig, PriceBound, Stage,
    WithdrawMinimums, WithdrawParams, WithdrawRequest, WorkflowController, WorkflowError,
    WorkflowPolicy,
};
use poolkit_crypto::{derive_pool_id, sign_transaction, verify_source_signature, Keypair};
use poolkit_ledger_mock::{MockLedger, PoolScenario, SCENARIO_CLOCK};
use poolkit_types::{Amount, TxHash};
use poolkit_xdr::TransactionResultCode;

fn shared_ledger() -> Arc<Mutex<MockLedger>> {
    Arc::new(Mutex::new(MockLedger::testnet()))
}

fn controller(
    ledger: &Arc<Mutex<MockLedger>>,
    config: NetworkConfig,
) -> WorkflowController<MockLedgerClient, MockFaucet> {
    WorkflowController::new(
        MockLedgerClient::shared(Arc::clone(ledger)),
        MockFaucet::new(Arc::clone(ledger)),
        config,
    )
}

fn rejection_reason(err: &WorkflowError) -> &str {
    match err {
        WorkflowError::Ledger(LedgerError::Rejected { reason, .. }) => reason,
        other => panic!("expected a ledger rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn two_sessions_create_independent_pools() {
    let ledger = shared_ledger();
    let alice = controller(&ledger, NetworkConfig::testnet());
    let bob = controller(&ledger, NetworkConfig::testnet());

    for session in [&alice, &bob] {
        session.generate_keypair();
        session.fund_account().await.unwrap();
        session
            .create_pool(&CreatePoolRequest::new("FOO", "100", "50"))
            .await
            .unwrap();
    }

    // Same code, different issuers: different pools.
    let alice_pool = alice.snapshot().pool_id.unwrap();
    let bob_pool = bob.snapshot().pool_id.unwrap();
    assert_ne!(alice_pool, bob_pool);

    // Bob cannot withdraw from Alice's pool without holding its shares.
    let err = bob
        .withdraw(&WithdrawRequest::new("1").with_pool_id(alice_pool.to_hex()))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SubmissionRejected);
    assert!(rejection_reason(&err).contains("no trust"));

    let ledger = ledger.lock().unwrap();
    assert!(ledger.pool(&alice_pool).is_some());
    assert!(ledger.pool(&bob_pool).is_some());
}

#[tokio::test]
async fn full_withdrawal_drains_reserves() {
    let ledger = shared_ledger();
    let session = controller(&ledger, NetworkConfig::testnet());
    let public_key = session.generate_keypair();
    session.fund_account().await.unwrap();
    session
        .create_pool(&CreatePoolRequest::new("FULL", "16", "4"))
        .await
        .unwrap();
    let pool_id = session.snapshot().pool_id.unwrap();

    // Initial shares are the geometric mean of the deposits: sqrt(16 * 4) = 8.
    let shares = ledger
        .lock()
        .unwrap()
        .pool_shares(&public_key, &pool_id)
        .unwrap();
    assert_eq!(shares, Amount::parse("8").unwrap().stroops());

    session.withdraw(&WithdrawRequest::new("8")).await.unwrap();
    let ledger = ledger.lock().unwrap();
    let pool = ledger.pool(&pool_id).unwrap();
    assert_eq!(pool.total_shares, 0);
    assert_eq!(pool.reserve_a, 0);
    assert_eq!(pool.reserve_b, 0);
    assert_eq!(session.stage(), Stage::PoolCreated);
}

#[tokio::test]
async fn low_base_fee_is_rejected() {
    let ledger = shared_ledger();
    let config = NetworkConfig {
        base_fee: 10,
        ..NetworkConfig::testnet()
    };
    let session = controller(&ledger, config);
    session.generate_keypair();
    session.fund_account().await.unwrap();

    let err = session
        .create_pool(&CreatePoolRequest::new("FOO", "100", "50"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SubmissionRejected);
    assert!(rejection_reason(&err).starts_with("txINSUFFICIENT_FEE"));
    assert_eq!(session.stage(), Stage::Funded);
}

#[tokio::test]
async fn withdraw_minimums_are_enforced() {
    let ledger = shared_ledger();
    let policy = WorkflowPolicy {
        withdraw_minimums: WithdrawMinimums {
            min_amount_a: Amount::parse("1000").unwrap(),
            min_amount_b: Amount::ZERO,
        },
        ..WorkflowPolicy::default()
    };
    let session = controller(&ledger, NetworkConfig::testnet()).with_policy(policy);
    session.generate_keypair();
    session.fund_account().await.unwrap();
    session
        .create_pool(&CreatePoolRequest::new("FOO", "100", "50"))
        .await
        .unwrap();

    let err = session
        .withdraw(&WithdrawRequest::new("1"))
        .await
        .unwrap_err();
    assert!(rejection_reason(&err).contains("under minimum"));
    assert!(session
        .snapshot()
        .error_message(Action::Withdraw)
        .unwrap()
        .starts_with("Error withdrawing from Liquidity Pool"));
}

#[tokio::test]
async fn pool_fee_policy_reaches_the_ledger() {
    let ledger = shared_ledger();
    let session = controller(&ledger, NetworkConfig::testnet()).with_policy(WorkflowPolicy {
        pool_fee_bp: 10,
        ..WorkflowPolicy::default()
    });
    session.generate_keypair();
    session.fund_account().await.unwrap();
    session
        .create_pool(&CreatePoolRequest::new("FEE", "10", "10"))
        .await
        .unwrap();

    let pool_id = session.snapshot().pool_id.unwrap();
    let ledger = ledger.lock().unwrap();
    let pool = ledger.pool(&pool_id).unwrap();
    assert_eq!(pool.descriptor.fee(), 10);
    assert_eq!(derive_pool_id(&pool.descriptor).unwrap(), pool_id);
}

#[tokio::test]
async fn tampered_signature_is_rejected() {
    let scenario = PoolScenario::new([21; 32], "SIG").unwrap();
    let client = MockLedgerClient::new(scenario.ledger.clone());
    let config = NetworkConfig::testnet();
    let params = DepositParams {
        descriptor: scenario.descriptor.clone(),
        pool_id: scenario.pool_id,
        max_amount_a: Amount::parse("10").unwrap(),
        max_amount_b: Amount::parse("10").unwrap(),
        price: PriceBound::default(),
    };

    assert_eq!(
        client.with_ledger(|ledger| ledger.close_time()).unwrap(),
        SCENARIO_CLOCK
    );
    let signed = build_deposit(&client, &config, &scenario.keypair, &params)
        .await
        .unwrap();
    assert_eq!(
        verify_source_signature(&config.network_id(), &signed.envelope).unwrap(),
        signed.hash
    );

    // Re-sign the same body with a different key.
    let intruder = Keypair::from_seed([99; 32]);
    let (_, forged) =
        sign_transaction(&intruder, &config.network_id(), signed.envelope.tx.clone()).unwrap();
    let err = client.send_transaction(&forged).await.unwrap_err();
    match err {
        LedgerError::Rejected { reason, .. } => {
            assert!(reason.starts_with(TransactionResultCode::BadAuth.name()), "{reason}")
        }
        other => panic!("unexpected error {other:?}"),
    }

    let accepted = client.send_transaction(&signed.envelope).await.unwrap();
    assert_eq!(accepted.hash, signed.hash);
}

#[tokio::test]
async fn withdraw_builder_consumes_next_sequence() {
    let scenario = PoolScenario::new([22; 32], "SEQ").unwrap();
    let client = MockLedgerClient::new(scenario.ledger.clone());
    let config = NetworkConfig::testnet();
    let deposit = DepositParams {
        descriptor: scenario.descriptor.clone(),
        pool_id: scenario.pool_id,
        max_amount_a: Amount::parse("4").unwrap(),
        max_amount_b: Amount::parse("9").unwrap(),
        price: PriceBound::default(),
    };

    let signed = build_deposit(&client, &config, &scenario.keypair, &deposit)
        .await
        .unwrap();
    client.send_transaction(&signed.envelope).await.unwrap();
    let after_deposit = client
        .get_account(&scenario.keypair.public_key())
        .await
        .unwrap()
        .sequence;
    assert_eq!(after_deposit, signed.envelope.tx.seq_num.0);

    let withdraw = WithdrawParams {
        pool_id: scenario.pool_id,
        amount: Amount::parse("6").unwrap(),
        minimums: WithdrawMinimums::default(),
    };
    let signed = build_withdraw(&client, &config, &scenario.keypair, &withdraw)
        .await
        .unwrap();
    assert_eq!(signed.envelope.tx.seq_num.0, after_deposit + 1);
    let result = client.send_transaction(&signed.envelope).await.unwrap();
    assert_ne!(result.hash, TxHash::new([0; 32]));

    let shares = client
        .with_ledger(|ledger| ledger.pool_shares(&scenario.keypair.public_key(), &scenario.pool_id))
        .unwrap();
    assert_eq!(shares, Some(0));
}
