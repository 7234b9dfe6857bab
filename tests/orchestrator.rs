mod utils;

use std::rc::Rc;
use std::time::Duration;

use alloy_primitives::U256;
use amplify::s;
use rstest::rstest;
use stories::{
    Action, FailureKind, MemStore, Plan, PriceQuote, Profile, ReadError, SignError,
    SimulationError, Stage, TransactionOrchestrator, TransactionOutcome, WalletSession,
};
use tokio::sync::Notify;
use tokio::task::LocalSet;
use tokio::time::sleep;

use crate::utils::chain::{MockChain, MockSigner, QuoteScript, ReceiptScript};
use crate::utils::{config, milli, premium, tx_hash, CHAIN_ID, USER};

fn session(signer: &MockSigner) -> WalletSession<&MockSigner> {
    WalletSession::connected(USER, CHAIN_ID, signer)
}

fn signer() -> MockSigner { MockSigner::new(Ok(tx_hash())) }

#[tokio::test]
async fn confirmed_subscription() {
    let chain = MockChain::new(milli());
    let signer = signer();
    let orchestrator = TransactionOrchestrator::new(&chain);
    let action = premium();

    let outcome = orchestrator.execute(&action, &session(&signer)).await;

    assert_eq!(outcome, TransactionOutcome::Success {
        tx_hash: tx_hash(),
        amount_paid: U256::from(1_000_000_000_000_000u64),
    });
    assert_eq!(signer.calls.get(), 1);
    let signed = signer.signed.borrow();
    assert_eq!(signed[0].value(), milli());
    assert_eq!(signed[0].to(), config().stories);
    assert_eq!(signed[0].from(), USER);
    assert_eq!(orchestrator.stage(action.id()), Stage::Succeeded);
    assert!(!orchestrator.is_busy(action.id()));
}

#[tokio::test]
async fn inactive_plan_is_never_signed() {
    let chain = MockChain::new(milli()).with_quote(QuoteScript::Reply(Ok(PriceQuote {
        price: milli(),
        active: false,
    })));
    let signer = signer();
    let orchestrator = TransactionOrchestrator::new(&chain);

    let outcome = orchestrator.execute(&premium(), &session(&signer)).await;

    assert_eq!(outcome.failure_kind(), Some(FailureKind::ActionInactive));
    assert_eq!(chain.simulations.get(), 0);
    assert_eq!(signer.calls.get(), 0);
}

#[rstest]
#[case(WalletSession::disconnected())]
#[case(WalletSession::new(Some(USER), Some(CHAIN_ID), None))]
#[case(WalletSession::new(None, Some(CHAIN_ID), Some(signer())))]
#[case(WalletSession::new(Some(USER), None, Some(signer())))]
#[tokio::test]
async fn not_ready_session_makes_no_calls(#[case] session: WalletSession<MockSigner>) {
    let chain = MockChain::new(milli());
    let orchestrator = TransactionOrchestrator::new(&chain);

    let outcome = orchestrator.execute(&premium(), &session).await;

    assert_eq!(outcome.failure_kind(), Some(FailureKind::NotConnected));
    assert_eq!(chain.network_calls(), 0);
}

#[tokio::test]
async fn wrong_network() {
    let chain = MockChain::new(milli());
    let signer = signer();
    let orchestrator = TransactionOrchestrator::new(&chain);
    let session = WalletSession::connected(USER, 1, &signer);

    let outcome = orchestrator.execute(&premium(), &session).await;

    assert_eq!(outcome.failure_kind(), Some(FailureKind::WrongNetwork));
    assert_eq!(chain.network_calls(), 0);
}

#[tokio::test]
async fn concurrent_attempt_is_rejected() {
    let gate = Rc::new(Notify::new());
    let chain = MockChain::new(milli()).with_quote(QuoteScript::Gated(gate.clone(), PriceQuote {
        price: milli(),
        active: true,
    }));
    let signer = signer();
    let orchestrator = TransactionOrchestrator::new(&chain);
    let action = premium();
    let session = session(&signer);

    let (first, second, _) = tokio::join!(
        orchestrator.execute(&action, &session),
        orchestrator.execute(&action, &session),
        async { gate.notify_one() }
    );

    assert!(first.is_success());
    assert_eq!(second.failure_kind(), Some(FailureKind::Busy));
    assert_eq!(chain.quotes.get(), 1);
    assert_eq!(chain.simulations.get(), 1);
    assert_eq!(signer.calls.get(), 1);
    assert_eq!(orchestrator.stage(action.id()), Stage::Succeeded);
}

#[tokio::test]
async fn unrelated_actions_run_concurrently() {
    let gate = Rc::new(Notify::new());
    let chain = MockChain::new(milli()).with_quote(QuoteScript::Gated(gate.clone(), PriceQuote {
        price: milli(),
        active: true,
    }));
    let signer = signer();
    let orchestrator = TransactionOrchestrator::new(&chain);
    let session = session(&signer);
    let subscribe = premium();
    let todo = Action::create_todo(&config(), "water the plants");

    let (first, second, _) = tokio::join!(
        orchestrator.execute(&subscribe, &session),
        orchestrator.execute(&todo, &session),
        async { gate.notify_waiters() }
    );

    assert!(first.is_success());
    assert!(second.is_success());
    assert_eq!(signer.calls.get(), 2);
}

#[tokio::test(start_paused = true)]
async fn abandoned_attempt_releases_the_action() {
    let chain = MockChain::new(milli()).with_quote(QuoteScript::Hang);
    let signer = signer();
    let orchestrator = TransactionOrchestrator::with_timeouts(
        &chain,
        Duration::from_secs(60),
        Duration::from_secs(120),
        Duration::from_secs(2),
    );
    let action = premium();
    let session = session(&signer);

    let mut attempt = Box::pin(orchestrator.execute(&action, &session));
    tokio::select! {
        _ = &mut attempt => panic!("quote must hang"),
        _ = sleep(Duration::from_secs(1)) => {}
    }
    assert!(orchestrator.is_busy(action.id()));
    assert_eq!(orchestrator.stage(action.id()), Stage::Quoting);

    drop(attempt);
    assert!(!orchestrator.is_busy(action.id()));
    assert_eq!(orchestrator.stage(action.id()), Stage::Idle);
}

#[tokio::test]
async fn multi_period_subscription_pays_every_period() {
    let chain = MockChain::new(milli());
    let signer = signer();
    let orchestrator = TransactionOrchestrator::new(&chain);
    let action = Action::subscribe(&config(), 1, 3);

    let outcome = orchestrator.execute(&action, &session(&signer)).await;

    let amount = milli() * U256::from(3u64);
    assert_eq!(outcome, TransactionOutcome::Success {
        tx_hash: tx_hash(),
        amount_paid: amount,
    });
    assert_eq!(chain.simulated.borrow()[0].value(), amount);
    assert_eq!(signer.signed.borrow()[0].value(), amount);
}

#[tokio::test]
async fn overflowing_payment_is_never_signed() {
    let chain = MockChain::new(U256::MAX);
    let signer = signer();
    let orchestrator = TransactionOrchestrator::new(&chain);

    let outcome = orchestrator
        .execute(&Action::subscribe(&config(), 1, 2), &session(&signer))
        .await;

    assert_eq!(outcome.failure_kind(), Some(FailureKind::QuoteUnavailable));
    assert_eq!(chain.simulations.get(), 0);
    assert_eq!(signer.calls.get(), 0);
}

#[tokio::test]
async fn revert_is_never_signed() {
    let chain = MockChain::new(milli())
        .with_simulation(Err(SimulationError::Reverted(s!("Plan inactive"))));
    let signer = signer();
    let orchestrator = TransactionOrchestrator::new(&chain);
    let action = premium();

    let outcome = orchestrator.execute(&action, &session(&signer)).await;

    let TransactionOutcome::Failure(failure) = outcome else {
        panic!("simulation failure must not succeed");
    };
    assert_eq!(failure.kind, FailureKind::WouldRevert);
    assert_eq!(failure.reason.as_deref(), Some("Plan inactive"));
    assert!(failure.message.starts_with(&FailureKind::WouldRevert.to_string()));
    assert!(failure.message.contains("Plan inactive"));
    assert_eq!(signer.calls.get(), 0);
    assert_eq!(orchestrator.stage(action.id()), Stage::Failed(FailureKind::WouldRevert));
}

#[tokio::test]
async fn cancelled_subscription_keeps_plan() {
    let store = MemStore::new();
    let profile = Profile::new(&store);
    profile.set_plan(Plan::Free);

    let chain = MockChain::new(milli());
    let signer = MockSigner::new(Err(SignError::Rejected));
    let orchestrator = TransactionOrchestrator::new(&chain);

    let outcome = orchestrator.execute(&premium(), &session(&signer)).await;

    assert_eq!(outcome.failure_kind(), Some(FailureKind::UserRejected));
    assert!(FailureKind::UserRejected.is_benign());
    assert!(!profile.record_subscription(&outcome, Plan::Premium));
    assert_eq!(profile.plan(), Some(Plan::Free));
    assert_eq!(chain.receipts.get(), 0);
}

#[rstest]
#[case(SignError::Rejected, FailureKind::UserRejected)]
#[case(SignError::Disconnected, FailureKind::NotConnected)]
#[case(SignError::Failed(s!("nonce too low")), FailureKind::SubmissionError)]
#[tokio::test]
async fn signing_failures(#[case] err: SignError, #[case] kind: FailureKind) {
    let chain = MockChain::new(milli());
    let signer = MockSigner::new(Err(err));
    let orchestrator = TransactionOrchestrator::new(&chain);

    let outcome = orchestrator.execute(&premium(), &session(&signer)).await;

    assert_eq!(outcome.failure_kind(), Some(kind));
}

#[rstest]
#[case(QuoteScript::Reply(Err(ReadError::Connectivity)))]
#[case(QuoteScript::Reply(Err(ReadError::Malformed(s!("0x")))))]
#[case(QuoteScript::Hang)]
#[tokio::test(start_paused = true)]
async fn quote_unavailable(#[case] quote: QuoteScript) {
    let chain = MockChain::new(milli()).with_quote(quote);
    let signer = signer();
    let orchestrator = TransactionOrchestrator::with_config(&chain, &config());

    let outcome = orchestrator.execute(&premium(), &session(&signer)).await;

    assert_eq!(outcome.failure_kind(), Some(FailureKind::QuoteUnavailable));
    assert_eq!(chain.simulations.get(), 0);
    assert_eq!(signer.calls.get(), 0);
}

#[tokio::test(start_paused = true)]
async fn confirmation_timeout() {
    let chain = MockChain::new(milli()).with_receipt(ReceiptScript::NeverIncluded);
    let signer = signer();
    let orchestrator = TransactionOrchestrator::new(&chain);

    let outcome = orchestrator.execute(&premium(), &session(&signer)).await;

    assert_eq!(outcome.failure_kind(), Some(FailureKind::ConfirmationFailed));
    // one poll every 2 seconds within 120 seconds
    assert!((60..=61).contains(&chain.receipts.get()));
}

#[tokio::test(start_paused = true)]
async fn reverted_on_chain() {
    let chain = MockChain::new(milli()).with_receipt(ReceiptScript::IncludedAfter(3, false));
    let signer = signer();
    let orchestrator = TransactionOrchestrator::new(&chain);

    let outcome = orchestrator.execute(&premium(), &session(&signer)).await;

    assert_eq!(outcome.failure_kind(), Some(FailureKind::ConfirmationFailed));
    assert!(FailureKind::ConfirmationFailed.can_retry());
    assert_eq!(chain.receipts.get(), 4);
}

#[tokio::test]
async fn free_action_pays_nothing() {
    let chain = MockChain::new(U256::ZERO).with_quote(QuoteScript::Reply(Ok(PriceQuote::free())));
    let signer = signer();
    let orchestrator = TransactionOrchestrator::new(&chain);
    let action = Action::complete_todo(&config(), 7);

    let outcome = orchestrator.execute(&action, &session(&signer)).await;

    assert!(outcome.is_success());
    let simulated = chain.simulated.borrow();
    assert_eq!(simulated[0].value(), U256::ZERO);
    assert_eq!(simulated[0].to(), utils::TODO_LIST);
    assert_eq!(signer.signed.borrow()[0], simulated[0]);
}

#[tokio::test]
async fn spawned_attempt_keeps_outcome() {
    let orchestrator = Rc::new(TransactionOrchestrator::new(MockChain::new(milli())));
    let session = WalletSession::connected(USER, CHAIN_ID, signer());

    let outcome = LocalSet::new()
        .run_until(async {
            let handle = orchestrator.clone().spawn(premium(), session);
            handle.await.unwrap()
        })
        .await;

    assert!(outcome.is_success());
    assert_eq!(orchestrator.stage(premium().id()), Stage::Succeeded);
    assert_eq!(orchestrator.chain().quotes.get(), 1);
}
