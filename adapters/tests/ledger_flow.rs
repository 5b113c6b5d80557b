#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::indexing_slicing)]

use std::sync::Arc;

use futures::future::join_all;
use rust_decimal::Decimal;
use time::OffsetDateTime;

use domain::account::UserId;
use domain::ledger::{LedgerReference, TransactionType};
use domain::payment::{PaymentId, PaymentRecord, PaymentStatus};
use domain::session::SessionStatus;

use intervox_adapters::outgoing::memory::{
    ledger_store_memory::MemoryLedgerStoreAdapter,
    payment_store_memory::MemoryPaymentStoreAdapter,
    session_store_memory::MemorySessionStoreAdapter,
};
use intervox_application::config::BillingSettings;
use intervox_application::contracts::credits::PurchaseOutcome;
use intervox_application::contracts::sessions::{
    EndTrigger, ReportedOutcome, SessionEndOutcome, SessionEndReport,
};
use intervox_application::credits::service::CreditService;
use intervox_application::error::AppError;
use intervox_application::ports::incoming::credits::HistoryQuery;
use intervox_application::ports::outgoing::ledger_store::DynLedgerStorePort;
use intervox_application::ports::outgoing::session_store::SessionStorePort;
use intervox_application::sessions::service::SessionService;

struct Stack {
    credit_service: Arc<CreditService>,
    session_service: Arc<SessionService>,
    ledger_store: Arc<MemoryLedgerStoreAdapter>,
    session_store: Arc<MemorySessionStoreAdapter>,
    payment_store: Arc<MemoryPaymentStoreAdapter>,
}

fn settings() -> BillingSettings {
    BillingSettings {
        history_default_limit: 20,
        history_max_limit: 100,
        stale_reservation_ttl_secs: 3600,
        stale_sweep_batch_size: 100,
    }
}

fn stack_with_settings(settings: BillingSettings) -> Stack {
    let ledger_store = Arc::new(MemoryLedgerStoreAdapter::new());
    let session_store = Arc::new(MemorySessionStoreAdapter::new());
    let payment_store = Arc::new(MemoryPaymentStoreAdapter::new());

    let credit_service = CreditService::new(
        settings.clone(),
        Arc::clone(&ledger_store) as DynLedgerStorePort,
        Arc::clone(&session_store) as _,
        Arc::clone(&payment_store) as _,
    );
    let session_service = SessionService::new(
        settings,
        Arc::clone(&ledger_store) as DynLedgerStorePort,
        Arc::clone(&session_store) as _,
    );

    Stack {
        credit_service,
        session_service,
        ledger_store,
        session_store,
        payment_store,
    }
}

fn stack() -> Stack {
    stack_with_settings(settings())
}

fn completed_payment(user_id: &UserId, credits: i64) -> PaymentRecord {
    PaymentRecord {
        id: PaymentId::new(),
        user_id: *user_id,
        credits: Decimal::from(credits),
        receipt_number: Some("R-1001".to_string()),
        status: PaymentStatus::Completed,
        credited_at: None,
        created_at: OffsetDateTime::now_utc(),
    }
}

async fn fund_user(stack: &Stack, user_id: &UserId, credits: i64) {
    let payment = completed_payment(user_id, credits);
    stack.payment_store.insert_payment(payment.clone());
    let outcome = stack
        .credit_service
        .credit_completed_payment(&payment.id)
        .await
        .unwrap();
    assert!(matches!(outcome, PurchaseOutcome::Credited { .. }));
}

fn webhook_report(elapsed_seconds: u64) -> SessionEndReport {
    SessionEndReport {
        trigger: EndTrigger::ProviderWebhook,
        outcome: ReportedOutcome::Completed,
        elapsed_seconds: Some(elapsed_seconds),
    }
}

#[tokio::test]
async fn happy_path_blocks_then_settles_with_partial_refund() {
    let stack = stack();
    let user_id = UserId::new();
    fund_user(&stack, &user_id, 100).await;

    let started = stack
        .session_service
        .start_interview(&user_id, 5)
        .await
        .unwrap();
    assert_eq!(started.blocked_credits, Decimal::from(50));
    assert_eq!(started.new_balance.available_credits, Decimal::from(50));
    assert_eq!(started.new_balance.blocked_credits, Decimal::from(50));

    // 180 s of usage at 10 credits/min: 30 credits charged, 20 returned.
    let outcome = stack
        .session_service
        .end_interview(&started.session.id, webhook_report(180))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        SessionEndOutcome::Settled {
            credits_deducted: Decimal::from(30),
            credits_refunded: Decimal::from(20),
            new_balance: stack.credit_service.get_balance(&user_id).await.unwrap(),
        }
    );

    let balance = stack.credit_service.get_balance(&user_id).await.unwrap();
    assert_eq!(balance.credits, Decimal::from(70));
    assert_eq!(balance.blocked_credits, Decimal::ZERO);
    assert_eq!(balance.available_credits, Decimal::from(70));

    let session = stack
        .session_store
        .get_session(&started.session.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.credits.credits_deducted, Some(Decimal::from(30)));
    assert_eq!(session.credits.credits_refunded, Some(Decimal::from(20)));
    assert!(session.credits.conserves_blocked_amount());

    // Newest first: refund(+20), deduct(-30), block(-50), purchase(+100).
    let history = stack
        .credit_service
        .list_transactions(&user_id, HistoryQuery::default())
        .await
        .unwrap();
    let kinds_and_amounts: Vec<(TransactionType, Decimal)> = history
        .transactions
        .iter()
        .map(|view| (view.entry.transaction_type, view.entry.amount))
        .collect();
    assert_eq!(
        kinds_and_amounts,
        vec![
            (TransactionType::Refund, Decimal::from(20)),
            (TransactionType::Deduct, Decimal::from(-30)),
            (TransactionType::Block, Decimal::from(-50)),
            (TransactionType::Purchase, Decimal::from(100)),
        ]
    );
}

#[tokio::test]
async fn duplicate_settlement_triggers_change_the_balance_once() {
    let stack = stack();
    let user_id = UserId::new();
    fund_user(&stack, &user_id, 100).await;

    let started = stack
        .session_service
        .start_interview(&user_id, 5)
        .await
        .unwrap();

    let first = stack
        .session_service
        .end_interview(&started.session.id, webhook_report(180))
        .await
        .unwrap();
    assert!(matches!(first, SessionEndOutcome::Settled { .. }));

    // The client fallback arrives late with a different measured duration.
    let fallback = SessionEndReport {
        trigger: EndTrigger::ClientFallback,
        outcome: ReportedOutcome::Completed,
        elapsed_seconds: Some(240),
    };
    let second = stack
        .session_service
        .end_interview(&started.session.id, fallback)
        .await
        .unwrap();
    assert_eq!(second, SessionEndOutcome::AlreadySettled);

    let balance = stack.credit_service.get_balance(&user_id).await.unwrap();
    assert_eq!(balance.credits, Decimal::from(70));
    assert_eq!(balance.available_credits, Decimal::from(70));
}

#[tokio::test]
async fn insufficient_credits_reports_shortfall() {
    let stack = stack();
    let user_id = UserId::new();
    fund_user(&stack, &user_id, 20).await;

    let err = stack
        .session_service
        .start_interview(&user_id, 5)
        .await
        .unwrap_err();
    match err {
        AppError::InsufficientCredits { available, needed } => {
            assert_eq!(available, Decimal::from(20));
            assert_eq!(needed, Decimal::from(50));
        }
        other => panic!("expected InsufficientCredits, got {other:?}"),
    }

    // Nothing was reserved by the failed attempt.
    let balance = stack.credit_service.get_balance(&user_id).await.unwrap();
    assert_eq!(balance.blocked_credits, Decimal::ZERO);
    assert_eq!(balance.available_credits, Decimal::from(20));
}

#[tokio::test]
async fn failed_call_refunds_the_full_reservation() {
    let stack = stack();
    let user_id = UserId::new();
    fund_user(&stack, &user_id, 100).await;

    let started = stack
        .session_service
        .start_interview(&user_id, 5)
        .await
        .unwrap();

    let report = SessionEndReport {
        trigger: EndTrigger::ProviderWebhook,
        outcome: ReportedOutcome::Failed,
        elapsed_seconds: None,
    };
    let outcome = stack
        .session_service
        .end_interview(&started.session.id, report)
        .await
        .unwrap();
    assert!(matches!(outcome, SessionEndOutcome::Refunded { .. }));

    // Balance identical to the pre-block state.
    let balance = stack.credit_service.get_balance(&user_id).await.unwrap();
    assert_eq!(balance.credits, Decimal::from(100));
    assert_eq!(balance.blocked_credits, Decimal::ZERO);

    let history = stack
        .credit_service
        .list_transactions(&user_id, HistoryQuery::default())
        .await
        .unwrap();
    assert_eq!(
        history.transactions[0].entry.transaction_type,
        TransactionType::Refund
    );
    assert_eq!(history.transactions[0].entry.amount, Decimal::from(50));
    assert_eq!(
        history.transactions[1].entry.transaction_type,
        TransactionType::Block
    );

    let session = stack
        .session_store
        .get_session(&started.session.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.status, SessionStatus::Failed);
}

#[tokio::test]
async fn settlement_never_charges_beyond_the_reservation() {
    let stack = stack();
    let user_id = UserId::new();
    fund_user(&stack, &user_id, 100).await;

    // 3 minutes blocked (30 credits), but the provider reports 300 s
    // (50 credits): the charge is clamped to the reservation.
    let started = stack
        .session_service
        .start_interview(&user_id, 3)
        .await
        .unwrap();

    let outcome = stack
        .session_service
        .end_interview(&started.session.id, webhook_report(300))
        .await
        .unwrap();
    match outcome {
        SessionEndOutcome::Settled {
            credits_deducted,
            credits_refunded,
            ..
        } => {
            assert_eq!(credits_deducted, Decimal::from(30));
            assert_eq!(credits_refunded, Decimal::ZERO);
        }
        other => panic!("expected Settled, got {other:?}"),
    }

    let balance = stack.credit_service.get_balance(&user_id).await.unwrap();
    assert_eq!(balance.credits, Decimal::from(70));
}

#[tokio::test]
async fn concurrent_blocks_cannot_overdraw_the_balance() {
    let stack = stack();
    let user_id = UserId::new();
    // Room for exactly three 30-credit reservations.
    fund_user(&stack, &user_id, 90).await;

    let ledger: DynLedgerStorePort = Arc::clone(&stack.ledger_store) as _;
    let attempts = (0..4).map(|_| {
        let ledger = Arc::clone(&ledger);
        let user_id = user_id;
        async move {
            let reference = LedgerReference::interview(&domain::session::SessionId::new());
            ledger
                .block_credits(&user_id, Decimal::from(30), &reference)
                .await
        }
    });

    let results = join_all(attempts).await;
    let successes = results.iter().filter(|result| result.is_ok()).count();
    let shortfalls = results
        .iter()
        .filter(|result| {
            matches!(
                result,
                Err(AppError::InsufficientCredits { available, .. })
                    if *available == Decimal::ZERO
            )
        })
        .count();

    assert_eq!(successes, 3);
    assert_eq!(shortfalls, 1);

    let balance = stack.credit_service.get_balance(&user_id).await.unwrap();
    assert_eq!(balance.blocked_credits, Decimal::from(90));
    assert_eq!(balance.available_credits, Decimal::ZERO);
}

#[tokio::test]
async fn duplicate_payment_notifications_credit_once() {
    let stack = stack();
    let user_id = UserId::new();

    let payment = completed_payment(&user_id, 160);
    stack.payment_store.insert_payment(payment.clone());

    let first = stack
        .credit_service
        .credit_completed_payment(&payment.id)
        .await
        .unwrap();
    assert!(matches!(first, PurchaseOutcome::Credited { .. }));

    let second = stack
        .credit_service
        .credit_completed_payment(&payment.id)
        .await
        .unwrap();
    assert_eq!(second, PurchaseOutcome::AlreadyCredited);

    let balance = stack.credit_service.get_balance(&user_id).await.unwrap();
    assert_eq!(balance.credits, Decimal::from(160));
}

#[tokio::test]
async fn session_end_without_usage_data_keeps_the_reservation() {
    let stack = stack();
    let user_id = UserId::new();
    fund_user(&stack, &user_id, 100).await;

    let started = stack
        .session_service
        .start_interview(&user_id, 5)
        .await
        .unwrap();

    let report = SessionEndReport {
        trigger: EndTrigger::ClientFallback,
        outcome: ReportedOutcome::Completed,
        elapsed_seconds: None,
    };
    let outcome = stack
        .session_service
        .end_interview(&started.session.id, report)
        .await
        .unwrap();
    assert_eq!(outcome, SessionEndOutcome::AwaitingUsageData);

    // No charge was guessed; the reservation stays for manual follow-up.
    let balance = stack.credit_service.get_balance(&user_id).await.unwrap();
    assert_eq!(balance.blocked_credits, Decimal::from(50));
}

#[tokio::test]
async fn stale_reservations_are_reclaimed_by_the_sweep() {
    let stack = stack_with_settings(BillingSettings {
        stale_reservation_ttl_secs: 0,
        ..settings()
    });
    let user_id = UserId::new();
    fund_user(&stack, &user_id, 100).await;

    let started = stack
        .session_service
        .start_interview(&user_id, 5)
        .await
        .unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(10)).await;

    let report = stack
        .session_service
        .reclaim_stale_reservations()
        .await
        .unwrap();
    assert_eq!(report.sessions_released, 1);
    assert_eq!(report.credits_released, Decimal::from(50));

    let balance = stack.credit_service.get_balance(&user_id).await.unwrap();
    assert_eq!(balance.credits, Decimal::from(100));
    assert_eq!(balance.blocked_credits, Decimal::ZERO);

    let session = stack
        .session_store
        .get_session(&started.session.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.status, SessionStatus::Expired);

    // A late webhook after the sweep observes the refunded settlement.
    let late = stack
        .session_service
        .end_interview(&started.session.id, webhook_report(180))
        .await
        .unwrap();
    assert_eq!(late, SessionEndOutcome::AlreadySettled);
}

#[tokio::test]
async fn history_pagination_and_type_filter() {
    let stack = stack();
    let user_id = UserId::new();
    fund_user(&stack, &user_id, 1000).await;

    for _ in 0..3 {
        let started = stack
            .session_service
            .start_interview(&user_id, 3)
            .await
            .unwrap();
        stack
            .session_service
            .end_interview(&started.session.id, webhook_report(90))
            .await
            .unwrap();
    }

    let blocks = stack
        .credit_service
        .list_transactions(
            &user_id,
            HistoryQuery {
                transaction_type: Some(TransactionType::Block),
                ..HistoryQuery::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(blocks.total, 3);
    assert!(blocks
        .transactions
        .iter()
        .all(|view| view.entry.transaction_type == TransactionType::Block));

    let page = stack
        .credit_service
        .list_transactions(
            &user_id,
            HistoryQuery {
                limit: Some(2),
                ..HistoryQuery::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(page.transactions.len(), 2);
    assert!(page.has_more);
    // purchase + 3 * (block, deduct, refund)
    assert_eq!(page.total, 10);
}
