//! Integration tests for the credits ledger: idempotent spend, balance
//! derivation, and the cached-mirror invariant.

mod common;

use common::{enqueue_task, seed_project, seed_user, seed_worker};
use medialoom_db::models::ledger::{LedgerEntryType, RecordCredit};
use medialoom_db::repositories::{LedgerRepo, TaskRepo, UserRepo};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Spend idempotence
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn spend_is_recorded_exactly_once(pool: PgPool) {
    let user = seed_user(&pool, "alice@example.com", 10_000).await;
    let project = seed_project(&pool, &user).await;
    let task = enqueue_task(&pool, &project, "video_generation", vec![]).await;

    let first = LedgerRepo::record_spend(&pool, user.id, task.id, 420, serde_json::json!({}))
        .await
        .unwrap();
    assert!(first.is_some());
    assert_eq!(first.unwrap().amount, -420);

    // A duplicate costing request is a no-op, not a second debit.
    let second = LedgerRepo::record_spend(&pool, user.id, task.id, 420, serde_json::json!({}))
        .await
        .unwrap();
    assert!(second.is_none());

    assert_eq!(LedgerRepo::balance(&pool, user.id).await.unwrap(), 10_000 - 420);
    assert!(LedgerRepo::spend_exists(&pool, task.id).await.unwrap());
}

#[sqlx::test(migrations = "./migrations")]
async fn concurrent_duplicate_spends_debit_once(pool: PgPool) {
    let user = seed_user(&pool, "alice@example.com", 10_000).await;
    let project = seed_project(&pool, &user).await;
    let task = enqueue_task(&pool, &project, "video_generation", vec![]).await;

    let (a, b) = tokio::join!(
        LedgerRepo::record_spend(&pool, user.id, task.id, 500, serde_json::json!({})),
        LedgerRepo::record_spend(&pool, user.id, task.id, 500, serde_json::json!({})),
    );
    let wrote = [a.unwrap(), b.unwrap()]
        .iter()
        .filter(|entry| entry.is_some())
        .count();
    assert_eq!(wrote, 1, "exactly one spend entry must land");

    assert_eq!(LedgerRepo::balance(&pool, user.id).await.unwrap(), 9_500);
}

// ---------------------------------------------------------------------------
// Balance derivation and the cached mirror
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn balance_is_the_signed_sum_of_entries(pool: PgPool) {
    let user = seed_user(&pool, "alice@example.com", 0).await;

    for (amount, entry_type) in [
        (5_000, LedgerEntryType::Stripe),
        (1_000, LedgerEntryType::AutoTopup),
        (250, LedgerEntryType::Refund),
    ] {
        LedgerRepo::record_credit(
            &pool,
            &RecordCredit {
                user_id: user.id,
                task_id: None,
                amount,
                entry_type,
                metadata: serde_json::json!({}),
            },
        )
        .await
        .unwrap();
    }

    let project = seed_project(&pool, &user).await;
    let task = enqueue_task(&pool, &project, "video_generation", vec![]).await;
    LedgerRepo::record_spend(&pool, user.id, task.id, 1_300, serde_json::json!({}))
        .await
        .unwrap();

    let balance = LedgerRepo::balance(&pool, user.id).await.unwrap();
    assert_eq!(balance, 5_000 + 1_000 + 250 - 1_300);

    // The cached column tracks the ledger sum after every write.
    let row = UserRepo::find_by_id(&pool, user.id).await.unwrap().unwrap();
    assert_eq!(row.credits, balance);

    // Reconciliation is a fixpoint when nothing drifted.
    assert_eq!(LedgerRepo::reconcile_user(&pool, user.id).await.unwrap(), balance);
}

#[sqlx::test(migrations = "./migrations")]
async fn reconcile_repairs_a_drifted_cache(pool: PgPool) {
    let user = seed_user(&pool, "alice@example.com", 2_000).await;

    // Simulate drift in the cached mirror.
    sqlx::query("UPDATE users SET credits = 999999 WHERE id = $1")
        .bind(user.id)
        .execute(&pool)
        .await
        .unwrap();

    let reconciled = LedgerRepo::reconcile_user(&pool, user.id).await.unwrap();
    assert_eq!(reconciled, 2_000);
}

// ---------------------------------------------------------------------------
// Entry listing
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn entries_list_newest_first(pool: PgPool) {
    let user = seed_user(&pool, "alice@example.com", 1_000).await;

    LedgerRepo::record_credit(
        &pool,
        &RecordCredit {
            user_id: user.id,
            task_id: None,
            amount: 300,
            entry_type: LedgerEntryType::Manual,
            metadata: serde_json::json!({ "note": "grant" }),
        },
    )
    .await
    .unwrap();

    let entries = LedgerRepo::list_for_user(&pool, user.id, None, None).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].amount, 300);
    assert_eq!(entries[0].entry_type, "manual");
}

// ---------------------------------------------------------------------------
// Spend frees no slot until recorded: claim + spend interplay
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn spending_down_to_zero_blocks_further_claims(pool: PgPool) {
    let user = seed_user(&pool, "alice@example.com", 400).await;
    let project = seed_project(&pool, &user).await;
    let worker = seed_worker(&pool, "gpu-01").await;

    let first = enqueue_task(&pool, &project, "video_generation", vec![]).await;
    enqueue_task(&pool, &project, "video_generation", vec![]).await;

    TaskRepo::claim_next(&pool, worker.id, None, None).await.unwrap().unwrap();
    TaskRepo::complete(&pool, first.id, "s3://outputs/1.mp4")
        .await
        .unwrap()
        .unwrap();
    LedgerRepo::record_spend(&pool, user.id, first.id, 400, serde_json::json!({}))
        .await
        .unwrap();

    // Balance hit zero: admission blocks the second task.
    let next = TaskRepo::claim_next(&pool, worker.id, None, None).await.unwrap();
    assert!(next.is_none());
}
