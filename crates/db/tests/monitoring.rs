//! Integration tests for the monitoring repositories.
//!
//! Each test runs against a fresh migrated database via `#[sqlx::test]`.

use sqlx::PgPool;

use linkwatch_core::check_status::{STATUS_BROKEN, STATUS_OK};
use linkwatch_db::repositories::{GroupRepo, HistoryRepo, ItemRepo};

/// Insert a group row directly (creation belongs to the management layer,
/// so the repositories expose no create operation).
async fn seed_group(pool: &PgPool, name: &str, region: &str) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO variant_groups (name, region) VALUES ($1, $2) RETURNING id",
    )
    .bind(name)
    .bind(region)
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn seed_item(pool: &PgPool, group_id: i64, code: &str, region: &str) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO monitored_items (group_id, code, region, brand) \
         VALUES ($1, $2, $3, 'TestBrand') RETURNING id",
    )
    .bind(group_id)
    .bind(code)
    .bind(region)
    .fetch_one(pool)
    .await
    .unwrap()
}

// ---------------------------------------------------------------------------
// Batch sequence
// ---------------------------------------------------------------------------

#[sqlx::test]
async fn batch_seq_is_strictly_increasing(pool: PgPool) {
    let first = HistoryRepo::next_batch_seq(&pool).await.unwrap();
    let second = HistoryRepo::next_batch_seq(&pool).await.unwrap();
    assert!(second > first);
}

#[sqlx::test]
async fn batch_seq_has_no_duplicates_under_concurrency(pool: PgPool) {
    let mut handles = Vec::new();
    for _ in 0..20 {
        let pool = pool.clone();
        handles.push(tokio::spawn(async move {
            HistoryRepo::next_batch_seq(&pool).await.unwrap()
        }));
    }

    let mut seqs = Vec::new();
    for handle in handles {
        seqs.push(handle.await.unwrap());
    }

    let mut deduped = seqs.clone();
    deduped.sort_unstable();
    deduped.dedup();
    assert_eq!(deduped.len(), seqs.len(), "duplicate batch sequence issued");
}

// ---------------------------------------------------------------------------
// History records
// ---------------------------------------------------------------------------

#[sqlx::test]
async fn append_and_list_round_trip(pool: PgPool) {
    let seq = HistoryRepo::next_batch_seq(&pool).await.unwrap();

    HistoryRepo::append(
        &pool,
        seq,
        "B0TEST00001",
        "US",
        STATUS_OK,
        Some("B0PARENT001"),
        Some("primary"),
        "primary_api",
    )
    .await
    .unwrap();

    HistoryRepo::append(
        &pool,
        seq,
        "B0TEST00002",
        "US",
        STATUS_BROKEN,
        None,
        None,
        "page_scrape",
    )
    .await
    .unwrap();

    let records = HistoryRepo::list_for_batch(&pool, seq).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].code, "B0TEST00001");
    assert_eq!(records[0].status, STATUS_OK);
    assert_eq!(records[0].parent_code.as_deref(), Some("B0PARENT001"));
    assert_eq!(records[1].status, STATUS_BROKEN);
    assert!(records[1].parent_code.is_none());
}

#[sqlx::test]
async fn delete_older_than_prunes_only_old_rows(pool: PgPool) {
    let seq = HistoryRepo::next_batch_seq(&pool).await.unwrap();
    HistoryRepo::append(&pool, seq, "B0TEST00001", "US", STATUS_OK, None, None, "primary_api")
        .await
        .unwrap();

    // Cutoff in the past: nothing to prune.
    let deleted = HistoryRepo::delete_older_than(&pool, chrono::Utc::now() - chrono::Duration::days(1))
        .await
        .unwrap();
    assert_eq!(deleted, 0);

    // Cutoff in the future: the fresh row goes.
    let deleted = HistoryRepo::delete_older_than(&pool, chrono::Utc::now() + chrono::Duration::days(1))
        .await
        .unwrap();
    assert_eq!(deleted, 1);
}

// ---------------------------------------------------------------------------
// Item status writes
// ---------------------------------------------------------------------------

#[sqlx::test]
async fn set_check_status_updates_flags(pool: PgPool) {
    let group_id = seed_group(&pool, "Group A", "US").await;
    let item_id = seed_item(&pool, group_id, "B0TEST00001", "US").await;

    ItemRepo::set_check_status(&pool, item_id, true).await.unwrap();

    let item = ItemRepo::find_by_id(&pool, item_id).await.unwrap().unwrap();
    assert!(item.is_broken);
    assert!(item.last_check_time.is_some());
}

#[sqlx::test]
async fn list_for_group_returns_members_in_order(pool: PgPool) {
    let group_id = seed_group(&pool, "Group A", "US").await;
    let other_group = seed_group(&pool, "Group B", "US").await;
    seed_item(&pool, group_id, "B0TEST00001", "US").await;
    seed_item(&pool, group_id, "B0TEST00002", "US").await;
    seed_item(&pool, other_group, "B0TEST00003", "US").await;

    let items = ItemRepo::list_for_group(&pool, group_id).await.unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].code, "B0TEST00001");
    assert_eq!(items[1].code, "B0TEST00002");
}

// ---------------------------------------------------------------------------
// Group flag derivation
// ---------------------------------------------------------------------------

#[sqlx::test]
async fn recompute_broken_reflects_member_state(pool: PgPool) {
    let group_id = seed_group(&pool, "Group A", "US").await;
    let a = seed_item(&pool, group_id, "B0TEST00001", "US").await;
    seed_item(&pool, group_id, "B0TEST00002", "US").await;

    assert!(!GroupRepo::recompute_broken(&pool, group_id).await.unwrap());

    ItemRepo::set_check_status(&pool, a, true).await.unwrap();
    assert!(GroupRepo::recompute_broken(&pool, group_id).await.unwrap());

    let group = GroupRepo::find_by_id(&pool, group_id).await.unwrap().unwrap();
    assert!(group.is_broken);
}
