//! Integration tests for the PostgreSQL record store.

use lpms_core::analysis::{AnalysisFilter, GroupBy};
use lpms_core::error::CoreError;
use lpms_core::pagination::PageRequest;
use lpms_core::reserve::{NewReserve, ReserveFilter, ReserveStatus};
use lpms_core::store::{ListScope, ReserveStore};
use lpms_db::PgReserveStore;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn new_reserve(name: &str, project_type: &str) -> NewReserve {
    NewReserve {
        name: name.to_string(),
        level: "provincial".to_string(),
        project_type: project_type.to_string(),
        construct_subject: "county".to_string(),
        site_photo: None,
        upload_cad_id: None,
    }
}

async fn insert(store: &PgReserveStore, name: &str, owner: &str) -> i64 {
    let mut tx = store.begin().await.unwrap();
    let record = tx.insert(&new_reserve(name, "irrigation"), owner).await.unwrap();
    tx.commit().await.unwrap();
    record.id
}

// ---------------------------------------------------------------------------
// Units of work
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn insert_and_get(pool: PgPool) {
    let store = PgReserveStore::new(pool);
    let id = insert(&store, "Reservoir", "u1").await;

    let record = store.get(id).await.unwrap().unwrap();
    assert_eq!(record.name, "Reservoir");
    assert_eq!(record.status, ReserveStatus::Draft);
    assert_eq!(record.created_by, "u1");
    assert_eq!(record.updated_by, "u1");
    assert!(store.get(id + 1).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn uncommitted_changes_roll_back(pool: PgPool) {
    let store = PgReserveStore::new(pool);
    let id = insert(&store, "Reservoir", "u1").await;

    {
        let mut tx = store.begin().await.unwrap();
        let mut record = tx.lock(id).await.unwrap().unwrap();
        record.status = ReserveStatus::EnteredDb;
        tx.save(&record).await.unwrap();
        // dropped without commit
    }

    let record = store.get(id).await.unwrap().unwrap();
    assert_eq!(record.status, ReserveStatus::Draft);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn save_keeps_creation_columns(pool: PgPool) {
    let store = PgReserveStore::new(pool);
    let id = insert(&store, "Reservoir", "u1").await;

    let mut tx = store.begin().await.unwrap();
    let mut record = tx.lock(id).await.unwrap().unwrap();
    let created_at = record.created_at;
    record.name = "Reservoir II".into();
    record.updated_by = "u2".into();
    record.created_by = "intruder".into();
    record.is_research = true;
    let saved = tx.save(&record).await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(saved.name, "Reservoir II");
    assert_eq!(saved.updated_by, "u2");
    assert_eq!(saved.created_by, "u1");
    assert_eq!(saved.created_at, created_at);
    assert!(saved.is_research);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn remove_reports_missing_rows(pool: PgPool) {
    let store = PgReserveStore::new(pool);
    let id = insert(&store, "Reservoir", "u1").await;

    let mut tx = store.begin().await.unwrap();
    assert!(tx.remove(id).await.unwrap());
    assert!(!tx.remove(id).await.unwrap());
    tx.commit().await.unwrap();
    assert!(store.get(id).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_status_id_is_unmarshal_error(pool: PgPool) {
    let store = PgReserveStore::new(pool.clone());
    let id = insert(&store, "Reservoir", "u1").await;

    sqlx::query("INSERT INTO reserve_project_statuses (id, name, label) VALUES (9, 'legacy', 'Legacy')")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("UPDATE reserve_projects SET status_id = 9 WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .unwrap();

    let err = store.get(id).await.unwrap_err();
    assert!(matches!(err, CoreError::Unmarshal(_)));
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn list_scopes_filters_and_orders(pool: PgPool) {
    let store = PgReserveStore::new(pool);
    let first = insert(&store, "North dam", "u1").await;
    let second = insert(&store, "South dam", "u1").await;
    insert(&store, "Harbour", "u1").await;
    insert(&store, "Other dam", "u2").await;

    let filter = ReserveFilter {
        name: Some("DAM".into()),
        ..Default::default()
    };
    let (total, items) = store
        .list(&filter, PageRequest::default(), &ListScope::OwnedBy("u1".into()))
        .await
        .unwrap();
    assert_eq!(total, 2);
    let ids: Vec<_> = items.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![second, first]);

    let (total, items) = store
        .list(&filter, PageRequest::new(Some(1), Some(1)), &ListScope::All)
        .await
        .unwrap();
    assert_eq!(total, 3);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, second);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn list_name_filter_matches_wildcards_literally(pool: PgPool) {
    let store = PgReserveStore::new(pool);
    insert(&store, "Phase_1", "u1").await;
    insert(&store, "Phase21", "u1").await;

    let filter = ReserveFilter {
        name: Some("e_1".into()),
        ..Default::default()
    };
    let (total, items) = store
        .list(&filter, PageRequest::default(), &ListScope::All)
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(items[0].name, "Phase_1");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn list_filters_by_status(pool: PgPool) {
    let store = PgReserveStore::new(pool);
    let draft = insert(&store, "a", "u1").await;
    let referred = insert(&store, "b", "u1").await;

    let mut tx = store.begin().await.unwrap();
    let mut record = tx.lock(referred).await.unwrap().unwrap();
    record.status = ReserveStatus::EnteredDb;
    tx.save(&record).await.unwrap();
    tx.commit().await.unwrap();

    let filter = ReserveFilter {
        status: Some(ReserveStatus::Draft),
        ..Default::default()
    };
    let (_, items) = store
        .list(&filter, PageRequest::default(), &ListScope::All)
        .await
        .unwrap();
    let ids: Vec<_> = items.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![draft]);
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn aggregate_groups_by_quarter_and_status(pool: PgPool) {
    let store = PgReserveStore::new(pool.clone());
    let a = insert(&store, "a", "u1").await;
    let b = insert(&store, "b", "u1").await;
    let c = insert(&store, "c", "u1").await;

    for (id, created_at, status) in [
        (a, "2026-02-10T00:00:00Z", 2i16),
        (b, "2026-03-31T23:00:00Z", 3),
        (c, "2026-04-01T00:00:00Z", 2),
    ] {
        sqlx::query(
            "UPDATE reserve_projects SET created_at = $2::timestamptz, status_id = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(created_at)
        .bind(status)
        .execute(&pool)
        .await
        .unwrap();
    }

    let rows = store
        .aggregate(&AnalysisFilter::new(GroupBy::Quarter))
        .await
        .unwrap();
    let flat: Vec<_> = rows
        .iter()
        .map(|r| (r.bucket.as_str(), r.status, r.count))
        .collect();
    assert_eq!(
        flat,
        vec![
            ("2026-Q1", ReserveStatus::EnteredDb, 1),
            ("2026-Q1", ReserveStatus::EarlyPlan, 1),
            ("2026-Q2", ReserveStatus::EnteredDb, 1),
        ]
    );

    let rows = store
        .aggregate(&AnalysisFilter::new(GroupBy::Month))
        .await
        .unwrap();
    let buckets: Vec<_> = rows.iter().map(|r| r.bucket.as_str()).collect();
    assert_eq!(buckets, vec!["2026-02", "2026-03", "2026-04"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn aggregate_applies_attribute_filter(pool: PgPool) {
    let store = PgReserveStore::new(pool);
    let mut tx = store.begin().await.unwrap();
    tx.insert(&new_reserve("a", "road"), "u1").await.unwrap();
    tx.insert(&new_reserve("b", "road"), "u1").await.unwrap();
    tx.insert(&new_reserve("c", "bridge"), "u1").await.unwrap();
    tx.commit().await.unwrap();

    let mut filter = AnalysisFilter::new(GroupBy::ProjectType);
    filter.project_type = Some("road".into());
    let rows = store.aggregate(&filter).await.unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].bucket, "road");
    assert_eq!(rows[0].status, ReserveStatus::Draft);
    assert_eq!(rows[0].count, 2);
}
