//! Schema and migration tests using in-memory SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use surrealdb_types::SurrealValue;

async fn setup() -> Surreal<surrealdb::engine::local::Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    db
}

#[derive(Debug, SurrealValue)]
struct MigrationRow {
    version: u32,
}

#[tokio::test]
async fn migrations_apply_and_are_recorded() {
    let db = setup().await;
    dossier_db::run_migrations(&db).await.unwrap();

    let mut result = db
        .query("SELECT version FROM _migration ORDER BY version ASC")
        .await
        .unwrap();
    let rows: Vec<MigrationRow> = result.take(0).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].version, 1);
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let db = setup().await;
    dossier_db::run_migrations(&db).await.unwrap();
    // A second run must not re-apply or fail.
    dossier_db::run_migrations(&db).await.unwrap();

    let mut result = db
        .query("SELECT version FROM _migration")
        .await
        .unwrap();
    let rows: Vec<MigrationRow> = result.take(0).unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn raw_schema_applies_without_the_runner() {
    let db = setup().await;
    db.query(dossier_db::schema_v1()).await.unwrap().check().unwrap();

    // Tables are live; field defaults apply and constraints hold.
    db.query("CREATE organization SET name = 'Acme', is_active = true")
        .await
        .unwrap()
        .check()
        .unwrap();

    // No migration bookkeeping happens on this path.
    let mut result = db.query("SELECT version FROM _migration").await.unwrap();
    let rows: Vec<MigrationRow> = result.take(0).unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn grant_triple_is_unique() {
    let db = setup().await;
    dossier_db::run_migrations(&db).await.unwrap();

    let insert = "CREATE permission_grant SET \
                  user_id = 'u-1', codename = 'change_document', \
                  object_uuid = 'o-1'";

    db.query(insert).await.unwrap().check().unwrap();

    // Same triple under a fresh record id must hit the UNIQUE index.
    let second = db.query(insert).await.unwrap().check();
    assert!(second.is_err());
}

#[tokio::test]
async fn grant_codename_outside_the_convention_is_rejected() {
    let db = setup().await;
    dossier_db::run_migrations(&db).await.unwrap();

    let result = db
        .query(
            "CREATE permission_grant SET \
             user_id = 'u-1', codename = 'view_document', \
             object_uuid = 'o-1'",
        )
        .await
        .unwrap()
        .check();
    assert!(result.is_err());
}
