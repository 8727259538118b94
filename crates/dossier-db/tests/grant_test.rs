//! Integration tests for the grant store and permission check engine.

use dossier_core::access::{Actor, Capability, EntityKind, PermissionKind};
use dossier_core::repository::GrantRepository;
use dossier_db::repository::SurrealGrantRepository;
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use uuid::Uuid;

async fn setup() -> SurrealGrantRepository<surrealdb::engine::local::Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    dossier_db::run_migrations(&db).await.unwrap();
    SurrealGrantRepository::new(db)
}

const CHANGE_DOC: PermissionKind = PermissionKind::new(Capability::Change, EntityKind::Document);
const DELETE_DOC: PermissionKind = PermissionKind::new(Capability::Delete, EntityKind::Document);
const ADD_PROJECT: PermissionKind = PermissionKind::new(Capability::Add, EntityKind::Project);

#[tokio::test]
async fn granted_permission_checks_true() {
    let repo = setup().await;
    let user_id = Uuid::new_v4();
    let object = Uuid::new_v4();
    let actor = Actor::new(user_id, false);

    assert!(!repo.has_perm(CHANGE_DOC, &actor, object).await.unwrap());

    repo.add_perm(CHANGE_DOC, user_id, object).await.unwrap();

    assert!(repo.has_perm(CHANGE_DOC, &actor, object).await.unwrap());
    // Same object, different kind: still false.
    assert!(!repo.has_perm(DELETE_DOC, &actor, object).await.unwrap());
    // Same kind, different object: still false.
    assert!(
        !repo
            .has_perm(CHANGE_DOC, &actor, Uuid::new_v4())
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn has_perms_is_a_logical_or() {
    let repo = setup().await;
    let user_id = Uuid::new_v4();
    let object = Uuid::new_v4();
    let actor = Actor::new(user_id, false);

    repo.add_perm(DELETE_DOC, user_id, object).await.unwrap();

    // Holds delete but not change: the OR over both passes.
    assert!(
        repo.has_perms(&[CHANGE_DOC, DELETE_DOC], &actor, object)
            .await
            .unwrap()
    );
    assert!(!repo.has_perms(&[CHANGE_DOC], &actor, object).await.unwrap());
    assert!(!repo.has_perms(&[], &actor, object).await.unwrap());
}

#[tokio::test]
async fn superuser_bypasses_every_check() {
    let repo = setup().await;
    let superuser = Actor::new(Uuid::new_v4(), true);
    let object = Uuid::new_v4();

    // No grant rows exist at all.
    assert!(repo.has_perm(CHANGE_DOC, &superuser, object).await.unwrap());
    assert!(repo.has_perms(&[], &superuser, object).await.unwrap());
}

#[tokio::test]
async fn repeated_grants_collapse_to_one_row() {
    let repo = setup().await;
    let user_id = Uuid::new_v4();
    let object = Uuid::new_v4();

    let first = repo.add_perm(CHANGE_DOC, user_id, object).await.unwrap();
    let second = repo.add_perm(CHANGE_DOC, user_id, object).await.unwrap();
    assert_eq!(first.id, second.id);

    let grants = repo.list_for_user(user_id).await.unwrap();
    assert_eq!(grants.len(), 1);
    assert_eq!(grants[0].kind, CHANGE_DOC);
    assert_eq!(grants[0].object_uuid, object);
}

#[tokio::test]
async fn objects_with_any_filters_by_kind() {
    let repo = setup().await;
    let user_id = Uuid::new_v4();
    let doc_a = Uuid::new_v4();
    let doc_b = Uuid::new_v4();
    let project = Uuid::new_v4();

    repo.add_perm(CHANGE_DOC, user_id, doc_a).await.unwrap();
    repo.add_perm(DELETE_DOC, user_id, doc_b).await.unwrap();
    repo.add_perm(ADD_PROJECT, user_id, project).await.unwrap();

    let mut docs = repo
        .objects_with_any(user_id, &PermissionKind::all_for(EntityKind::Document))
        .await
        .unwrap();
    docs.sort();
    let mut expected = vec![doc_a, doc_b];
    expected.sort();
    assert_eq!(docs, expected);

    let projects = repo
        .objects_with_any(user_id, &PermissionKind::all_for(EntityKind::Project))
        .await
        .unwrap();
    assert_eq!(projects, vec![project]);

    // Another user holds nothing.
    let other = repo
        .objects_with_any(Uuid::new_v4(), &PermissionKind::all_for(EntityKind::Document))
        .await
        .unwrap();
    assert!(other.is_empty());
}

#[tokio::test]
async fn list_for_user_returns_all_grants() {
    let repo = setup().await;
    let user_id = Uuid::new_v4();

    repo.add_perm(CHANGE_DOC, user_id, Uuid::new_v4())
        .await
        .unwrap();
    repo.add_perm(ADD_PROJECT, user_id, Uuid::new_v4())
        .await
        .unwrap();
    // Another user's grant must not leak in.
    repo.add_perm(CHANGE_DOC, Uuid::new_v4(), Uuid::new_v4())
        .await
        .unwrap();

    let grants = repo.list_for_user(user_id).await.unwrap();
    assert_eq!(grants.len(), 2);
    assert!(grants.iter().all(|g| g.user_id == user_id));
}
