//! Integration tests for the hierarchical visibility resolver.

use dossier_core::access::{Actor, Capability, EntityKind, PermissionKind};
use dossier_core::models::document::{CreateDocument, CreateDocumentVersion};
use dossier_core::models::organization::{CreateOrganization, Organization};
use dossier_core::models::project::{CreateProject, Project};
use dossier_core::models::user::{CreateUser, User};
use dossier_core::repository::{
    DocumentRepository, GrantRepository, OrganizationRepository, ProjectRepository,
    UserRepository, VisibilityRepository,
};
use dossier_db::repository::{
    SurrealDocumentRepository, SurrealGrantRepository, SurrealOrganizationRepository,
    SurrealProjectRepository, SurrealUserRepository, SurrealVisibilityRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use uuid::Uuid;

const CHANGE_ORG: PermissionKind =
    PermissionKind::new(Capability::Change, EntityKind::Organization);
const ADD_ORG: PermissionKind = PermissionKind::new(Capability::Add, EntityKind::Organization);
const ADD_PROJECT: PermissionKind = PermissionKind::new(Capability::Add, EntityKind::Project);
const CHANGE_DOC: PermissionKind = PermissionKind::new(Capability::Change, EntityKind::Document);

type Db = surrealdb::engine::local::Db;

/// Two organizations, each with projects and a document:
///
///   org1 ── p1a ── d1a
///       └── p1b
///   org2 ── p2a ── d2a
struct Fixture {
    db: Surreal<Db>,
    org1: Organization,
    org2: Organization,
    p1a: Project,
    p1b: Project,
    p2a: Project,
    d1a: dossier_core::models::document::Document,
    d2a: dossier_core::models::document::Document,
}

impl Fixture {
    fn grants(&self) -> SurrealGrantRepository<Db> {
        SurrealGrantRepository::new(self.db.clone())
    }

    fn visibility(&self) -> SurrealVisibilityRepository<Db> {
        SurrealVisibilityRepository::new(self.db.clone())
    }
}

async fn setup() -> Fixture {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    dossier_db::run_migrations(&db).await.unwrap();

    let orgs = SurrealOrganizationRepository::new(db.clone());
    let projects = SurrealProjectRepository::new(db.clone());
    let docs = SurrealDocumentRepository::new(db.clone());

    let org1 = orgs
        .create(CreateOrganization { name: "Org One".into() })
        .await
        .unwrap();
    let org2 = orgs
        .create(CreateOrganization { name: "Org Two".into() })
        .await
        .unwrap();

    let p1a = projects
        .create(CreateProject {
            organization_id: org1.id,
            name: "P1A".into(),
        })
        .await
        .unwrap();
    let p1b = projects
        .create(CreateProject {
            organization_id: org1.id,
            name: "P1B".into(),
        })
        .await
        .unwrap();
    let p2a = projects
        .create(CreateProject {
            organization_id: org2.id,
            name: "P2A".into(),
        })
        .await
        .unwrap();

    let d1a = docs
        .create(CreateDocument {
            project_id: p1a.id,
            name: "d1a.pdf".into(),
            mime_type: Some("application/pdf".into()),
        })
        .await
        .unwrap();
    let d2a = docs
        .create(CreateDocument {
            project_id: p2a.id,
            name: "d2a.txt".into(),
            mime_type: Some("text/plain".into()),
        })
        .await
        .unwrap();

    Fixture {
        db,
        org1,
        org2,
        p1a,
        p1b,
        p2a,
        d1a,
        d2a,
    }
}

fn ids<T>(items: &[T], id_of: impl Fn(&T) -> Uuid) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = items.iter().map(id_of).collect();
    ids.sort();
    ids
}

fn sorted(mut ids: Vec<Uuid>) -> Vec<Uuid> {
    ids.sort();
    ids
}

#[tokio::test]
async fn no_grants_nothing_visible() {
    let fx = setup().await;
    let visibility = fx.visibility();
    let actor = Actor::new(Uuid::new_v4(), false);

    assert!(visibility.visible_organizations(&actor).await.unwrap().is_empty());
    assert!(visibility.visible_projects(&actor).await.unwrap().is_empty());
    assert!(visibility.visible_documents(&actor).await.unwrap().is_empty());
    assert!(visibility.organizations_with_create(&actor).await.unwrap().is_empty());
}

#[tokio::test]
async fn project_grant_makes_its_organization_visible() {
    let fx = setup().await;
    let user_id = Uuid::new_v4();
    let actor = Actor::new(user_id, false);

    fx.grants()
        .add_perm(ADD_PROJECT, user_id, fx.p1a.id)
        .await
        .unwrap();

    let orgs = fx.visibility().visible_organizations(&actor).await.unwrap();
    assert_eq!(ids(&orgs, |o| o.id), vec![fx.org1.id]);

    // Visibility of the ancestor confers no permission on it.
    assert!(
        !fx.grants()
            .has_perm(CHANGE_ORG, &actor, fx.org1.id)
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn visible_organization_cascades_to_all_its_active_projects() {
    let fx = setup().await;
    let user_id = Uuid::new_v4();
    let actor = Actor::new(user_id, false);

    // A grant on one project of org1 exposes every project of org1.
    fx.grants()
        .add_perm(ADD_PROJECT, user_id, fx.p1a.id)
        .await
        .unwrap();

    let projects = fx.visibility().visible_projects(&actor).await.unwrap();
    assert_eq!(
        ids(&projects, |p| p.id),
        sorted(vec![fx.p1a.id, fx.p1b.id])
    );

    // A deactivated sibling drops out of the cascade.
    SurrealProjectRepository::new(fx.db.clone())
        .set_active(fx.p1b.id, false)
        .await
        .unwrap();
    let projects = fx.visibility().visible_projects(&actor).await.unwrap();
    assert_eq!(ids(&projects, |p| p.id), vec![fx.p1a.id]);
}

#[tokio::test]
async fn document_grant_makes_both_ancestors_visible() {
    let fx = setup().await;
    let user_id = Uuid::new_v4();
    let actor = Actor::new(user_id, false);

    fx.grants()
        .add_perm(CHANGE_DOC, user_id, fx.d2a.id)
        .await
        .unwrap();

    let orgs = fx.visibility().visible_organizations(&actor).await.unwrap();
    assert_eq!(ids(&orgs, |o| o.id), vec![fx.org2.id]);

    let projects = fx.visibility().visible_projects(&actor).await.unwrap();
    assert_eq!(ids(&projects, |p| p.id), vec![fx.p2a.id]);

    let documents = fx.visibility().visible_documents(&actor).await.unwrap();
    assert_eq!(ids(&documents, |d| d.document.id), vec![fx.d2a.id]);
}

#[tokio::test]
async fn deactivated_organization_is_not_visible() {
    let fx = setup().await;
    let user_id = Uuid::new_v4();
    let actor = Actor::new(user_id, false);

    fx.grants()
        .add_perm(CHANGE_ORG, user_id, fx.org1.id)
        .await
        .unwrap();
    SurrealOrganizationRepository::new(fx.db.clone())
        .set_active(fx.org1.id, false)
        .await
        .unwrap();

    assert!(
        fx.visibility()
            .visible_organizations(&actor)
            .await
            .unwrap()
            .is_empty()
    );
    // The cascade dies with the organization.
    assert!(fx.visibility().visible_projects(&actor).await.unwrap().is_empty());
}

#[tokio::test]
async fn inactive_documents_are_excluded() {
    let fx = setup().await;
    let user_id = Uuid::new_v4();
    let actor = Actor::new(user_id, false);

    fx.grants()
        .add_perm(CHANGE_DOC, user_id, fx.d1a.id)
        .await
        .unwrap();
    SurrealDocumentRepository::new(fx.db.clone())
        .set_active(fx.d1a.id, false)
        .await
        .unwrap();

    let documents = fx.visibility().visible_documents(&actor).await.unwrap();
    assert!(documents.is_empty());
}

#[tokio::test]
async fn hierarchy_and_direct_grants_union_without_duplicates() {
    let fx = setup().await;
    let user_id = Uuid::new_v4();
    let actor = Actor::new(user_id, false);

    // d1a is reachable both via the org1 cascade (through the project
    // grant) and via its own direct grant; d2a only directly.
    fx.grants()
        .add_perm(ADD_PROJECT, user_id, fx.p1a.id)
        .await
        .unwrap();
    fx.grants()
        .add_perm(CHANGE_DOC, user_id, fx.d1a.id)
        .await
        .unwrap();
    fx.grants()
        .add_perm(CHANGE_DOC, user_id, fx.d2a.id)
        .await
        .unwrap();

    let documents = fx.visibility().visible_documents(&actor).await.unwrap();
    assert_eq!(
        ids(&documents, |d| d.document.id),
        sorted(vec![fx.d1a.id, fx.d2a.id])
    );
}

#[tokio::test]
async fn documents_come_with_project_and_versions() {
    let fx = setup().await;
    let user_id = Uuid::new_v4();
    let actor = Actor::new(user_id, false);

    let docs = SurrealDocumentRepository::new(fx.db.clone());
    docs.add_version(CreateDocumentVersion {
        document_id: fx.d1a.id,
        user_id: Some(user_id),
        file_name: "d1a-v1.pdf".into(),
    })
    .await
    .unwrap();
    docs.add_version(CreateDocumentVersion {
        document_id: fx.d1a.id,
        user_id: None,
        file_name: "d1a-v2.pdf".into(),
    })
    .await
    .unwrap();

    fx.grants()
        .add_perm(CHANGE_DOC, user_id, fx.d1a.id)
        .await
        .unwrap();

    let documents = fx.visibility().visible_documents(&actor).await.unwrap();
    assert_eq!(documents.len(), 1);
    let item = &documents[0];
    assert_eq!(item.document.id, fx.d1a.id);
    assert_eq!(item.project.id, fx.p1a.id);
    assert_eq!(item.versions.len(), 2);
    assert_eq!(item.versions[0].file_name, "d1a-v1.pdf");
    assert_eq!(item.versions[1].file_name, "d1a-v2.pdf");
}

#[tokio::test]
async fn superuser_sees_every_active_entity_and_nothing_inactive() {
    let fx = setup().await;
    let superuser = Actor::new(Uuid::new_v4(), true);

    SurrealOrganizationRepository::new(fx.db.clone())
        .set_active(fx.org2.id, false)
        .await
        .unwrap();
    SurrealDocumentRepository::new(fx.db.clone())
        .set_active(fx.d2a.id, false)
        .await
        .unwrap();

    let orgs = fx
        .visibility()
        .visible_organizations(&superuser)
        .await
        .unwrap();
    assert_eq!(ids(&orgs, |o| o.id), vec![fx.org1.id]);

    let projects = fx.visibility().visible_projects(&superuser).await.unwrap();
    // Superuser project listing filters on the project flag only.
    assert_eq!(
        ids(&projects, |p| p.id),
        sorted(vec![fx.p1a.id, fx.p1b.id, fx.p2a.id])
    );

    let documents = fx.visibility().visible_documents(&superuser).await.unwrap();
    assert_eq!(ids(&documents, |d| d.document.id), vec![fx.d1a.id]);
}

#[tokio::test]
async fn organizations_with_create_requires_the_add_kind() {
    let fx = setup().await;
    let user_id = Uuid::new_v4();
    let actor = Actor::new(user_id, false);

    // change_organization makes it visible but does not qualify here.
    fx.grants()
        .add_perm(CHANGE_ORG, user_id, fx.org1.id)
        .await
        .unwrap();
    fx.grants()
        .add_perm(ADD_ORG, user_id, fx.org2.id)
        .await
        .unwrap();

    let orgs = fx
        .visibility()
        .organizations_with_create(&actor)
        .await
        .unwrap();
    assert_eq!(ids(&orgs, |o| o.id), vec![fx.org2.id]);

    let superuser = Actor::new(Uuid::new_v4(), true);
    let all = fx
        .visibility()
        .organizations_with_create(&superuser)
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
}

async fn make_user(db: &Surreal<Db>, email: &str) -> User {
    SurrealUserRepository::new(db.clone())
        .create(CreateUser {
            email: email.into(),
            password: "Password123!".into(),
            first_name: "Test".into(),
            last_name: "User".into(),
            title: None,
            timezone: None,
            is_superuser: false,
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn users_see_members_of_their_own_organizations() {
    let fx = setup().await;
    let users = SurrealUserRepository::new(fx.db.clone());

    let alice = make_user(&fx.db, "alice@example.com").await;
    let bob = make_user(&fx.db, "bob@example.com").await;
    let carol = make_user(&fx.db, "carol@example.com").await;

    users.add_to_organization(alice.id, fx.org1.id).await.unwrap();
    users.add_to_organization(bob.id, fx.org1.id).await.unwrap();
    users.add_to_organization(carol.id, fx.org2.id).await.unwrap();

    let visible = fx
        .visibility()
        .visible_users(&Actor::from(&alice))
        .await
        .unwrap();
    assert_eq!(
        ids(&visible, |u| u.id),
        sorted(vec![alice.id, bob.id])
    );

    // No membership, no peers.
    let loner = make_user(&fx.db, "loner@example.com").await;
    assert!(
        fx.visibility()
            .visible_users(&Actor::from(&loner))
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn deactivated_users_are_invisible_to_their_peers() {
    let fx = setup().await;
    let users = SurrealUserRepository::new(fx.db.clone());

    let alice = make_user(&fx.db, "alice@example.com").await;
    let bob = make_user(&fx.db, "bob@example.com").await;
    users.add_to_organization(alice.id, fx.org1.id).await.unwrap();
    users.add_to_organization(bob.id, fx.org1.id).await.unwrap();
    users.set_active(bob.id, false).await.unwrap();

    let visible = fx
        .visibility()
        .visible_users(&Actor::from(&alice))
        .await
        .unwrap();
    assert_eq!(ids(&visible, |u| u.id), vec![alice.id]);
}

#[tokio::test]
async fn superuser_sees_all_active_users() {
    let fx = setup().await;
    let users = SurrealUserRepository::new(fx.db.clone());

    let alice = make_user(&fx.db, "alice@example.com").await;
    let bob = make_user(&fx.db, "bob@example.com").await;
    users.set_active(bob.id, false).await.unwrap();

    let superuser = Actor::new(Uuid::new_v4(), true);
    let visible = fx.visibility().visible_users(&superuser).await.unwrap();
    assert_eq!(ids(&visible, |u| u.id), vec![alice.id]);
}
