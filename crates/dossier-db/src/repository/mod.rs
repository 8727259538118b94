//! SurrealDB repository implementations.

mod document;
mod grant;
mod organization;
mod project;
mod user;
mod visibility;

pub use document::SurrealDocumentRepository;
pub use grant::SurrealGrantRepository;
pub use organization::SurrealOrganizationRepository;
pub use project::SurrealProjectRepository;
pub use user::{SurrealUserRepository, verify_password};
pub use visibility::SurrealVisibilityRepository;
