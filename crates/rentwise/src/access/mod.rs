//! Users, roles and the capability checks every mutating operation runs first.

mod credentials;
pub mod domain;
pub mod resolver;
pub mod session;

pub use credentials::{CredentialError, CredentialIssuer, TemporaryCredential};
pub use domain::{
    normalize_email, Capability, EmployeePermissions, NewOccupant, NewUser, Role, User, UserId,
};
pub use resolver::{authorize, has_capability, has_capability_key};
pub use session::{Actor, SessionResolver, SharedSessions, StaticSessions};
