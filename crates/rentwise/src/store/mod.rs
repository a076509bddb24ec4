//! Entity Store contracts.
//!
//! Repositories are synchronous and short-lived per call. Every method that changes a
//! target's availability is a single conditional update, so two callers racing on the same
//! target cannot both observe the precondition they expect.

mod memory;
#[cfg(test)]
pub(crate) mod testing;

pub use memory::MemoryStore;

use serde::Serialize;

use crate::access::{NewUser, Role, User, UserId};
use crate::occupancy::{
    Availability, DeletePolicy, NewProperty, NewUnit, Occupancy, OccupancyTarget, Property,
    PropertyId, TargetState, Unit, UnitId,
};
use crate::tenancy::{NewTenant, Tenant, TenantId, TenantStatus};

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record conflicts with existing data: {0}")]
    Conflict(String),
    #[error("record not found")]
    NotFound,
    #[error("availability changed concurrently (now {actual})")]
    StaleState { actual: Availability },
    #[error("precondition failed: {0}")]
    Precondition(String),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Compare-and-set request for a target's availability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityChange {
    pub expected: Availability,
    pub next: Availability,
    /// Back-reference stored alongside `next`; `None` clears it.
    pub occupancy: Option<Occupancy>,
    /// Refuse with `Precondition` while an active tenant is bound to the target.
    pub require_unbound: bool,
}

/// Result of switching a property into unit mode.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitModeChange {
    Enabled(Property),
    AlreadyEnabled(Property),
}

impl UnitModeChange {
    pub fn property(&self) -> &Property {
        match self {
            UnitModeChange::Enabled(property) | UnitModeChange::AlreadyEnabled(property) => {
                property
            }
        }
    }
}

/// Outcome of releasing an occupied target.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    pub state: TargetState,
    /// Tenant whose status changed in the same commit, if the back-reference named one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant: Option<Tenant>,
}

pub trait UserRepository: Send + Sync {
    /// Fails with `Conflict` when the normalized email is already registered.
    fn insert_user(&self, user: NewUser) -> Result<User, RepositoryError>;
    fn fetch_user(&self, id: &UserId) -> Result<Option<User>, RepositoryError>;
    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;
    fn update_role(&self, id: &UserId, role: Role) -> Result<User, RepositoryError>;
}

pub trait PropertyRepository: Send + Sync {
    fn insert_property(
        &self,
        draft: NewProperty,
        agent: UserId,
    ) -> Result<Property, RepositoryError>;
    fn fetch_property(&self, id: &PropertyId) -> Result<Option<Property>, RepositoryError>;

    /// Switches a property into unit mode. `Precondition` while an occupancy or an active
    /// tenant is bound directly to the property.
    fn enable_units(&self, id: &PropertyId) -> Result<UnitModeChange, RepositoryError>;

    /// All-or-nothing bulk insert. `Conflict` when any unit number is already taken.
    fn insert_units(
        &self,
        property_id: &PropertyId,
        units: Vec<NewUnit>,
    ) -> Result<Vec<Unit>, RepositoryError>;
    fn fetch_unit(
        &self,
        property_id: &PropertyId,
        unit_id: &UnitId,
    ) -> Result<Option<Unit>, RepositoryError>;
    fn list_units(&self, property_id: &PropertyId) -> Result<Vec<Unit>, RepositoryError>;

    fn fetch_target(&self, target: &OccupancyTarget)
        -> Result<Option<TargetState>, RepositoryError>;

    /// Applies `change` only if the current availability equals `change.expected`,
    /// otherwise `StaleState` with the observed value. Property targets in unit mode fail
    /// with `Precondition`, as does a `require_unbound` change while an active tenant is
    /// bound. Both checks and the write happen in one step.
    fn transition_availability(
        &self,
        target: &OccupancyTarget,
        change: AvailabilityChange,
    ) -> Result<TargetState, RepositoryError>;

    /// `occupied -> available`, clearing the back-reference and moving the referenced
    /// tenant to `tenant_status` in one commit.
    fn release_occupancy(
        &self,
        target: &OccupancyTarget,
        tenant_status: TenantStatus,
    ) -> Result<Release, RepositoryError>;

    /// Returns the number of units removed with the property.
    fn remove_property(
        &self,
        id: &PropertyId,
        policy: DeletePolicy,
    ) -> Result<usize, RepositoryError>;
}

pub trait TenantRepository: Send + Sync {
    /// Fails with `Conflict` while another active tenant is bound to the same target.
    fn insert_tenant(&self, draft: NewTenant) -> Result<Tenant, RepositoryError>;
    fn fetch_tenant(&self, id: &TenantId) -> Result<Option<Tenant>, RepositoryError>;
    fn active_tenant_for(
        &self,
        target: &OccupancyTarget,
    ) -> Result<Option<Tenant>, RepositoryError>;
}

/// Everything the lifecycle services need from persistence.
pub trait EntityStore: UserRepository + PropertyRepository + TenantRepository {}

impl<T> EntityStore for T where T: UserRepository + PropertyRepository + TenantRepository {}
