use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};
use validator::Validate;

use super::domain::{
    Availability, NewProperty, NewUnit, Occupancy, OccupancyTarget, OccupyRequest, Property,
    PropertyId, PropertyView, TargetState, Unit,
};
use super::roster::parse_roster;
use crate::access::{authorize, Capability, User, UserId};
use crate::config::LeasePolicy;
use crate::error::LifecycleError;
use crate::store::{AvailabilityChange, EntityStore, Release, RepositoryError, UnitModeChange};

/// Occupancy State Machine over an Entity Store.
///
/// Every transition is a pre-read for error reporting followed by a single conditional update
/// in the store. The pre-read never decides the outcome on its own: a transition whose
/// conditional update observes a different state is rejected without side effects.
pub struct OccupancyService<S> {
    store: Arc<S>,
    policy: LeasePolicy,
}

impl<S> OccupancyService<S>
where
    S: EntityStore + 'static,
{
    pub fn new(store: Arc<S>, policy: LeasePolicy) -> Self {
        Self { store, policy }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn policy(&self) -> LeasePolicy {
        self.policy
    }

    /// List a property. Plain properties need rent and deposit; unit-bearing ones price
    /// their units instead.
    pub fn create_property(
        &self,
        actor: &User,
        draft: NewProperty,
    ) -> Result<Property, LifecycleError> {
        authorize(actor, Capability::ManageProperties)?;
        draft.validate()?;

        if !draft.has_units {
            if draft.rent.is_none() {
                return Err(LifecycleError::Validation(
                    "rent is required for a property leased as a whole".to_string(),
                ));
            }
            if draft.deposit.is_none() {
                return Err(LifecycleError::Validation(
                    "deposit is required for a property leased as a whole".to_string(),
                ));
            }
        }

        let owner = self.resolve_owner(actor, draft.agent.as_ref())?;
        let property = self.store.insert_property(draft, owner)?;
        info!(
            property_id = %property.id,
            agent = %property.agent,
            has_units = property.has_units,
            "property listed"
        );
        Ok(property)
    }

    fn resolve_owner(
        &self,
        actor: &User,
        requested: Option<&UserId>,
    ) -> Result<UserId, LifecycleError> {
        match requested {
            None if actor.role.owns_listings() => Ok(actor.id.clone()),
            None => Err(LifecycleError::Validation(
                "agent is required when listing on behalf of an agent or landlord".to_string(),
            )),
            Some(agent_id) if *agent_id == actor.id && actor.role.owns_listings() => {
                Ok(actor.id.clone())
            }
            Some(agent_id) => {
                let agent = self
                    .store
                    .fetch_user(agent_id)?
                    .ok_or_else(|| LifecycleError::not_found("user", agent_id))?;
                if agent.role.owns_listings() {
                    Ok(agent.id)
                } else {
                    Err(LifecycleError::Validation(format!(
                        "user {agent_id} is a {} and cannot own listings",
                        agent.role.label()
                    )))
                }
            }
        }
    }

    pub fn get_property(
        &self,
        _actor: &User,
        id: &PropertyId,
    ) -> Result<PropertyView, LifecycleError> {
        let property = self.fetch_property(id)?;
        let units = self.store.list_units(id)?;
        Ok(PropertyView { property, units })
    }

    pub fn list_units(&self, _actor: &User, id: &PropertyId) -> Result<Vec<Unit>, LifecycleError> {
        self.fetch_property(id)?;
        Ok(self.store.list_units(id)?)
    }

    /// Structural transition into unit mode. Idempotent.
    pub fn enable_units(&self, actor: &User, id: &PropertyId) -> Result<Property, LifecycleError> {
        authorize(actor, Capability::ManageProperties)?;

        match self.store.enable_units(id) {
            Ok(UnitModeChange::Enabled(property)) => {
                info!(property_id = %id, "unit mode enabled");
                Ok(property)
            }
            Ok(UnitModeChange::AlreadyEnabled(property)) => {
                debug!(property_id = %id, "unit mode already enabled");
                Ok(property)
            }
            Err(RepositoryError::NotFound) => Err(LifecycleError::not_found("property", id)),
            Err(RepositoryError::Precondition(reason)) => {
                Err(LifecycleError::InvalidStateTransition(reason))
            }
            Err(other) => Err(other.into()),
        }
    }

    /// `PATCH /properties/:id` semantics. Unit mode is one-way.
    pub fn set_unit_mode(
        &self,
        actor: &User,
        id: &PropertyId,
        has_units: bool,
    ) -> Result<Property, LifecycleError> {
        if has_units {
            return self.enable_units(actor, id);
        }

        authorize(actor, Capability::ManageProperties)?;
        let property = self.fetch_property(id)?;
        if property.has_units {
            return Err(LifecycleError::InvalidStateTransition(format!(
                "property {id} is divided into units and cannot be reverted"
            )));
        }
        Ok(property)
    }

    /// Bulk unit creation, all-or-nothing.
    pub fn add_units(
        &self,
        actor: &User,
        id: &PropertyId,
        units: Vec<NewUnit>,
    ) -> Result<Vec<Unit>, LifecycleError> {
        authorize(actor, Capability::ManageProperties)?;
        self.insert_units(id, units)
    }

    /// Roster import: the CSV body goes through the same checks as [`Self::add_units`].
    pub fn import_units(
        &self,
        actor: &User,
        id: &PropertyId,
        roster: &str,
    ) -> Result<Vec<Unit>, LifecycleError> {
        authorize(actor, Capability::ManageProperties)?;
        let units = parse_roster(roster.as_bytes())
            .map_err(|error| LifecycleError::Validation(error.to_string()))?;
        self.insert_units(id, units)
    }

    fn insert_units(
        &self,
        id: &PropertyId,
        units: Vec<NewUnit>,
    ) -> Result<Vec<Unit>, LifecycleError> {
        if units.is_empty() {
            return Err(LifecycleError::Validation(
                "at least one unit is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for (index, unit) in units.iter().enumerate() {
            unit.validate().map_err(|errors| {
                LifecycleError::Validation(format!("units[{index}]: {errors}"))
            })?;
            if !seen.insert(unit.number_key()) {
                return Err(LifecycleError::Validation(format!(
                    "unit number '{}' appears more than once in the request",
                    unit.unit_number.trim()
                )));
            }
        }

        let property = self.fetch_property(id)?;
        if !property.has_units {
            return Err(LifecycleError::InvalidStateTransition(format!(
                "property {id} is not divided into units"
            )));
        }

        let created = match self.store.insert_units(id, units) {
            Ok(created) => created,
            Err(RepositoryError::Conflict(reason)) => {
                return Err(LifecycleError::Validation(reason))
            }
            Err(RepositoryError::Precondition(reason)) => {
                return Err(LifecycleError::InvalidStateTransition(reason))
            }
            Err(RepositoryError::NotFound) => {
                return Err(LifecycleError::not_found("property", id))
            }
            Err(other) => return Err(other.into()),
        };

        info!(property_id = %id, units = created.len(), "units added");
        Ok(created)
    }

    /// `available -> occupied` for an explicit actor.
    pub fn occupy(
        &self,
        actor: &User,
        target: &OccupancyTarget,
        request: &OccupyRequest,
    ) -> Result<TargetState, LifecycleError> {
        authorize(actor, Capability::ManageProperties)?;
        self.occupy_target(target, request)
    }

    /// Shared by [`Self::occupy`] and the provisioning workflow, which authorizes on its own.
    pub(crate) fn occupy_target(
        &self,
        target: &OccupancyTarget,
        request: &OccupyRequest,
    ) -> Result<TargetState, LifecycleError> {
        let current = self.load_target(target)?;
        if current.availability != Availability::Available {
            return Err(LifecycleError::InvalidStateTransition(format!(
                "{target} is {} and cannot be occupied",
                current.availability
            )));
        }

        let tenant = self
            .store
            .fetch_tenant(&request.tenant_id)?
            .ok_or_else(|| LifecycleError::not_found("tenant", &request.tenant_id))?;
        if !tenant.is_active() {
            return Err(LifecycleError::InvalidStateTransition(format!(
                "tenant {} is {}",
                tenant.id,
                tenant.status.label()
            )));
        }
        if tenant.target() != *target {
            return Err(LifecycleError::Validation(format!(
                "tenant {} is bound to {}, not {target}",
                tenant.id,
                tenant.target()
            )));
        }

        let lease_start = request.lease_start.unwrap_or(tenant.lease.lease_start_date);
        let lease_end = request.lease_end.unwrap_or(tenant.lease.lease_end_date);
        if lease_end <= lease_start {
            return Err(LifecycleError::Validation(
                "lease end must be after lease start".to_string(),
            ));
        }

        let change = AvailabilityChange {
            expected: Availability::Available,
            next: Availability::Occupied,
            occupancy: Some(Occupancy {
                tenant_id: tenant.id.clone(),
                lease_start,
                lease_end,
            }),
            require_unbound: false,
        };

        match self.store.transition_availability(target, change) {
            Ok(state) => {
                info!(%target, tenant_id = %tenant.id, "target occupied");
                Ok(state)
            }
            Err(RepositoryError::StaleState { actual }) => {
                warn!(%target, tenant_id = %tenant.id, %actual, "occupy lost a concurrent race");
                Err(LifecycleError::TargetUnavailable(format!(
                    "{target} became {actual} before it could be occupied"
                )))
            }
            Err(error) => Err(self.transition_error(target, error)),
        }
    }

    /// `occupied -> available`. The departing tenant moves to the configured status in the
    /// same store commit.
    pub fn vacate(
        &self,
        actor: &User,
        target: &OccupancyTarget,
    ) -> Result<Release, LifecycleError> {
        authorize(actor, Capability::ManageProperties)?;

        let current = self.load_target(target)?;
        if current.availability != Availability::Occupied {
            return Err(LifecycleError::InvalidStateTransition(format!(
                "{target} is {} and cannot be vacated",
                current.availability
            )));
        }

        match self
            .store
            .release_occupancy(target, self.policy.vacated_status)
        {
            Ok(release) => {
                info!(
                    %target,
                    tenant_id = ?release.tenant.as_ref().map(|tenant| &tenant.id),
                    status = self.policy.vacated_status.label(),
                    "target vacated"
                );
                Ok(release)
            }
            Err(RepositoryError::StaleState { actual }) => {
                Err(LifecycleError::InvalidStateTransition(format!(
                    "{target} is {actual} and cannot be vacated"
                )))
            }
            Err(error) => Err(self.transition_error(target, error)),
        }
    }

    /// Administrative maintenance toggle. Entering maintenance is refused while a tenant is
    /// bound; leaving it is only valid from `maintenance`.
    pub fn set_maintenance(
        &self,
        actor: &User,
        target: &OccupancyTarget,
        under_maintenance: bool,
    ) -> Result<TargetState, LifecycleError> {
        authorize(actor, Capability::ManageProperties)?;

        let current = self.load_target(target)?;
        let expected = match (under_maintenance, current.availability) {
            (true, Availability::Maintenance) => {
                debug!(%target, "already under maintenance");
                return Ok(current);
            }
            (true, Availability::Available) => Availability::Available,
            (false, Availability::Maintenance) => Availability::Maintenance,
            (_, availability) => {
                return Err(LifecycleError::InvalidStateTransition(format!(
                    "{target} is {availability}; vacate or finish maintenance first"
                )))
            }
        };

        let next = if under_maintenance {
            Availability::Maintenance
        } else {
            Availability::Available
        };
        let change = AvailabilityChange {
            expected,
            next,
            occupancy: None,
            require_unbound: under_maintenance,
        };

        match self.store.transition_availability(target, change) {
            Ok(state) => {
                info!(%target, availability = %state.availability, "maintenance toggled");
                Ok(state)
            }
            Err(RepositoryError::StaleState { actual }) => {
                Err(LifecycleError::InvalidStateTransition(format!(
                    "{target} changed to {actual} concurrently"
                )))
            }
            Err(error) => Err(self.transition_error(target, error)),
        }
    }

    /// Removes a property under the configured delete policy; returns removed unit count.
    pub fn delete_property(&self, actor: &User, id: &PropertyId) -> Result<usize, LifecycleError> {
        authorize(actor, Capability::ManageProperties)?;

        match self.store.remove_property(id, self.policy.delete_policy) {
            Ok(removed_units) => {
                info!(property_id = %id, removed_units, "property deleted");
                Ok(removed_units)
            }
            Err(RepositoryError::NotFound) => Err(LifecycleError::not_found("property", id)),
            Err(RepositoryError::Precondition(reason)) => {
                Err(LifecycleError::InvalidStateTransition(reason))
            }
            Err(other) => Err(other.into()),
        }
    }

    pub(crate) fn fetch_property(&self, id: &PropertyId) -> Result<Property, LifecycleError> {
        self.store
            .fetch_property(id)?
            .ok_or_else(|| LifecycleError::not_found("property", id))
    }

    /// Loads the current state of a target, rejecting property-level targets in unit mode.
    pub(crate) fn load_target(
        &self,
        target: &OccupancyTarget,
    ) -> Result<TargetState, LifecycleError> {
        let property = self.fetch_property(target.property_id())?;

        match target {
            OccupancyTarget::Property { property_id } if property.has_units => {
                Err(LifecycleError::InvalidStateTransition(format!(
                    "property {property_id} is divided into units; address one of its units"
                )))
            }
            OccupancyTarget::Property { property_id } => self
                .store
                .fetch_target(target)?
                .ok_or_else(|| LifecycleError::not_found("property", property_id)),
            OccupancyTarget::Unit { unit_id, .. } => self
                .store
                .fetch_target(target)?
                .ok_or_else(|| LifecycleError::not_found("unit", unit_id)),
        }
    }

    fn transition_error(&self, target: &OccupancyTarget, error: RepositoryError) -> LifecycleError {
        match error {
            RepositoryError::NotFound => match target {
                OccupancyTarget::Property { property_id } => {
                    LifecycleError::not_found("property", property_id)
                }
                OccupancyTarget::Unit { unit_id, .. } => LifecycleError::not_found("unit", unit_id),
            },
            RepositoryError::Precondition(reason) => LifecycleError::InvalidStateTransition(reason),
            other => other.into(),
        }
    }
}
