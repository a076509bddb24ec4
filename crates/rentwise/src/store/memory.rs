use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use super::{
    AvailabilityChange, PropertyRepository, Release, RepositoryError, TenantRepository,
    UnitModeChange, UserRepository,
};
use crate::access::{normalize_email, NewUser, Role, User, UserId};
use crate::occupancy::{
    unit_number_key, Availability, DeletePolicy, NewProperty, NewUnit, Occupancy,
    OccupancyTarget, Property, PropertyId, TargetState, Unit, UnitId,
};
use crate::tenancy::{NewTenant, Tenant, TenantId, TenantStatus};

#[derive(Debug, Default)]
struct StoreState {
    sequence: u64,
    users: BTreeMap<UserId, User>,
    properties: BTreeMap<PropertyId, Property>,
    units: BTreeMap<UnitId, Unit>,
    tenants: BTreeMap<TenantId, Tenant>,
}

impl StoreState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.sequence += 1;
        format!("{prefix}-{:06}", self.sequence)
    }

    fn active_tenant(&self, target: &OccupancyTarget) -> Option<&Tenant> {
        self.tenants
            .values()
            .find(|tenant| tenant.is_active() && &tenant.target() == target)
    }

    fn unit(&self, property_id: &PropertyId, unit_id: &UnitId) -> Option<&Unit> {
        self.units
            .get(unit_id)
            .filter(|unit| &unit.property_id == property_id)
    }

    fn target_state(&self, target: &OccupancyTarget) -> Option<TargetState> {
        match target {
            OccupancyTarget::Property { property_id } => {
                self.properties.get(property_id).map(|property| TargetState {
                    target: target.clone(),
                    availability: property.availability,
                    occupancy: property.occupancy.clone(),
                    rent: property.rent,
                    deposit: property.deposit,
                })
            }
            OccupancyTarget::Unit {
                property_id,
                unit_id,
            } => self.unit(property_id, unit_id).map(|unit| TargetState {
                target: target.clone(),
                availability: unit.availability,
                occupancy: unit.occupancy.clone(),
                rent: Some(unit.rent),
                deposit: Some(unit.deposit),
            }),
        }
    }

    fn apply(
        &mut self,
        target: &OccupancyTarget,
        availability: Availability,
        occupancy: Option<Occupancy>,
    ) -> Result<TargetState, RepositoryError> {
        let now = Utc::now();
        match target {
            OccupancyTarget::Property { property_id } => {
                let property = self
                    .properties
                    .get_mut(property_id)
                    .ok_or(RepositoryError::NotFound)?;
                property.availability = availability;
                property.occupancy = occupancy;
                property.updated_at = now;
            }
            OccupancyTarget::Unit {
                property_id,
                unit_id,
            } => {
                let unit = self
                    .units
                    .get_mut(unit_id)
                    .filter(|unit| &unit.property_id == property_id)
                    .ok_or(RepositoryError::NotFound)?;
                unit.availability = availability;
                unit.occupancy = occupancy;
                unit.updated_at = now;
            }
        }
        self.target_state(target).ok_or(RepositoryError::NotFound)
    }

    fn ensure_not_unit_mode(&self, target: &OccupancyTarget) -> Result<(), RepositoryError> {
        if let OccupancyTarget::Property { property_id } = target {
            let property = self
                .properties
                .get(property_id)
                .ok_or(RepositoryError::NotFound)?;
            if property.has_units {
                return Err(RepositoryError::Precondition(format!(
                    "property {property_id} is divided into units"
                )));
            }
        }
        Ok(())
    }
}

/// Process-local Entity Store. One lock guards every record, so each repository call is a
/// single atomic step.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, StoreState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))
    }
}

impl UserRepository for MemoryStore {
    fn insert_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut state = self.state()?;
        let email = normalize_email(&user.email);
        if state.users.values().any(|existing| existing.email == email) {
            return Err(RepositoryError::Conflict(format!(
                "email {email} is already registered"
            )));
        }

        let id = UserId(state.next_id("usr"));
        let record = User {
            id: id.clone(),
            name: user.name.trim().to_string(),
            email,
            phone: user.phone,
            role: user.role,
            password_hash: user.password_hash,
            must_change_password: user.must_change_password,
            created_at: Utc::now(),
        };
        state.users.insert(id, record.clone());
        Ok(record)
    }

    fn fetch_user(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.state()?.users.get(id).cloned())
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let email = normalize_email(email);
        Ok(self
            .state()?
            .users
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    fn update_role(&self, id: &UserId, role: Role) -> Result<User, RepositoryError> {
        let mut state = self.state()?;
        let user = state.users.get_mut(id).ok_or(RepositoryError::NotFound)?;
        user.role = role;
        Ok(user.clone())
    }
}

impl PropertyRepository for MemoryStore {
    fn insert_property(
        &self,
        draft: NewProperty,
        agent: UserId,
    ) -> Result<Property, RepositoryError> {
        let mut state = self.state()?;
        let id = PropertyId(state.next_id("prop"));
        let now = Utc::now();
        let property = Property {
            id: id.clone(),
            title: draft.title.trim().to_string(),
            address: draft.address.trim().to_string(),
            agent,
            has_units: draft.has_units,
            availability: Availability::Available,
            rent: draft.rent,
            deposit: draft.deposit,
            occupancy: None,
            created_at: now,
            updated_at: now,
        };
        state.properties.insert(id, property.clone());
        Ok(property)
    }

    fn fetch_property(&self, id: &PropertyId) -> Result<Option<Property>, RepositoryError> {
        Ok(self.state()?.properties.get(id).cloned())
    }

    fn enable_units(&self, id: &PropertyId) -> Result<UnitModeChange, RepositoryError> {
        let mut state = self.state()?;
        let property = state.properties.get(id).ok_or(RepositoryError::NotFound)?;

        if property.has_units {
            return Ok(UnitModeChange::AlreadyEnabled(property.clone()));
        }
        if property.occupancy.is_some() || property.availability == Availability::Occupied {
            return Err(RepositoryError::Precondition(format!(
                "property {id} is occupied"
            )));
        }
        if state
            .active_tenant(&OccupancyTarget::property(id.clone()))
            .is_some()
        {
            return Err(RepositoryError::Precondition(format!(
                "an active tenant is bound to property {id}"
            )));
        }

        let property = state
            .properties
            .get_mut(id)
            .ok_or(RepositoryError::NotFound)?;
        property.has_units = true;
        property.availability = Availability::Available;
        property.updated_at = Utc::now();
        Ok(UnitModeChange::Enabled(property.clone()))
    }

    fn insert_units(
        &self,
        property_id: &PropertyId,
        units: Vec<NewUnit>,
    ) -> Result<Vec<Unit>, RepositoryError> {
        let mut state = self.state()?;
        let property = state
            .properties
            .get(property_id)
            .ok_or(RepositoryError::NotFound)?;
        if !property.has_units {
            return Err(RepositoryError::Precondition(format!(
                "property {property_id} is not divided into units"
            )));
        }

        let mut taken: HashSet<String> = state
            .units
            .values()
            .filter(|unit| &unit.property_id == property_id)
            .map(|unit| unit_number_key(&unit.unit_number))
            .collect();
        for unit in &units {
            if !taken.insert(unit.number_key()) {
                return Err(RepositoryError::Conflict(format!(
                    "unit number '{}' already exists in property {property_id}",
                    unit.unit_number.trim()
                )));
            }
        }

        let now = Utc::now();
        let mut created = Vec::with_capacity(units.len());
        for draft in units {
            let id = UnitId(state.next_id("unit"));
            let unit = Unit {
                id: id.clone(),
                property_id: property_id.clone(),
                unit_number: draft.unit_number.trim().to_string(),
                area: draft.area,
                rent: draft.rent,
                deposit: draft.deposit,
                bedrooms: draft.bedrooms,
                availability: Availability::Available,
                occupancy: None,
                created_at: now,
                updated_at: now,
            };
            state.units.insert(id, unit.clone());
            created.push(unit);
        }
        Ok(created)
    }

    fn fetch_unit(
        &self,
        property_id: &PropertyId,
        unit_id: &UnitId,
    ) -> Result<Option<Unit>, RepositoryError> {
        Ok(self.state()?.unit(property_id, unit_id).cloned())
    }

    fn list_units(&self, property_id: &PropertyId) -> Result<Vec<Unit>, RepositoryError> {
        Ok(self
            .state()?
            .units
            .values()
            .filter(|unit| &unit.property_id == property_id)
            .cloned()
            .collect())
    }

    fn fetch_target(
        &self,
        target: &OccupancyTarget,
    ) -> Result<Option<TargetState>, RepositoryError> {
        Ok(self.state()?.target_state(target))
    }

    fn transition_availability(
        &self,
        target: &OccupancyTarget,
        change: AvailabilityChange,
    ) -> Result<TargetState, RepositoryError> {
        let mut state = self.state()?;
        state.ensure_not_unit_mode(target)?;

        let current = state
            .target_state(target)
            .ok_or(RepositoryError::NotFound)?;
        if current.availability != change.expected {
            return Err(RepositoryError::StaleState {
                actual: current.availability,
            });
        }
        if change.require_unbound {
            if let Some(tenant) = state.active_tenant(target) {
                return Err(RepositoryError::Precondition(format!(
                    "tenant {} is still bound to {target}",
                    tenant.id
                )));
            }
        }

        state.apply(target, change.next, change.occupancy)
    }

    fn release_occupancy(
        &self,
        target: &OccupancyTarget,
        tenant_status: TenantStatus,
    ) -> Result<Release, RepositoryError> {
        let mut state = self.state()?;
        state.ensure_not_unit_mode(target)?;

        let current = state
            .target_state(target)
            .ok_or(RepositoryError::NotFound)?;
        if current.availability != Availability::Occupied {
            return Err(RepositoryError::StaleState {
                actual: current.availability,
            });
        }

        let tenant_id = current
            .occupancy
            .map(|occupancy| occupancy.tenant_id)
            .or_else(|| state.active_tenant(target).map(|tenant| tenant.id.clone()));

        let released = state.apply(target, Availability::Available, None)?;

        let tenant = match tenant_id {
            Some(id) => state.tenants.get_mut(&id).map(|tenant| {
                tenant.status = tenant_status;
                tenant.updated_at = Utc::now();
                tenant.clone()
            }),
            None => None,
        };

        Ok(Release {
            state: released,
            tenant,
        })
    }

    fn remove_property(
        &self,
        id: &PropertyId,
        policy: DeletePolicy,
    ) -> Result<usize, RepositoryError> {
        let mut state = self.state()?;
        let property = state.properties.get(id).ok_or(RepositoryError::NotFound)?;

        let unit_ids: Vec<UnitId> = state
            .units
            .values()
            .filter(|unit| &unit.property_id == id)
            .map(|unit| unit.id.clone())
            .collect();

        if policy == DeletePolicy::Block && !unit_ids.is_empty() {
            return Err(RepositoryError::Precondition(format!(
                "property {id} still owns {} units",
                unit_ids.len()
            )));
        }
        if property.occupancy.is_some() || property.availability == Availability::Occupied {
            return Err(RepositoryError::Precondition(format!(
                "property {id} is occupied"
            )));
        }
        if unit_ids.iter().any(|unit_id| {
            state
                .units
                .get(unit_id)
                .is_some_and(|unit| unit.availability == Availability::Occupied)
        }) {
            return Err(RepositoryError::Precondition(format!(
                "property {id} has occupied units"
            )));
        }
        if state
            .tenants
            .values()
            .any(|tenant| tenant.is_active() && &tenant.property_id == id)
        {
            return Err(RepositoryError::Precondition(format!(
                "active tenants are bound to property {id}"
            )));
        }

        for unit_id in &unit_ids {
            state.units.remove(unit_id);
        }
        state.properties.remove(id);
        Ok(unit_ids.len())
    }
}

impl TenantRepository for MemoryStore {
    fn insert_tenant(&self, draft: NewTenant) -> Result<Tenant, RepositoryError> {
        let mut state = self.state()?;
        state.ensure_not_unit_mode(&draft.target)?;

        if let Some(existing) = state.active_tenant(&draft.target) {
            return Err(RepositoryError::Conflict(format!(
                "tenant {} is already active on {}",
                existing.id, draft.target
            )));
        }

        let current = state
            .target_state(&draft.target)
            .ok_or(RepositoryError::NotFound)?;
        if current.availability != Availability::Available {
            return Err(RepositoryError::StaleState {
                actual: current.availability,
            });
        }

        let id = TenantId(state.next_id("ten"));
        let now = Utc::now();
        let tenant = Tenant {
            id: id.clone(),
            user_id: draft.user_id,
            property_id: draft.target.property_id().clone(),
            unit_id: draft.target.unit_id().cloned(),
            lease: draft.lease,
            emergency_contact: draft.emergency_contact,
            employment: draft.employment,
            references: draft.references,
            status: TenantStatus::Active,
            created_by: draft.created_by,
            created_at: now,
            updated_at: now,
        };
        state.tenants.insert(id, tenant.clone());
        Ok(tenant)
    }

    fn fetch_tenant(&self, id: &TenantId) -> Result<Option<Tenant>, RepositoryError> {
        Ok(self.state()?.tenants.get(id).cloned())
    }

    fn active_tenant_for(
        &self,
        target: &OccupancyTarget,
    ) -> Result<Option<Tenant>, RepositoryError> {
        Ok(self.state()?.active_tenant(target).cloned())
    }
}
