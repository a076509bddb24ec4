//! Store wrappers for exercising failure and race paths.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};

use super::{
    AvailabilityChange, MemoryStore, PropertyRepository, Release, RepositoryError,
    TenantRepository, UnitModeChange, UserRepository,
};
use crate::access::{NewUser, Role, User, UserId};
use crate::occupancy::{
    DeletePolicy, NewProperty, NewUnit, OccupancyTarget, Property, PropertyId, TargetState, Unit,
    UnitId,
};
use crate::tenancy::{NewTenant, Tenant, TenantId, TenantStatus};

/// Delegates to a [`MemoryStore`] with a few switches: a barrier that holds the next
/// `gated` target reads until all parties arrive, a tenant committed right after the next
/// target read, and a flag that fails every availability transition.
#[derive(Default)]
pub(crate) struct ScriptedStore {
    pub(crate) inner: MemoryStore,
    gate: std::sync::Mutex<Option<Arc<Barrier>>>,
    gated_reads: AtomicUsize,
    tenant_after_read: std::sync::Mutex<Option<NewTenant>>,
    fail_transitions: AtomicBool,
}

impl ScriptedStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// The next `parties` calls to `fetch_target` block until all of them have arrived.
    pub(crate) fn gate_target_reads(&self, parties: usize) {
        if let Ok(mut gate) = self.gate.lock() {
            *gate = Some(Arc::new(Barrier::new(parties)));
        }
        self.gated_reads.store(parties, Ordering::SeqCst);
    }

    /// Commits `draft` as soon as the next `fetch_target` has answered, the way a
    /// concurrent provisioning call landing between a read and a write would.
    pub(crate) fn insert_tenant_after_next_read(&self, draft: NewTenant) {
        if let Ok(mut pending) = self.tenant_after_read.lock() {
            *pending = Some(draft);
        }
    }

    pub(crate) fn fail_transitions(&self, fail: bool) {
        self.fail_transitions.store(fail, Ordering::SeqCst);
    }

    fn wait_at_gate(&self) {
        let admitted = self
            .gated_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
                remaining.checked_sub(1)
            })
            .is_ok();
        if !admitted {
            return;
        }

        let barrier = self.gate.lock().ok().and_then(|gate| gate.clone());
        if let Some(barrier) = barrier {
            barrier.wait();
        }
    }
}

impl UserRepository for ScriptedStore {
    fn insert_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        self.inner.insert_user(user)
    }

    fn fetch_user(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        self.inner.fetch_user(id)
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        self.inner.find_user_by_email(email)
    }

    fn update_role(&self, id: &UserId, role: Role) -> Result<User, RepositoryError> {
        self.inner.update_role(id, role)
    }
}

impl PropertyRepository for ScriptedStore {
    fn insert_property(
        &self,
        draft: NewProperty,
        agent: UserId,
    ) -> Result<Property, RepositoryError> {
        self.inner.insert_property(draft, agent)
    }

    fn fetch_property(&self, id: &PropertyId) -> Result<Option<Property>, RepositoryError> {
        self.inner.fetch_property(id)
    }

    fn enable_units(&self, id: &PropertyId) -> Result<UnitModeChange, RepositoryError> {
        self.inner.enable_units(id)
    }

    fn insert_units(
        &self,
        property_id: &PropertyId,
        units: Vec<NewUnit>,
    ) -> Result<Vec<Unit>, RepositoryError> {
        self.inner.insert_units(property_id, units)
    }

    fn fetch_unit(
        &self,
        property_id: &PropertyId,
        unit_id: &UnitId,
    ) -> Result<Option<Unit>, RepositoryError> {
        self.inner.fetch_unit(property_id, unit_id)
    }

    fn list_units(&self, property_id: &PropertyId) -> Result<Vec<Unit>, RepositoryError> {
        self.inner.list_units(property_id)
    }

    fn fetch_target(
        &self,
        target: &OccupancyTarget,
    ) -> Result<Option<TargetState>, RepositoryError> {
        let state = self.inner.fetch_target(target);
        self.wait_at_gate();
        let pending = self
            .tenant_after_read
            .lock()
            .ok()
            .and_then(|mut pending| pending.take());
        if let Some(draft) = pending {
            self.inner.insert_tenant(draft)?;
        }
        state
    }

    fn transition_availability(
        &self,
        target: &OccupancyTarget,
        change: AvailabilityChange,
    ) -> Result<TargetState, RepositoryError> {
        if self.fail_transitions.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable(
                "simulated availability outage".to_string(),
            ));
        }
        self.inner.transition_availability(target, change)
    }

    fn release_occupancy(
        &self,
        target: &OccupancyTarget,
        tenant_status: TenantStatus,
    ) -> Result<Release, RepositoryError> {
        self.inner.release_occupancy(target, tenant_status)
    }

    fn remove_property(
        &self,
        id: &PropertyId,
        policy: DeletePolicy,
    ) -> Result<usize, RepositoryError> {
        self.inner.remove_property(id, policy)
    }
}

impl TenantRepository for ScriptedStore {
    fn insert_tenant(&self, draft: NewTenant) -> Result<Tenant, RepositoryError> {
        self.inner.insert_tenant(draft)
    }

    fn fetch_tenant(&self, id: &TenantId) -> Result<Option<Tenant>, RepositoryError> {
        self.inner.fetch_tenant(id)
    }

    fn active_tenant_for(
        &self,
        target: &OccupancyTarget,
    ) -> Result<Option<Tenant>, RepositoryError> {
        self.inner.active_tenant_for(target)
    }
}
