use metrics_exporter_prometheus::PrometheusHandle;
use rentwise::access::{
    Capability, EmployeePermissions, NewUser, Role, StaticSessions, User, UserId,
};
use rentwise::occupancy::{
    DeletePolicy, NewProperty, NewUnit, OccupancyTarget, Property, PropertyId, TargetState, Unit,
    UnitId,
};
use rentwise::store::{
    AvailabilityChange, MemoryStore, PropertyRepository, Release, RepositoryError,
    TenantRepository, UnitModeChange, UserRepository,
};
use rentwise::tenancy::{
    NewTenant, NotificationError, Tenant, TenantId, TenantNotifier, TenantStatus, WelcomeNotice,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Welcome notices go to the log until a mail relay is wired in.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct LoggingNotifier;

impl TenantNotifier for LoggingNotifier {
    fn welcome(&self, notice: &WelcomeNotice) -> Result<(), NotificationError> {
        info!(
            tenant_id = %notice.tenant_id,
            user_id = %notice.user_id,
            email = %notice.email,
            target = %notice.target,
            move_in = %notice.move_in_date,
            temporary_credential = notice.temporary_password.is_some(),
            "welcome notice queued"
        );
        Ok(())
    }
}

/// In-memory store with a switch that makes every availability transition fail, used by the
/// demo to show a provisioning that commits the tenant but cannot occupy the target.
#[derive(Default)]
pub(crate) struct OutageStore {
    inner: MemoryStore,
    outage: AtomicBool,
}

impl OutageStore {
    pub(crate) fn set_outage(&self, enabled: bool) {
        if enabled {
            warn!("availability transitions disabled");
        }
        self.outage.store(enabled, Ordering::SeqCst);
    }
}

impl UserRepository for OutageStore {
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

impl PropertyRepository for OutageStore {
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
        self.inner.fetch_target(target)
    }

    fn transition_availability(
        &self,
        target: &OccupancyTarget,
        change: AvailabilityChange,
    ) -> Result<TargetState, RepositoryError> {
        if self.outage.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable(
                "availability writes are offline".to_string(),
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

impl TenantRepository for OutageStore {
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

/// An operator account created at startup together with its bearer token.
#[derive(Debug, Clone)]
pub(crate) struct SeededAccount {
    pub(crate) user: User,
    pub(crate) token: String,
}

impl SeededAccount {
    pub(crate) fn role_label(&self) -> &'static str {
        self.user.role.label()
    }
}

/// Grants every seeded token, plus `operator_token` for the admin account when configured.
pub(crate) fn issue_sessions<U: UserRepository>(
    sessions: &StaticSessions<U>,
    accounts: &[SeededAccount],
    operator_token: Option<&str>,
) -> Result<(), RepositoryError> {
    for account in accounts {
        sessions.grant(account.token.clone(), account.user.id.clone())?;
    }

    if let Some(token) = operator_token {
        let admin = accounts
            .iter()
            .find(|account| account.user.role == Role::Admin)
            .ok_or(RepositoryError::NotFound)?;
        sessions.grant(token, admin.user.id.clone())?;
    }
    Ok(())
}

pub(crate) fn seed_accounts<U: UserRepository>(
    users: &U,
) -> Result<Vec<SeededAccount>, RepositoryError> {
    let clerk = EmployeePermissions::default()
        .with(Capability::ManageProperties)
        .with(Capability::ViewReports);
    let roster = [
        ("Avery Admin", "admin@rentwise.local", Role::Admin),
        ("Riley Agent", "agent@rentwise.local", Role::Agent),
        ("Morgan Landlord", "landlord@rentwise.local", Role::Landlord),
        ("Casey Clerk", "clerk@rentwise.local", Role::Employee(clerk)),
        ("Sam Seeker", "seeker@rentwise.local", Role::Seeker),
    ];

    roster
        .into_iter()
        .map(|(name, email, role)| {
            let user = users.insert_user(NewUser {
                name: name.to_string(),
                email: email.to_string(),
                phone: None,
                role,
                password_hash: None,
                must_change_password: false,
            })?;
            Ok(SeededAccount {
                user,
                token: Uuid::new_v4().simple().to_string(),
            })
        })
        .collect()
}
