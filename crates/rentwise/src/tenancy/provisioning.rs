//! Tenant Provisioning Workflow.
//!
//! Steps run in order: authorize, resolve the target, derive lease terms, resolve the
//! occupant, commit the tenant record, occupy the target. The tenant record is the durability
//! point: once it exists, later failures become warnings on a successful outcome instead of
//! errors, and nothing is rolled back.

use std::fmt;
use std::sync::Arc;

use chrono::Months;
use serde::{Serialize, Serializer};
use tracing::{info, warn};
use validator::Validate;

use super::domain::{
    LeaseTerms, NewTenant, OccupantSource, ProvisionTenantRequest, Tenant, TenantId,
};
use super::notify::{TenantNotifier, WelcomeNotice};
use crate::access::{
    authorize, Capability, CredentialIssuer, NewOccupant, NewUser, Role, User, UserId,
};
use crate::config::SecurityConfig;
use crate::error::LifecycleError;
use crate::occupancy::{
    Availability, OccupancyService, OccupancyTarget, OccupyRequest, TargetState,
};
use crate::store::{EntityStore, RepositoryError};

/// Non-fatal problem attached to a successful provisioning outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningWarning {
    OccupancyFailed { target: OccupancyTarget },
    RoleUpdateFailed { user_id: UserId },
    NotificationFailed,
}

impl fmt::Display for ProvisioningWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProvisioningWarning::OccupancyFailed { target } => write!(
                f,
                "{} occupation failed — manual follow-up required",
                target.kind()
            ),
            ProvisioningWarning::RoleUpdateFailed { user_id } => write!(
                f,
                "role update for user {user_id} failed — manual follow-up required"
            ),
            ProvisioningWarning::NotificationFailed => {
                f.write_str("welcome notice could not be delivered")
            }
        }
    }
}

impl Serialize for ProvisioningWarning {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One-time password returned to the provisioning caller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedCredential {
    pub user_id: UserId,
    pub email: String,
    pub temporary_password: String,
    pub must_change_password: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisioningOutcome {
    pub tenant: Tenant,
    pub warnings: Vec<ProvisioningWarning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential: Option<IssuedCredential>,
}

impl ProvisioningOutcome {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

struct ResolvedOccupant {
    user: User,
    created: bool,
    temporary_password: Option<String>,
}

pub struct TenantProvisioningService<S, N> {
    store: Arc<S>,
    occupancy: Arc<OccupancyService<S>>,
    notifier: Arc<N>,
    credentials: CredentialIssuer,
}

impl<S, N> TenantProvisioningService<S, N>
where
    S: EntityStore + 'static,
    N: TenantNotifier + 'static,
{
    pub fn new(
        occupancy: Arc<OccupancyService<S>>,
        notifier: Arc<N>,
        security: &SecurityConfig,
    ) -> Self {
        Self {
            store: occupancy.store().clone(),
            occupancy,
            notifier,
            credentials: CredentialIssuer::new(security),
        }
    }

    pub fn provision(
        &self,
        actor: &User,
        request: ProvisionTenantRequest,
    ) -> Result<ProvisioningOutcome, LifecycleError> {
        authorize(actor, Capability::CreateTenants)?;
        request.validate()?;
        request.emergency_contact.validate()?;
        let source = occupant_source(&request)?;

        let target = self.resolve_target(&request)?;
        let state = self.occupancy.load_target(&target)?;
        if state.availability != Availability::Available {
            return Err(LifecycleError::TargetUnavailable(format!(
                "{target} is {}",
                state.availability
            )));
        }
        if let Some(existing) = self.store.active_tenant_for(&target)? {
            return Err(LifecycleError::TargetUnavailable(format!(
                "tenant {} is already active on {target}",
                existing.id
            )));
        }

        let lease = derive_lease(&request, &state)?;
        let occupant = self.resolve_occupant(source)?;

        let draft = NewTenant {
            user_id: occupant.user.id.clone(),
            target: target.clone(),
            lease,
            emergency_contact: request.emergency_contact,
            employment: request.employment,
            references: request.references,
            created_by: actor.id.clone(),
        };
        let tenant = match self.store.insert_tenant(draft) {
            Ok(tenant) => tenant,
            Err(error) => return Err(self.tenant_insert_error(&target, &occupant, error)),
        };
        info!(
            tenant_id = %tenant.id,
            user_id = %tenant.user_id,
            %target,
            created_by = %actor.id,
            "tenant record created"
        );

        let mut warnings = Vec::new();

        let occupy = OccupyRequest {
            tenant_id: tenant.id.clone(),
            lease_start: Some(lease.lease_start_date),
            lease_end: Some(lease.lease_end_date),
        };
        if let Err(error) = self.occupancy.occupy_target(&target, &occupy) {
            warn!(
                tenant_id = %tenant.id,
                %target,
                %error,
                "occupancy failed after tenant creation"
            );
            warnings.push(ProvisioningWarning::OccupancyFailed {
                target: target.clone(),
            });
        }

        if !occupant.created {
            if let Err(error) = self.store.update_role(&occupant.user.id, Role::Tenant) {
                warn!(user_id = %occupant.user.id, %error, "seeker conversion failed");
                warnings.push(ProvisioningWarning::RoleUpdateFailed {
                    user_id: occupant.user.id.clone(),
                });
            }
        }

        let notice = WelcomeNotice {
            tenant_id: tenant.id.clone(),
            user_id: occupant.user.id.clone(),
            name: occupant.user.name.clone(),
            email: occupant.user.email.clone(),
            target: target.clone(),
            move_in_date: lease.move_in_date,
            temporary_password: occupant.temporary_password.clone(),
        };
        if let Err(error) = self.notifier.welcome(&notice) {
            warn!(tenant_id = %tenant.id, %error, "welcome notice failed");
            warnings.push(ProvisioningWarning::NotificationFailed);
        }

        let credential = occupant
            .temporary_password
            .map(|temporary_password| IssuedCredential {
                user_id: occupant.user.id.clone(),
                email: occupant.user.email.clone(),
                temporary_password,
                must_change_password: true,
            });

        info!(
            tenant_id = %tenant.id,
            %target,
            warnings = warnings.len(),
            "tenant provisioned"
        );

        Ok(ProvisioningOutcome {
            tenant,
            warnings,
            credential,
        })
    }

    /// Re-runs the occupancy step for an existing active tenant. Succeeds without changes
    /// when the target is already occupied by that tenant.
    pub fn retry_occupancy(
        &self,
        actor: &User,
        tenant_id: &TenantId,
    ) -> Result<TargetState, LifecycleError> {
        authorize(actor, Capability::CreateTenants)?;

        let tenant = self.fetch_tenant(tenant_id)?;
        if !tenant.is_active() {
            return Err(LifecycleError::InvalidStateTransition(format!(
                "tenant {tenant_id} is {}",
                tenant.status.label()
            )));
        }

        let target = tenant.target();
        let state = self.occupancy.load_target(&target)?;
        let held_by_tenant = state
            .occupancy
            .as_ref()
            .is_some_and(|occupancy| occupancy.tenant_id == tenant.id);
        if state.availability == Availability::Occupied && held_by_tenant {
            return Ok(state);
        }

        let request = OccupyRequest {
            tenant_id: tenant.id.clone(),
            lease_start: Some(tenant.lease.lease_start_date),
            lease_end: Some(tenant.lease.lease_end_date),
        };
        let state = self.occupancy.occupy_target(&target, &request)?;
        info!(%tenant_id, %target, "occupancy retried");
        Ok(state)
    }

    pub fn get_tenant(&self, actor: &User, tenant_id: &TenantId) -> Result<Tenant, LifecycleError> {
        authorize(actor, Capability::CreateTenants)?;
        self.fetch_tenant(tenant_id)
    }

    fn fetch_tenant(&self, tenant_id: &TenantId) -> Result<Tenant, LifecycleError> {
        self.store
            .fetch_tenant(tenant_id)?
            .ok_or_else(|| LifecycleError::not_found("tenant", tenant_id))
    }

    fn resolve_target(
        &self,
        request: &ProvisionTenantRequest,
    ) -> Result<OccupancyTarget, LifecycleError> {
        let property = self.occupancy.fetch_property(&request.property)?;

        match (property.has_units, &request.unit) {
            (true, Some(unit_id)) => Ok(OccupancyTarget::unit(property.id, unit_id.clone())),
            (true, None) => Err(LifecycleError::Validation(format!(
                "property {} is divided into units; a unit is required",
                property.id
            ))),
            (false, Some(_)) => Err(LifecycleError::Validation(format!(
                "property {} is not divided into units",
                property.id
            ))),
            (false, None) => Ok(OccupancyTarget::property(property.id)),
        }
    }

    fn resolve_occupant(&self, source: OccupantSource) -> Result<ResolvedOccupant, LifecycleError> {
        match source {
            OccupantSource::Existing(user_id) => {
                let user = self
                    .store
                    .fetch_user(&user_id)?
                    .ok_or_else(|| LifecycleError::not_found("user", &user_id))?;
                if user.role != Role::Seeker {
                    return Err(LifecycleError::Validation(format!(
                        "user {user_id} is a {}; only seekers can become tenants",
                        user.role.label()
                    )));
                }
                Ok(ResolvedOccupant {
                    user,
                    created: false,
                    temporary_password: None,
                })
            }
            OccupantSource::New(details) => self.register_occupant(details),
        }
    }

    fn register_occupant(&self, details: NewOccupant) -> Result<ResolvedOccupant, LifecycleError> {
        details.validate()?;

        let credential = self.credentials.issue()?;
        let user = self.store.insert_user(NewUser {
            name: details.name,
            email: details.email,
            phone: details.phone,
            role: Role::Tenant,
            password_hash: Some(credential.hash),
            must_change_password: true,
        })?;
        info!(user_id = %user.id, "occupant account created with temporary credential");

        Ok(ResolvedOccupant {
            user,
            created: true,
            temporary_password: Some(credential.plaintext),
        })
    }

    fn tenant_insert_error(
        &self,
        target: &OccupancyTarget,
        occupant: &ResolvedOccupant,
        error: RepositoryError,
    ) -> LifecycleError {
        let error = match error {
            RepositoryError::Conflict(reason) => LifecycleError::TargetUnavailable(reason),
            RepositoryError::StaleState { actual } => {
                LifecycleError::TargetUnavailable(format!("{target} became {actual}"))
            }
            RepositoryError::Precondition(reason) => LifecycleError::InvalidStateTransition(reason),
            RepositoryError::NotFound => match target.unit_id() {
                Some(unit_id) => LifecycleError::not_found("unit", unit_id),
                None => LifecycleError::not_found("property", target.property_id()),
            },
            other => {
                LifecycleError::Internal(format!("tenant record could not be stored: {other}"))
            }
        };

        if !occupant.created {
            return error;
        }

        let user_id = &occupant.user.id;
        warn!(%user_id, %target, %error, "occupant account left without a tenant record");
        let note = format!("occupant account {user_id} was created and left in place");
        match error {
            LifecycleError::TargetUnavailable(reason) => {
                LifecycleError::TargetUnavailable(format!("{reason}; {note}"))
            }
            LifecycleError::InvalidStateTransition(reason) => {
                LifecycleError::InvalidStateTransition(format!("{reason}; {note}"))
            }
            LifecycleError::Internal(reason) => {
                LifecycleError::Internal(format!("{reason}; {note}"))
            }
            other => other,
        }
    }
}

fn occupant_source(request: &ProvisionTenantRequest) -> Result<OccupantSource, LifecycleError> {
    match (&request.user_id, &request.user_data) {
        (Some(user_id), None) => Ok(OccupantSource::Existing(user_id.clone())),
        (None, Some(details)) => Ok(OccupantSource::New(details.clone())),
        (Some(_), Some(_)) => Err(LifecycleError::Validation(
            "provide either userId or userData, not both".to_string(),
        )),
        (None, None) => Err(LifecycleError::Validation(
            "userId or userData is required".to_string(),
        )),
    }
}

/// Resolves lease terms, falling back to the target's listed rent and deposit.
pub(crate) fn derive_lease(
    request: &ProvisionTenantRequest,
    state: &TargetState,
) -> Result<LeaseTerms, LifecycleError> {
    let lease_start_date = request.lease_start_date;
    let lease_end_date = match (request.lease_end_date, request.lease_duration_months) {
        (Some(end), _) => end,
        (None, Some(months)) => lease_start_date
            .checked_add_months(Months::new(months))
            .ok_or_else(|| LifecycleError::Validation("lease end is out of range".to_string()))?,
        (None, None) => {
            return Err(LifecycleError::Validation(
                "leaseEndDate or leaseDurationMonths is required".to_string(),
            ))
        }
    };
    if lease_end_date <= lease_start_date {
        return Err(LifecycleError::Validation(
            "lease end must be after lease start".to_string(),
        ));
    }

    let rent_amount = request.rent_amount.or(state.rent).ok_or_else(|| {
        LifecycleError::Validation("rentAmount is required for this target".to_string())
    })?;
    let deposit_amount = request.deposit_amount.or(state.deposit).unwrap_or(0);

    Ok(LeaseTerms {
        move_in_date: request.move_in_date.unwrap_or(lease_start_date),
        lease_start_date,
        lease_end_date,
        rent_amount,
        deposit_amount,
    })
}
