//! Tenant records and the provisioning workflow that binds an occupant to a property or unit.

pub mod domain;
pub mod notify;
pub mod provisioning;
pub mod router;

#[cfg(test)]
mod tests;

pub use domain::{
    EmergencyContact, EmploymentInfo, LeaseTerms, NewTenant, OccupantSource,
    ProvisionTenantRequest, Tenant, TenantId, TenantReference, TenantStatus,
};
pub use notify::{NotificationError, SilentNotifier, TenantNotifier, WelcomeNotice};
pub use provisioning::{
    IssuedCredential, ProvisioningOutcome, ProvisioningWarning, TenantProvisioningService,
};
pub use router::tenancy_router;
