//! Capability decisions for an explicit acting user.

use super::domain::{Capability, Role, User};
use crate::error::LifecycleError;

/// Admins, agents and landlords hold every capability; employees consult their flags;
/// tenants and seekers hold none.
pub fn has_capability(user: &User, capability: Capability) -> bool {
    role_grants(&user.role, capability)
}

/// String-keyed variant for callers holding a raw flag name. Unknown keys are denied.
pub fn has_capability_key(user: &User, key: &str) -> bool {
    match Capability::from_key(key) {
        Some(capability) => has_capability(user, capability),
        None => matches!(user.role, Role::Admin | Role::Agent | Role::Landlord),
    }
}

fn role_grants(role: &Role, capability: Capability) -> bool {
    match role {
        Role::Admin | Role::Agent | Role::Landlord => true,
        Role::Employee(permissions) => permissions.grants(capability),
        Role::Tenant | Role::Seeker => false,
    }
}

/// Guard used by every mutating operation before it touches the store.
pub fn authorize(user: &User, capability: Capability) -> Result<(), LifecycleError> {
    if has_capability(user, capability) {
        Ok(())
    } else {
        tracing::debug!(
            user_id = %user.id,
            role = user.role.label(),
            %capability,
            "capability denied"
        );
        Err(LifecycleError::Unauthorized { capability })
    }
}
