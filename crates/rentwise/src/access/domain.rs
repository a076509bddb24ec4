use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Identifier wrapper for user accounts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Named permission flag consulted for employees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    CreateTenants,
    ManageProperties,
    HandlePayments,
    ViewReports,
}

impl Capability {
    pub const ALL: [Capability; 4] = [
        Capability::CreateTenants,
        Capability::ManageProperties,
        Capability::HandlePayments,
        Capability::ViewReports,
    ];

    pub const fn key(self) -> &'static str {
        match self {
            Capability::CreateTenants => "canCreateTenants",
            Capability::ManageProperties => "canManageProperties",
            Capability::HandlePayments => "canHandlePayments",
            Capability::ViewReports => "canViewReports",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|capability| capability.key() == key)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Per-employee capability flags. Missing flags deserialize as `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmployeePermissions {
    pub can_create_tenants: bool,
    pub can_manage_properties: bool,
    pub can_handle_payments: bool,
    pub can_view_reports: bool,
}

impl EmployeePermissions {
    pub const fn grants(&self, capability: Capability) -> bool {
        match capability {
            Capability::CreateTenants => self.can_create_tenants,
            Capability::ManageProperties => self.can_manage_properties,
            Capability::HandlePayments => self.can_handle_payments,
            Capability::ViewReports => self.can_view_reports,
        }
    }

    pub fn with(mut self, capability: Capability) -> Self {
        match capability {
            Capability::CreateTenants => self.can_create_tenants = true,
            Capability::ManageProperties => self.can_manage_properties = true,
            Capability::HandlePayments => self.can_handle_payments = true,
            Capability::ViewReports => self.can_view_reports = true,
        }
        self
    }
}

/// Account role. Only employees carry a permission record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", content = "permissions", rename_all = "lowercase")]
pub enum Role {
    Admin,
    Agent,
    Landlord,
    Employee(EmployeePermissions),
    Tenant,
    Seeker,
}

impl Role {
    pub const fn label(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Agent => "agent",
            Role::Landlord => "landlord",
            Role::Employee(_) => "employee",
            Role::Tenant => "tenant",
            Role::Seeker => "seeker",
        }
    }

    /// Agents and landlords list and own properties.
    pub const fn owns_listings(&self) -> bool {
        matches!(self, Role::Agent | Role::Landlord)
    }
}

/// Stored user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(flatten)]
    pub role: Role,
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    pub must_change_password: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a user account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    pub password_hash: Option<String>,
    pub must_change_password: bool,
}

/// Occupant details supplied when the occupant has no account yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewOccupant {
    #[validate(length(min = 1, message = "occupant name is required"))]
    pub name: String,
    #[validate(email(message = "occupant email must be a valid address"))]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Normalized form used for uniqueness checks.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}
