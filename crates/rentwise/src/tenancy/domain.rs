use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::access::{NewOccupant, UserId};
use crate::occupancy::{OccupancyTarget, PropertyId, UnitId};

/// Identifier wrapper for tenant records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub String);

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantStatus {
    Active,
    Inactive,
    Terminated,
}

impl TenantStatus {
    pub const fn label(self) -> &'static str {
        match self {
            TenantStatus::Active => "active",
            TenantStatus::Inactive => "inactive",
            TenantStatus::Terminated => "terminated",
        }
    }
}

/// Resolved lease terms stored on the tenant record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaseTerms {
    pub move_in_date: NaiveDate,
    pub lease_start_date: NaiveDate,
    pub lease_end_date: NaiveDate,
    pub rent_amount: u32,
    pub deposit_amount: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyContact {
    #[validate(length(min = 1, message = "emergency contact name is required"))]
    pub name: String,
    #[validate(length(min = 3, message = "emergency contact phone is required"))]
    pub phone: String,
    #[serde(default)]
    pub relationship: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmploymentInfo {
    pub employer: String,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub monthly_income: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantReference {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub relationship: Option<String>,
}

/// Lease-binding record. Retained after termination for history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: TenantId,
    pub user_id: UserId,
    pub property_id: PropertyId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<UnitId>,
    #[serde(flatten)]
    pub lease: LeaseTerms,
    pub emergency_contact: EmergencyContact,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employment: Option<EmploymentInfo>,
    pub references: Vec<TenantReference>,
    pub status: TenantStatus,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    pub fn target(&self) -> OccupancyTarget {
        match &self.unit_id {
            Some(unit_id) => OccupancyTarget::unit(self.property_id.clone(), unit_id.clone()),
            None => OccupancyTarget::property(self.property_id.clone()),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == TenantStatus::Active
    }
}

/// Store input for a tenant record; the store assigns id, status and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTenant {
    pub user_id: UserId,
    pub target: OccupancyTarget,
    pub lease: LeaseTerms,
    pub emergency_contact: EmergencyContact,
    pub employment: Option<EmploymentInfo>,
    pub references: Vec<TenantReference>,
    pub created_by: UserId,
}

/// Body of `POST /tenants`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionTenantRequest {
    pub property: PropertyId,
    #[serde(default)]
    pub unit: Option<UnitId>,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub user_data: Option<NewOccupant>,
    #[serde(default)]
    pub move_in_date: Option<NaiveDate>,
    pub lease_start_date: NaiveDate,
    #[serde(default)]
    pub lease_end_date: Option<NaiveDate>,
    #[serde(default)]
    #[validate(range(min = 1, max = 120, message = "lease duration must be 1-120 months"))]
    pub lease_duration_months: Option<u32>,
    #[serde(default)]
    #[validate(range(min = 1, message = "rent amount must be at least 1"))]
    pub rent_amount: Option<u32>,
    #[serde(default)]
    pub deposit_amount: Option<u32>,
    pub emergency_contact: EmergencyContact,
    #[serde(default)]
    pub employment: Option<EmploymentInfo>,
    #[serde(default)]
    pub references: Vec<TenantReference>,
}

/// Who will occupy the target: an existing seeker account or a person to register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OccupantSource {
    Existing(UserId),
    New(NewOccupant),
}
