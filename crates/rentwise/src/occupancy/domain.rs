use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::access::UserId;
use crate::tenancy::TenantId;

/// Identifier wrapper for listed properties.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyId(pub String);

/// Identifier wrapper for leasable units.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(pub String);

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    Available,
    Occupied,
    Maintenance,
}

impl Availability {
    pub const fn label(self) -> &'static str {
        match self {
            Availability::Available => "available",
            Availability::Occupied => "occupied",
            Availability::Maintenance => "maintenance",
        }
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Back-reference from an occupied target to its active tenant. Display and lookup only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Occupancy {
    pub tenant_id: TenantId,
    pub lease_start: NaiveDate,
    pub lease_end: NaiveDate,
}

/// The entity whose availability a transition acts on: a whole property in non-unit mode,
/// or one unit of a unit-bearing property.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum OccupancyTarget {
    Property {
        property_id: PropertyId,
    },
    Unit {
        property_id: PropertyId,
        unit_id: UnitId,
    },
}

impl OccupancyTarget {
    pub fn property(property_id: PropertyId) -> Self {
        Self::Property { property_id }
    }

    pub fn unit(property_id: PropertyId, unit_id: UnitId) -> Self {
        Self::Unit {
            property_id,
            unit_id,
        }
    }

    pub fn property_id(&self) -> &PropertyId {
        match self {
            Self::Property { property_id } | Self::Unit { property_id, .. } => property_id,
        }
    }

    pub fn unit_id(&self) -> Option<&UnitId> {
        match self {
            Self::Property { .. } => None,
            Self::Unit { unit_id, .. } => Some(unit_id),
        }
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Property { .. } => "property",
            Self::Unit { .. } => "unit",
        }
    }
}

impl fmt::Display for OccupancyTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Property { property_id } => write!(f, "property {property_id}"),
            Self::Unit {
                property_id,
                unit_id,
            } => write!(f, "unit {unit_id} of property {property_id}"),
        }
    }
}

/// Current availability of a target together with its tenant back-reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetState {
    pub target: OccupancyTarget,
    pub availability: Availability,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupancy: Option<Occupancy>,
    pub rent: Option<u32>,
    pub deposit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub id: PropertyId,
    pub title: String,
    pub address: String,
    pub agent: UserId,
    pub has_units: bool,
    /// Meaningful only while `has_units` is false.
    pub availability: Availability,
    pub rent: Option<u32>,
    pub deposit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupancy: Option<Occupancy>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub id: UnitId,
    pub property_id: PropertyId,
    pub unit_number: String,
    pub area: f64,
    pub rent: u32,
    pub deposit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<u8>,
    pub availability: Availability,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupancy: Option<Occupancy>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing request. Rent and deposit are required unless the property is unit-bearing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewProperty {
    #[validate(custom(function = "not_blank", message = "title is required"))]
    pub title: String,
    #[validate(custom(function = "not_blank", message = "address is required"))]
    pub address: String,
    #[serde(default)]
    pub has_units: bool,
    #[serde(default)]
    #[validate(range(min = 1, message = "rent must be at least 1"))]
    pub rent: Option<u32>,
    #[serde(default)]
    pub deposit: Option<u32>,
    /// Owning agent when an admin or employee lists on someone's behalf.
    #[serde(default)]
    pub agent: Option<UserId>,
}

/// Unit creation payload. Availability is never accepted from clients; new units start
/// available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewUnit {
    #[validate(custom(function = "not_blank", message = "unit number is required"))]
    pub unit_number: String,
    #[validate(
        custom(function = "finite", message = "area must be a finite number"),
        range(min = 0.01, message = "area must be at least 0.01")
    )]
    pub area: f64,
    #[validate(range(min = 1, message = "rent must be at least 1"))]
    pub rent: u32,
    #[serde(default)]
    pub deposit: u32,
    #[serde(default)]
    pub bedrooms: Option<u8>,
}

impl NewUnit {
    /// Key used for per-property uniqueness.
    pub fn number_key(&self) -> String {
        unit_number_key(&self.unit_number)
    }
}

pub fn unit_number_key(unit_number: &str) -> String {
    unit_number.trim().to_lowercase()
}

// `range` lets NaN through since every comparison with it is false.
fn finite(value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::new("not_finite"))
    }
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new("blank"))
    } else {
        Ok(())
    }
}

/// Body of the occupy endpoints. Lease dates default to the tenant's lease terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OccupyRequest {
    pub tenant_id: TenantId,
    #[serde(default)]
    pub lease_start: Option<NaiveDate>,
    #[serde(default)]
    pub lease_end: Option<NaiveDate>,
}

/// Whether removing a property takes its units along or is refused while units exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeletePolicy {
    Block,
    Cascade,
}

/// Property together with its units for read endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyView {
    #[serde(flatten)]
    pub property: Property,
    pub units: Vec<Unit>,
}
