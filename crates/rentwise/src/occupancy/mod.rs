//! Property and unit availability: the Occupancy State Machine, the structural switch into
//! unit mode, unit roster import and the HTTP endpoints driving them.

pub mod domain;
pub mod roster;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    unit_number_key, Availability, DeletePolicy, NewProperty, NewUnit, Occupancy,
    OccupancyTarget, OccupyRequest, Property, PropertyId, PropertyView, TargetState, Unit, UnitId,
};
pub use roster::{parse_roster, RosterError};
pub use router::occupancy_router;
pub use service::OccupancyService;
