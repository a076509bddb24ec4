//! Property, unit and tenant occupancy lifecycle.
//!
//! The crate is organised leaf-first: [`store`] holds the Entity Store contracts, [`access`]
//! decides capabilities for an explicit acting user, [`occupancy`] owns the availability
//! state machine and [`tenancy`] orchestrates tenant provisioning on top of it.

pub mod access;
pub mod config;
pub mod error;
pub mod extract;
pub mod occupancy;
pub mod store;
pub mod telemetry;
pub mod tenancy;

pub use error::{AppError, LifecycleError};
