#![warn(clippy::all, missing_docs)]

//! Core of the imported-vehicle catalog.
//!
//! This crate hosts the vehicle data model, the in-memory registry with
//! its JSON persistence, and configuration handling used by the console
//! driver and any future frontends.

pub mod config;
pub mod error;
pub mod models;
pub mod registry;
pub mod store;

pub use crate::config::AppConfig;
pub use error::{RegistryError, Result};
pub use models::{NewVehicle, VehicleField, VehicleRecord, VehicleUpdate};
pub use registry::{Mutation, UpdateReport, VehicleRegistry};
