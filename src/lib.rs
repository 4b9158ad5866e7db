// Migrascope: Oracle fleet migration analyzer
//
// Capability classification, privilege-aware metadata extraction, cost
// estimation and tier-partitioned persistence for fleets of Oracle
// instances heading toward PostgreSQL.

pub mod classify;
pub mod cli;
pub mod config;
pub mod estimator;
pub mod extract;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod scope;
pub mod source;
pub mod store;

pub use model::CapabilityTier;
pub use store::{create_schema, ResultsStore, StoreStatus};
