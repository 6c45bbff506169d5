//! chantier-board: construction project dashboard with weighted progress,
//! workload planning and billing follow-up. Hexagonal architecture.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod shared;
pub mod usecases;
