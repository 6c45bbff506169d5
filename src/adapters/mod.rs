//! Infrastructure adapters. Implement outbound ports.
//!
//! Local SQLite and in-memory stores, the hosted PostgREST store, the terminal UI.
//! Map errors to DomainError.

pub mod persistence;
pub mod remote;
pub mod ui;
