//! Hosted BaaS adapters.

pub mod postgrest;

pub use postgrest::PostgrestStore;
