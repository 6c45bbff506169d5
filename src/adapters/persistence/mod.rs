//! Data store adapters: SQLite (local), in-memory (tests) and JSON seed import.

pub mod memory_repo;
pub mod seed_json;
pub mod sqlite_repo;

pub use memory_repo::MemoryStore;
pub use seed_json::{SeedData, SeedStats};
pub use sqlite_repo::SqliteStore;
