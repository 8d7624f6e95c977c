mod memory;
mod port;
mod repository;

pub use memory::*;
pub use port::*;
pub use repository::*;

/// SQL migration for initial schema
pub const MIGRATION_001_INITIAL: &str = include_str!("migrations/001_initial.sql");
