//! Shared infrastructure for the puzzle game services
//!
//! Connection handling for PostgreSQL and Redis plus the typed errors they
//! raise. Services depend on this crate instead of configuring drivers
//! themselves.

pub mod cache;
pub mod database;
pub mod error;

pub use error::{CacheError, CacheResult, DatabaseError, DatabaseResult};
