//! PostgreSQL-backed implementations of the collaborator contracts

pub mod game;
pub mod user;

pub use game::PgGameStore;
pub use user::PgIdentityProvider;
