//! Request-edge security for the word puzzle game
//!
//! Three independent checks sit in front of every state-changing request, in
//! this order:
//!
//! 1. [`rate_limiter`]: fixed-window ceilings per client and route class.
//! 2. [`csrf`]: double-submit token check on mutating methods.
//! 3. [`session`] / [`jwt`]: signed, stateless session credential, where the
//!    handler needs a caller identity.
//!
//! Each check can end the request with its own response; none of them calls
//! another.

pub mod csrf;
pub mod error;
pub mod game;
pub mod identity;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod rate_limiter;
pub mod repositories;
pub mod routes;
pub mod session;
pub mod settings;
pub mod state;
pub mod validation;

pub use state::AppState;
