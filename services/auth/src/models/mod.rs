//! Request, response and domain models

pub mod score;
pub mod session;
pub mod user;

// Re-export for convenience
pub use score::{ProfileUpdate, ScoreReceipt, ScoreSubmission};
pub use session::SessionData;
pub use user::{Credentials, Identity, NewAccount, User};
