//! Application state shared across handlers

use std::sync::Arc;

use crate::{
    csrf::TokenGuard,
    game::GameStore,
    identity::IdentityProvider,
    jwt::SessionCodec,
    rate_limiter::RateLimiter,
    settings::Settings,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub session_codec: SessionCodec,
    pub token_guard: TokenGuard,
    pub rate_limiter: RateLimiter,
    pub identity: Arc<dyn IdentityProvider>,
    pub game_store: Arc<dyn GameStore>,
    /// Set `Secure` on every cookie
    pub secure_cookies: bool,
}

impl AppState {
    pub fn new(
        settings: &Settings,
        rate_limiter: RateLimiter,
        identity: Arc<dyn IdentityProvider>,
        game_store: Arc<dyn GameStore>,
    ) -> Self {
        let secure_cookies = settings.secure_cookies();

        Self {
            session_codec: SessionCodec::new(&settings.session_secret),
            token_guard: TokenGuard::new(secure_cookies),
            rate_limiter,
            identity,
            game_store,
            secure_cookies,
        }
    }
}
