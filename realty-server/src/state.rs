//! Application state shared by every handler

use std::sync::Arc;

use realty_core::SessionCodec;

use crate::config::Config;
use crate::error::AppError;
use crate::notify::Notifier;
use crate::oauth::IdentityProvider;
use crate::store::Store;
use crate::viewings::ViewingManager;

/// Built once at startup and handed to the router behind an `Arc`
pub struct AppState<S, P, N> {
    pub store: Arc<S>,
    pub identity: P,
    pub notifier: N,
    pub codec: SessionCodec,
    pub config: Config,
}

impl<S, P, N> AppState<S, P, N>
where
    S: Store,
    P: IdentityProvider,
    N: Notifier,
{
    /// Fails when the session secret is missing
    pub fn new(config: Config, store: S, identity: P, notifier: N) -> Result<Self, AppError> {
        let codec = SessionCodec::new(&config.jwt_secret, config.app_id.clone())
            .map_err(|e| AppError::Internal(format!("Cannot sign sessions: {}", e)))?;

        Ok(Self {
            store: Arc::new(store),
            identity,
            notifier,
            codec,
            config,
        })
    }

    pub fn viewings(&self) -> ViewingManager<'_, S, N> {
        ViewingManager::new(self.store.as_ref(), &self.notifier)
    }
}
