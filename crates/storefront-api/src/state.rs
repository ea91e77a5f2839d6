//! Application state management
//!
//! Author: hephaex@gmail.com

use std::sync::Arc;
use std::time::Instant;

use storefront_core::config::AppConfig;
use storefront_core::Stores;

use crate::auth::{AuthService, Clock, SystemClock};

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Registration, login and token checks
    pub auth: AuthService,
    /// Store handles, all backed by one implementation
    pub stores: Stores,
    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    /// Create state using the wall clock
    pub fn new(config: AppConfig, stores: Stores) -> Self {
        Self::with_clock(config, stores, Arc::new(SystemClock))
    }

    /// Create state with an explicit time source
    pub fn with_clock(config: AppConfig, stores: Stores, clock: Arc<dyn Clock>) -> Self {
        let auth = AuthService::new(
            stores.users.clone(),
            stores.ledger.clone(),
            &config.auth,
            clock,
        );

        Self {
            config,
            auth,
            stores,
            start_time: Instant::now(),
        }
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(AppConfig::default(), Stores::in_memory())
    }
}
