//! Application state.

use std::sync::Arc;

use estate_credits_core::CreditLedger;
use estate_credits_store::Store;

use crate::config::ServiceConfig;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend.
    pub store: Arc<dyn Store>,

    /// Service configuration.
    pub config: ServiceConfig,

    /// Ledger bound to the configured allowances.
    pub ledger: CreditLedger,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: ServiceConfig) -> Self {
        let ledger = CreditLedger::new(config.credit_policy);

        tracing::info!(
            free_lifetime_allowance = config.credit_policy.free_lifetime_allowance,
            pro_monthly_allowance = config.credit_policy.pro_monthly_allowance,
            "Credit policy loaded"
        );

        if config.jwt_secret.is_none() {
            tracing::warn!("JWT secret not configured - user endpoints will reject all tokens");
        }

        if config.admin_api_key.is_none() {
            tracing::warn!("Admin API key not configured - purchases will not be available");
        }

        Self {
            store,
            config,
            ledger,
        }
    }
}
