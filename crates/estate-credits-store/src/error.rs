//! Error types for estate-credits storage.

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record.
        entity: &'static str,
        /// Key that was looked up.
        id: String,
    },

    /// Record already exists.
    #[error("{entity} already exists: {id}")]
    AlreadyExists {
        /// Kind of record.
        entity: &'static str,
        /// Conflicting key.
        id: String,
    },

    /// The profile changed since the instruction was planned.
    #[error("concurrent update on profile {user_id}")]
    Conflict {
        /// The contended profile.
        user_id: String,
    },

    /// The device already used its trial.
    #[error("device trial exhausted: {device_id}")]
    TrialExhausted {
        /// The device fingerprint.
        device_id: String,
    },

    /// The purchase was rejected.
    #[error("invalid purchase: {0}")]
    InvalidPurchase(String),
}

impl StoreError {
    pub(crate) fn profile_not_found(user_id: &estate_credits_core::UserId) -> Self {
        Self::NotFound {
            entity: "profile",
            id: user_id.to_string(),
        }
    }
}
