// Central Error Type for the Application

use crate::domain::DomainError;
use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(DomainError),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Store unavailable or failing (the store flavour of an external service error)
    #[error("Database error: {0}")]
    Database(String),

    /// Geocoder or another remote collaborator failed
    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// True for failures of collaborators outside the core (store, geocoder)
    pub fn is_external(&self) -> bool {
        matches!(self, AppError::Database(_) | AppError::ExternalService(_))
    }
}

// Illegal transitions surface as InvalidState so callers see one taxonomy
impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InvalidStateTransition { .. } | DomainError::ShopClosed(_) => {
                AppError::InvalidState(err.to_string())
            }
            DomainError::ValidationError(msg) => AppError::Validation(msg),
            other => AppError::Domain(other),
        }
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

// Note: sqlx::Error conversion is handled in infra-sqlite crate
// by converting to AppError::Database(String) or AppError::Conflict
