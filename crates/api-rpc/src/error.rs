//! RPC Error Types
//!
//! Maps application errors to JSON-RPC error codes.

use jsonrpsee::types::ErrorObjectOwned;
use queueease_core::error::AppError;

/// RPC Error Codes
pub mod code {
    pub const VALIDATION_ERROR: i32 = 4000;
    pub const NOT_FOUND: i32 = 4001;
    pub const CONFLICT: i32 = 4002;
    pub const INVALID_STATE: i32 = 4004;
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const DB_ERROR: i32 = 5001;
    pub const EXTERNAL_ERROR: i32 = 5003;
}

/// Convert AppError to JSON-RPC ErrorObject
pub fn to_rpc_error(err: AppError) -> ErrorObjectOwned {
    let code = match &err {
        AppError::Validation(_) | AppError::Domain(_) => code::VALIDATION_ERROR,
        AppError::NotFound(_) => code::NOT_FOUND,
        AppError::Conflict(_) => code::CONFLICT,
        AppError::InvalidState(_) => code::INVALID_STATE,
        AppError::Database(_) => code::DB_ERROR,
        AppError::ExternalService(_) => code::EXTERNAL_ERROR,
        AppError::Serialization(_) | AppError::Config(_) | AppError::Internal(_) => {
            code::INTERNAL_ERROR
        }
    };

    // Store internals stay in the daemon log
    if code >= code::INTERNAL_ERROR {
        tracing::error!(code, error = %err, "RPC call failed");
    }

    let message = match err {
        AppError::Validation(msg)
        | AppError::NotFound(msg)
        | AppError::Conflict(msg)
        | AppError::InvalidState(msg)
        | AppError::ExternalService(msg) => msg,
        AppError::Database(_) => "Database error".to_string(),
        other => other.to_string(),
    };
    ErrorObjectOwned::owned(code, message, None::<()>)
}
