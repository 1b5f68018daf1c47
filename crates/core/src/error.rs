//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Every operation of the catalog and cart services fails with one of these
/// variants. The HTTP layer maps each variant to exactly one status code, so
/// adding a variant means touching `storefront-api::app::errors` as well.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (missing field, bad quantity, non-array payload).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A requested product, cart or line item does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// Another product already uses this code.
    #[error("code must be unique: {0}")]
    DuplicateCode(String),

    /// An identifier is malformed for the active backend.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// Unexpected backend failure. The message is for logs only.
    #[error("internal failure: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn duplicate_code(code: impl Into<String>) -> Self {
        Self::DuplicateCode(code.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
