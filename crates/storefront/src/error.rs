//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type for everything a storefront front end
//! can surface. Front ends show [`AppError::user_message`] and call
//! [`AppError::capture`] so service failures reach Sentry.

use thiserror::Error;

use crate::admin::AdminError;
use crate::backend::BackendError;
use crate::cart::StorageError;
use crate::catalog::CatalogError;
use crate::config::ConfigError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Backend request failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Catalog read failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Cart storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Admin operation failed.
    #[error("Admin error: {0}")]
    Admin(#[from] AdminError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input from the user.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// Whether the user can reasonably try the same action again.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Backend(err) => err.is_retryable(),
            Self::Catalog(err) => err.is_retryable(),
            Self::Admin(AdminError::Backend(err)) => err.is_retryable(),
            Self::Storage(_) => true,
            Self::Config(_) | Self::Admin(_) | Self::NotFound(_) | Self::BadRequest(_) => false,
        }
    }

    /// Whether this error points at a service fault rather than user input.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        match self {
            Self::Backend(err)
            | Self::Catalog(CatalogError::Backend(err))
            | Self::Admin(AdminError::Backend(err)) => !matches!(err, BackendError::NotFound(_)),
            Self::Catalog(CatalogError::Malformed(_))
            | Self::Admin(AdminError::Malformed(_))
            | Self::Storage(_) => true,
            _ => false,
        }
    }

    /// Message safe to show to the user.
    ///
    /// Internal details (status codes, backend messages, file paths of the
    /// cart) are left out.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(err) => err.to_string(),
            Self::Backend(BackendError::RateLimited(secs))
            | Self::Catalog(CatalogError::Backend(BackendError::RateLimited(secs))) => {
                format!("The store is busy. Please try again in {secs} seconds.")
            }
            Self::Catalog(CatalogError::NotFound(id)) | Self::Admin(AdminError::NotFound(id)) => {
                format!("Product {id} was not found.")
            }
            Self::Catalog(CatalogError::Malformed(_)) => {
                "This product cannot be displayed right now.".to_string()
            }
            Self::Backend(BackendError::NotFound(_))
            | Self::Catalog(CatalogError::Backend(BackendError::NotFound(_))) => {
                "Not found.".to_string()
            }
            Self::Backend(_) | Self::Catalog(CatalogError::Backend(_)) => {
                "Could not reach the store. Please try again.".to_string()
            }
            Self::Storage(_) => "Could not access the saved cart.".to_string(),
            Self::Admin(
                err @ (AdminError::NotConfigured
                | AdminError::Validation(_)
                | AdminError::InvalidImage { .. }
                | AdminError::Io { .. }),
            ) => err.to_string(),
            Self::Admin(_) => "The store rejected the change. Please try again.".to_string(),
            Self::NotFound(what) => format!("{what} was not found."),
            Self::BadRequest(msg) => msg.clone(),
        }
    }

    /// Report service faults to Sentry and the log.
    pub fn capture(&self) {
        if self.is_internal() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Storefront error"
            );
        } else {
            tracing::debug!(error = %self, "User-facing error");
        }
    }
}
