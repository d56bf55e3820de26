//! crates/lesson_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like storage or model APIs.

use async_trait::async_trait;
use crate::domain::{ContentBundle, SearchParams};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., storage, network).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
    /// The external model reported that the caller's rate/usage limit was reached.
    #[error("Quota exceeded")]
    QuotaExceeded,
    #[error("Generation failed: {0}")]
    GenerationFailed(String),
    /// The key-value store refused a write because it would exceed its capacity.
    #[error("Storage is full")]
    StorageFull,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Durable string key-value storage, modelled on browser local storage.
///
/// Access is synchronous; implementations must not be shared across
/// concurrent writers without their own locking.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> PortResult<Option<String>>;

    /// Fails with `PortError::StorageFull` when the value does not fit.
    fn set(&self, key: &str, value: &str) -> PortResult<()>;

    fn remove(&self, key: &str) -> PortResult<()>;
}

#[async_trait]
pub trait ContentGenerationService: Send + Sync {
    /// Generates a complete, locally stamped bundle for the given parameters.
    ///
    /// Fails with `QuotaExceeded` on rate limiting and `GenerationFailed` for
    /// anything else, including an unparseable response.
    async fn generate_content(&self, params: &SearchParams) -> PortResult<ContentBundle>;
}

#[async_trait]
pub trait ImageGenerationService: Send + Sync {
    /// Returns a `data:` URI for the slide illustration, or an empty string
    /// when the model produced no image. Only `QuotaExceeded` is surfaced;
    /// every other failure is swallowed as "no image".
    async fn generate_slide_image(&self, prompt: &str) -> PortResult<String>;
}
