//! Form-version API trait definition.

use std::future::Future;

use formflow_types::error::ServiceError;
use formflow_types::wire::{CreateVersionOptions, FormVersion, PublishedVersion, SaveRequest};

/// The backend operations the save orchestrator depends on.
///
/// Implementations live in formflow-infra (e.g., `HttpFormVersionApi`).
/// Every failure is normalized into a [`ServiceError`]; a request that never
/// got a response carries [`ServiceError::NETWORK_FAILURE_STATUS`].
pub trait FormVersionApi: Send + Sync {
    /// Fetch a form version with its full stage tree and transitions.
    fn fetch_form_version(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<FormVersion, ServiceError>> + Send;

    /// Replace the content of a draft form version. The backend echoes the
    /// accepted data back, with ids assigned to new entities.
    fn update_form_version(
        &self,
        id: i64,
        request: &SaveRequest,
    ) -> impl Future<Output = Result<SaveRequest, ServiceError>> + Send;

    /// Publish a draft form version.
    fn publish_form_version(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<PublishedVersion, ServiceError>> + Send;

    /// Create a new draft version of a form, optionally copying the current
    /// published content.
    fn create_form_version(
        &self,
        form_id: i64,
        options: CreateVersionOptions,
    ) -> impl Future<Output = Result<FormVersion, ServiceError>> + Send;
}
