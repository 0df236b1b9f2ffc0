//! Core traits for CRM transports.
//!
//! This module defines the `CrmTransport` trait - the seam between the
//! resolution engine and the CRM that owns labels, associations and records.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{LabelDefinition, LabelTag, ObjectType, Record};

/// Error types for CRM transport operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The requested object does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Credentials were rejected
    #[error("Unauthorized: invalid CRM credentials")]
    Unauthorized,

    /// Rate limited by the CRM
    #[error("Rate limited, retry after {retry_after_secs:?}s")]
    RateLimited { retry_after_secs: Option<u64> },

    /// CRM returned an error status
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    /// Connection or timeout failure
    #[error("Network error: {0}")]
    Network(String),

    /// Response body did not match the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Transport could not be constructed from its configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

/// One association returned by the batch lookup.
///
/// Only the first label the CRM reports survives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchLink {
    pub target_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_id: Option<u64>,
}

/// One association returned by the paged lookup, with every label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedLink {
    pub target_id: String,
    pub label_tags: Vec<LabelTag>,
}

/// One page of associations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkPage {
    pub results: Vec<PagedLink>,
    /// Cursor for the next page; absent on the last page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// Core trait for CRM transports.
///
/// Implementations are injected into every component as
/// `Arc<dyn CrmTransport>`; none of them retry internally.
#[async_trait]
pub trait CrmTransport: Send + Sync {
    /// All label definitions registered between two object types.
    async fn label_definitions(
        &self,
        from: ObjectType,
        to: ObjectType,
    ) -> Result<Vec<LabelDefinition>, TransportError>;

    /// Associations of one record, single label per association.
    async fn links_batch(
        &self,
        from: ObjectType,
        to: ObjectType,
        id: &str,
    ) -> Result<Vec<BatchLink>, TransportError>;

    /// One page of associations of one record, all labels per association.
    async fn links_page(
        &self,
        from: ObjectType,
        to: ObjectType,
        id: &str,
        cursor: Option<&str>,
        page_size: u32,
    ) -> Result<LinkPage, TransportError>;

    /// A record with exactly the requested attributes.
    async fn get_record(
        &self,
        object_type: ObjectType,
        id: &str,
        fields: &[String],
    ) -> Result<Record, TransportError>;

    /// Check whether the CRM is reachable with the configured credentials.
    async fn is_available(&self) -> bool;
}
