//! Error types for stakeholder role resolution

use thiserror::Error;

use crate::engine::Stage;
use crate::transport::TransportError;

/// Result type for role resolution operations
pub type Result<T> = std::result::Result<T, RoleError>;

/// Role resolution error
#[derive(Debug, Clone, Error)]
pub enum RoleError {
    /// No association label with this name is registered
    #[error("Association label not found: {0}")]
    LabelNotFound(String),

    /// The CRM could not serve a label or link lookup
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(#[from] TransportError),

    /// A single record could not be fetched
    #[error("Record {id} could not be fetched: {source}")]
    RecordFetchFailed {
        id: String,
        #[source]
        source: TransportError,
    },

    /// The caller cancelled the pipeline or its deadline expired
    #[error("Resolution cancelled during {stage}")]
    Cancelled { stage: Stage },

    /// Organization id is empty or blank
    #[error("Invalid object id: {0:?}")]
    InvalidId(String),

    /// Role name does not name a known stakeholder role
    #[error("Unknown stakeholder role: {0:?}")]
    UnknownRole(String),
}

impl RoleError {
    /// Whether this error aborts a pipeline run.
    ///
    /// `LabelNotFound` drives the unfiltered fallback and `RecordFetchFailed`
    /// is absorbed by the loader; everything else reaches the caller.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            RoleError::LabelNotFound(_) | RoleError::RecordFetchFailed { .. }
        )
    }
}
