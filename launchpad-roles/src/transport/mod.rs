//! CRM transport abstraction layer.
//!
//! Provides a trait-based interface over the CRM that owns the data:
//! - HTTP transport against the CRM REST API
//! - In-memory mock transport for testing and offline use

pub mod http;
pub mod mock;
pub mod traits;

pub use http::HttpTransport;
pub use mock::MockTransport;
pub use traits::{BatchLink, CrmTransport, LinkPage, PagedLink, TransportError};
