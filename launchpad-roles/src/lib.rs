//! Launchpad Roles - Stakeholder Role Resolution
//!
//! Resolves the people linked to an organization in the CRM who hold a given
//! stakeholder role (founder, mentor, investor, sponsor, event host) and
//! projects them into role-specific views:
//! - Label catalog with single-flight caching and pinned type ids
//! - Batch and paged association lookups
//! - Collision-safe label classification with an explicit fallback flag
//! - Bounded, failure-tolerant record loading
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │          StakeholderEngine              │
//! │  (deadline / cancellation, tracing)     │
//! └────────────────┬────────────────────────┘
//!                  │
//!   ┌──────────┬───┴────────┬────────────┬────────────┐
//!   ▼          ▼            ▼            ▼            ▼
//! ┌───────┐ ┌─────────┐ ┌──────────┐ ┌────────┐ ┌───────────┐
//! │Catalog│ │ Fetcher │ │Classifier│ │ Loader │ │ Projector │
//! └───┬───┘ └────┬────┘ └──────────┘ └───┬────┘ └───────────┘
//!     └──────────┴───────────┬───────────┘
//!                            ▼
//!                 ┌─────────────────────┐
//!                 │    CrmTransport     │
//!                 │  (Http / Mock)      │
//!                 └─────────────────────┘
//! ```

pub mod catalog;
pub mod classifier;
pub mod config;
pub mod engine;
pub mod error;
pub mod fetcher;
pub mod loader;
pub mod projector;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use catalog::{CatalogStatsSnapshot, LabelCatalog};
pub use classifier::{classify, Classification, MatchOutcome};
pub use config::{CrmConfig, EngineConfig, LinkStrategy};
pub use engine::{RoleResolution, Stage, StakeholderEngine, StakeholderQuery};
pub use error::{Result, RoleError};
pub use fetcher::AssociationFetcher;
pub use loader::RecordLoader;
pub use projector::{project, Role, RoleView};
pub use transport::{CrmTransport, HttpTransport, MockTransport, TransportError};
pub use types::*;
