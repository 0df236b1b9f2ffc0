//! Configuration for the CRM transport and the resolution engine

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::types::ObjectType;

/// Largest page the CRM serves for association lookups
pub const MAX_PAGE_SIZE: u32 = 500;

/// CRM client configuration
#[derive(Debug, Clone)]
pub struct CrmConfig {
    /// Base URL for the CRM HTTP API
    pub base_url: String,
    /// Private app access token
    pub access_token: Option<String>,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for CrmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.hubapi.com".to_string(),
            access_token: None,
            timeout_secs: 30,
            user_agent: concat!("launchpad-roles/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// How associations are read from the CRM
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LinkStrategy {
    /// Single request, first label only
    Batch,
    /// Cursor-paged requests with every label
    #[default]
    Paged,
}

impl fmt::Display for LinkStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkStrategy::Batch => f.write_str("batch"),
            LinkStrategy::Paged => f.write_str("paged"),
        }
    }
}

impl FromStr for LinkStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "batch" => Ok(LinkStrategy::Batch),
            "paged" | "page" => Ok(LinkStrategy::Paged),
            other => Err(format!("unknown link strategy {:?} (expected batch or paged)", other)),
        }
    }
}

/// Configuration for the resolution engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Association lookup strategy
    pub strategy: LinkStrategy,
    /// Page size for the paged strategy, clamped to 1..=500
    pub page_size: u32,
    /// Maximum concurrent record fetches
    pub max_concurrency: usize,
    /// Deadline applied to `resolve` (None = no deadline)
    pub deadline: Option<Duration>,
    /// Role names pinned to a known association type id
    pub pinned_type_ids: HashMap<String, u64>,
    /// Object type of the organization side
    pub organization_type: ObjectType,
    /// Object type of the stakeholder side
    pub person_type: ObjectType,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strategy: LinkStrategy::Paged,
            page_size: MAX_PAGE_SIZE,
            max_concurrency: 10,
            deadline: None,
            pinned_type_ids: HashMap::new(),
            organization_type: ObjectType::Companies,
            person_type: ObjectType::Contacts,
        }
    }
}

impl EngineConfig {
    /// Page size actually sent upstream
    pub fn effective_page_size(&self) -> u32 {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }

    /// Pin a role name to a type id (skips the catalog lookup)
    pub fn with_pinned_type_id(mut self, role_name: &str, type_id: u64) -> Self {
        self.pinned_type_ids
            .insert(role_name.trim().to_lowercase(), type_id);
        self
    }
}
