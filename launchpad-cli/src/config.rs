//! Configuration for the launchpad CLI
//!
//! CLI arguments and environment variable handling using clap. A `.env`
//! file is loaded before parsing, so every variable below can live there.

use clap::{Parser, Subcommand, ValueEnum};
use std::time::Duration;

use launchpad_roles::{CrmConfig, EngineConfig, LinkStrategy, Role};

/// Launchpad - stakeholder roles from CRM association labels
#[derive(Parser, Debug, Clone)]
#[command(name = "launchpad")]
#[command(about = "Resolve role-filtered stakeholders linked to a CRM company")]
pub struct Args {
    /// CRM private app access token
    #[arg(long, env = "HUBSPOT_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// CRM API base URL
    #[arg(long, env = "HUBSPOT_BASE_URL", default_value = "https://api.hubapi.com")]
    pub base_url: String,

    /// CRM request timeout in seconds
    #[arg(long, env = "HUBSPOT_TIMEOUT_SECS", default_value = "30")]
    pub timeout_secs: u64,

    /// Association lookup strategy (batch or paged)
    #[arg(long, env = "LINK_STRATEGY", default_value = "paged")]
    pub strategy: LinkStrategy,

    /// Page size for paged association lookups (max 500)
    #[arg(long, env = "LINK_PAGE_SIZE", default_value = "500")]
    pub page_size: u32,

    /// Maximum concurrent record fetches
    #[arg(long, env = "RECORD_CONCURRENCY", default_value = "10")]
    pub concurrency: usize,

    /// Give up on a resolution after this many milliseconds
    #[arg(long, env = "RESOLVE_DEADLINE_MS")]
    pub deadline_ms: Option<u64>,

    /// Pinned association type ids
    #[command(flatten)]
    pub pins: LabelPins,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// Role names pinned to known association type ids.
///
/// A pinned role skips the label lookup entirely.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct LabelPins {
    /// Association type id of the Founder label
    #[arg(long = "founder-type-id", env = "ASSOCIATION_LABEL_FOUNDER")]
    pub founder: Option<u64>,

    /// Association type id of the Mentor label
    #[arg(long = "mentor-type-id", env = "ASSOCIATION_LABEL_MENTOR")]
    pub mentor: Option<u64>,

    /// Association type id of the Investor label
    #[arg(long = "investor-type-id", env = "ASSOCIATION_LABEL_INVESTOR")]
    pub investor: Option<u64>,

    /// Association type id of the Sponsor label
    #[arg(long = "sponsor-type-id", env = "ASSOCIATION_LABEL_SPONSOR")]
    pub sponsor: Option<u64>,

    /// Association type id of the Event Host label
    #[arg(long = "event-host-type-id", env = "ASSOCIATION_LABEL_EVENT_HOST")]
    pub event_host: Option<u64>,
}

impl LabelPins {
    /// Every pinned role with its type id
    pub fn pinned(&self) -> Vec<(Role, u64)> {
        [
            (Role::Founder, self.founder),
            (Role::Mentor, self.mentor),
            (Role::Investor, self.investor),
            (Role::Sponsor, self.sponsor),
            (Role::EventHost, self.event_host),
        ]
        .into_iter()
        .filter_map(|(role, id)| id.map(|id| (role, id)))
        .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// CLI commands
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Resolve the stakeholders of one role at a company
    Stakeholders {
        /// CRM company id
        #[arg(long)]
        company_id: String,

        /// Role (founder, mentor, investor, sponsor, event-host)
        #[arg(long)]
        role: Role,

        /// Attribute keys to load instead of the role's own set
        #[arg(long, value_delimiter = ',')]
        fields: Vec<String>,
    },

    /// List the association labels registered between contacts and companies
    Labels,

    /// Show the normalized links of a company, or of a contact
    Links {
        /// CRM company id (contacts linked to it)
        #[arg(long, conflicts_with = "contact_id", required_unless_present = "contact_id")]
        company_id: Option<String>,

        /// CRM contact id (companies linked to it)
        #[arg(long)]
        contact_id: Option<String>,
    },

    /// Check connectivity to the CRM
    Ping,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        match self.access_token.as_deref() {
            Some(token) if !token.trim().is_empty() => {}
            _ => return Err("HUBSPOT_ACCESS_TOKEN is required".to_string()),
        }

        if self.page_size == 0 {
            return Err("LINK_PAGE_SIZE must be at least 1".to_string());
        }

        if self.concurrency == 0 {
            return Err("RECORD_CONCURRENCY must be at least 1".to_string());
        }

        if self.timeout_secs == 0 {
            return Err("HUBSPOT_TIMEOUT_SECS must be at least 1".to_string());
        }

        Ok(())
    }

    /// Transport configuration
    pub fn crm_config(&self) -> CrmConfig {
        CrmConfig {
            base_url: self.base_url.clone(),
            access_token: self.access_token.clone(),
            timeout_secs: self.timeout_secs,
            ..CrmConfig::default()
        }
    }

    /// Engine configuration
    pub fn engine_config(&self) -> EngineConfig {
        let config = EngineConfig {
            strategy: self.strategy,
            page_size: self.page_size,
            max_concurrency: self.concurrency,
            deadline: self.deadline_ms.map(Duration::from_millis),
            ..EngineConfig::default()
        };

        self.pins
            .pinned()
            .into_iter()
            .fold(config, |config, (role, id)| {
                config.with_pinned_type_id(role.label_name(), id)
            })
    }
}
