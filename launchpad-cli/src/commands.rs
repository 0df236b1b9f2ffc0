//! Command execution
//!
//! Every command renders a JSON document for stdout. Logs go to stderr.

use anyhow::Context;
use serde_json::{json, Value};
use tracing::info;

use launchpad_roles::{StakeholderEngine, StakeholderQuery};

use crate::config::Command;

/// Rendered result of a command.
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub body: Value,
    /// False when the command ran but its check failed
    pub success: bool,
}

impl Output {
    fn ok(body: Value) -> Self {
        Self {
            body,
            success: true,
        }
    }
}

/// Run a command against the engine.
pub async fn execute(engine: &StakeholderEngine, command: &Command) -> anyhow::Result<Output> {
    match command {
        Command::Stakeholders {
            company_id,
            role,
            fields,
        } => {
            let mut query = StakeholderQuery::new(company_id.clone(), *role);
            if !fields.is_empty() {
                query = query.with_fields(fields.clone());
            }

            let resolution = engine
                .resolve(&query)
                .await
                .with_context(|| format!("failed to resolve {} stakeholders for company {}", role, company_id))?;

            Ok(Output::ok(serde_json::to_value(&resolution)?))
        }

        Command::Labels => {
            let labels = engine
                .catalog()
                .list()
                .await
                .context("failed to list association labels")?;

            Ok(Output::ok(json!({
                "count": labels.len(),
                "labels": labels,
            })))
        }

        Command::Links {
            company_id,
            contact_id,
        } => {
            let config = engine.config();
            let (source, target, id) = match (company_id, contact_id) {
                (Some(id), _) => (config.organization_type, config.person_type, id),
                (None, Some(id)) => (config.person_type, config.organization_type, id),
                (None, None) => anyhow::bail!("either --company-id or --contact-id is required"),
            };

            let links = engine
                .fetcher()
                .fetch_links_from(source, id, target)
                .await
                .with_context(|| format!("failed to fetch links of {} {}", source, id))?;

            Ok(Output::ok(json!({
                "source": source,
                "id": id,
                "target": target,
                "count": links.len(),
                "links": links,
            })))
        }

        Command::Ping => {
            let available = engine.transport().is_available().await;
            info!(available, "CRM connectivity check");

            Ok(Output {
                body: json!({ "available": available }),
                success: available,
            })
        }
    }
}
