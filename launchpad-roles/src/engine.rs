//! Stakeholder role resolution engine
//!
//! Runs the pipeline for one (organization, role) query:
//!
//! ```text
//! Idle -> ResolvingLabel -> FetchingLinks -> Classifying -> LoadingRecords -> Projecting -> Done
//!                                                 |                                           ^
//!                                                 +------- no links / nothing matched --------+
//! ```
//!
//! A run can be cut short by a caller signal or a deadline. The pipeline
//! future is then dropped, in-flight fetches are abandoned and the caller
//! gets [`RoleError::Cancelled`] naming the stage that was interrupted.

use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::catalog::LabelCatalog;
use crate::classifier::{classify, MatchOutcome};
use crate::config::EngineConfig;
use crate::error::{Result, RoleError};
use crate::fetcher::AssociationFetcher;
use crate::loader::RecordLoader;
use crate::projector::{project, Role, RoleView};
use crate::transport::CrmTransport;

/// Pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Stage {
    Idle = 0,
    ResolvingLabel = 1,
    FetchingLinks = 2,
    Classifying = 3,
    LoadingRecords = 4,
    Projecting = 5,
    Done = 6,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::ResolvingLabel => "resolving label",
            Stage::FetchingLinks => "fetching links",
            Stage::Classifying => "classifying",
            Stage::LoadingRecords => "loading records",
            Stage::Projecting => "projecting",
            Stage::Done => "done",
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => Stage::ResolvingLabel,
            2 => Stage::FetchingLinks,
            3 => Stage::Classifying,
            4 => Stage::LoadingRecords,
            5 => Stage::Projecting,
            6 => Stage::Done,
            _ => Stage::Idle,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current stage of one run, readable after its future is dropped.
struct StageTracker(AtomicU8);

impl StageTracker {
    fn new() -> Self {
        Self(AtomicU8::new(Stage::Idle as u8))
    }

    fn enter(&self, stage: Stage) {
        self.0.store(stage as u8, Ordering::SeqCst);
        debug!(stage = %stage, "Entered stage");
    }

    fn current(&self) -> Stage {
        Stage::from_u8(self.0.load(Ordering::SeqCst))
    }
}

/// A request for the stakeholders of one role at one organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StakeholderQuery {
    pub organization_id: String,
    pub role: Role,
    /// Attribute keys to load; `None` loads the role's own field set
    pub fields: Option<Vec<String>>,
}

impl StakeholderQuery {
    pub fn new(organization_id: impl Into<String>, role: Role) -> Self {
        Self {
            organization_id: organization_id.into(),
            role,
            fields: None,
        }
    }

    pub fn with_fields(mut self, fields: Vec<String>) -> Self {
        self.fields = Some(fields);
        self
    }
}

/// Outcome of a resolution run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleResolution {
    pub role: Role,
    pub total_count: usize,
    pub views: Vec<RoleView>,
    /// True only when no label is registered and links were returned unfiltered
    pub fallback_applied: bool,
    pub outcome: MatchOutcome,
}

impl RoleResolution {
    fn new(role: Role, views: Vec<RoleView>, outcome: MatchOutcome) -> Self {
        Self {
            role,
            total_count: views.len(),
            views,
            fallback_applied: outcome.fallback_applied(),
            outcome,
        }
    }
}

/// Resolves role-filtered stakeholder views for organizations.
pub struct StakeholderEngine {
    transport: Arc<dyn CrmTransport>,
    catalog: LabelCatalog,
    fetcher: AssociationFetcher,
    loader: RecordLoader,
    config: EngineConfig,
}

impl StakeholderEngine {
    pub fn new(transport: Arc<dyn CrmTransport>, config: EngineConfig) -> Self {
        let catalog = LabelCatalog::new(
            transport.clone(),
            config.person_type,
            config.organization_type,
        )
        .with_pinned(&config.pinned_type_ids);

        let fetcher = AssociationFetcher::new(transport.clone(), config.strategy)
            .with_page_size(config.effective_page_size())
            .with_source_type(config.organization_type);

        let loader = RecordLoader::new(transport.clone(), config.person_type)
            .with_max_concurrency(config.max_concurrency);

        Self {
            transport,
            catalog,
            fetcher,
            loader,
            config,
        }
    }

    pub fn transport(&self) -> &Arc<dyn CrmTransport> {
        &self.transport
    }

    pub fn catalog(&self) -> &LabelCatalog {
        &self.catalog
    }

    pub fn fetcher(&self) -> &AssociationFetcher {
        &self.fetcher
    }

    pub fn loader(&self) -> &RecordLoader {
        &self.loader
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Resolve a query, applying the configured deadline if any.
    pub async fn resolve(&self, query: &StakeholderQuery) -> Result<RoleResolution> {
        match self.config.deadline {
            Some(deadline) => self.resolve_with_deadline(query, deadline).await,
            None => self.resolve_until(query, std::future::pending::<()>()).await,
        }
    }

    /// Resolve a query, giving up once `deadline` has elapsed.
    pub async fn resolve_with_deadline(
        &self,
        query: &StakeholderQuery,
        deadline: Duration,
    ) -> Result<RoleResolution> {
        self.resolve_until(query, tokio::time::sleep(deadline)).await
    }

    /// Resolve a query, giving up as soon as `signal` completes.
    ///
    /// A run that finishes in the same poll as the signal still returns its
    /// result.
    pub async fn resolve_until<F>(&self, query: &StakeholderQuery, signal: F) -> Result<RoleResolution>
    where
        F: Future<Output = ()>,
    {
        let span = info_span!(
            "resolve",
            request_id = %Uuid::new_v4(),
            organization_id = %query.organization_id,
            role = %query.role,
        );

        async {
            let progress = StageTracker::new();

            tokio::select! {
                biased;
                result = self.run(query, &progress) => result,
                _ = signal => {
                    let stage = progress.current();
                    warn!(stage = %stage, "Resolution cancelled");
                    Err(RoleError::Cancelled { stage })
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run(&self, query: &StakeholderQuery, progress: &StageTracker) -> Result<RoleResolution> {
        validate_object_id(&query.organization_id)?;
        let role_name = query.role.label_name();

        progress.enter(Stage::ResolvingLabel);
        let descriptor = match self.catalog.resolve(role_name).await {
            Ok(descriptor) => Some(descriptor),
            Err(RoleError::LabelNotFound(_)) => None,
            Err(err) => return Err(err),
        };

        progress.enter(Stage::FetchingLinks);
        let links = self
            .fetcher
            .fetch_links(&query.organization_id, self.config.person_type)
            .await?;

        progress.enter(Stage::Classifying);
        let classification = classify(&links, role_name, descriptor.as_ref());
        if classification.is_empty() {
            progress.enter(Stage::Done);
            info!(
                links = links.len(),
                outcome = ?classification.outcome,
                "No stakeholders for role"
            );
            return Ok(RoleResolution::new(query.role, Vec::new(), classification.outcome));
        }

        progress.enter(Stage::LoadingRecords);
        let fields = query.fields.clone().unwrap_or_else(|| query.role.fields());
        let records = self
            .loader
            .load_all(&classification.target_ids, &fields)
            .await;

        progress.enter(Stage::Projecting);
        let views: Vec<RoleView> = records
            .iter()
            .map(|record| project(record, query.role))
            .collect();

        progress.enter(Stage::Done);
        info!(
            links = links.len(),
            matched = classification.target_ids.len(),
            count = views.len(),
            fallback = classification.fallback_applied(),
            "Resolved stakeholders"
        );
        Ok(RoleResolution::new(query.role, views, classification.outcome))
    }
}

/// Organization ids are opaque; only blank ids are rejected.
pub fn validate_object_id(id: &str) -> Result<()> {
    if !id.trim().is_empty() {
        Ok(())
    } else {
        Err(RoleError::InvalidId(id.to_string()))
    }
}
