//! Label catalog
//!
//! Resolves a role name to the association label registered for the
//! (person, organization) relationship. Resolved descriptors are cached for
//! the life of the process; operators can add labels at any time, so the
//! cache supports forced refresh and invalidation.
//!
//! # Concurrency
//!
//! Each role name owns one async slot. A caller holds the slot's lock for the
//! whole upstream lookup, so concurrent callers for the same role wait and
//! reuse the first caller's result instead of issuing their own lookup. That
//! includes a failed result: callers that were already waiting when a lookup
//! failed receive the same error. Failures are never cached, so a later,
//! non-overlapping call asks the CRM again.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{Result, RoleError};
use crate::transport::CrmTransport;
use crate::types::{LabelCategory, LabelDefinition, ObjectType, RoleDescriptor};

/// Per-role resolution slot.
#[derive(Default)]
struct Slot {
    state: Mutex<SlotState>,
    /// Upstream lookups completed through this slot
    flights: AtomicU64,
}

#[derive(Default)]
struct SlotState {
    descriptor: Option<RoleDescriptor>,
    /// Outcome of the last lookup when it failed
    last_failure: Option<RoleError>,
}

/// Counters for catalog behaviour.
#[derive(Debug, Default)]
pub struct CatalogStats {
    /// Resolutions served from cache
    pub hits: AtomicU64,
    /// Resolutions that needed an upstream lookup
    pub misses: AtomicU64,
    /// Resolutions answered with a concurrent lookup's failure
    pub shared_failures: AtomicU64,
    /// Resolutions answered from pinned type ids
    pub pinned: AtomicU64,
    /// Upstream label definition calls issued
    pub upstream_lookups: AtomicU64,
}

impl CatalogStats {
    /// Get a snapshot of current statistics.
    pub fn snapshot(&self) -> CatalogStatsSnapshot {
        CatalogStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            shared_failures: self.shared_failures.load(Ordering::Relaxed),
            pinned: self.pinned.load(Ordering::Relaxed),
            upstream_lookups: self.upstream_lookups.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`CatalogStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub shared_failures: u64,
    pub pinned: u64,
    pub upstream_lookups: u64,
}

/// Resolves role names to association label descriptors.
pub struct LabelCatalog {
    transport: Arc<dyn CrmTransport>,
    from: ObjectType,
    to: ObjectType,
    /// Lowercased role name -> pinned type id
    pinned: HashMap<String, u64>,
    /// Lowercased role name -> resolution slot
    slots: DashMap<String, Arc<Slot>>,
    stats: CatalogStats,
}

fn cache_key(role_name: &str) -> String {
    role_name.trim().to_lowercase()
}

impl LabelCatalog {
    /// Catalog for labels from `from` records to `to` records.
    pub fn new(transport: Arc<dyn CrmTransport>, from: ObjectType, to: ObjectType) -> Self {
        Self {
            transport,
            from,
            to,
            pinned: HashMap::new(),
            slots: DashMap::new(),
            stats: CatalogStats::default(),
        }
    }

    /// Pin role names to type ids; pinned roles never hit the CRM.
    pub fn with_pinned(mut self, pinned: &HashMap<String, u64>) -> Self {
        self.pinned = pinned
            .iter()
            .map(|(name, type_id)| (cache_key(name), *type_id))
            .collect();
        self
    }

    /// Catalog statistics.
    pub fn stats(&self) -> &CatalogStats {
        &self.stats
    }

    /// Resolve a role name to its label descriptor.
    ///
    /// Matching is case-insensitive. When both an operator label and a
    /// built-in label share the name, the operator label wins; otherwise the
    /// category is returned as found.
    pub async fn resolve(&self, role_name: &str) -> Result<RoleDescriptor> {
        let key = cache_key(role_name);

        if let Some(type_id) = self.pinned.get(&key) {
            self.stats.pinned.fetch_add(1, Ordering::Relaxed);
            return Ok(RoleDescriptor::new(
                role_name.trim(),
                LabelCategory::UserDefined,
                *type_id,
            ));
        }

        let slot = self.slot(&key);
        let arrived_at = slot.flights.load(Ordering::SeqCst);
        let mut state = slot.state.lock().await;

        if let Some(descriptor) = state.descriptor.as_ref() {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            debug!(role = %role_name, type_id = descriptor.type_id, "Label resolved from cache");
            return Ok(descriptor.clone());
        }

        // A lookup finished while we waited for the slot
        if slot.flights.load(Ordering::SeqCst) != arrived_at {
            if let Some(err) = state.last_failure.clone() {
                self.stats.shared_failures.fetch_add(1, Ordering::Relaxed);
                debug!(role = %role_name, error = %err, "Reusing concurrent label lookup failure");
                return Err(err);
            }
        }

        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        self.fly(&slot, &mut state, role_name).await
    }

    /// Re-resolve a role name upstream, replacing any cached descriptor.
    ///
    /// A label that no longer exists is dropped from the cache.
    pub async fn refresh(&self, role_name: &str) -> Result<RoleDescriptor> {
        let slot = self.slot(&cache_key(role_name));
        let mut state = slot.state.lock().await;

        let result = self.fly(&slot, &mut state, role_name).await;
        if let Err(RoleError::LabelNotFound(_)) = &result {
            state.descriptor = None;
        }
        result
    }

    /// Forget the cached descriptor for a role name.
    ///
    /// Waits for an in-flight lookup on the role; a lookup that completes
    /// after the call is kept.
    pub async fn invalidate(&self, role_name: &str) {
        let slot = self.slots.get(&cache_key(role_name)).map(|s| Arc::clone(s.value()));
        if let Some(slot) = slot {
            forget(&slot).await;
        }
    }

    /// Forget every cached descriptor.
    pub async fn invalidate_all(&self) {
        let slots: Vec<Arc<Slot>> = self.slots.iter().map(|s| Arc::clone(s.value())).collect();
        for slot in slots {
            forget(&slot).await;
        }
    }

    /// List every label definition for the relationship.
    ///
    /// Always asks the CRM, and warms the cache with what it returns.
    pub async fn list(&self) -> Result<Vec<LabelDefinition>> {
        let labels = self.fetch_definitions().await?;

        for label in preferred_per_name(&labels) {
            let slot = self.slot(&cache_key(&label.name));
            // A busy slot is mid-lookup and will fill itself
            let guard = slot.state.try_lock();
            if let Ok(mut state) = guard {
                state.descriptor = Some(label.clone());
                state.last_failure = None;
            }
        }

        info!(count = labels.len(), "Listed association labels");
        Ok(labels)
    }

    fn slot(&self, key: &str) -> Arc<Slot> {
        self.slots.entry(key.to_string()).or_default().clone()
    }

    /// Run one upstream lookup under the slot lock and publish its outcome.
    async fn fly(&self, slot: &Slot, state: &mut SlotState, role_name: &str) -> Result<RoleDescriptor> {
        let result = self.lookup(role_name).await;

        match &result {
            Ok(descriptor) => {
                state.descriptor = Some(descriptor.clone());
                state.last_failure = None;
            }
            Err(err) => state.last_failure = Some(err.clone()),
        }
        slot.flights.fetch_add(1, Ordering::SeqCst);

        result
    }

    async fn fetch_definitions(&self) -> Result<Vec<LabelDefinition>> {
        self.stats.upstream_lookups.fetch_add(1, Ordering::Relaxed);
        let labels = self.transport.label_definitions(self.from, self.to).await?;
        Ok(labels)
    }

    async fn lookup(&self, role_name: &str) -> Result<RoleDescriptor> {
        let labels = self.fetch_definitions().await?;

        match find_label(&labels, role_name) {
            Some(found) => {
                debug!(
                    role = %role_name,
                    label = %found.name,
                    category = %found.category,
                    type_id = found.type_id,
                    "Label resolved from CRM"
                );
                Ok(found.clone())
            }
            None => {
                debug!(role = %role_name, available = labels.len(), "No label registered for role");
                Err(RoleError::LabelNotFound(role_name.trim().to_string()))
            }
        }
    }
}

async fn forget(slot: &Slot) {
    let requested_at = slot.flights.load(Ordering::SeqCst);
    let mut state = slot.state.lock().await;
    if slot.flights.load(Ordering::SeqCst) == requested_at {
        state.descriptor = None;
    }
}

/// Find a label by name, preferring operator-created labels.
pub fn find_label<'a>(labels: &'a [LabelDefinition], name: &str) -> Option<&'a LabelDefinition> {
    labels
        .iter()
        .filter(|l| l.is_named(name))
        .min_by_key(|l| l.category != LabelCategory::UserDefined)
}

/// One label per case-insensitive name, using the same preference as `find_label`.
fn preferred_per_name(labels: &[LabelDefinition]) -> Vec<&LabelDefinition> {
    let mut seen = std::collections::HashSet::new();
    labels
        .iter()
        .filter(|l| seen.insert(cache_key(&l.name)))
        .filter_map(|l| find_label(labels, &l.name))
        .collect()
}
