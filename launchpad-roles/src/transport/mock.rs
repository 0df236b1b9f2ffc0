//! Mock CRM transport for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use super::traits::*;
use crate::types::{LabelDefinition, Link, ObjectType, Record};

/// Mock transport for testing.
///
/// Holds labels, links and records in memory, with injectable failures,
/// latency and per-call counters.
pub struct MockTransport {
    labels: RwLock<Vec<LabelDefinition>>,
    links: RwLock<HashMap<String, Vec<Link>>>,
    records: RwLock<HashMap<String, Record>>,
    failing_records: RwLock<HashSet<String>>,
    label_failure: RwLock<Option<TransportError>>,
    link_failure: RwLock<Option<TransportError>>,
    available: AtomicBool,
    label_latency_ms: AtomicU64,
    record_latency_ms: AtomicU64,
    label_calls: AtomicU32,
    batch_calls: AtomicU32,
    page_calls: AtomicU32,
    record_calls: AtomicU32,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl MockTransport {
    /// Create an empty mock transport.
    pub fn new() -> Self {
        Self {
            labels: RwLock::new(Vec::new()),
            links: RwLock::new(HashMap::new()),
            records: RwLock::new(HashMap::new()),
            failing_records: RwLock::new(HashSet::new()),
            label_failure: RwLock::new(None),
            link_failure: RwLock::new(None),
            available: AtomicBool::new(true),
            label_latency_ms: AtomicU64::new(0),
            record_latency_ms: AtomicU64::new(0),
            label_calls: AtomicU32::new(0),
            batch_calls: AtomicU32::new(0),
            page_calls: AtomicU32::new(0),
            record_calls: AtomicU32::new(0),
        }
    }

    /// Register a label definition.
    pub fn with_label(self, label: LabelDefinition) -> Self {
        self.add_label(label);
        self
    }

    /// Set the links of a source record.
    pub fn with_links(self, source_id: impl Into<String>, links: Vec<Link>) -> Self {
        write(&self.links).insert(source_id.into(), links);
        self
    }

    /// Store a record.
    pub fn with_record(self, record: Record) -> Self {
        write(&self.records).insert(record.id.clone(), record);
        self
    }

    /// Make fetches of this record id fail with a network error.
    pub fn with_failing_record(self, id: impl Into<String>) -> Self {
        write(&self.failing_records).insert(id.into());
        self
    }

    /// Make label definition lookups fail.
    pub fn with_label_failure(self, error: TransportError) -> Self {
        *write(&self.label_failure) = Some(error);
        self
    }

    /// Make link lookups fail.
    pub fn with_link_failure(self, error: TransportError) -> Self {
        *write(&self.link_failure) = Some(error);
        self
    }

    /// Delay every label definition lookup.
    pub fn with_label_latency(self, latency: Duration) -> Self {
        self.label_latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
        self
    }

    /// Delay every record fetch.
    pub fn with_record_latency(self, latency: Duration) -> Self {
        self.record_latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
        self
    }

    /// Set availability.
    pub fn with_available(self, available: bool) -> Self {
        self.available.store(available, Ordering::SeqCst);
        self
    }

    /// Register a label at runtime, as an operator would.
    pub fn add_label(&self, label: LabelDefinition) {
        write(&self.labels).push(label);
    }

    /// Remove every label with this name (case-insensitive).
    pub fn remove_label(&self, name: &str) {
        write(&self.labels).retain(|l| !l.is_named(name));
    }

    /// Number of label definition lookups served.
    pub fn label_calls(&self) -> u32 {
        self.label_calls.load(Ordering::SeqCst)
    }

    /// Number of batch link lookups served.
    pub fn batch_calls(&self) -> u32 {
        self.batch_calls.load(Ordering::SeqCst)
    }

    /// Number of link pages served.
    pub fn page_calls(&self) -> u32 {
        self.page_calls.load(Ordering::SeqCst)
    }

    /// Number of record fetches attempted.
    pub fn record_calls(&self) -> u32 {
        self.record_calls.load(Ordering::SeqCst)
    }

    fn links_of(&self, id: &str) -> Result<Vec<Link>, TransportError> {
        if let Some(error) = read(&self.link_failure).clone() {
            return Err(error);
        }
        Ok(read(&self.links).get(id).cloned().unwrap_or_default())
    }

    async fn delay(latency_ms: &AtomicU64) {
        let ms = latency_ms.load(Ordering::SeqCst);
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CrmTransport for MockTransport {
    async fn label_definitions(
        &self,
        _from: ObjectType,
        _to: ObjectType,
    ) -> Result<Vec<LabelDefinition>, TransportError> {
        self.label_calls.fetch_add(1, Ordering::SeqCst);
        Self::delay(&self.label_latency_ms).await;

        if let Some(error) = read(&self.label_failure).clone() {
            return Err(error);
        }
        Ok(read(&self.labels).clone())
    }

    async fn links_batch(
        &self,
        _from: ObjectType,
        _to: ObjectType,
        id: &str,
    ) -> Result<Vec<BatchLink>, TransportError> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);

        Ok(self
            .links_of(id)?
            .into_iter()
            .map(|link| {
                let first = link.labels.into_iter().next().unwrap_or_default();
                BatchLink {
                    target_id: link.target_id,
                    label_name: first.name,
                    type_id: first.type_id,
                }
            })
            .collect())
    }

    async fn links_page(
        &self,
        _from: ObjectType,
        _to: ObjectType,
        id: &str,
        cursor: Option<&str>,
        page_size: u32,
    ) -> Result<LinkPage, TransportError> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);

        let links = self.links_of(id)?;
        let start = match cursor {
            Some(c) => c
                .parse::<usize>()
                .map_err(|_| TransportError::InvalidResponse(format!("bad cursor {:?}", c)))?,
            None => 0,
        };
        let end = (start + page_size.max(1) as usize).min(links.len());

        let results = links
            .get(start..end)
            .unwrap_or_default()
            .iter()
            .map(|link| PagedLink {
                target_id: link.target_id.clone(),
                label_tags: link.labels.clone(),
            })
            .collect();

        Ok(LinkPage {
            results,
            next_cursor: (end < links.len()).then(|| end.to_string()),
        })
    }

    async fn get_record(
        &self,
        _object_type: ObjectType,
        id: &str,
        fields: &[String],
    ) -> Result<Record, TransportError> {
        self.record_calls.fetch_add(1, Ordering::SeqCst);
        Self::delay(&self.record_latency_ms).await;

        if read(&self.failing_records).contains(id) {
            return Err(TransportError::Network(format!("injected failure for {}", id)));
        }

        let mut record = read(&self.records)
            .get(id)
            .cloned()
            .ok_or_else(|| TransportError::NotFound(id.to_string()))?;

        if !fields.is_empty() {
            record.attributes.retain(|key, _| fields.contains(key));
        }
        Ok(record)
    }

    async fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }
}
