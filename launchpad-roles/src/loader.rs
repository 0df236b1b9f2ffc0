//! Record batch loader
//!
//! Fetches full records for a list of ids with bounded concurrency. A fetch
//! that fails drops that id from the output and is logged; it never fails
//! the batch. Surviving records come back in the order of their ids.

use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use crate::error::RoleError;
use crate::transport::CrmTransport;
use crate::types::{ObjectType, Record};

/// Loads records concurrently, tolerating individual failures.
pub struct RecordLoader {
    transport: Arc<dyn CrmTransport>,
    object_type: ObjectType,
    max_concurrency: usize,
}

impl RecordLoader {
    pub fn new(transport: Arc<dyn CrmTransport>, object_type: ObjectType) -> Self {
        Self {
            transport,
            object_type,
            max_concurrency: 10,
        }
    }

    /// Cap on in-flight fetches (at least 1).
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Load every id with exactly `fields`.
    pub async fn load_all(&self, ids: &[String], fields: &[String]) -> Vec<Record> {
        let ids = dedup(ids);
        if ids.is_empty() {
            return Vec::new();
        }

        let requested = ids.len();
        let records: Vec<Record> = stream::iter(ids)
            .map(|id| self.load_one(id, fields))
            .buffered(self.max_concurrency)
            .filter_map(|result| async move {
                match result {
                    Ok(record) => Some(record),
                    Err(err) => {
                        warn!(error = %err, "Dropping record");
                        None
                    }
                }
            })
            .collect()
            .await;

        debug!(
            requested,
            loaded = records.len(),
            failed = requested - records.len(),
            "Loaded records"
        );
        records
    }

    async fn load_one(&self, id: String, fields: &[String]) -> Result<Record, RoleError> {
        self.transport
            .get_record(self.object_type, &id, fields)
            .await
            .map_err(|source| RoleError::RecordFetchFailed { id, source })
    }
}

/// Remove repeated ids, keeping first occurrences in order.
fn dedup(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn mock_with(records: &[&str]) -> MockTransport {
        records.iter().fold(MockTransport::new(), |mock, id| {
            mock.with_record(Record::new(*id).with("email", format!("{}@example.com", id)))
        })
    }

    #[tokio::test]
    async fn test_partial_failures_are_dropped() {
        let mock = Arc::new(
            mock_with(&["1", "2", "3", "4", "5"])
                .with_failing_record("2")
                .with_failing_record("4")
                .with_failing_record("5"),
        );
        let loader = RecordLoader::new(mock.clone(), ObjectType::Contacts);

        let records = loader
            .load_all(&ids(&["1", "2", "3", "4", "5"]), &ids(&["email"]))
            .await;

        let loaded: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(loaded, vec!["1", "3"]);
        assert_eq!(mock.record_calls(), 5);
    }

    #[tokio::test]
    async fn test_missing_records_are_dropped() {
        let mock = Arc::new(mock_with(&["1"]));
        let loader = RecordLoader::new(mock, ObjectType::Contacts);

        let records = loader.load_all(&ids(&["404", "1"]), &[]).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "1");
    }

    #[tokio::test]
    async fn test_empty_input_makes_no_calls() {
        let mock = Arc::new(MockTransport::new());
        let loader = RecordLoader::new(mock.clone(), ObjectType::Contacts);

        assert!(loader.load_all(&[], &ids(&["email"])).await.is_empty());
        assert_eq!(mock.record_calls(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_ids_fetched_once() {
        let mock = Arc::new(mock_with(&["1", "2"]));
        let loader = RecordLoader::new(mock.clone(), ObjectType::Contacts).with_max_concurrency(0);

        let records = loader.load_all(&ids(&["2", "1", "2", "1"]), &[]).await;

        let loaded: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(loaded, vec!["2", "1"]);
        assert_eq!(mock.record_calls(), 2);
    }

    #[tokio::test]
    async fn test_requested_fields_only() {
        let mock = Arc::new(MockTransport::new().with_record(
            Record::new("1")
                .with("email", "a@example.com")
                .with("hs_object_id", "1"),
        ));
        let loader = RecordLoader::new(mock, ObjectType::Contacts);

        let records = loader.load_all(&ids(&["1"]), &ids(&["email", "phone"])).await;

        assert_eq!(records[0].attributes.len(), 1);
        assert!(records[0].attributes.contains_key("email"));
    }
}
