//! Association fetcher
//!
//! Reads the links of one record through either lookup strategy and
//! normalizes them to [`Link`]s. Pages are requested strictly one after
//! another, in cursor order. No retries.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use crate::config::{LinkStrategy, MAX_PAGE_SIZE};
use crate::error::Result;
use crate::transport::{BatchLink, CrmTransport, TransportError};
use crate::types::{LabelTag, Link, ObjectType};

/// Retrieves links between a record and records of another type.
pub struct AssociationFetcher {
    transport: Arc<dyn CrmTransport>,
    strategy: LinkStrategy,
    page_size: u32,
    source_type: ObjectType,
}

impl AssociationFetcher {
    /// Fetcher for links whose source is an organization record.
    pub fn new(transport: Arc<dyn CrmTransport>, strategy: LinkStrategy) -> Self {
        Self {
            transport,
            strategy,
            page_size: MAX_PAGE_SIZE,
            source_type: ObjectType::Companies,
        }
    }

    /// Set the page size for the paged strategy (clamped to 1..=500).
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    /// Set the organization object type.
    pub fn with_source_type(mut self, source_type: ObjectType) -> Self {
        self.source_type = source_type;
        self
    }

    pub fn strategy(&self) -> LinkStrategy {
        self.strategy
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Links from an organization to records of `target`.
    pub async fn fetch_links(&self, organization_id: &str, target: ObjectType) -> Result<Vec<Link>> {
        self.fetch_links_from(self.source_type, organization_id, target)
            .await
    }

    /// Links from any record to records of `target`.
    pub async fn fetch_links_from(
        &self,
        source: ObjectType,
        id: &str,
        target: ObjectType,
    ) -> Result<Vec<Link>> {
        let links = match self.strategy {
            LinkStrategy::Batch => self.fetch_batch(source, id, target).await?,
            LinkStrategy::Paged => self.fetch_paged(source, id, target).await?,
        };

        debug!(
            source = %source,
            id = %id,
            target = %target,
            strategy = %self.strategy,
            count = links.len(),
            "Fetched links"
        );
        Ok(links)
    }

    async fn fetch_batch(&self, source: ObjectType, id: &str, target: ObjectType) -> Result<Vec<Link>> {
        let raw = self.transport.links_batch(source, target, id).await?;
        Ok(first_occurrences(raw.into_iter().map(batch_to_link)))
    }

    async fn fetch_paged(&self, source: ObjectType, id: &str, target: ObjectType) -> Result<Vec<Link>> {
        let mut links = Vec::new();
        let mut cursor: Option<String> = None;
        let mut seen_cursors = HashSet::new();
        let mut pages = 0u32;

        loop {
            let page = self
                .transport
                .links_page(source, target, id, cursor.as_deref(), self.page_size)
                .await?;
            pages += 1;

            links.extend(
                page.results
                    .into_iter()
                    .map(|p| Link::new(p.target_id, p.label_tags)),
            );

            match page.next_cursor.filter(|c| !c.is_empty()) {
                None => break,
                Some(next) => {
                    if !seen_cursors.insert(next.clone()) {
                        return Err(TransportError::InvalidResponse(format!(
                            "pagination cursor {:?} repeated",
                            next
                        ))
                        .into());
                    }
                    cursor = Some(next);
                }
            }
        }

        debug!(id = %id, pages, "Followed association pages");
        Ok(merge_duplicates(links))
    }
}

fn batch_to_link(raw: BatchLink) -> Link {
    let labels = if raw.label_name.is_some() || raw.type_id.is_some() {
        vec![LabelTag {
            name: raw.label_name,
            category: None,
            type_id: raw.type_id,
        }]
    } else {
        Vec::new()
    };
    Link::new(raw.target_id, labels)
}

/// Drop links whose target id was already seen.
///
/// Batch links carry a single label, so a repeated target keeps the first one.
fn first_occurrences(links: impl IntoIterator<Item = Link>) -> Vec<Link> {
    let mut seen = HashSet::new();
    links
        .into_iter()
        .filter(|link| seen.insert(link.target_id.clone()))
        .collect()
}

/// Collapse links that share a target id.
///
/// The first occurrence keeps its position; labels from later occurrences
/// are appended unless already present.
pub fn merge_duplicates(links: impl IntoIterator<Item = Link>) -> Vec<Link> {
    let mut merged: Vec<Link> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for link in links {
        match index.get(&link.target_id) {
            Some(&i) => {
                let existing = &mut merged[i].labels;
                for tag in link.labels {
                    if !existing.contains(&tag) {
                        existing.push(tag);
                    }
                }
            }
            None => {
                index.insert(link.target_id.clone(), merged.len());
                merged.push(link);
            }
        }
    }

    merged
}
