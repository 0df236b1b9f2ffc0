//! HTTP transport for the CRM REST API.
//!
//! Associations and labels use the v4 associations API, records use the v3
//! objects API. Ids are accepted as JSON strings or numbers.

use async_trait::async_trait;
use reqwest::{header, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;
use tracing::debug;

use super::traits::*;
use crate::config::CrmConfig;
use crate::types::{AttributeValue, LabelCategory, LabelDefinition, LabelTag, ObjectType, Record};

/// HTTP transport against the CRM API
///
/// # Example
///
/// ```rust,no_run
/// use launchpad_roles::{CrmConfig, CrmTransport, HttpTransport};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let transport = HttpTransport::new(CrmConfig {
///     access_token: Some("pat-na1-...".into()),
///     ..Default::default()
/// })?;
///
/// assert!(transport.is_available().await);
/// # Ok(())
/// # }
/// ```
pub struct HttpTransport {
    config: CrmConfig,
    client: Client,
}

impl HttpTransport {
    /// Create a new transport
    pub fn new(config: CrmConfig) -> Result<Self, TransportError> {
        let mut headers = header::HeaderMap::new();
        if let Some(ref token) = config.access_token {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| TransportError::Config("access token is not a valid header value".into()))?;
            headers.insert(header::AUTHORIZATION, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| TransportError::Config(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Base URL without a trailing slash
    fn base(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    fn labels_url(&self, from: ObjectType, to: ObjectType) -> String {
        format!("{}/crm/v4/associations/{}/{}/labels", self.base(), from, to)
    }

    fn batch_read_url(&self, from: ObjectType, to: ObjectType) -> String {
        format!("{}/crm/v4/associations/{}/{}/batch/read", self.base(), from, to)
    }

    fn associations_url(&self, from: ObjectType, id: &str, to: ObjectType) -> String {
        format!(
            "{}/crm/v4/objects/{}/{}/associations/{}",
            self.base(),
            from,
            urlencoding::encode(id),
            to
        )
    }

    fn record_url(&self, object_type: ObjectType, id: &str) -> String {
        format!(
            "{}/crm/v3/objects/{}/{}",
            self.base(),
            object_type,
            urlencoding::encode(id)
        )
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response, TransportError> {
        let response = request.send().await.map_err(map_reqwest_error)?;
        check_status(response).await
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, TransportError> {
        response
            .json()
            .await
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))
    }
}

// ==================== Wire Types ====================

/// Object id as either a JSON string or number
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireId {
    Text(String),
    Number(u64),
}

impl WireId {
    fn into_string(self) -> String {
        match self {
            WireId::Text(s) => s,
            WireId::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
struct ResultsEnvelope<T> {
    #[serde(default)]
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireLabel {
    category: LabelCategory,
    type_id: u64,
    label: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireAssociationType {
    category: Option<LabelCategory>,
    type_id: Option<u64>,
    label: Option<String>,
}

impl From<WireAssociationType> for LabelTag {
    fn from(t: WireAssociationType) -> Self {
        LabelTag {
            name: t.label,
            category: t.category,
            type_id: t.type_id,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireAssociation {
    to_object_id: WireId,
    #[serde(default)]
    association_types: Vec<WireAssociationType>,
}

#[derive(Debug, Deserialize)]
struct WireBatchResult {
    #[serde(default)]
    to: Vec<WireAssociation>,
}

#[derive(Debug, Serialize)]
struct BatchReadRequest<'a> {
    inputs: Vec<BatchInput<'a>>,
}

#[derive(Debug, Serialize)]
struct BatchInput<'a> {
    id: &'a str,
}

#[derive(Debug, Deserialize)]
struct WirePage {
    #[serde(default)]
    results: Vec<WireAssociation>,
    paging: Option<WirePaging>,
}

#[derive(Debug, Deserialize)]
struct WirePaging {
    next: Option<WireNext>,
}

#[derive(Debug, Deserialize)]
struct WireNext {
    after: String,
}

#[derive(Debug, Deserialize)]
struct WireObject {
    id: WireId,
    #[serde(default)]
    properties: BTreeMap<String, Option<AttributeValue>>,
}

// ==================== Transport ====================

#[async_trait]
impl CrmTransport for HttpTransport {
    async fn label_definitions(
        &self,
        from: ObjectType,
        to: ObjectType,
    ) -> Result<Vec<LabelDefinition>, TransportError> {
        let url = self.labels_url(from, to);
        debug!(url = %url, "Fetching label definitions");

        let response = self.send(self.client.get(&url)).await?;
        let body: ResultsEnvelope<WireLabel> = Self::decode(response).await?;

        // Unlabeled default types cannot name a role
        Ok(body
            .results
            .into_iter()
            .filter_map(|l| {
                l.label
                    .filter(|name| !name.trim().is_empty())
                    .map(|name| LabelDefinition::new(name, l.category, l.type_id))
            })
            .collect())
    }

    async fn links_batch(
        &self,
        from: ObjectType,
        to: ObjectType,
        id: &str,
    ) -> Result<Vec<BatchLink>, TransportError> {
        let url = self.batch_read_url(from, to);
        debug!(url = %url, id = %id, "Batch reading associations");

        let body = BatchReadRequest {
            inputs: vec![BatchInput { id }],
        };
        let response = self.send(self.client.post(&url).json(&body)).await?;
        let body: ResultsEnvelope<WireBatchResult> = Self::decode(response).await?;

        let Some(result) = body.results.into_iter().next() else {
            return Ok(Vec::new());
        };

        Ok(result
            .to
            .into_iter()
            .map(|assoc| {
                let first = assoc.association_types.into_iter().next();
                BatchLink {
                    target_id: assoc.to_object_id.into_string(),
                    type_id: first.as_ref().and_then(|t| t.type_id),
                    label_name: first.and_then(|t| t.label),
                }
            })
            .collect())
    }

    async fn links_page(
        &self,
        from: ObjectType,
        to: ObjectType,
        id: &str,
        cursor: Option<&str>,
        page_size: u32,
    ) -> Result<LinkPage, TransportError> {
        let url = self.associations_url(from, id, to);
        debug!(url = %url, cursor = ?cursor, page_size, "Fetching association page");

        let mut request = self
            .client
            .get(&url)
            .query(&[("limit", page_size.to_string())]);
        if let Some(after) = cursor {
            request = request.query(&[("after", after)]);
        }

        let response = self.send(request).await?;
        let page: WirePage = Self::decode(response).await?;

        Ok(LinkPage {
            results: page
                .results
                .into_iter()
                .map(|assoc| PagedLink {
                    target_id: assoc.to_object_id.into_string(),
                    label_tags: assoc.association_types.into_iter().map(LabelTag::from).collect(),
                })
                .collect(),
            next_cursor: page.paging.and_then(|p| p.next).map(|n| n.after),
        })
    }

    async fn get_record(
        &self,
        object_type: ObjectType,
        id: &str,
        fields: &[String],
    ) -> Result<Record, TransportError> {
        let url = self.record_url(object_type, id);

        let mut request = self.client.get(&url);
        if !fields.is_empty() {
            request = request.query(&[("properties", fields.join(","))]);
        }

        let response = self.send(request).await?;
        let object: WireObject = Self::decode(response).await?;

        // The CRM adds system properties; keep only what was asked for
        let requested: HashSet<&str> = fields.iter().map(String::as_str).collect();
        let attributes = object
            .properties
            .into_iter()
            .filter(|(key, _)| requested.is_empty() || requested.contains(key.as_str()))
            .collect();

        Ok(Record {
            id: object.id.into_string(),
            attributes,
        })
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/integrations/v1/me", self.base());
        match self.client.get(&url).send().await {
            Ok(r) => r.status().is_success(),
            Err(e) => {
                debug!(error = %e, "CRM connectivity check failed");
                false
            }
        }
    }
}

// ==================== Helper Functions ====================

fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_decode() {
        TransportError::InvalidResponse(e.to_string())
    } else {
        TransportError::Network(e.to_string())
    }
}

async fn check_status(response: Response) -> Result<Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(TransportError::Unauthorized),
        StatusCode::NOT_FOUND => Err(TransportError::NotFound(response.url().path().to_string())),
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after_secs = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok());
            Err(TransportError::RateLimited { retry_after_secs })
        }
        _ => {
            let body = response.text().await.unwrap_or_default();
            Err(TransportError::Server {
                status: status.as_u16(),
                message: body,
            })
        }
    }
}
