//! HTTP transport integration tests
//!
//! Verifies request shapes and response mapping against a mock CRM server:
//! - Label definitions and association lookups (batch and paged)
//! - Record property selection
//! - Status code to error mapping

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use launchpad_roles::{
    AssociationFetcher, CrmConfig, CrmTransport, HttpTransport, LabelCategory, LinkStrategy,
    ObjectType, TransportError,
};

async fn setup() -> (MockServer, HttpTransport) {
    let server = MockServer::start().await;
    let transport = HttpTransport::new(CrmConfig {
        base_url: server.uri(),
        access_token: Some("test-token".into()),
        timeout_secs: 5,
        ..Default::default()
    })
    .unwrap();
    (server, transport)
}

// =============================================================================
// Labels
// =============================================================================

#[tokio::test]
async fn test_label_definitions() {
    let (server, transport) = setup().await;

    Mock::given(method("GET"))
        .and(path("/crm/v4/associations/contacts/companies/labels"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                { "category": "HUBSPOT_DEFINED", "typeId": 1, "label": "Primary" },
                { "category": "HUBSPOT_DEFINED", "typeId": 279, "label": null },
                { "category": "USER_DEFINED", "typeId": 3, "label": "Founder" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let labels = transport
        .label_definitions(ObjectType::Contacts, ObjectType::Companies)
        .await
        .unwrap();

    assert_eq!(labels.len(), 2);
    assert_eq!(labels[0].name, "Primary");
    assert_eq!(labels[0].category, LabelCategory::SystemDefined);
    assert_eq!(labels[1].name, "Founder");
    assert_eq!(labels[1].category, LabelCategory::UserDefined);
    assert_eq!(labels[1].type_id, 3);
}

// =============================================================================
// Associations
// =============================================================================

#[tokio::test]
async fn test_paged_associations_follow_cursor() {
    let (server, transport) = setup().await;
    let url = "/crm/v4/objects/companies/5001/associations/contacts";

    Mock::given(method("GET"))
        .and(path(url))
        .and(query_param("limit", "2"))
        .and(query_param("after", "cursor-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                { "toObjectId": "13", "associationTypes": [] }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    // Lower priority so the cursor-specific mock wins for the second page
    Mock::given(method("GET"))
        .and(path(url))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {
                    "toObjectId": 11,
                    "associationTypes": [
                        { "category": "HUBSPOT_DEFINED", "typeId": 1, "label": "Primary" },
                        { "category": "USER_DEFINED", "typeId": 3, "label": "Founder" }
                    ]
                },
                {
                    "toObjectId": 12,
                    "associationTypes": [
                        { "category": "HUBSPOT_DEFINED", "typeId": 279, "label": null }
                    ]
                }
            ],
            "paging": { "next": { "after": "cursor-2" } }
        })))
        .with_priority(10)
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = AssociationFetcher::new(std::sync::Arc::new(transport), LinkStrategy::Paged)
        .with_page_size(2);
    let links = fetcher
        .fetch_links("5001", ObjectType::Contacts)
        .await
        .unwrap();

    let targets: Vec<_> = links.iter().map(|l| l.target_id.as_str()).collect();
    assert_eq!(targets, vec!["11", "12", "13"]);
    assert_eq!(links[0].labels.len(), 2);
    assert!(links[0].labels[1].is_user_label("founder"));
    assert_eq!(links[1].labels[0].name, None);
    assert_eq!(links[1].labels[0].type_id, Some(279));
}

#[tokio::test]
async fn test_batch_read_associations() {
    let (server, transport) = setup().await;

    Mock::given(method("POST"))
        .and(path("/crm/v4/associations/companies/contacts/batch/read"))
        .and(body_json(json!({ "inputs": [{ "id": "5001" }] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "COMPLETE",
            "results": [{
                "from": { "id": "5001" },
                "to": [
                    {
                        "toObjectId": 11,
                        "associationTypes": [
                            { "category": "USER_DEFINED", "typeId": 3, "label": "Founder" },
                            { "category": "HUBSPOT_DEFINED", "typeId": 1, "label": "Primary" }
                        ]
                    },
                    { "toObjectId": 12, "associationTypes": [] }
                ]
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let links = transport
        .links_batch(ObjectType::Companies, ObjectType::Contacts, "5001")
        .await
        .unwrap();

    assert_eq!(links.len(), 2);
    assert_eq!(links[0].target_id, "11");
    assert_eq!(links[0].label_name.as_deref(), Some("Founder"));
    assert_eq!(links[0].type_id, Some(3));
    assert_eq!(links[1].label_name, None);
    assert_eq!(links[1].type_id, None);
}

#[tokio::test]
async fn test_batch_read_without_results() {
    let (server, transport) = setup().await;

    Mock::given(method("POST"))
        .and(path("/crm/v4/associations/companies/contacts/batch/read"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [] })))
        .mount(&server)
        .await;

    let links = transport
        .links_batch(ObjectType::Companies, ObjectType::Contacts, "5001")
        .await
        .unwrap();
    assert!(links.is_empty());
}

// =============================================================================
// Records
// =============================================================================

#[tokio::test]
async fn test_get_record_requests_properties() {
    let (server, transport) = setup().await;

    Mock::given(method("GET"))
        .and(path("/crm/v3/objects/contacts/11"))
        .and(query_param("properties", "firstname,events_hosted,phone"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "11",
            "properties": {
                "firstname": "Ada",
                "events_hosted": 4,
                "phone": null,
                "hs_object_id": "11",
                "createdate": "2025-01-01T00:00:00Z"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let fields: Vec<String> = ["firstname", "events_hosted", "phone"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let record = transport
        .get_record(ObjectType::Contacts, "11", &fields)
        .await
        .unwrap();

    assert_eq!(record.id, "11");
    assert_eq!(record.attributes.len(), 3);
    assert_eq!(record.text("firstname").as_deref(), Some("Ada"));
    assert_eq!(record.text("events_hosted").as_deref(), Some("4"));
    assert_eq!(record.text("phone"), None);
    assert!(!record.attributes.contains_key("hs_object_id"));
}

// =============================================================================
// Error mapping
// =============================================================================

#[tokio::test]
async fn test_unauthorized() {
    let (server, transport) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = transport
        .label_definitions(ObjectType::Contacts, ObjectType::Companies)
        .await
        .unwrap_err();
    assert_eq!(err, TransportError::Unauthorized);
}

#[tokio::test]
async fn test_not_found() {
    let (server, transport) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = transport
        .get_record(ObjectType::Contacts, "404", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::NotFound(p) if p.ends_with("/contacts/404")));
}

#[tokio::test]
async fn test_rate_limited_with_retry_after() {
    let (server, transport) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
        .mount(&server)
        .await;

    let err = transport
        .links_page(ObjectType::Companies, ObjectType::Contacts, "5001", None, 500)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        TransportError::RateLimited {
            retry_after_secs: Some(7)
        }
    );
}

#[tokio::test]
async fn test_server_error_keeps_body() {
    let (server, transport) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = transport
        .label_definitions(ObjectType::Contacts, ObjectType::Companies)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        TransportError::Server {
            status: 503,
            message: "maintenance".into()
        }
    );
}

#[tokio::test]
async fn test_malformed_body_is_invalid_response() {
    let (server, transport) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let err = transport
        .label_definitions(ObjectType::Contacts, ObjectType::Companies)
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_availability_probe() {
    let (server, transport) = setup().await;

    Mock::given(method("GET"))
        .and(path("/integrations/v1/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "portalId": 1 })))
        .mount(&server)
        .await;
    assert!(transport.is_available().await);

    server.reset().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    assert!(!transport.is_available().await);
}
