//! Provider HTTP Tests
//!
//! Exercise the Airtable and Retell clients against a scripted local HTTP
//! server, verifying the exact requests they send and how they decode what
//! comes back.

use time::macros::datetime;
use url::Url;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use callgate::core::access::{CodeStore, StoreError};
use callgate::core::records::AirtableStore;
use callgate::core::voice::{CallMetadata, RetellClient, VoiceBackend, VoiceError};

fn airtable(server: &MockServer) -> AirtableStore {
    AirtableStore::new(
        reqwest::Client::new(),
        "key_test",
        "appTEST",
        "Access_Codes",
    )
    .with_base_url(Url::parse(&server.uri()).unwrap())
}

fn retell(server: &MockServer) -> RetellClient {
    RetellClient::new(reqwest::Client::new(), "retell_test")
        .with_base_url(Url::parse(&server.uri()).unwrap())
}

// =============================================================================
// AirtableStore
// =============================================================================

#[tokio::test]
async fn find_active_sends_filter_and_decodes_the_record() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/appTEST/Access_Codes"))
        .and(query_param(
            "filterByFormula",
            r#"AND({Code} = "BETA-2025", OR({Active} = 1, {Active} = ""))"#,
        ))
        .and(query_param("maxRecords", "1"))
        .and(header("Authorization", "Bearer key_test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "records": [{
                "id": "recXYZ",
                "createdTime": "2025-01-01T00:00:00.000Z",
                "fields": {
                    "Code": "BETA-2025",
                    "Active": true,
                    "Max_Uses": 3,
                    "Used_Count": 1,
                    "Expires_At": "2030-06-15T10:30:00Z"
                }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let record = airtable(&server)
        .find_active("BETA-2025")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(record.id, "recXYZ");
    assert_eq!(record.code, "BETA-2025");
    assert_eq!(record.remaining(), Some(2));
    assert_eq!(record.expires_at, Some(datetime!(2030-06-15 10:30 UTC)));
}

#[tokio::test]
async fn find_active_returns_none_when_no_record_matches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/appTEST/Access_Codes"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"records": []})),
        )
        .mount(&server)
        .await;

    let found = airtable(&server).find_active("NOPE").await.unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn store_rejection_carries_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(403).set_body_string(r#"{"error": "NOT_AUTHORIZED"}"#),
        )
        .mount(&server)
        .await;

    let err = airtable(&server).find_active("BETA-2025").await.unwrap_err();
    let StoreError::Rejected { status, body } = err else {
        panic!("expected rejection, got {err:?}");
    };
    assert_eq!(status, 403);
    assert!(body.contains("NOT_AUTHORIZED"));
}

#[tokio::test]
async fn garbage_payload_is_malformed_not_a_panic() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let err = airtable(&server).find_active("BETA-2025").await.unwrap_err();
    assert!(matches!(err, StoreError::Malformed(_)));
}

#[tokio::test]
async fn update_used_count_patches_the_single_field() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/appTEST/Access_Codes/recXYZ"))
        .and(header("Authorization", "Bearer key_test"))
        .and(body_json(
            serde_json::json!({"fields": {"Used_Count": 3}}),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "recXYZ",
            "fields": {"Code": "BETA-2025", "Used_Count": 3}
        })))
        .expect(1)
        .mount(&server)
        .await;

    airtable(&server).update_used_count("recXYZ", 3).await.unwrap();
}

#[tokio::test]
async fn rejected_update_reports_the_store_answer() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .respond_with(
            ResponseTemplate::new(422).set_body_string(r#"{"error": "INVALID_VALUE_FOR_COLUMN"}"#),
        )
        .mount(&server)
        .await;

    let err = airtable(&server)
        .update_used_count("recXYZ", 3)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Rejected { status: 422, .. }));
}

#[tokio::test]
async fn probe_lists_one_record_without_a_filter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/appTEST/Access_Codes"))
        .and(query_param("maxRecords", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "records": [{"id": "recA", "fields": {"Code": "ANY"}}]
        })))
        .mount(&server)
        .await;

    assert_eq!(airtable(&server).probe().await.unwrap(), 1);
}

// =============================================================================
// RetellClient
// =============================================================================

fn metadata() -> CallMetadata {
    CallMetadata {
        participant_name: "Ada Lovelace".to_string(),
        company: Some("Analytical Engines".to_string()),
        email: "ada@example.com".to_string(),
        scenario: "feedback".to_string(),
        persona: None,
        attempt: Some(1),
    }
}

#[tokio::test]
async fn create_call_posts_agent_and_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/create-web-call"))
        .and(header("Authorization", "Bearer retell_test"))
        .and(body_json(serde_json::json!({
            "agent_id": "agent_42",
            "metadata": {
                "participant_name": "Ada Lovelace",
                "company": "Analytical Engines",
                "email": "ada@example.com",
                "scenario": "feedback",
                "attempt": 1
            }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "access_token": "tok_abc",
            "call_id": "call_123",
            "call_status": "registered"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let credential = retell(&server)
        .create_call("agent_42", &metadata())
        .await
        .unwrap();
    assert_eq!(credential.access_token, "tok_abc");
    assert_eq!(credential.call_id, "call_123");
}

#[tokio::test]
async fn provider_error_keeps_the_raw_body_for_diagnosis() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/create-web-call"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_string(r#"{"error_message": "internal provider error"}"#),
        )
        .mount(&server)
        .await;

    let err = retell(&server)
        .create_call("agent_42", &metadata())
        .await
        .unwrap_err();
    let VoiceError::Upstream { status, body } = err else {
        panic!("expected upstream error, got {err:?}");
    };
    assert_eq!(status, 500);
    assert!(body.contains("internal provider error"));
}

#[tokio::test]
async fn success_without_a_token_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"call_id": "call_123"})),
        )
        .mount(&server)
        .await;

    let err = retell(&server)
        .create_call("agent_42", &metadata())
        .await
        .unwrap_err();
    assert!(matches!(err, VoiceError::Malformed(_)));
}
