//! Organization account operations against mocked endpoints

use std::collections::HashMap;

use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use strato_api::ServiceClient;
use strato_services::organizations::{AccountState, OrganizationsService};

fn service(server: &MockServer) -> OrganizationsService {
    // The organizations API is global; no project scoping.
    OrganizationsService::new(ServiceClient::new(server.uri(), ""))
}

#[tokio::test]
async fn create_returns_account_and_status_handles() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/organizations/accounts"))
        .and(body_json(json!({
            "name": "payments-prod",
            "tags": [{"key": "env", "value": "prod"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "create_account_status": {
                "id": "cas-1",
                "account_id": "acct-1",
                "state": "in_progress"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut tags = HashMap::new();
    tags.insert("env".to_string(), "prod".to_string());

    let created = service(&server)
        .create_account("payments-prod", &tags)
        .await
        .unwrap();
    assert_eq!(created.account_id, "acct-1");
    assert_eq!(created.status_id, "cas-1");
}

#[tokio::test]
async fn creation_state_is_mapped_from_the_wire() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/organizations/create-account-status/cas-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "create_account_status": {"id": "cas-1", "state": "succeeded"}
        })))
        .mount(&server)
        .await;

    let state = service(&server).account_state("cas-1").await.unwrap();
    assert_eq!(state, AccountState::Succeeded);
}

#[tokio::test]
async fn parent_lookup_reads_the_first_entity() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/organizations/entities"))
        .and(query_param("child_id", "acct-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entities": [{"id": "ou-12", "type": "organizational_unit"}]
        })))
        .mount(&server)
        .await;

    let parent = service(&server).parent_of("acct-1").await.unwrap();
    assert_eq!(parent.as_deref(), Some("ou-12"));
}

#[tokio::test]
async fn move_posts_both_parents() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/organizations/accounts/acct-1/move"))
        .and(body_json(json!({
            "source_parent_id": "ou-12",
            "destination_parent_id": "ou-34"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    service(&server)
        .move_account("acct-1", "ou-12", "ou-34")
        .await
        .unwrap();
}

#[tokio::test]
async fn account_read_unwraps_the_envelope() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/organizations/accounts/acct-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "account": {
                "id": "acct-1",
                "name": "payments-prod",
                "urn": "organizations::acct-1",
                "joined_at": "2024-05-01T00:00:00Z",
                "join_method": "created"
            }
        })))
        .mount(&server)
        .await;

    let account = service(&server).get_account("acct-1").await.unwrap();
    assert_eq!(account.name, "payments-prod");
    assert_eq!(account.joined_method, "created");
}

#[tokio::test]
async fn account_tags_round_trip() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/organizations/accounts/acct-1/tags/action"))
        .and(body_json(json!({
            "action": "create",
            "tags": [{"key": "env", "value": "prod"}]
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/organizations/accounts/acct-1/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tags": [{"key": "env", "value": "prod"}]
        })))
        .mount(&server)
        .await;

    let service = service(&server);

    let mut tags = HashMap::new();
    tags.insert("env".to_string(), "prod".to_string());
    service.set_account_tags("acct-1", &tags).await.unwrap();

    let fetched = service.account_tags("acct-1").await.unwrap();
    assert_eq!(fetched.get("env").map(String::as_str), Some("prod"));
}
