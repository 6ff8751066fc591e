//! Order endpoints against mocked responses

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use strato_api::ServiceClient;
use strato_services::orders::{OrderService, OrderStatus};

fn service(server: &MockServer) -> OrderService {
    OrderService::new(ServiceClient::new(server.uri(), "prj-1"))
}

#[tokio::test]
async fn order_status_is_mapped_from_the_wire() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/prj-1/orders/ord-1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"order_id": "ord-1", "status": "processing"})),
        )
        .mount(&server)
        .await;

    let status = service(&server).status("ord-1").await.unwrap();
    assert_eq!(status, OrderStatus::Processing);
}

#[tokio::test]
async fn resource_ids_skip_empty_bindings() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/prj-1/orders/ord-1/resources"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resources": [
                {"resource_id": ""},
                {"resource_id": "sh-9"}
            ]
        })))
        .mount(&server)
        .await;

    let ids = service(&server).resource_ids("ord-1").await.unwrap();
    assert_eq!(ids, vec!["sh-9".to_string()]);
}

#[tokio::test]
async fn missing_binding_list_is_empty() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/prj-1/orders/ord-1/resources"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let ids = service(&server).resource_ids("ord-1").await.unwrap();
    assert!(ids.is_empty());
}
