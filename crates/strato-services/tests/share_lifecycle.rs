//! Share lifecycle against mocked endpoints

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use strato_api::ServiceClient;
use strato_core::{WaitSpec, with_operation_retry};
use strato_services::sfs::{
    CreateShareRequest, PeriodUnit, PrepaidBilling, SfsShareService, ShareStatus,
};
use strato_services::{MULTI_OP_CONFLICT_CODES, ServiceError};

fn service(server: &MockServer) -> SfsShareService {
    SfsShareService::new(ServiceClient::new(server.uri(), "prj-1"))
}

fn request() -> CreateShareRequest {
    CreateShareRequest {
        name: "scratch".to_string(),
        size_gb: 500,
        share_proto: "NFS".to_string(),
        share_type: "STANDARD".to_string(),
        vpc_id: "vpc-1".to_string(),
        subnet_id: "sub-1".to_string(),
        security_group_id: "sg-1".to_string(),
        availability_zone: "ap-east-1a".to_string(),
        ..CreateShareRequest::default()
    }
}

fn fast_spec(pending: Vec<ShareStatus>, target: Vec<ShareStatus>) -> WaitSpec<ShareStatus> {
    WaitSpec::new(pending, target, Duration::from_secs(2))
        .poll_interval(Duration::from_millis(20))
}

#[tokio::test]
async fn create_then_poll_until_available() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/prj-1/sfs-turbo/shares"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "sh-1"})))
        .expect(1)
        .mount(&server)
        .await;

    // Two probes still provisioning, then available.
    Mock::given(method("GET"))
        .and(path("/v1/prj-1/sfs-turbo/shares/sh-1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": "sh-1", "name": "scratch", "status": "100"})),
        )
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/prj-1/sfs-turbo/shares/sh-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "sh-1",
            "name": "scratch",
            "status": "200",
            "size": "500.0",
            "export_location": "10.0.0.5:/",
        })))
        .mount(&server)
        .await;

    let service = service(&server);
    let created = service.create(&request()).await.unwrap();
    assert_eq!(created.id, "sh-1");
    assert_eq!(created.order_id, None);

    let share = service
        .wait_status(
            "sh-1",
            fast_spec(vec![ShareStatus::Creating], vec![ShareStatus::Available]),
        )
        .await
        .unwrap()
        .expect("share must be present on success");

    assert_eq!(share.effective_status(), ShareStatus::Available);
    assert_eq!(share.size_gb(), Some(500));
    assert_eq!(share.export_location, "10.0.0.5:/");
}

#[tokio::test]
async fn prepaid_create_without_order_id_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/prj-1/sfs-turbo/shares"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "sh-2"})))
        .mount(&server)
        .await;

    let mut prepaid = request();
    prepaid.billing = Some(PrepaidBilling {
        period_unit: PeriodUnit::Month,
        period: 3,
        auto_renew: true,
    });

    let err = service(&server).create(&prepaid).await.unwrap_err();
    assert!(matches!(err, ServiceError::OrderMissing), "got {err:?}");
}

#[tokio::test]
async fn delete_poll_treats_404_as_deleted() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/v1/prj-1/sfs-turbo/shares/sh-1"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/prj-1/sfs-turbo/shares/sh-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": "sh-1", "status": "200"})),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/prj-1/sfs-turbo/shares/sh-1"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"error_msg": "share not found"})),
        )
        .mount(&server)
        .await;

    let service = service(&server);
    service.delete("sh-1").await.unwrap();

    let snapshot = service
        .wait_status(
            "sh-1",
            fast_spec(
                vec![ShareStatus::Creating, ShareStatus::Available],
                vec![ShareStatus::Deleted],
            ),
        )
        .await
        .unwrap();
    assert!(snapshot.is_none());
}

#[tokio::test]
async fn conflicting_expand_is_retried_until_it_lands() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/prj-1/sfs-turbo/shares/sh-1/action"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "errCode": "DBS.201202",
            "error_msg": "another operation is in progress"
        })))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/prj-1/sfs-turbo/shares/sh-1/action"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let service = service(&server);
    let order_id = with_operation_retry(
        Duration::from_secs(5),
        Duration::from_millis(20),
        |err: &ServiceError| {
            matches!(err, ServiceError::Api(api) if api.is_transient_conflict(MULTI_OP_CONFLICT_CODES))
        },
        || service.expand("sh-1", 600, false),
    )
    .await
    .unwrap();

    assert_eq!(order_id, None);
}

#[tokio::test]
async fn unexpected_status_fails_the_wait() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/prj-1/sfs-turbo/shares/sh-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": "sh-1", "status": "303"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = service(&server)
        .wait_status(
            "sh-1",
            fast_spec(vec![ShareStatus::Creating], vec![ShareStatus::Available]),
        )
        .await
        .unwrap_err();

    match err {
        ServiceError::Wait(strato_core::WaitError::UnexpectedStatus(status)) => {
            assert_eq!(status, "303");
        }
        other => panic!("expected UnexpectedStatus, got {other:?}"),
    }
}
