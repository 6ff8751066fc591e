//! File-storage shares
//!
//! High-performance NFS shares. Provisioning, capacity expansion and
//! deletion are asynchronous: the share reports a numeric status (plus a
//! more specific sub-status during expansion) that the wait helpers poll.
//!
//! Pay-per-use shares are created and deleted directly; prepaid shares go
//! through the order service first (create returns an order id, delete is
//! an unsubscription) — see [`crate::orders`].

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use strato_api::{ApiError, ServiceClient};
use strato_core::{Probe, StateWaiter, StatusProbe, WaitSpec};

use crate::error::{Result, ServiceError};

/// Resource type segment in tag URLs.
pub const SHARE_RESOURCE_TYPE: &str = "sfs-turbo";

pub const DEFAULT_CREATE_TIMEOUT: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_EXPAND_TIMEOUT: Duration = Duration::from_secs(15 * 60);
pub const DEFAULT_DELETE_TIMEOUT: Duration = Duration::from_secs(10 * 60);

const CREATE_POLL_INTERVAL: Duration = Duration::from_secs(3);
const EXPAND_POLL_INTERVAL: Duration = Duration::from_secs(5);
const DELETE_INITIAL_DELAY: Duration = Duration::from_secs(5);
const DELETE_MIN_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Share lifecycle status.
///
/// The wire representation is a numeric string; expansion progress is
/// reported through the sub-status field with its own codes. `deleted` is
/// synthetic: the status endpoint answers 404 once the share is gone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareStatus {
    /// "100" — provisioning.
    Creating,
    /// "200" — ready for use.
    Available,
    /// "121" — capacity expansion in progress (sub-status).
    Expanding,
    /// "221" — capacity expansion finished (sub-status).
    Expanded,
    /// Synthetic: the share no longer exists.
    Deleted,
    /// Anything the mapping does not know.
    Unknown(String),
}

impl ShareStatus {
    pub fn from_wire(code: &str) -> Self {
        match code {
            "100" => ShareStatus::Creating,
            "200" => ShareStatus::Available,
            "121" => ShareStatus::Expanding,
            "221" => ShareStatus::Expanded,
            other => ShareStatus::Unknown(other.to_string()),
        }
    }

    pub fn as_wire(&self) -> &str {
        match self {
            ShareStatus::Creating => "100",
            ShareStatus::Available => "200",
            ShareStatus::Expanding => "121",
            ShareStatus::Expanded => "221",
            ShareStatus::Deleted => "deleted",
            ShareStatus::Unknown(code) => code,
        }
    }
}

impl fmt::Display for ShareStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_wire())
    }
}

/// A share as reported by the API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Share {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub sub_status: String,
    /// Stringified float on the wire ("500.0").
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub share_proto: String,
    #[serde(default)]
    pub share_type: String,
    #[serde(default)]
    pub vpc_id: String,
    #[serde(default)]
    pub subnet_id: String,
    #[serde(default)]
    pub security_group_id: String,
    #[serde(default)]
    pub availability_zone: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub export_location: String,
    #[serde(default)]
    pub avail_capacity: String,
    #[serde(default)]
    pub crypt_key_id: Option<String>,
    #[serde(default)]
    pub expand_type: Option<String>,
    #[serde(default)]
    pub enterprise_project_id: Option<String>,
}

impl Share {
    /// Sub-status is the more specific signal when present.
    pub fn effective_status(&self) -> ShareStatus {
        if !self.sub_status.is_empty() {
            ShareStatus::from_wire(&self.sub_status)
        } else {
            ShareStatus::from_wire(&self.status)
        }
    }

    /// Capacity in whole gigabytes, parsed from the stringified float.
    pub fn size_gb(&self) -> Option<u64> {
        self.size.parse::<f64>().ok().map(|size| size as u64)
    }

    /// Whether the share was created with enhanced bandwidth.
    pub fn enhanced(&self) -> bool {
        self.expand_type.as_deref() == Some("bandwidth")
    }
}

/// Billing period unit for prepaid shares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodUnit {
    Month,
    Year,
}

impl PeriodUnit {
    fn as_wire(self) -> u8 {
        match self {
            PeriodUnit::Month => 2,
            PeriodUnit::Year => 3,
        }
    }
}

/// Prepaid billing parameters. Auto-pay is always enabled so the order
/// does not stall waiting for manual payment.
#[derive(Debug, Clone)]
pub struct PrepaidBilling {
    pub period_unit: PeriodUnit,
    pub period: u32,
    pub auto_renew: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CreateShareRequest {
    pub name: String,
    pub size_gb: u64,
    pub share_proto: String,
    pub share_type: String,
    pub vpc_id: String,
    pub subnet_id: String,
    pub security_group_id: String,
    pub availability_zone: String,
    pub crypt_key_id: Option<String>,
    pub enhanced: bool,
    pub dedicated_flavor: Option<String>,
    pub dedicated_storage_id: Option<String>,
    pub enterprise_project_id: Option<String>,
    pub billing: Option<PrepaidBilling>,
}

/// What a create call hands back: the share id for pay-per-use, plus the
/// order id for prepaid shares.
#[derive(Debug, Clone)]
pub struct CreatedShare {
    pub id: String,
    pub order_id: Option<String>,
}

/// Client for the share endpoints.
#[derive(Debug, Clone)]
pub struct SfsShareService {
    client: ServiceClient,
}

impl SfsShareService {
    pub fn new(client: ServiceClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ServiceClient {
        &self.client
    }

    pub async fn create(&self, request: &CreateShareRequest) -> Result<CreatedShare> {
        let url = self.client.url("v1/{project_id}/sfs-turbo/shares", &[]);
        let body = build_create_body(request);
        tracing::debug!(name = %request.name, size_gb = request.size_gb, "creating share");

        let response = self.client.post(&url, &body).await?;
        let id = string_field(&response, "id").ok_or(ServiceError::MissingField("id"))?;
        let order_id = string_field(&response, "orderId");

        if request.billing.is_some() && order_id.is_none() {
            return Err(ServiceError::OrderMissing);
        }
        Ok(CreatedShare { id, order_id })
    }

    pub async fn get(&self, id: &str) -> Result<Share> {
        let url = self
            .client
            .url("v1/{project_id}/sfs-turbo/shares/{id}", &[("id", id)]);
        let body = self.client.get(&url).await?;
        Ok(serde_json::from_value(body).map_err(ApiError::Decode)?)
    }

    /// Grow the share. Shrinking is rejected remotely; callers validate
    /// before getting here. Returns the order id for prepaid shares.
    pub async fn expand(&self, id: &str, new_size_gb: u64, prepaid: bool) -> Result<Option<String>> {
        let url = self
            .client
            .url("v1/{project_id}/sfs-turbo/shares/{id}/action", &[("id", id)]);

        let mut extend = Map::new();
        extend.insert("new_size".to_string(), json!(new_size_gb));
        if prepaid {
            extend.insert("bss_param".to_string(), json!({ "is_auto_pay": 1 }));
        }
        let body = json!({ "extend": extend });

        tracing::debug!(id, new_size_gb, "expanding share");
        let response = self.client.post(&url, &body).await?;
        Ok(string_field(&response, "orderId"))
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let url = self
            .client
            .url("v1/{project_id}/sfs-turbo/shares/{id}", &[("id", id)]);
        self.client.delete(&url).await?;
        Ok(())
    }

    /// Block until a freshly created share is available.
    pub async fn wait_created(&self, id: &str, timeout: Duration) -> Result<Share> {
        let spec = WaitSpec::new(
            vec![ShareStatus::Creating],
            vec![ShareStatus::Available],
            timeout,
        )
        .poll_interval(CREATE_POLL_INTERVAL);

        let snapshot = self.wait_status(id, spec).await?;
        snapshot.ok_or(ServiceError::MissingField("share"))
    }

    /// Block until an expansion has finished.
    pub async fn wait_expanded(&self, id: &str, timeout: Duration) -> Result<Share> {
        let spec = WaitSpec::new(
            vec![ShareStatus::Expanding],
            vec![ShareStatus::Expanded, ShareStatus::Available],
            timeout,
        )
        .poll_interval(EXPAND_POLL_INTERVAL);

        let snapshot = self.wait_status(id, spec).await?;
        snapshot.ok_or(ServiceError::MissingField("share"))
    }

    /// Block until the share is gone (status endpoint answers 404).
    pub async fn wait_deleted(&self, id: &str, timeout: Duration) -> Result<()> {
        let spec = WaitSpec::new(
            vec![ShareStatus::Creating, ShareStatus::Available],
            vec![ShareStatus::Deleted],
            timeout,
        )
        .initial_delay(DELETE_INITIAL_DELAY)
        .min_poll_interval(DELETE_MIN_POLL_INTERVAL);

        self.wait_status(id, spec).await?;
        Ok(())
    }

    /// Poll the share's status with an explicit [`WaitSpec`]. The snapshot
    /// is `None` when the terminal observation was the 404 of a deleted
    /// share.
    pub async fn wait_status(
        &self,
        id: &str,
        spec: WaitSpec<ShareStatus>,
    ) -> Result<Option<Share>> {
        let probe = ShareStatusProbe { service: self, id };
        Ok(StateWaiter::new(probe, spec).run().await?)
    }

    pub async fn set_tags(&self, id: &str, tags: &HashMap<String, String>) -> Result<()> {
        strato_api::create_resource_tags(&self.client, SHARE_RESOURCE_TYPE, id, tags).await?;
        Ok(())
    }

    pub async fn remove_tags(&self, id: &str, keys: &[String]) -> Result<()> {
        strato_api::delete_resource_tags_with_keys(&self.client, SHARE_RESOURCE_TYPE, id, keys)
            .await?;
        Ok(())
    }

    pub async fn tags(&self, id: &str) -> Result<HashMap<String, String>> {
        Ok(strato_api::resource_tags(&self.client, SHARE_RESOURCE_TYPE, id).await?)
    }
}

struct ShareStatusProbe<'a> {
    service: &'a SfsShareService,
    id: &'a str,
}

#[async_trait]
impl StatusProbe for ShareStatusProbe<'_> {
    type Status = ShareStatus;
    type Snapshot = Option<Share>;

    async fn probe(&self) -> Probe<ShareStatus, Option<Share>> {
        match self.service.get(self.id).await {
            Ok(share) => Probe::Observed {
                status: share.effective_status(),
                snapshot: Some(share),
            },
            Err(ServiceError::Api(err)) if err.is_not_found() => {
                tracing::debug!(id = self.id, "share no longer exists");
                Probe::Observed {
                    status: ShareStatus::Deleted,
                    snapshot: None,
                }
            }
            Err(err) => Probe::Failed(err.into()),
        }
    }
}

fn build_create_body(request: &CreateShareRequest) -> Value {
    let mut metadata = Map::new();
    if let Some(key_id) = &request.crypt_key_id {
        metadata.insert("crypt_key_id".to_string(), json!(key_id));
    }
    if request.enhanced {
        metadata.insert("expand_type".to_string(), json!("bandwidth"));
    }
    if let Some(flavor) = &request.dedicated_flavor {
        metadata.insert("dedicated_flavor".to_string(), json!(flavor));
    }
    if let Some(storage_id) = &request.dedicated_storage_id {
        metadata.insert("dedicated_storage_id".to_string(), json!(storage_id));
    }

    let mut share = Map::new();
    share.insert("name".to_string(), json!(request.name));
    share.insert("size".to_string(), json!(request.size_gb));
    share.insert("share_proto".to_string(), json!(request.share_proto));
    share.insert("share_type".to_string(), json!(request.share_type));
    share.insert("vpc_id".to_string(), json!(request.vpc_id));
    share.insert("subnet_id".to_string(), json!(request.subnet_id));
    share.insert(
        "security_group_id".to_string(),
        json!(request.security_group_id),
    );
    share.insert(
        "availability_zone".to_string(),
        json!(request.availability_zone),
    );
    if let Some(eps_id) = &request.enterprise_project_id {
        share.insert("enterprise_project_id".to_string(), json!(eps_id));
    }
    if !metadata.is_empty() {
        share.insert("metadata".to_string(), Value::Object(metadata));
    }

    let mut body = Map::new();
    body.insert("share".to_string(), Value::Object(share));

    if let Some(billing) = &request.billing {
        body.insert(
            "bss_param".to_string(),
            json!({
                "period_type": billing.period_unit.as_wire(),
                "period_num": billing.period,
                "is_auto_renew": u8::from(billing.auto_renew),
                "is_auto_pay": 1,
            }),
        );
    }

    Value::Object(body)
}

fn string_field(body: &Value, key: &str) -> Option<String> {
    body.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
