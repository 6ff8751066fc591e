//! Prepaid order tracking
//!
//! Prepaid create and expand calls register an order instead of acting
//! immediately. The order first has to complete, then the ordered resource
//! appears under the order's resource bindings; only then does the share
//! id exist and the usual status polling take over.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use strato_api::ServiceClient;
use strato_core::{Probe, StateWaiter, StatusProbe, WaitSpec};

use crate::error::{Result, ServiceError};

const ORDER_POLL_INTERVAL: Duration = Duration::from_secs(5);
const ORDER_INITIAL_DELAY: Duration = Duration::from_secs(3);

/// Order lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderStatus {
    /// "processing" — payment or fulfilment still running.
    Processing,
    /// "completed" — the order went through.
    Completed,
    /// "failed" — the order was rejected or cancelled.
    Failed,
    Unknown(String),
}

impl OrderStatus {
    pub fn from_wire(state: &str) -> Self {
        match state {
            "processing" => OrderStatus::Processing,
            "completed" => OrderStatus::Completed,
            "failed" => OrderStatus::Failed,
            other => OrderStatus::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::Processing => "processing",
            OrderStatus::Completed => "completed",
            OrderStatus::Failed => "failed",
            OrderStatus::Unknown(state) => state,
        };
        write!(f, "{s}")
    }
}

/// Whether an order's resource binding has appeared yet.
#[derive(Debug, Clone, PartialEq, Eq)]
enum BindingStatus {
    Waiting,
    Bound,
}

impl fmt::Display for BindingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BindingStatus::Waiting => "waiting",
            BindingStatus::Bound => "bound",
        };
        write!(f, "{s}")
    }
}

/// Client for the order endpoints.
#[derive(Debug, Clone)]
pub struct OrderService {
    client: ServiceClient,
}

impl OrderService {
    pub fn new(client: ServiceClient) -> Self {
        Self { client }
    }

    pub async fn status(&self, order_id: &str) -> Result<OrderStatus> {
        let url = self
            .client
            .url("v2/{project_id}/orders/{order_id}", &[("order_id", order_id)]);
        let body = self.client.get(&url).await?;
        let state = body
            .get("status")
            .and_then(Value::as_str)
            .ok_or(ServiceError::MissingField("status"))?;
        Ok(OrderStatus::from_wire(state))
    }

    /// Resource ids bound to a completed order. Empty until fulfilment
    /// has caught up.
    pub async fn resource_ids(&self, order_id: &str) -> Result<Vec<String>> {
        let url = self.client.url(
            "v2/{project_id}/orders/{order_id}/resources",
            &[("order_id", order_id)],
        );
        let body = self.client.get(&url).await?;

        let ids = body
            .get("resources")
            .and_then(Value::as_array)
            .map(|resources| {
                resources
                    .iter()
                    .filter_map(|r| r.get("resource_id").and_then(Value::as_str))
                    .filter(|id| !id.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Ok(ids)
    }

    /// Unsubscribe prepaid resources. The remote side then tears them
    /// down asynchronously; callers poll the resource itself afterwards.
    pub async fn unsubscribe(&self, resource_ids: &[String]) -> Result<()> {
        let url = self.client.url("v2/{project_id}/orders/unsubscribe", &[]);
        let body = serde_json::json!({ "resource_ids": resource_ids });

        tracing::debug!(count = resource_ids.len(), "unsubscribing prepaid resources");
        self.client.post(&url, &body).await?;
        Ok(())
    }

    /// Block until the order completes.
    pub async fn wait_order_complete(&self, order_id: &str, timeout: Duration) -> Result<()> {
        let spec = WaitSpec::new(
            vec![OrderStatus::Processing],
            vec![OrderStatus::Completed],
            timeout,
        )
        .initial_delay(ORDER_INITIAL_DELAY)
        .poll_interval(ORDER_POLL_INTERVAL);

        let probe = OrderStatusProbe {
            service: self,
            order_id,
        };
        StateWaiter::new(probe, spec).run().await?;
        Ok(())
    }

    /// Block until the ordered resource exists, returning its id.
    pub async fn wait_order_resource(&self, order_id: &str, timeout: Duration) -> Result<String> {
        let spec = WaitSpec::new(
            vec![BindingStatus::Waiting],
            vec![BindingStatus::Bound],
            timeout,
        )
        .poll_interval(ORDER_POLL_INTERVAL);

        let probe = OrderResourceProbe {
            service: self,
            order_id,
        };
        let resource_id = StateWaiter::new(probe, spec).run().await?;
        resource_id.ok_or(ServiceError::MissingField("resource_id"))
    }
}

struct OrderStatusProbe<'a> {
    service: &'a OrderService,
    order_id: &'a str,
}

#[async_trait]
impl StatusProbe for OrderStatusProbe<'_> {
    type Status = OrderStatus;
    type Snapshot = ();

    async fn probe(&self) -> Probe<OrderStatus, ()> {
        match self.service.status(self.order_id).await {
            Ok(status) => Probe::Observed {
                status,
                snapshot: (),
            },
            Err(err) => Probe::Failed(err.into()),
        }
    }
}

struct OrderResourceProbe<'a> {
    service: &'a OrderService,
    order_id: &'a str,
}

#[async_trait]
impl StatusProbe for OrderResourceProbe<'_> {
    type Status = BindingStatus;
    type Snapshot = Option<String>;

    async fn probe(&self) -> Probe<BindingStatus, Option<String>> {
        match self.service.resource_ids(self.order_id).await {
            Ok(ids) => match ids.into_iter().next() {
                Some(id) => Probe::Observed {
                    status: BindingStatus::Bound,
                    snapshot: Some(id),
                },
                None => Probe::Observed {
                    status: BindingStatus::Waiting,
                    snapshot: None,
                },
            },
            Err(err) => Probe::Failed(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_status_mapping() {
        assert_eq!(OrderStatus::from_wire("processing"), OrderStatus::Processing);
        assert_eq!(OrderStatus::from_wire("completed"), OrderStatus::Completed);
        assert_eq!(OrderStatus::from_wire("failed"), OrderStatus::Failed);
        assert_eq!(
            OrderStatus::from_wire("refunding"),
            OrderStatus::Unknown("refunding".to_string())
        );
    }
}
