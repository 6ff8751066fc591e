//! File-storage share handler

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::json;

use strato_core::with_operation_retry;
use strato_services::sfs::{
    self, CreateShareRequest, PeriodUnit, PrepaidBilling, SfsShareService, Share,
};
use strato_services::{CONFLICT_RETRY_INTERVAL, OrderService, ServiceError};

use super::is_multi_op_conflict;
use crate::error::{ProviderError, Result};
use crate::resource::{ManagedResource, ResourceSpec, ResourceState};

const TYPE_NAME: &str = "strato_sfs_share";

#[derive(Debug)]
pub struct SfsShareResource {
    shares: SfsShareService,
    orders: OrderService,
}

impl SfsShareResource {
    pub fn new(shares: SfsShareService, orders: OrderService) -> Self {
        Self { shares, orders }
    }

    fn build_create_request(spec: &ResourceSpec) -> Result<CreateShareRequest> {
        Ok(CreateShareRequest {
            name: spec.require_str("name")?,
            size_gb: spec
                .attr::<u64>("size")
                .ok_or(ProviderError::MissingAttribute("size"))?,
            share_proto: spec
                .attr::<String>("share_proto")
                .unwrap_or_else(|| "NFS".to_string()),
            share_type: spec
                .attr::<String>("share_type")
                .unwrap_or_else(|| "STANDARD".to_string()),
            vpc_id: spec.require_str("vpc_id")?,
            subnet_id: spec.require_str("subnet_id")?,
            security_group_id: spec.require_str("security_group_id")?,
            availability_zone: spec.require_str("availability_zone")?,
            crypt_key_id: spec.attr("crypt_key_id"),
            enhanced: spec.attr::<bool>("enhanced").unwrap_or(false),
            dedicated_flavor: spec.attr("dedicated_flavor"),
            dedicated_storage_id: spec.attr("dedicated_storage_id"),
            enterprise_project_id: spec.attr("enterprise_project_id"),
            billing: parse_billing(spec)?,
        })
    }

    async fn state_of(&self, id: &str, action: &'static str) -> Result<ResourceState> {
        let share = self
            .shares
            .get(id)
            .await
            .map_err(|e| ProviderError::operation(action, TYPE_NAME, id, e))?;
        let tags = self
            .shares
            .tags(id)
            .await
            .map_err(|e| ProviderError::operation(action, TYPE_NAME, id, e))?;
        Ok(state_from(&share, tags))
    }
}

#[async_trait]
impl ManagedResource for SfsShareResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    async fn create(&self, spec: &ResourceSpec) -> Result<ResourceState> {
        let request = Self::build_create_request(spec)?;
        let prepaid = request.billing.is_some();

        let created = with_operation_retry(
            sfs::DEFAULT_CREATE_TIMEOUT,
            CONFLICT_RETRY_INTERVAL,
            is_multi_op_conflict,
            || self.shares.create(&request),
        )
        .await
        .map_err(|e| ProviderError::operation("creating", TYPE_NAME, &spec.name, e))?;

        // Prepaid shares materialize through the order; the share id only
        // exists once the order's resource binding appears.
        let share_id = match &created.order_id {
            Some(order_id) if prepaid => {
                self.orders
                    .wait_order_complete(order_id, sfs::DEFAULT_CREATE_TIMEOUT)
                    .await
                    .map_err(|e| ProviderError::operation("creating", TYPE_NAME, &spec.name, e))?;
                self.orders
                    .wait_order_resource(order_id, sfs::DEFAULT_CREATE_TIMEOUT)
                    .await
                    .map_err(|e| ProviderError::operation("creating", TYPE_NAME, &spec.name, e))?
            }
            _ => created.id.clone(),
        };

        self.shares
            .wait_created(&share_id, sfs::DEFAULT_CREATE_TIMEOUT)
            .await
            .map_err(|e| ProviderError::operation("creating", TYPE_NAME, &share_id, e))?;

        let tags = spec.map_attr("tags");
        self.shares
            .set_tags(&share_id, &tags)
            .await
            .map_err(|e| ProviderError::operation("tagging", TYPE_NAME, &share_id, e))?;

        self.state_of(&share_id, "reading").await
    }

    async fn read(&self, id: &str) -> Result<Option<ResourceState>> {
        let share = match self.shares.get(id).await {
            Ok(share) => share,
            Err(err) if err.is_not_found() => return Ok(None),
            Err(err) => return Err(ProviderError::operation("reading", TYPE_NAME, id, err)),
        };
        let tags = self
            .shares
            .tags(id)
            .await
            .map_err(|e| ProviderError::operation("reading", TYPE_NAME, id, e))?;
        Ok(Some(state_from(&share, tags)))
    }

    async fn update(&self, id: &str, spec: &ResourceSpec) -> Result<ResourceState> {
        if let Some(new_size) = spec.attr::<u64>("size") {
            let current = self
                .shares
                .get(id)
                .await
                .map_err(|e| ProviderError::operation("updating", TYPE_NAME, id, e))?;
            let current_size = current.size_gb().unwrap_or(0);

            if new_size < current_size {
                return Err(ProviderError::InvalidAttribute {
                    attribute: "size",
                    reason: format!("capacity can only grow ({current_size} → {new_size})"),
                });
            }
            if new_size > current_size {
                self.expand(id, new_size, parse_billing(spec)?.is_some())
                    .await?;
            }
        }

        let old_tags = self
            .shares
            .tags(id)
            .await
            .map_err(|e| ProviderError::operation("updating", TYPE_NAME, id, e))?;
        let new_tags = spec.map_attr("tags");
        if old_tags != new_tags {
            let old_keys: Vec<String> = old_tags.into_keys().collect();
            self.shares
                .remove_tags(id, &old_keys)
                .await
                .map_err(|e| ProviderError::operation("tagging", TYPE_NAME, id, e))?;
            self.shares
                .set_tags(id, &new_tags)
                .await
                .map_err(|e| ProviderError::operation("tagging", TYPE_NAME, id, e))?;
        }

        self.state_of(id, "reading").await
    }

    async fn delete(&self, id: &str, spec: &ResourceSpec) -> Result<()> {
        if parse_billing(spec)?.is_some() {
            // Prepaid shares are unsubscribed; the remote side tears the
            // share down once the unsubscription settles.
            let ids = vec![id.to_string()];
            with_operation_retry(
                sfs::DEFAULT_DELETE_TIMEOUT,
                CONFLICT_RETRY_INTERVAL,
                is_multi_op_conflict,
                || self.orders.unsubscribe(&ids),
            )
            .await
            .map_err(|e| ProviderError::operation("deleting", TYPE_NAME, id, e))?;
        } else {
            let result = with_operation_retry(
                sfs::DEFAULT_DELETE_TIMEOUT,
                CONFLICT_RETRY_INTERVAL,
                is_multi_op_conflict,
                || self.shares.delete(id),
            )
            .await;
            match result {
                Ok(()) => {}
                Err(err) if err.is_not_found() => return Ok(()),
                Err(err) => return Err(ProviderError::operation("deleting", TYPE_NAME, id, err)),
            }
        }

        self.shares
            .wait_deleted(id, sfs::DEFAULT_DELETE_TIMEOUT)
            .await
            .map_err(|e| ProviderError::operation("deleting", TYPE_NAME, id, e))?;
        Ok(())
    }
}

impl SfsShareResource {
    async fn expand(&self, id: &str, new_size: u64, prepaid: bool) -> Result<()> {
        let order_id = with_operation_retry(
            sfs::DEFAULT_EXPAND_TIMEOUT,
            CONFLICT_RETRY_INTERVAL,
            is_multi_op_conflict,
            || self.shares.expand(id, new_size, prepaid),
        )
        .await
        .map_err(|e| ProviderError::operation("expanding", TYPE_NAME, id, e))?;

        if prepaid {
            let order_id = order_id.ok_or_else(|| {
                ProviderError::operation("expanding", TYPE_NAME, id, ServiceError::OrderMissing)
            })?;
            self.orders
                .wait_order_complete(&order_id, sfs::DEFAULT_EXPAND_TIMEOUT)
                .await
                .map_err(|e| ProviderError::operation("expanding", TYPE_NAME, id, e))?;
            self.orders
                .wait_order_resource(&order_id, sfs::DEFAULT_EXPAND_TIMEOUT)
                .await
                .map_err(|e| ProviderError::operation("expanding", TYPE_NAME, id, e))?;
        }

        self.shares
            .wait_expanded(id, sfs::DEFAULT_EXPAND_TIMEOUT)
            .await
            .map_err(|e| ProviderError::operation("expanding", TYPE_NAME, id, e))?;
        Ok(())
    }
}

fn parse_billing(spec: &ResourceSpec) -> Result<Option<PrepaidBilling>> {
    if spec.attr::<String>("charging_mode").as_deref() != Some("prePaid") {
        return Ok(None);
    }

    let period_unit = match spec.attr::<String>("period_unit").as_deref() {
        Some("month") | None => PeriodUnit::Month,
        Some("year") => PeriodUnit::Year,
        Some(other) => {
            return Err(ProviderError::InvalidAttribute {
                attribute: "period_unit",
                reason: format!("expected 'month' or 'year', got '{other}'"),
            });
        }
    };
    let period = spec
        .attr::<u32>("period")
        .ok_or(ProviderError::MissingAttribute("period"))?;

    Ok(Some(PrepaidBilling {
        period_unit,
        period,
        auto_renew: spec.attr::<bool>("auto_renew").unwrap_or(false),
    }))
}

fn state_from(share: &Share, tags: HashMap<String, String>) -> ResourceState {
    let mut state = ResourceState::new(&share.id, share.effective_status().to_string())
        .with_attribute("name", json!(share.name))
        .with_attribute("share_proto", json!(share.share_proto))
        .with_attribute("share_type", json!(share.share_type))
        .with_attribute("vpc_id", json!(share.vpc_id))
        .with_attribute("subnet_id", json!(share.subnet_id))
        .with_attribute("security_group_id", json!(share.security_group_id))
        .with_attribute("availability_zone", json!(share.availability_zone))
        .with_attribute("version", json!(share.version))
        .with_attribute("export_location", json!(share.export_location))
        .with_attribute("available_capacity", json!(share.avail_capacity))
        .with_attribute("enhanced", json!(share.enhanced()))
        .with_attribute("tags", json!(tags));

    if let Some(size) = share.size_gb() {
        state.set_attribute("size", json!(size));
    }
    if let Some(key_id) = &share.crypt_key_id {
        state.set_attribute("crypt_key_id", json!(key_id));
    }
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base_spec(extra: serde_json::Value) -> ResourceSpec {
        let mut attributes = json!({
            "name": "scratch",
            "size": 500,
            "vpc_id": "vpc-1",
            "subnet_id": "sub-1",
            "security_group_id": "sg-1",
            "availability_zone": "ap-east-1a",
        });
        if let (Some(base), Some(more)) = (attributes.as_object_mut(), extra.as_object()) {
            for (key, value) in more {
                base.insert(key.clone(), value.clone());
            }
        }
        ResourceSpec::new(TYPE_NAME, "scratch", attributes)
    }

    #[test]
    fn create_request_fills_protocol_defaults() {
        let request = SfsShareResource::build_create_request(&base_spec(json!({}))).unwrap();
        assert_eq!(request.share_proto, "NFS");
        assert_eq!(request.share_type, "STANDARD");
        assert!(request.billing.is_none());
    }

    #[test]
    fn prepaid_spec_needs_a_period() {
        let err = SfsShareResource::build_create_request(&base_spec(json!({
            "charging_mode": "prePaid",
            "period_unit": "year",
        })))
        .unwrap_err();
        assert!(matches!(err, ProviderError::MissingAttribute("period")));

        let request = SfsShareResource::build_create_request(&base_spec(json!({
            "charging_mode": "prePaid",
            "period_unit": "year",
            "period": 2,
        })))
        .unwrap();
        let billing = request.billing.unwrap();
        assert_eq!(billing.period_unit, PeriodUnit::Year);
        assert_eq!(billing.period, 2);
    }

    #[test]
    fn missing_network_attribute_is_reported_by_name() {
        let mut spec = base_spec(json!({}));
        spec.attributes.as_object_mut().unwrap().remove("subnet_id");
        let err = SfsShareResource::build_create_request(&spec).unwrap_err();
        assert!(matches!(err, ProviderError::MissingAttribute("subnet_id")));
    }
}
