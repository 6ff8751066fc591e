//! WAF precise-protection rule handler
//!
//! Rules live under a policy, so the provider-side id is the composite
//! `<policy_id>/<rule_id>`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use strato_services::waf::{RuleCondition, RuleRequest, WafRule, WafRuleService};

use crate::error::{ProviderError, Result};
use crate::resource::{ManagedResource, ResourceSpec, ResourceState};

const TYPE_NAME: &str = "strato_waf_rule";

const TIME_WINDOW_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug)]
pub struct WafRuleResource {
    rules: WafRuleService,
}

/// Condition as the host writes it.
#[derive(Debug, Clone, Default, Deserialize)]
struct FlatCondition {
    #[serde(default)]
    field: String,
    #[serde(default)]
    subfield: Option<String>,
    #[serde(default)]
    logic: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    reference_table_id: Option<String>,
}

impl WafRuleResource {
    pub fn new(rules: WafRuleService) -> Self {
        Self { rules }
    }

    fn build_request(spec: &ResourceSpec) -> Result<RuleRequest> {
        let flat = spec
            .attr::<Vec<FlatCondition>>("conditions")
            .unwrap_or_default();
        let conditions = flat
            .into_iter()
            .map(|c| RuleCondition {
                category: c.field,
                index: c.subfield,
                logic_operation: c.logic,
                contents: c.content.into_iter().collect(),
                value_list_id: c.reference_table_id,
            })
            .collect();

        Ok(RuleRequest {
            name: spec.require_str("name")?,
            priority: spec
                .attr::<i64>("priority")
                .ok_or(ProviderError::MissingAttribute("priority"))?,
            conditions,
            action: spec.attr("action"),
            description: spec.attr("description"),
            start_time: parse_window(spec, "start_time")?,
            end_time: parse_window(spec, "end_time")?,
        })
    }
}

#[async_trait]
impl ManagedResource for WafRuleResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    async fn create(&self, spec: &ResourceSpec) -> Result<ResourceState> {
        let policy_id = spec.require_str("policy_id")?;
        let request = Self::build_request(spec)?;

        let rule_id = self
            .rules
            .create(&policy_id, &request)
            .await
            .map_err(|e| ProviderError::operation("creating", TYPE_NAME, &spec.name, e))?;
        let id = format!("{policy_id}/{rule_id}");

        // Rules come up enabled; an explicit status of 0 means disabled.
        if spec.attr::<i64>("status") == Some(0) {
            self.rules
                .set_enabled(&policy_id, &rule_id, false)
                .await
                .map_err(|e| ProviderError::operation("creating", TYPE_NAME, &id, e))?;
        }

        self.read(&id).await?.ok_or_else(|| {
            ProviderError::operation(
                "reading",
                TYPE_NAME,
                &id,
                strato_services::ServiceError::MissingField("rule"),
            )
        })
    }

    async fn read(&self, id: &str) -> Result<Option<ResourceState>> {
        let (policy_id, rule_id) = split_id(id)?;
        match self.rules.get(policy_id, rule_id).await {
            Ok(rule) => Ok(Some(state_from(id, &rule))),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(ProviderError::operation("reading", TYPE_NAME, id, err)),
        }
    }

    async fn update(&self, id: &str, spec: &ResourceSpec) -> Result<ResourceState> {
        let (policy_id, rule_id) = split_id(id)?;
        let request = Self::build_request(spec)?;

        self.rules
            .update(policy_id, rule_id, &request)
            .await
            .map_err(|e| ProviderError::operation("updating", TYPE_NAME, id, e))?;

        if let Some(status) = spec.attr::<i64>("status") {
            self.rules
                .set_enabled(policy_id, rule_id, status != 0)
                .await
                .map_err(|e| ProviderError::operation("updating", TYPE_NAME, id, e))?;
        }

        self.read(id).await?.ok_or_else(|| {
            ProviderError::operation(
                "reading",
                TYPE_NAME,
                id,
                strato_services::ServiceError::MissingField("rule"),
            )
        })
    }

    async fn delete(&self, id: &str, _spec: &ResourceSpec) -> Result<()> {
        let (policy_id, rule_id) = split_id(id)?;
        match self.rules.delete(policy_id, rule_id).await {
            Ok(()) => Ok(()),
            Err(err) if err.is_not_found() => Ok(()),
            Err(err) => Err(ProviderError::operation("deleting", TYPE_NAME, id, err)),
        }
    }
}

fn split_id(id: &str) -> Result<(&str, &str)> {
    id.split_once('/').ok_or_else(|| ProviderError::InvalidAttribute {
        attribute: "id",
        reason: format!("expected <policy_id>/<rule_id>, got '{id}'"),
    })
}

fn parse_window(spec: &ResourceSpec, key: &'static str) -> Result<Option<DateTime<Utc>>> {
    let Some(raw) = spec.attr::<String>(key).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    NaiveDateTime::parse_from_str(&raw, TIME_WINDOW_FORMAT)
        .map(|naive| Some(naive.and_utc()))
        .map_err(|e| ProviderError::InvalidAttribute {
            attribute: key,
            reason: format!("expected '{TIME_WINDOW_FORMAT}' timestamp: {e}"),
        })
}

fn state_from(id: &str, rule: &WafRule) -> ResourceState {
    let conditions: Vec<_> = rule
        .conditions
        .iter()
        .map(|c| {
            json!({
                "field": c.category,
                "subfield": c.index,
                "logic": c.logic_operation,
                "content": c.contents.first(),
                "reference_table_id": c.value_list_id,
            })
        })
        .collect();

    let status = if rule.enabled() { "enabled" } else { "disabled" };
    let mut state = ResourceState::new(id, status)
        .with_attribute("policy_id", json!(rule.policy_id))
        .with_attribute("name", json!(rule.name))
        .with_attribute("priority", json!(rule.priority))
        .with_attribute("description", json!(rule.description))
        .with_attribute("action", json!(rule.action()))
        .with_attribute("conditions", json!(conditions));

    if let Some(start) = rule.start_time() {
        state.set_attribute(
            "start_time",
            json!(start.format(TIME_WINDOW_FORMAT).to_string()),
        );
    }
    if let Some(end) = rule.end_time() {
        state.set_attribute("end_time", json!(end.format(TIME_WINDOW_FORMAT).to_string()));
    }
    state
}
