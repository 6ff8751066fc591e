//! WAF precise-protection rules
//!
//! Policy-scoped rules matching requests against a condition list, with an
//! optional effective time window. Rule CRUD is synchronous; enabling or
//! disabling goes through a separate status endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use strato_api::{ApiError, ServiceClient};

use crate::error::Result;

/// Protective action taken when a rule matches.
pub const DEFAULT_RULE_ACTION: &str = "block";

/// One match condition of a rule, in wire form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleCondition {
    /// Request field the condition inspects (url, ip, params, ...).
    #[serde(default)]
    pub category: String,
    /// Subfield within the category (header name, param name, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    #[serde(default)]
    pub logic_operation: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contents: Vec<String>,
    /// Reference table standing in for inline contents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_list_id: Option<String>,
}

/// A rule as reported by the API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WafRule {
    #[serde(default)]
    pub id: String,
    #[serde(default, rename = "policyid")]
    pub policy_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub description: String,
    /// 1 enabled, 0 disabled.
    #[serde(default)]
    pub status: i64,
    #[serde(default)]
    pub conditions: Vec<RuleCondition>,
    #[serde(default)]
    action: Option<ActionBody>,
    /// Unix timestamps bounding the effective window.
    #[serde(default)]
    start: Option<i64>,
    #[serde(default, rename = "terminal")]
    end: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
struct ActionBody {
    #[serde(default)]
    category: String,
}

impl WafRule {
    pub fn enabled(&self) -> bool {
        self.status == 1
    }

    pub fn action(&self) -> &str {
        self.action
            .as_ref()
            .map(|a| a.category.as_str())
            .unwrap_or(DEFAULT_RULE_ACTION)
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start.and_then(|ts| DateTime::from_timestamp(ts, 0))
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end.and_then(|ts| DateTime::from_timestamp(ts, 0))
    }
}

#[derive(Debug, Clone, Default)]
pub struct RuleRequest {
    pub name: String,
    pub priority: i64,
    pub conditions: Vec<RuleCondition>,
    pub action: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

/// Client for the precise-protection rule endpoints.
#[derive(Debug, Clone)]
pub struct WafRuleService {
    client: ServiceClient,
    enterprise_project_id: Option<String>,
}

impl WafRuleService {
    pub fn new(client: ServiceClient, enterprise_project_id: Option<String>) -> Self {
        Self {
            client,
            enterprise_project_id,
        }
    }

    pub fn client(&self) -> &ServiceClient {
        &self.client
    }

    pub async fn create(&self, policy_id: &str, request: &RuleRequest) -> Result<String> {
        let url = self.rule_collection_url(policy_id);
        let body = build_rule_body(request);

        tracing::debug!(policy_id, name = %request.name, "creating waf rule");
        let response = self.client.post(&url, &body).await?;
        response
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(crate::ServiceError::MissingField("id"))
    }

    pub async fn get(&self, policy_id: &str, rule_id: &str) -> Result<WafRule> {
        let url = self.rule_url(policy_id, rule_id);
        let response = self.client.get(&url).await?;
        Ok(serde_json::from_value(response).map_err(ApiError::Decode)?)
    }

    pub async fn update(&self, policy_id: &str, rule_id: &str, request: &RuleRequest) -> Result<()> {
        let url = self.rule_url(policy_id, rule_id);
        let body = build_rule_body(request);
        self.client.put(&url, &body).await?;
        Ok(())
    }

    /// Enable or disable a rule without touching its definition.
    pub async fn set_enabled(&self, policy_id: &str, rule_id: &str, enabled: bool) -> Result<()> {
        let url = format!("{}/status", self.rule_url(policy_id, rule_id));
        let url = self.with_query(&url);
        let body = json!({ "status": i64::from(enabled) });
        self.client.put(&url, &body).await?;
        Ok(())
    }

    pub async fn delete(&self, policy_id: &str, rule_id: &str) -> Result<()> {
        let url = self.rule_url(policy_id, rule_id);
        self.client.delete(&url).await?;
        Ok(())
    }

    fn rule_collection_url(&self, policy_id: &str) -> String {
        let url = self.client.url(
            "v1/{project_id}/waf/policy/{policy_id}/custom",
            &[("policy_id", policy_id)],
        );
        self.with_query(&url)
    }

    fn rule_url(&self, policy_id: &str, rule_id: &str) -> String {
        let url = self.client.url(
            "v1/{project_id}/waf/policy/{policy_id}/custom/{rule_id}",
            &[("policy_id", policy_id), ("rule_id", rule_id)],
        );
        self.with_query(&url)
    }

    fn with_query(&self, url: &str) -> String {
        match &self.enterprise_project_id {
            Some(eps_id) if !eps_id.is_empty() => {
                format!("{url}?enterprise_project_id={eps_id}")
            }
            _ => url.to_string(),
        }
    }
}

fn build_rule_body(request: &RuleRequest) -> Value {
    let mut body = Map::new();
    body.insert("name".to_string(), json!(request.name));
    body.insert("priority".to_string(), json!(request.priority));
    body.insert("conditions".to_string(), json!(request.conditions));
    body.insert(
        "action".to_string(),
        json!({
            "category": request.action.as_deref().unwrap_or(DEFAULT_RULE_ACTION)
        }),
    );
    if let Some(description) = &request.description {
        body.insert("description".to_string(), json!(description));
    }

    if let Some(start) = request.start_time {
        body.insert("start".to_string(), json!(start.timestamp()));
    }
    if let Some(end) = request.end_time {
        body.insert("terminal".to_string(), json!(end.timestamp()));
    }
    if request.start_time.is_some() || request.end_time.is_some() {
        body.insert("time".to_string(), json!(true));
    }

    Value::Object(body)
}
