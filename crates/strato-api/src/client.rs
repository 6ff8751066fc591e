//! JSON service client
//!
//! Thin wrapper over reqwest shared by all resource modules: endpoint +
//! project scoping, `{param}` path templating, and uniform error mapping
//! (404 → [`ApiError::NotFound`], other non-2xx → [`ApiError::Response`]
//! with the provider error code pulled out of the body).

use reqwest::Method;
use serde_json::Value;

use crate::error::{ApiError, Result};

/// Client for one service endpoint.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    http: reqwest::Client,
    endpoint: String,
    project_id: String,
}

impl ServiceClient {
    pub fn new(endpoint: impl Into<String>, project_id: impl Into<String>) -> Self {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            endpoint,
            project_id: project_id.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Expand a path template into a full URL. `{project_id}` is always
    /// available; further `{name}` parameters come from `params`.
    pub fn url(&self, template: &str, params: &[(&str, &str)]) -> String {
        let mut path = template.replace("{project_id}", &self.project_id);
        for (key, value) in params {
            path = path.replace(&format!("{{{key}}}"), value);
        }
        format!("{}/{}", self.endpoint, path.trim_start_matches('/'))
    }

    pub async fn get(&self, url: &str) -> Result<Value> {
        self.request(Method::GET, url, None).await
    }

    pub async fn post(&self, url: &str, body: &Value) -> Result<Value> {
        self.request(Method::POST, url, Some(body)).await
    }

    pub async fn put(&self, url: &str, body: &Value) -> Result<Value> {
        self.request(Method::PUT, url, Some(body)).await
    }

    pub async fn delete(&self, url: &str) -> Result<Value> {
        self.request(Method::DELETE, url, None).await
    }

    async fn request(&self, method: Method, url: &str, body: Option<&Value>) -> Result<Value> {
        tracing::debug!(%method, url, "api request");

        let mut request = self.http.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound {
                url: url.to_string(),
            });
        }

        let bytes = response.bytes().await?;
        if !status.is_success() {
            return Err(ApiError::from_response(status.as_u16(), url, &bytes));
        }

        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(ApiError::Decode)
    }
}
