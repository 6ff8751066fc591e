//! Organization accounts
//!
//! Member accounts of the organization. Account creation is asynchronous:
//! the create call returns a status handle that is polled until the
//! account exists, after which the account can be moved between
//! organizational units. The organizations API is global, not
//! project-scoped.
//!
//! Accounts cannot be deleted remotely; the provider layer only forgets
//! them.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use strato_api::{ApiError, ServiceClient};
use strato_core::{Probe, StateWaiter, StatusProbe, WaitSpec};

use crate::error::{Result, ServiceError};

pub const DEFAULT_CREATE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

const CREATE_INITIAL_DELAY: Duration = Duration::from_secs(10);
const CREATE_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// State of an account-creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountState {
    InProgress,
    Succeeded,
    Failed,
    Unknown(String),
}

impl AccountState {
    pub fn from_wire(state: &str) -> Self {
        match state {
            "in_progress" => AccountState::InProgress,
            "succeeded" => AccountState::Succeeded,
            "failed" => AccountState::Failed,
            other => AccountState::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for AccountState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AccountState::InProgress => "in_progress",
            AccountState::Succeeded => "succeeded",
            AccountState::Failed => "failed",
            AccountState::Unknown(state) => state,
        };
        write!(f, "{s}")
    }
}

/// Handle returned by a create call.
#[derive(Debug, Clone)]
pub struct CreatedAccount {
    pub account_id: String,
    /// Id of the creation status record to poll.
    pub status_id: String,
}

/// An account as reported by the API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Account {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub urn: String,
    #[serde(default)]
    pub joined_at: String,
    #[serde(default, rename = "join_method")]
    pub joined_method: String,
}

#[derive(Debug, Deserialize)]
struct AccountEnvelope {
    account: Account,
}

/// Client for the organizations endpoints.
#[derive(Debug, Clone)]
pub struct OrganizationsService {
    client: ServiceClient,
}

impl OrganizationsService {
    pub fn new(client: ServiceClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ServiceClient {
        &self.client
    }

    pub async fn create_account(
        &self,
        name: &str,
        tags: &HashMap<String, String>,
    ) -> Result<CreatedAccount> {
        let url = self.client.url("v1/organizations/accounts", &[]);

        let mut body = json!({ "name": name });
        if !tags.is_empty() {
            let tag_list: Vec<_> = {
                let mut pairs: Vec<_> = tags.iter().collect();
                pairs.sort();
                pairs
                    .into_iter()
                    .map(|(key, value)| json!({ "key": key, "value": value }))
                    .collect()
            };
            body["tags"] = Value::Array(tag_list);
        }

        tracing::debug!(name, "creating organizations account");
        let response = self.client.post(&url, &body).await?;

        let account_id = response
            .pointer("/create_account_status/account_id")
            .and_then(Value::as_str)
            .ok_or(ServiceError::MissingField("create_account_status.account_id"))?
            .to_string();
        let status_id = response
            .pointer("/create_account_status/id")
            .and_then(Value::as_str)
            .ok_or(ServiceError::MissingField("create_account_status.id"))?
            .to_string();

        Ok(CreatedAccount {
            account_id,
            status_id,
        })
    }

    /// Block until the creation request succeeds.
    pub async fn wait_account_created(&self, status_id: &str, timeout: Duration) -> Result<()> {
        let spec = WaitSpec::new(
            vec![AccountState::InProgress],
            vec![AccountState::Succeeded],
            timeout,
        )
        .initial_delay(CREATE_INITIAL_DELAY)
        .poll_interval(CREATE_POLL_INTERVAL);

        let probe = AccountStateProbe {
            service: self,
            status_id,
        };
        StateWaiter::new(probe, spec).run().await?;
        Ok(())
    }

    /// Current state of a creation request.
    pub async fn account_state(&self, status_id: &str) -> Result<AccountState> {
        let url = self.client.url(
            "v1/organizations/create-account-status/{status_id}",
            &[("status_id", status_id)],
        );
        let response = self.client.get(&url).await?;

        response
            .pointer("/create_account_status/state")
            .and_then(Value::as_str)
            .map(AccountState::from_wire)
            .ok_or(ServiceError::MissingField("create_account_status.state"))
    }

    pub async fn get_account(&self, account_id: &str) -> Result<Account> {
        let url = self.client.url(
            "v1/organizations/accounts/{account_id}",
            &[("account_id", account_id)],
        );
        let response = self.client.get(&url).await?;
        let envelope: AccountEnvelope =
            serde_json::from_value(response).map_err(ApiError::Decode)?;
        Ok(envelope.account)
    }

    /// The organizational unit (or root) currently holding the account.
    pub async fn parent_of(&self, account_id: &str) -> Result<Option<String>> {
        let url = self.client.url(
            "v1/organizations/entities?child_id={account_id}",
            &[("account_id", account_id)],
        );
        let response = self.client.get(&url).await?;

        Ok(response
            .pointer("/entities/0/id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(str::to_string))
    }

    /// Move the account from one organizational unit to another.
    pub async fn move_account(
        &self,
        account_id: &str,
        source_parent_id: &str,
        destination_parent_id: &str,
    ) -> Result<()> {
        let url = self.client.url(
            "v1/organizations/accounts/{account_id}/move",
            &[("account_id", account_id)],
        );
        let body = json!({
            "source_parent_id": source_parent_id,
            "destination_parent_id": destination_parent_id,
        });

        tracing::debug!(
            account_id,
            from = source_parent_id,
            to = destination_parent_id,
            "moving account"
        );
        self.client.post(&url, &body).await?;
        Ok(())
    }

    pub async fn set_account_tags(
        &self,
        account_id: &str,
        tags: &HashMap<String, String>,
    ) -> Result<()> {
        strato_api::create_tags_at(&self.client, &self.account_tags_url(account_id), tags).await?;
        Ok(())
    }

    pub async fn remove_account_tags(&self, account_id: &str, keys: &[String]) -> Result<()> {
        strato_api::delete_tags_at(&self.client, &self.account_tags_url(account_id), keys).await?;
        Ok(())
    }

    pub async fn account_tags(&self, account_id: &str) -> Result<HashMap<String, String>> {
        Ok(strato_api::tags_at(&self.client, &self.account_tags_url(account_id)).await?)
    }

    fn account_tags_url(&self, account_id: &str) -> String {
        self.client.url(
            "v1/organizations/accounts/{account_id}/tags",
            &[("account_id", account_id)],
        )
    }
}

struct AccountStateProbe<'a> {
    service: &'a OrganizationsService,
    status_id: &'a str,
}

#[async_trait]
impl StatusProbe for AccountStateProbe<'_> {
    type Status = AccountState;
    type Snapshot = ();

    async fn probe(&self) -> Probe<AccountState, ()> {
        match self.service.account_state(self.status_id).await {
            Ok(state) => Probe::Observed {
                status: state,
                snapshot: (),
            },
            Err(err) => Probe::Failed(err.into()),
        }
    }
}
