//! Organization account handler

use async_trait::async_trait;
use serde_json::json;

use strato_services::organizations::{self, Account, OrganizationsService};

use crate::error::{ProviderError, Result};
use crate::resource::{ManagedResource, ResourceSpec, ResourceState};

const TYPE_NAME: &str = "strato_organizations_account";

#[derive(Debug)]
pub struct OrganizationsAccountResource {
    accounts: OrganizationsService,
}

impl OrganizationsAccountResource {
    pub fn new(accounts: OrganizationsService) -> Self {
        Self { accounts }
    }

    async fn move_to_parent(&self, account_id: &str, destination: &str) -> Result<()> {
        let current = self
            .accounts
            .parent_of(account_id)
            .await
            .map_err(|e| ProviderError::operation("moving", TYPE_NAME, account_id, e))?
            .unwrap_or_default();

        if current == destination {
            return Ok(());
        }
        self.accounts
            .move_account(account_id, &current, destination)
            .await
            .map_err(|e| ProviderError::operation("moving", TYPE_NAME, account_id, e))
    }

    async fn state_of(&self, account_id: &str, account: &Account) -> Result<ResourceState> {
        let parent = self
            .accounts
            .parent_of(account_id)
            .await
            .map_err(|e| ProviderError::operation("reading", TYPE_NAME, account_id, e))?;

        let mut state = ResourceState::new(account_id, "active")
            .with_attribute("name", json!(account.name))
            .with_attribute("urn", json!(account.urn))
            .with_attribute("joined_at", json!(account.joined_at))
            .with_attribute("joined_method", json!(account.joined_method));

        if let Some(parent) = parent {
            state.set_attribute("parent_id", json!(parent));
        }

        // Tags are best-effort on read: a tag endpoint hiccup should not
        // fail the whole refresh.
        match self.accounts.account_tags(account_id).await {
            Ok(tags) => state.set_attribute("tags", json!(tags)),
            Err(err) => {
                tracing::warn!(account_id, "failed to fetch account tags: {err}");
            }
        }
        Ok(state)
    }
}

#[async_trait]
impl ManagedResource for OrganizationsAccountResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    async fn create(&self, spec: &ResourceSpec) -> Result<ResourceState> {
        let name = spec.require_str("name")?;
        let tags = spec.map_attr("tags");

        let created = self
            .accounts
            .create_account(&name, &tags)
            .await
            .map_err(|e| ProviderError::operation("creating", TYPE_NAME, &spec.name, e))?;

        self.accounts
            .wait_account_created(&created.status_id, organizations::DEFAULT_CREATE_TIMEOUT)
            .await
            .map_err(|e| {
                ProviderError::operation("creating", TYPE_NAME, &created.account_id, e)
            })?;

        if let Some(parent_id) = spec.attr::<String>("parent_id").filter(|p| !p.is_empty()) {
            self.move_to_parent(&created.account_id, &parent_id).await?;
        }

        match self.read(&created.account_id).await? {
            Some(state) => Ok(state),
            None => Err(ProviderError::operation(
                "reading",
                TYPE_NAME,
                &created.account_id,
                strato_services::ServiceError::MissingField("account"),
            )),
        }
    }

    async fn read(&self, id: &str) -> Result<Option<ResourceState>> {
        let account = match self.accounts.get_account(id).await {
            Ok(account) => account,
            Err(err) if err.is_not_found() => return Ok(None),
            Err(err) => return Err(ProviderError::operation("reading", TYPE_NAME, id, err)),
        };
        Ok(Some(self.state_of(id, &account).await?))
    }

    async fn update(&self, id: &str, spec: &ResourceSpec) -> Result<ResourceState> {
        if let Some(parent_id) = spec.attr::<String>("parent_id").filter(|p| !p.is_empty()) {
            self.move_to_parent(id, &parent_id).await?;
        }

        let old_tags = self
            .accounts
            .account_tags(id)
            .await
            .map_err(|e| ProviderError::operation("tagging", TYPE_NAME, id, e))?;
        let new_tags = spec.map_attr("tags");
        if old_tags != new_tags {
            let old_keys: Vec<String> = old_tags.into_keys().collect();
            self.accounts
                .remove_account_tags(id, &old_keys)
                .await
                .map_err(|e| ProviderError::operation("tagging", TYPE_NAME, id, e))?;
            self.accounts
                .set_account_tags(id, &new_tags)
                .await
                .map_err(|e| ProviderError::operation("tagging", TYPE_NAME, id, e))?;
        }

        match self.read(id).await? {
            Some(state) => Ok(state),
            None => Err(ProviderError::operation(
                "reading",
                TYPE_NAME,
                id,
                strato_services::ServiceError::MissingField("account"),
            )),
        }
    }

    async fn delete(&self, id: &str, _spec: &ResourceSpec) -> Result<()> {
        // The organizations API has no account deletion; the account only
        // leaves the host's state.
        tracing::warn!(
            account_id = id,
            "organization accounts cannot be deleted remotely; the account remains in the cloud"
        );
        Ok(())
    }
}
