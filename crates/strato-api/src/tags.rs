//! Resource tag helpers
//!
//! Tags follow one convention across services:
//! `{project_id}/{resource_type}/{id}/tags` to read,
//! `{project_id}/{resource_type}/{id}/tags/action` to batch create or
//! delete.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::client::ServiceClient;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
struct TagsEnvelope {
    #[serde(default)]
    tags: Vec<Tag>,
}

/// Attach `tags` to a project-scoped resource. Empty input is a no-op.
pub async fn create_resource_tags(
    client: &ServiceClient,
    resource_type: &str,
    id: &str,
    tags: &HashMap<String, String>,
) -> Result<()> {
    create_tags_at(client, &tags_url(client, resource_type, id), tags).await
}

/// Remove the tags with the given keys from a project-scoped resource.
/// Empty input is a no-op.
pub async fn delete_resource_tags_with_keys(
    client: &ServiceClient,
    resource_type: &str,
    id: &str,
    keys: &[String],
) -> Result<()> {
    delete_tags_at(client, &tags_url(client, resource_type, id), keys).await
}

/// Fetch the current tags of a project-scoped resource as a key/value map.
pub async fn resource_tags(
    client: &ServiceClient,
    resource_type: &str,
    id: &str,
) -> Result<HashMap<String, String>> {
    tags_at(client, &tags_url(client, resource_type, id)).await
}

/// Batch-create tags at an explicit `.../tags` URL. Services that are not
/// project-scoped (organizations) build their own URL and come in here.
pub async fn create_tags_at(
    client: &ServiceClient,
    tags_url: &str,
    tags: &HashMap<String, String>,
) -> Result<()> {
    if tags.is_empty() {
        return Ok(());
    }

    let body = json!({
        "action": "create",
        "tags": to_tag_list(tags),
    });
    client.post(&format!("{tags_url}/action"), &body).await?;
    Ok(())
}

/// Batch-delete tags by key at an explicit `.../tags` URL.
pub async fn delete_tags_at(client: &ServiceClient, tags_url: &str, keys: &[String]) -> Result<()> {
    if keys.is_empty() {
        return Ok(());
    }

    let tags: Vec<_> = keys.iter().map(|key| json!({ "key": key })).collect();
    let body = json!({
        "action": "delete",
        "tags": tags,
    });
    client.post(&format!("{tags_url}/action"), &body).await?;
    Ok(())
}

/// Fetch tags at an explicit `.../tags` URL.
pub async fn tags_at(client: &ServiceClient, tags_url: &str) -> Result<HashMap<String, String>> {
    let body = client.get(tags_url).await?;
    let envelope: TagsEnvelope = serde_json::from_value(body).map_err(crate::ApiError::Decode)?;

    Ok(envelope
        .tags
        .into_iter()
        .map(|tag| (tag.key, tag.value))
        .collect())
}

fn tags_url(client: &ServiceClient, resource_type: &str, id: &str) -> String {
    client.url(
        "v1/{project_id}/{resource_type}/{id}/tags",
        &[("resource_type", resource_type), ("id", id)],
    )
}

fn to_tag_list(tags: &HashMap<String, String>) -> Vec<Tag> {
    let mut list: Vec<Tag> = tags
        .iter()
        .map(|(key, value)| Tag {
            key: key.clone(),
            value: value.clone(),
        })
        .collect();
    // Stable request bodies make request logs and tests deterministic.
    list.sort_by(|a, b| a.key.cmp(&b.key));
    list
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_list_is_sorted_by_key() {
        let mut tags = HashMap::new();
        tags.insert("owner".to_string(), "ops".to_string());
        tags.insert("env".to_string(), "prod".to_string());

        let list = to_tag_list(&tags);
        assert_eq!(list[0].key, "env");
        assert_eq!(list[1].key, "owner");
    }
}
