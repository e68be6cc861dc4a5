use anyhow::Result;
use serde::Deserialize;
use urlencoding::encode;

use crate::http::ApiClient;
use crate::model::{Event, Organization, RawRow};
use crate::query::{encode_pairs, QueryDescription};

#[derive(Debug, Deserialize)]
pub struct EventsResponse {
    #[serde(default)]
    pub data: Vec<RawRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventIdLookup {
    #[serde(default)]
    pub project_slug: Option<String>,
    #[serde(default)]
    pub group_id: Option<String>,
    pub event: Event,
}

pub fn events_path(org_slug: &str, query: &QueryDescription, limit: usize) -> String {
    let mut pairs = query.query_pairs();
    pairs.push(("per_page", limit.to_string()));
    format!(
        "/api/0/organizations/{}/eventsv2/?{}",
        encode(org_slug),
        encode_pairs(pairs)
    )
}

pub async fn list_events(
    client: &ApiClient,
    org_slug: &str,
    query: &QueryDescription,
    limit: usize,
) -> Result<Vec<RawRow>> {
    let response: EventsResponse = client.get(&events_path(org_slug, query, limit)).await?;
    Ok(response.data)
}

pub async fn get_event(client: &ApiClient, org_slug: &str, event_id: &str) -> Result<Event> {
    let path = format!(
        "/api/0/organizations/{}/eventids/{}/",
        encode(org_slug),
        encode(event_id)
    );
    let lookup: EventIdLookup = client.get(&path).await?;
    tracing::debug!(
        event_id,
        project = lookup.project_slug.as_deref().unwrap_or("-"),
        issue = lookup.group_id.as_deref().unwrap_or("-"),
        "resolved event id"
    );
    Ok(lookup.event)
}

pub async fn get_organization(client: &ApiClient, org_slug: &str) -> Result<Organization> {
    let path = format!("/api/0/organizations/{}/", encode(org_slug));
    client.get(&path).await
}
