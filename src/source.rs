use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::api::{self, EventIdLookup};
use crate::http::ApiClient;
use crate::model::{Event, RawRow};
use crate::query::QueryDescription;

/// Where related-event rows come from.
#[allow(async_fn_in_trait)]
pub trait EventsSource {
    async fn fetch_rows(
        &self,
        org_slug: &str,
        query: &QueryDescription,
        limit: usize,
    ) -> Result<Vec<RawRow>>;
}

pub struct DiscoverSource<'a> {
    client: &'a ApiClient,
    print_queries: bool,
}

impl<'a> DiscoverSource<'a> {
    pub fn new(client: &'a ApiClient, print_queries: bool) -> Self {
        Self {
            client,
            print_queries,
        }
    }
}

impl EventsSource for DiscoverSource<'_> {
    async fn fetch_rows(
        &self,
        org_slug: &str,
        query: &QueryDescription,
        limit: usize,
    ) -> Result<Vec<RawRow>> {
        if self.print_queries {
            eprintln!(
                "[related-events] GET {}",
                self.client.url(&api::events_path(org_slug, query, limit))
            );
        }
        api::list_events(self.client, org_slug, query, limit)
            .await
            .with_context(|| format!("events query failed: {}", query.filter))
    }
}

/// Rows saved from an earlier events API response.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RowsFile {
    Response { data: Vec<RawRow> },
    Rows(Vec<RawRow>),
}

impl EventsSource for FileSource {
    async fn fetch_rows(
        &self,
        _org_slug: &str,
        query: &QueryDescription,
        limit: usize,
    ) -> Result<Vec<RawRow>> {
        let contents = read_file(&self.path)?;
        let parsed: RowsFile = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse rows file {}", self.path.display()))?;
        let mut rows = match parsed {
            RowsFile::Response { data } => data,
            RowsFile::Rows(rows) => rows,
        };
        tracing::debug!(
            path = %self.path.display(),
            rows = rows.len(),
            filter = %query.filter,
            "loaded rows from file"
        );
        rows.truncate(limit);
        Ok(rows)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EventFile {
    Lookup(EventIdLookup),
    Event(Event),
}

/// Read an event from either a bare event document or an event id lookup response.
pub fn load_event_file(path: &Path) -> Result<Event> {
    let contents = read_file(path)?;
    let parsed: EventFile = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse event file {}", path.display()))?;
    Ok(match parsed {
        EventFile::Lookup(lookup) => lookup.event,
        EventFile::Event(event) => event,
    })
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}
