use std::fmt;

use serde::Serialize;
use urlencoding::encode;

use crate::error::RelatedEventsError;
use crate::model::{Capabilities, Event, Organization};

/// Fields requested for every related event. Names must match the events API.
pub const RELATED_EVENT_FIELDS: [&str; 8] = [
    "title",
    "event.type",
    "project",
    "project.id",
    "trace.span",
    "timestamp",
    "lastSeen",
    "issue",
];

pub const STATS_PERIOD: &str = "90d";
pub const QUERY_VERSION: u8 = 2;

/// Sentinel project id meaning "every project the member can access".
pub const ALL_PROJECTS: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectScope {
    AllProjects,
    Single(i64),
}

impl ProjectScope {
    pub fn ids(&self) -> Vec<i64> {
        match self {
            ProjectScope::AllProjects => vec![ALL_PROJECTS],
            ProjectScope::Single(id) => vec![*id],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sort {
    pub field: &'static str,
    pub descending: bool,
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.descending {
            write!(f, "-{}", self.field)
        } else {
            f.write_str(self.field)
        }
    }
}

/// `trace:<id>` filter clause. Holds exactly one trace id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceFilter(String);

impl TraceFilter {
    pub fn trace_id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TraceFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trace:{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryDescription {
    pub name: String,
    pub fields: Vec<&'static str>,
    #[serde(serialize_with = "serialize_display")]
    pub sort: Sort,
    #[serde(rename = "query", serialize_with = "serialize_display")]
    pub filter: TraceFilter,
    #[serde(rename = "projects", serialize_with = "serialize_scope")]
    pub project_scope: ProjectScope,
    pub range: &'static str,
    pub version: u8,
}

impl QueryDescription {
    pub fn for_trace(trace_id: &str, project_scope: ProjectScope) -> Self {
        Self {
            name: format!("Events with Trace ID {trace_id}"),
            fields: RELATED_EVENT_FIELDS.to_vec(),
            sort: Sort {
                field: "timestamp",
                descending: true,
            },
            filter: TraceFilter(trace_id.to_string()),
            project_scope,
            range: STATS_PERIOD,
            version: QUERY_VERSION,
        }
    }

    pub fn trace_id(&self) -> &str {
        self.filter.trace_id()
    }

    /// Parameters shared by the events API and the Discover routes.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(self.fields.len() + 5);
        pairs.push(("name", self.name.clone()));
        for field in &self.fields {
            pairs.push(("field", field.to_string()));
        }
        pairs.push(("sort", self.sort.to_string()));
        pairs.push(("query", self.filter.to_string()));
        for id in self.project_scope.ids() {
            pairs.push(("project", id.to_string()));
        }
        pairs.push(("statsPeriod", self.range.to_string()));
        pairs
    }

    pub fn query_string(&self) -> String {
        encode_pairs(self.query_pairs())
    }
}

pub fn build_query(
    event: &Event,
    organization: &Organization,
) -> Result<Option<QueryDescription>, RelatedEventsError> {
    build_query_with(event, organization.capabilities())
}

/// `Ok(None)` means the event is not part of a trace and the panel is empty.
pub fn build_query_with(
    event: &Event,
    capabilities: Capabilities,
) -> Result<Option<QueryDescription>, RelatedEventsError> {
    let Some(trace_id) = event.trace_id() else {
        tracing::debug!(event_id = %event.id, "event has no trace id");
        return Ok(None);
    };

    let project_scope = if capabilities.global_views {
        ProjectScope::AllProjects
    } else {
        // Project ids are positive; anything else would collide with ALL_PROJECTS.
        let id = event
            .project_id
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|id| *id > 0)
            .ok_or_else(|| RelatedEventsError::InvalidProjectId {
                project_id: event.project_id.clone(),
            })?;
        ProjectScope::Single(id)
    };

    let query = QueryDescription::for_trace(trace_id, project_scope);
    tracing::debug!(
        event_id = %event.id,
        filter = %query.filter,
        scope = ?query.project_scope,
        "built related events query"
    );
    Ok(Some(query))
}

pub fn encode_pairs<K: AsRef<str>, V: AsRef<str>>(pairs: impl IntoIterator<Item = (K, V)>) -> String {
    pairs
        .into_iter()
        .map(|(key, value)| format!("{}={}", encode(key.as_ref()), encode(value.as_ref())))
        .collect::<Vec<_>>()
        .join("&")
}

fn serialize_display<T: fmt::Display, S: serde::Serializer>(
    value: &T,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

fn serialize_scope<S: serde::Serializer>(
    scope: &ProjectScope,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(scope.ids())
}
