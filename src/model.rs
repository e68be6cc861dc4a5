use std::borrow::Cow;
use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::RowError;

pub const FEATURE_GLOBAL_VIEWS: &str = "global-views";
pub const FEATURE_DISCOVER_BASIC: &str = "discover-basic";

/// One result row as returned by the events API, keyed by field name.
pub type RawRow = Map<String, Value>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    pub id: String,
    #[serde(rename = "projectID", deserialize_with = "string_or_number")]
    pub project_id: String,
    #[serde(default)]
    pub contexts: EventContexts,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventContexts {
    #[serde(default)]
    pub trace: Option<TraceContext>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TraceContext {
    #[serde(default)]
    pub trace_id: Option<String>,
}

impl Event {
    /// The trace id, if the event was recorded inside a trace.
    pub fn trace_id(&self) -> Option<&str> {
        self.contexts
            .trace
            .as_ref()
            .and_then(|trace| trace.trace_id.as_deref())
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Organization {
    pub slug: String,
    #[serde(default)]
    pub features: BTreeSet<String>,
}

impl Organization {
    pub fn new<I, S>(slug: impl Into<String>, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            slug: slug.into(),
            features: features.into_iter().map(Into::into).collect(),
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities::from_features(&self.features)
    }
}

/// Feature flags that change how related events are queried and linked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub global_views: bool,
    pub discover_basic: bool,
}

impl Capabilities {
    pub fn from_features<'a, I>(features: I) -> Self
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut caps = Self::default();
        for feature in features {
            match feature.as_str() {
                FEATURE_GLOBAL_VIEWS => caps.global_views = true,
                FEATURE_DISCOVER_BASIC => caps.discover_basic = true,
                _ => {}
            }
        }
        caps
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    Error { issue_id: Option<String> },
    Transaction,
}

impl EventKind {
    pub fn label(&self) -> &'static str {
        match self {
            EventKind::Error { .. } => "Error",
            EventKind::Transaction => "Transaction",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelatedEventRow {
    pub id: String,
    pub title: String,
    #[serde(flatten)]
    pub kind: EventKind,
    pub project: String,
    pub project_id: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl RelatedEventRow {
    /// Type a raw row. Anything that is not a transaction is shown as an
    /// error; its issue id is optional.
    pub fn from_raw(row: &RawRow) -> Result<Self, RowError> {
        let id = value_as_string(row.get("id")).ok_or(RowError::MissingId)?;
        let event_type = value_as_string(row.get("event.type")).unwrap_or_default();
        let kind = if event_type.eq_ignore_ascii_case("transaction") {
            EventKind::Transaction
        } else {
            EventKind::Error {
                issue_id: value_as_string(row.get("issue.id")),
            }
        };
        let project = value_as_string(row.get("project.name"))
            .or_else(|| value_as_string(row.get("project")))
            .unwrap_or_default();

        Ok(Self {
            id,
            title: value_as_string(row.get("title")).unwrap_or_default(),
            kind,
            project,
            project_id: value_as_string(row.get("project.id")),
            timestamp: value_as_string(row.get("timestamp"))
                .as_deref()
                .and_then(parse_timestamp),
        })
    }
}

/// Row identity used for deduplication. Raw ids are read with the same
/// coercion as [`RelatedEventRow::from_raw`], so `5` and `"5"` are one id.
pub trait RowIdentity {
    fn row_id(&self) -> Option<Cow<'_, str>>;
}

impl RowIdentity for RawRow {
    fn row_id(&self) -> Option<Cow<'_, str>> {
        value_as_string(self.get("id")).map(Cow::Owned)
    }
}

impl RowIdentity for RelatedEventRow {
    fn row_id(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(&self.id))
    }
}

pub fn value_as_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawRow {
        value.as_object().cloned().expect("object")
    }

    #[test]
    fn event_trace_id_reads_trace_context() {
        let event: Event = serde_json::from_value(json!({
            "id": "e1",
            "projectID": "7",
            "contexts": {"trace": {"trace_id": "abc"}}
        }))
        .unwrap();
        assert_eq!(event.trace_id(), Some("abc"));
        assert_eq!(event.project_id, "7");
    }

    #[test]
    fn event_without_trace_context_has_no_trace_id() {
        let event: Event = serde_json::from_value(json!({"id": "e1", "projectID": 7})).unwrap();
        assert_eq!(event.trace_id(), None);
        assert_eq!(event.project_id, "7");
    }

    #[test]
    fn blank_trace_id_counts_as_missing() {
        let event: Event = serde_json::from_value(json!({
            "id": "e1",
            "projectID": "7",
            "contexts": {"trace": {"trace_id": "  "}}
        }))
        .unwrap();
        assert_eq!(event.trace_id(), None);
    }

    #[test]
    fn capabilities_follow_feature_names() {
        let org = Organization::new("acme", ["global-views", "other"]);
        let caps = org.capabilities();
        assert!(caps.global_views);
        assert!(!caps.discover_basic);
    }

    #[test]
    fn from_raw_types_error_rows() {
        let row = RelatedEventRow::from_raw(&raw(json!({
            "id": "e2",
            "title": "ZeroDivisionError",
            "event.type": "error",
            "project": "backend",
            "project.id": 7,
            "issue.id": 42,
            "timestamp": "2020-06-01T12:00:00+00:00"
        })))
        .unwrap();
        assert_eq!(
            row.kind,
            EventKind::Error {
                issue_id: Some("42".into())
            }
        );
        assert_eq!(row.project_id.as_deref(), Some("7"));
        assert!(row.timestamp.is_some());
    }

    #[test]
    fn from_raw_types_transaction_rows() {
        let row = RelatedEventRow::from_raw(&raw(json!({
            "id": "t1",
            "title": "/api/checkout",
            "event.type": "transaction",
            "project": "frontend",
            "timestamp": "2020-06-01T12:00:00"
        })))
        .unwrap();
        assert_eq!(row.kind, EventKind::Transaction);
        assert!(row.timestamp.is_some());
    }

    #[test]
    fn error_without_issue_is_still_typed() {
        let row = RelatedEventRow::from_raw(&raw(json!({"id": "e3", "event.type": "error"})))
            .unwrap();
        assert_eq!(row.kind, EventKind::Error { issue_id: None });
    }

    #[test]
    fn numeric_and_string_ids_share_identity() {
        let numeric = raw(json!({"id": 5}));
        let string = raw(json!({"id": "5"}));
        assert_eq!(numeric.row_id(), string.row_id());
        assert_eq!(raw(json!({"id": ""})).row_id(), None);
    }

    #[test]
    fn from_raw_rejects_missing_id() {
        let err = RelatedEventRow::from_raw(&raw(json!({"event.type": "transaction"}))).unwrap_err();
        assert_eq!(err, RowError::MissingId);
    }

    #[test]
    fn project_name_preferred_over_project() {
        let row = RelatedEventRow::from_raw(&raw(json!({
            "id": "t1",
            "event.type": "transaction",
            "project": "p",
            "project.name": "frontend"
        })))
        .unwrap();
        assert_eq!(row.project, "frontend");
    }
}
