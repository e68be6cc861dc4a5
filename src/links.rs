use urlencoding::encode;

use crate::location::LocationContext;
use crate::model::{Capabilities, EventKind, RelatedEventRow};
use crate::query::{encode_pairs, QueryDescription, STATS_PERIOD};

/// `<project>:<event id>`, the key Discover uses for event detail pages. Each
/// part is encoded on its own so the separator stays a literal colon.
pub fn generate_event_slug(row: &RelatedEventRow) -> String {
    format!("{}:{}", encode(&row.project), encode(&row.id))
}

/// `event_slug` is inserted as is; build it with [`generate_event_slug`].
pub fn event_details_route(org_slug: &str, event_slug: &str, query: &QueryDescription) -> String {
    format!(
        "/organizations/{}/discover/{}/?{}",
        encode(org_slug),
        event_slug,
        query.query_string()
    )
}

pub fn issue_route(org_slug: &str, issue_id: &str) -> String {
    format!("/organizations/{}/issues/{}/", encode(org_slug), encode(issue_id))
}

pub fn transaction_summary_route(
    org_slug: &str,
    transaction: &str,
    project_id: Option<&str>,
    query: &QueryDescription,
) -> String {
    let mut pairs = vec![("transaction", transaction.to_string())];
    if let Some(project_id) = project_id {
        pairs.push(("project", project_id.to_string()));
    }
    pairs.push(("statsPeriod", STATS_PERIOD.to_string()));
    pairs.push(("query", query.filter.to_string()));

    format!(
        "/organizations/{}/performance/summary/?{}",
        encode(org_slug),
        encode_pairs(pairs)
    )
}

pub fn discover_results_route(org_slug: &str, query: &QueryDescription) -> String {
    format!(
        "/organizations/{}/discover/results/?{}",
        encode(org_slug),
        query.query_string()
    )
}

pub fn resolve_row_target(
    row: &RelatedEventRow,
    context: LocationContext,
    org_slug: &str,
    query: &QueryDescription,
) -> String {
    match (&row.kind, context) {
        (_, LocationContext::Discover) | (EventKind::Error { issue_id: None }, _) => {
            event_details_route(org_slug, &generate_event_slug(row), query)
        }
        (EventKind::Error { issue_id: Some(issue_id) }, _) => issue_route(org_slug, issue_id),
        (EventKind::Transaction, _) => {
            transaction_summary_route(org_slug, &row.title, row.project_id.as_deref(), query)
        }
    }
}

/// The "Open in Discover" action needs Discover and is pointless from Discover.
pub fn should_show_discover_action(capabilities: Capabilities, context: LocationContext) -> bool {
    capabilities.discover_basic && context != LocationContext::Discover
}

pub fn absolute_url(app_url: &str, route: &str) -> String {
    format!("{}{}", app_url.trim_end_matches('/'), route)
}
