use std::fmt;

use anyhow::Result;
use serde::Serialize;

use crate::error::RelatedEventsError;
use crate::links::{discover_results_route, resolve_row_target, should_show_discover_action};
use crate::location::LocationContext;
use crate::model::{Capabilities, Event, Organization, RelatedEventRow};
use crate::query::{build_query, QueryDescription};
use crate::rows::prepare_rows;
use crate::source::EventsSource;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelState {
    Loading,
    Empty,
    Populated(Vec<RelatedEventRow>),
}

impl PanelState {
    /// Settle a loading panel. Terminal states ignore further results.
    pub fn settle(self, rows: Vec<RelatedEventRow>) -> Self {
        match self {
            PanelState::Loading if rows.is_empty() => PanelState::Empty,
            PanelState::Loading => PanelState::Populated(rows),
            settled => settled,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PanelState::Loading => "loading",
            PanelState::Empty => "empty",
            PanelState::Populated(_) => "populated",
        }
    }

    pub fn rows(&self) -> &[RelatedEventRow] {
        match self {
            PanelState::Populated(rows) => rows,
            _ => &[],
        }
    }
}

/// A row together with the link it resolves to from the current location.
#[derive(Debug, Clone, Serialize)]
pub struct LinkedRow<'a> {
    #[serde(flatten)]
    pub row: &'a RelatedEventRow,
    pub target: String,
}

/// Why the "Open in Discover" action is not offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionUnavailable {
    MissingTrace,
    InvalidProject,
    FeatureDisabled,
    AlreadyInDiscover,
    Hidden,
}

impl fmt::Display for ActionUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ActionUnavailable::MissingTrace => "the event has no trace id",
            ActionUnavailable::InvalidProject => "the event's project id is not usable",
            ActionUnavailable::FeatureDisabled => {
                "the organization does not have the discover-basic feature"
            }
            ActionUnavailable::AlreadyInDiscover => "the listing is already viewed from Discover",
            ActionUnavailable::Hidden => "it was hidden with --hide-action",
        })
    }
}

/// Related events for one originating event, viewed from one location.
pub struct Panel {
    org_slug: String,
    originating_id: String,
    capabilities: Capabilities,
    context: LocationContext,
    query: Option<QueryDescription>,
    query_error: Option<RelatedEventsError>,
    show_action: bool,
}

impl Panel {
    /// An event whose query cannot be built gets an empty panel, never a failure.
    pub fn for_event(event: &Event, organization: &Organization, context: LocationContext) -> Self {
        match build_query(event, organization) {
            Ok(query) => Self::with_query(query, &event.id, organization, context),
            Err(err) => {
                tracing::warn!(event_id = %event.id, error = %err, "cannot query related events");
                let mut panel = Self::with_query(None, &event.id, organization, context);
                panel.query_error = Some(err);
                panel
            }
        }
    }

    /// Build a panel around a query that was derived elsewhere.
    pub fn with_query(
        query: Option<QueryDescription>,
        originating_id: &str,
        organization: &Organization,
        context: LocationContext,
    ) -> Self {
        Self {
            org_slug: organization.slug.clone(),
            originating_id: originating_id.to_string(),
            capabilities: organization.capabilities(),
            context,
            query,
            query_error: None,
            show_action: true,
        }
    }

    pub fn hide_action(mut self) -> Self {
        self.show_action = false;
        self
    }

    pub fn query(&self) -> Option<&QueryDescription> {
        self.query.as_ref()
    }

    /// Set when the event had a trace id but no query could be built for it.
    pub fn query_error(&self) -> Option<&RelatedEventsError> {
        self.query_error.as_ref()
    }

    pub fn context(&self) -> LocationContext {
        self.context
    }

    pub fn org_slug(&self) -> &str {
        &self.org_slug
    }

    /// Fetch and prepare rows. A failed fetch is an error, not an empty panel.
    pub async fn load<S: EventsSource>(&self, source: &S, limit: usize) -> Result<PanelState> {
        let state = PanelState::Loading;
        let Some(query) = &self.query else {
            return Ok(state.settle(Vec::new()));
        };

        let raw = source.fetch_rows(&self.org_slug, query, limit).await?;
        let fetched = raw.len();
        let rows = prepare_rows(raw, &self.originating_id);
        tracing::info!(
            fetched,
            related = rows.len(),
            trace_id = query.trace_id(),
            "loaded related events"
        );
        Ok(state.settle(rows))
    }

    pub fn linked_rows<'a>(&self, state: &'a PanelState) -> Vec<LinkedRow<'a>> {
        let Some(query) = &self.query else {
            return Vec::new();
        };
        state
            .rows()
            .iter()
            .map(|row| LinkedRow {
                row,
                target: resolve_row_target(row, self.context, &self.org_slug, query),
            })
            .collect()
    }

    /// Route for the "Open in Discover" action, or why it is not offered.
    pub fn discover_action(&self) -> Result<String, ActionUnavailable> {
        let Some(query) = &self.query else {
            return Err(match self.query_error {
                Some(_) => ActionUnavailable::InvalidProject,
                None => ActionUnavailable::MissingTrace,
            });
        };
        if !self.show_action {
            return Err(ActionUnavailable::Hidden);
        }
        if !should_show_discover_action(self.capabilities, self.context) {
            return Err(if self.capabilities.discover_basic {
                ActionUnavailable::AlreadyInDiscover
            } else {
                ActionUnavailable::FeatureDisabled
            });
        }
        Ok(discover_results_route(&self.org_slug, query))
    }
}
