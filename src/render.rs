use std::fmt::Write as _;

use anyhow::Result;
use chrono::{DateTime, Utc};
use dialoguer::console;
use serde_json::{json, Value};

use crate::links::absolute_url;
use crate::panel::{Panel, PanelState};
use crate::ui::{apply_column_padding, header, kind_cell, styled_table, time_since, truncate};
use crate::utils::pluralize;

pub const EMPTY_STATE_MESSAGE: &str = "No related events have been found for the last 90 days.";
const MAX_TITLE_CHARS: usize = 60;

pub fn render_json(panel: &Panel, state: &PanelState, app_url: &str) -> Value {
    let items: Vec<Value> = panel
        .linked_rows(state)
        .into_iter()
        .map(|linked| {
            let mut item = serde_json::to_value(&linked).unwrap_or(Value::Null);
            if let Some(obj) = item.as_object_mut() {
                obj.insert(
                    "url".to_string(),
                    Value::String(absolute_url(app_url, &linked.target)),
                );
            }
            item
        })
        .collect();

    json!({
        "meta": {
            "org": panel.org_slug(),
            "location": panel.context(),
            "trace_id": panel.query().map(|q| q.trace_id()),
            "query": panel.query(),
        },
        "state": state.label(),
        "discover_action": panel.discover_action().ok().map(|route| absolute_url(app_url, &route)),
        "items": items,
    })
}

pub fn render_text(
    panel: &Panel,
    state: &PanelState,
    app_url: &str,
    now: DateTime<Utc>,
) -> Result<String> {
    let mut output = String::new();

    if let Ok(route) = panel.discover_action() {
        writeln!(
            output,
            "{} {}\n",
            console::style("Open in Discover:").dim(),
            absolute_url(app_url, &route)
        )?;
    }

    let linked = panel.linked_rows(state);
    if linked.is_empty() {
        write!(output, "{EMPTY_STATE_MESSAGE}")?;
        return Ok(output);
    }

    let count = format!(
        "{} related {}",
        linked.len(),
        pluralize(linked.len(), "event", None)
    );
    writeln!(
        output,
        "{} in trace {} (from {})\n",
        console::style(count),
        console::style(panel.query().map(|q| q.trace_id()).unwrap_or("-")).bold(),
        panel.context()
    )?;

    let mut table = styled_table();
    table.set_header(vec![
        header("Id"),
        header("Title"),
        header("Type"),
        header("Project"),
        header("Created"),
        header("Link"),
    ]);
    apply_column_padding(&mut table, (0, 3));

    for item in &linked {
        let row = item.row;
        let created = row
            .timestamp
            .map(|ts| {
                format!(
                    "{} - {}",
                    time_since(ts, now),
                    ts.format("%b %-d, %Y %H:%M:%S UTC")
                )
            })
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            comfy_table::Cell::new(&row.id),
            comfy_table::Cell::new(truncate(&row.title, MAX_TITLE_CHARS)),
            kind_cell(&row.kind),
            comfy_table::Cell::new(&row.project),
            comfy_table::Cell::new(created),
            comfy_table::Cell::new(absolute_url(app_url, &item.target)),
        ]);
    }

    write!(output, "{table}")?;
    Ok(output)
}
