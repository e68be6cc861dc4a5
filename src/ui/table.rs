use chrono::{DateTime, Utc};
use comfy_table::{presets::NOTHING, Attribute, Cell, Color, ContentArrangement, Table};

use crate::model::EventKind;

/// Borderless, non-wrapping table used for every listing.
pub fn styled_table() -> Table {
    let mut table = Table::new();
    table.load_preset(NOTHING);
    table.set_content_arrangement(ContentArrangement::Disabled);
    table
}

/// Truncate to `max_chars` characters, marking the cut with an ellipsis.
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{kept}…")
}

/// Call after the header is set, otherwise there are no columns yet.
pub fn apply_column_padding(table: &mut Table, padding: (u16, u16)) {
    for i in 0..table.column_count() {
        if let Some(col) = table.column_mut(i) {
            col.set_padding(padding);
        }
    }
}

pub fn header(text: &str) -> Cell {
    Cell::new(text)
        .add_attribute(Attribute::Bold)
        .add_attribute(Attribute::Dim)
}

pub fn kind_cell(kind: &EventKind) -> Cell {
    match kind {
        EventKind::Error { .. } => Cell::new(format!("● {}", kind.label())).fg(Color::Red),
        EventKind::Transaction => Cell::new(format!("◆ {}", kind.label())).fg(Color::Magenta),
    }
}

/// Coarse "how long ago" label, e.g. `5 minutes ago`.
pub fn time_since(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - timestamp).num_seconds();
    if seconds < 0 {
        return "in the future".to_string();
    }
    let (value, unit) = match seconds {
        0..=59 => return "just now".to_string(),
        60..=3_599 => (seconds / 60, "minute"),
        3_600..=86_399 => (seconds / 3_600, "hour"),
        86_400..=2_591_999 => (seconds / 86_400, "day"),
        2_592_000..=31_535_999 => (seconds / 2_592_000, "month"),
        _ => (seconds / 31_536_000, "year"),
    };
    let suffix = if value == 1 { "" } else { "s" };
    format!("{value} {unit}{suffix} ago")
}
