use std::collections::HashSet;

use crate::model::{RawRow, RelatedEventRow, RowIdentity};

/// Keep the first row per id and drop the originating event. Rows without an
/// id cannot be deduplicated and pass through untouched.
pub fn dedup_rows<T: RowIdentity>(rows: Vec<T>, originating_id: &str) -> Vec<T> {
    let mut seen: HashSet<String> = HashSet::new();
    rows.into_iter()
        .filter(|row| match row.row_id() {
            Some(id) => id != originating_id && seen.insert(id.into_owned()),
            None => true,
        })
        .collect()
}

pub fn prepare_rows(raw_rows: Vec<RawRow>, originating_id: &str) -> Vec<RelatedEventRow> {
    dedup_rows(raw_rows, originating_id)
        .iter()
        .filter_map(|raw| match RelatedEventRow::from_raw(raw) {
            Ok(row) => Some(row),
            Err(err) => {
                tracing::warn!(error = %err, "skipping related event row");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn raw(value: Value) -> RawRow {
        value.as_object().cloned().expect("object")
    }

    fn transaction(id: &str, title: &str) -> RawRow {
        raw(json!({
            "id": id,
            "title": title,
            "event.type": "transaction",
            "project": "backend",
            "project.id": 7,
            "timestamp": "2020-06-01T12:00:00+00:00"
        }))
    }

    fn ids(rows: &[RelatedEventRow]) -> Vec<&str> {
        rows.iter().map(|row| row.id.as_str()).collect()
    }

    #[test]
    fn drops_originating_event_and_duplicates() {
        let rows = vec![
            transaction("e2", "first"),
            transaction("e1", "self"),
            transaction("e2", "second"),
        ];
        let prepared = prepare_rows(rows, "e1");
        assert_eq!(ids(&prepared), vec!["e2"]);
        assert_eq!(prepared[0].title, "first");
    }

    #[test]
    fn keeps_first_occurrence_order() {
        let rows = vec![
            transaction("c", "1"),
            transaction("a", "2"),
            transaction("c", "3"),
            transaction("b", "4"),
            transaction("a", "5"),
        ];
        assert_eq!(ids(&prepare_rows(rows, "zzz")), vec!["c", "a", "b"]);
    }

    #[test]
    fn originating_id_never_survives() {
        let rows = vec![
            transaction("e1", "1"),
            transaction("e1", "2"),
            transaction("e3", "3"),
            transaction("e1", "4"),
        ];
        let prepared = prepare_rows(rows, "e1");
        assert!(prepared.iter().all(|row| row.id != "e1"));
        assert_eq!(ids(&prepared), vec!["e3"]);
    }

    #[test]
    fn dedup_is_idempotent() {
        let rows = vec![
            transaction("x", "1"),
            transaction("y", "2"),
            transaction("x", "3"),
            transaction("o", "4"),
        ];
        let once = dedup_rows(rows, "o");
        let twice = dedup_rows(once.clone(), "o");
        assert_eq!(once, twice);

        let prepared = prepare_rows(once, "o");
        assert_eq!(dedup_rows(prepared.clone(), "o"), prepared);
    }

    #[test]
    fn only_originating_event_gives_empty() {
        assert!(prepare_rows(vec![transaction("e1", "self")], "e1").is_empty());
        assert!(prepare_rows(Vec::new(), "e1").is_empty());
    }

    #[test]
    fn untyped_rows_are_skipped() {
        let rows = vec![
            raw(json!({"title": "no id", "event.type": "error", "issue.id": 1})),
            transaction("e3", "ok"),
        ];
        assert_eq!(ids(&prepare_rows(rows, "e1")), vec!["e3"]);
    }

    #[test]
    fn numeric_ids_are_deduplicated_and_filtered() {
        let numeric = |id: u64| {
            raw(json!({
                "id": id,
                "title": "/api",
                "event.type": "transaction",
                "project": "backend"
            }))
        };
        let rows = vec![numeric(123), numeric(5), numeric(5)];
        assert_eq!(ids(&prepare_rows(rows, "123")), vec!["5"]);

        let mixed = vec![numeric(5), transaction("5", "string id")];
        let prepared = prepare_rows(mixed, "e1");
        assert_eq!(ids(&prepared), vec!["5"]);
        assert_eq!(prepared[0].title, "/api");
    }

    #[test]
    fn error_rows_without_issue_are_kept() {
        let rows = vec![raw(json!({"id": "e2", "event.type": "error", "project": "backend"}))];
        assert_eq!(ids(&prepare_rows(rows, "e1")), vec!["e2"]);
    }
}
