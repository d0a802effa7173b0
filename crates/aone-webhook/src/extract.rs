//! Best-effort extraction of typed records from webhook responses.
//!
//! The backend's response shape for list-returning actions is not
//! contractually fixed: a bare array, an object wrapping the array under one
//! of several conventional keys, a JSON string containing an array, or an
//! array whose first element wraps the real payload. The extractors here try
//! an explicit chain of shape matchers in priority order and degrade to an
//! empty list instead of erroring; callers show "no records" rather than a
//! parsing failure.

use aone_core::record::{RecordObject, Stage, default_stages, record_stage_id};
use serde_json::Value;

/// Maximum depth for the recursive array scan over unknown object trees.
const MAX_SCAN_DEPTH: usize = 6;

/// Extracts a list of records from a response of unknown shape.
///
/// `domain_key` is the conventional wrapper key for the operation
/// ("leads", "clients", "messages", ...), tried before the generic
/// `items`/`data`/`body` wrappers.
pub fn extract_records(raw: &Value, domain_key: &str) -> Vec<RecordObject> {
    let found = extract_records_inner(raw, domain_key);
    if !found.is_empty() {
        return found;
    }
    // Some workflows wrap the true response object in a single-element array.
    if let Value::Array(items) = raw
        && let Some(first) = items.first()
        && first.is_object()
    {
        return extract_records_inner(first, domain_key);
    }
    found
}

fn extract_records_inner(raw: &Value, domain_key: &str) -> Vec<RecordObject> {
    match raw {
        Value::Array(items) => record_elements(items),
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Array(items)) => record_elements(&items),
            _ => Vec::new(),
        },
        Value::Object(map) => {
            for key in [domain_key, "items", "data", "body"] {
                if let Some(inner) = map.get(key) {
                    return extract_records_inner(inner, domain_key);
                }
            }
            best_array_in_tree(raw)
        }
        _ => Vec::new(),
    }
}

/// Keeps the plain-object elements of an array, dropping scalars and nested
/// arrays.
fn object_elements(items: &[Value]) -> Vec<RecordObject> {
    items
        .iter()
        .filter_map(|item| item.as_object().cloned())
        .collect()
}

/// Keeps the record-like elements of an array. An array of plain objects
/// with none of the identity keys yields nothing here, which lets the
/// single-element-wrapper rescue in [`extract_records`] take over.
fn record_elements(items: &[Value]) -> Vec<RecordObject> {
    items
        .iter()
        .filter(|item| is_record_like(item))
        .filter_map(|item| item.as_object().cloned())
        .collect()
}

/// Record-likeness: an object carrying at least one of the conventional
/// identity keys.
fn is_record_like(value: &Value) -> bool {
    value
        .as_object()
        .map(|map| map.contains_key("id") || map.contains_key("name") || map.contains_key("title"))
        .unwrap_or(false)
}

/// Scans the whole tree (bounded depth) for arrays, scores each by its count
/// of record-like elements and returns the elements of the best one.
fn best_array_in_tree(raw: &Value) -> Vec<RecordObject> {
    let mut arrays: Vec<&Vec<Value>> = Vec::new();
    collect_arrays(raw, 0, &mut arrays);

    let mut best: Option<(&Vec<Value>, usize)> = None;
    for items in &arrays {
        let score = items.iter().filter(|item| is_record_like(item)).count();
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((items, score)),
        }
    }

    match best {
        Some((items, score)) if score > 0 => record_elements(items),
        _ => {
            // No array scored; fall back to the first one that holds any
            // object-shaped element at all.
            arrays
                .iter()
                .find(|items| items.iter().any(Value::is_object))
                .map(|items| object_elements(items))
                .unwrap_or_default()
        }
    }
}

fn collect_arrays<'a>(value: &'a Value, depth: usize, out: &mut Vec<&'a Vec<Value>>) {
    if depth >= MAX_SCAN_DEPTH {
        return;
    }
    match value {
        Value::Array(items) => {
            out.push(items);
            for item in items {
                collect_arrays(item, depth + 1, out);
            }
        }
        Value::Object(map) => {
            for inner in map.values() {
                collect_arrays(inner, depth + 1, out);
            }
        }
        _ => {}
    }
}

/// Extracts the stage catalog from a response: `stages` at the top level or
/// nested under `data`/`body`. Only `{id: string, title: string}` elements
/// are accepted; a missing numeric `order` defaults to the element position.
pub fn extract_stages(raw: &Value) -> Vec<Stage> {
    let candidates = [
        raw.get("stages"),
        raw.get("data").and_then(|data| data.get("stages")),
        raw.get("body").and_then(|body| body.get("stages")),
    ];
    for candidate in candidates.into_iter().flatten() {
        if let Value::Array(items) = candidate {
            return items
                .iter()
                .enumerate()
                .filter_map(|(position, item)| stage_from_value(item, position as i64))
                .collect();
        }
    }
    Vec::new()
}

fn stage_from_value(value: &Value, fallback_order: i64) -> Option<Stage> {
    let map = value.as_object()?;
    let id = map.get("id")?.as_str()?;
    let title = map.get("title")?.as_str()?;
    if id.is_empty() {
        return None;
    }
    let order = map
        .get("order")
        .and_then(Value::as_i64)
        .unwrap_or(fallback_order);
    Some(Stage {
        id: id.to_string(),
        title: title.to_string(),
        order,
    })
}

/// Extracts a lead's event history: a bare array, or the object's `events`
/// field (`evants` is an observed backend misspelling and accepted too).
/// The result is sorted most-recent-first; elements without a resolvable
/// timestamp sort as oldest.
pub fn extract_events(raw: &Value) -> Vec<RecordObject> {
    let mut events = match raw {
        Value::Array(items) => object_elements(items),
        Value::Object(map) => match map.get("events").or_else(|| map.get("evants")) {
            Some(Value::Array(items)) => object_elements(items),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };
    events.sort_by_key(|event| std::cmp::Reverse(event_timestamp(event)));
    events
}

/// Resolves an event's timestamp in epoch milliseconds: a numeric
/// `timestamp`, or `createdAt`/`created_at` parsed as a date; 0 otherwise.
pub fn event_timestamp(event: &RecordObject) -> i64 {
    if let Some(number) = event.get("timestamp").and_then(Value::as_i64) {
        return number;
    }
    if let Some(float) = event.get("timestamp").and_then(Value::as_f64) {
        return float as i64;
    }
    for key in ["createdAt", "created_at"] {
        if let Some(text) = event.get(key).and_then(Value::as_str)
            && let Some(millis) = parse_datetime_millis(text)
        {
            return millis;
        }
    }
    0
}

fn parse_datetime_millis(text: &str) -> Option<i64> {
    if let Ok(datetime) = chrono::DateTime::parse_from_rfc3339(text) {
        return Some(datetime.timestamp_millis());
    }
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc().timestamp_millis());
    }
    None
}

/// Reconciles the extracted stage catalog with the records referencing it.
///
/// Any `stageId` referenced by a record but missing from the catalog gets a
/// synthesized entry (humanized title, ordered after the existing maximum),
/// then the default catalog is merged in: union by id with the backend
/// winning, sorted by order, no duplicate ids. Every record's stage resolves
/// to some entry of the result.
pub fn reconcile_stages(records: &[RecordObject], backend_stages: Vec<Stage>) -> Vec<Stage> {
    let mut catalog: Vec<Stage> = Vec::new();
    for stage in backend_stages {
        if !catalog.iter().any(|existing| existing.id == stage.id) {
            catalog.push(stage);
        }
    }

    let mut next_order = catalog.iter().map(|stage| stage.order).max().unwrap_or(-1) + 1;
    for record in records {
        if let Some(stage_id) = record_stage_id(record)
            && !catalog.iter().any(|stage| stage.id == stage_id)
        {
            catalog.push(Stage {
                title: humanize_stage_id(&stage_id),
                id: stage_id,
                order: next_order,
            });
            next_order += 1;
        }
    }

    for default in default_stages() {
        if !catalog.iter().any(|stage| stage.id == default.id) {
            catalog.push(default);
        }
    }

    catalog.sort_by(|a, b| a.order.cmp(&b.order));
    catalog
}

/// Turns a raw stage id into a displayable title: `in_progress` → "In progress".
pub fn humanize_stage_id(id: &str) -> String {
    let spaced = id.replace(['_', '-'], " ");
    let trimmed = spaced.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ids(records: &[RecordObject]) -> Vec<String> {
        records
            .iter()
            .filter_map(aone_core::record::record_id)
            .collect()
    }

    #[test]
    fn test_bare_array() {
        let raw = json!([{"id": "1"}, {"id": "2"}, "noise", 7, ["nested"]]);
        let records = extract_records(&raw, "clients");
        assert_eq!(ids(&records), vec!["1", "2"]);
    }

    #[test]
    fn test_wrapped_object_equivalent_to_bare_array() {
        let bare = json!([{"id": "a"}, {"id": "b"}]);
        let wrapped = json!({"data": {"items": [{"id": "a"}, {"id": "b"}]}});
        assert_eq!(
            extract_records(&bare, "leads"),
            extract_records(&wrapped, "leads")
        );
    }

    #[test]
    fn test_domain_key_preferred() {
        let raw = json!({
            "leads": [{"id": "lead-1"}],
            "items": [{"id": "item-1"}],
        });
        let records = extract_records(&raw, "leads");
        assert_eq!(ids(&records), vec!["lead-1"]);
    }

    #[test]
    fn test_stringified_array() {
        let raw = json!("[{\"id\": \"s1\"}, {\"id\": \"s2\"}]");
        let records = extract_records(&raw, "clients");
        assert_eq!(ids(&records), vec!["s1", "s2"]);
    }

    #[test]
    fn test_stringified_non_array_is_empty() {
        let raw = json!("{\"id\": \"not-a-list\"}");
        assert!(extract_records(&raw, "clients").is_empty());
    }

    #[test]
    fn test_nested_scan_picks_highest_scoring_array() {
        let raw = json!({
            "meta": {"tags": ["a", "b", "c"]},
            "result": {"deep": {"rows": [
                {"id": "r1", "name": "one"},
                {"id": "r2", "name": "two"},
            ]}},
        });
        let records = extract_records(&raw, "clients");
        assert_eq!(ids(&records), vec!["r1", "r2"]);
    }

    #[test]
    fn test_no_array_anywhere_is_empty_not_error() {
        let raw = json!({"status": "ok", "count": 3});
        assert!(extract_records(&raw, "clients").is_empty());
    }

    #[test]
    fn test_scalar_is_empty() {
        assert!(extract_records(&json!(42), "clients").is_empty());
        assert!(extract_records(&Value::Null, "clients").is_empty());
    }

    #[test]
    fn test_single_element_array_wrapper() {
        let raw = json!([{"body": {"clients": [{"id": "c1"}]}}]);
        let records = extract_records(&raw, "clients");
        assert_eq!(ids(&records), vec!["c1"]);
    }

    #[test]
    fn test_array_of_non_records_is_empty() {
        let raw = json!([{"foo": 1}, {"bar": 2}]);
        assert!(extract_records(&raw, "clients").is_empty());
    }

    #[test]
    fn test_scan_depth_is_bounded() {
        let mut raw = json!([{"id": "deep"}]);
        for _ in 0..8 {
            raw = json!({"level": raw});
        }
        assert!(extract_records(&raw, "clients").is_empty());
    }

    #[test]
    fn test_extract_stages_wrappers() {
        let expected = vec![Stage {
            id: "new".to_string(),
            title: "Новая".to_string(),
            order: 0,
        }];
        let top = json!({"stages": [{"id": "new", "title": "Новая", "order": 0}]});
        let nested = json!({"data": {"stages": [{"id": "new", "title": "Новая", "order": 0}]}});
        assert_eq!(extract_stages(&top), expected);
        assert_eq!(extract_stages(&nested), expected);
    }

    #[test]
    fn test_extract_stages_rejects_malformed() {
        let raw = json!({"stages": [
            {"id": "ok", "title": "Ok"},
            {"id": 5, "title": "numeric id"},
            {"title": "no id"},
            "noise",
        ]});
        let stages = extract_stages(&raw);
        assert_eq!(stages.len(), 1);
        assert_eq!(stages[0].id, "ok");
    }

    #[test]
    fn test_extract_events_misspelled_key_and_sort() {
        let raw = json!({"evants": [
            {"id": "old", "created_at": "2024-01-01T00:00:00Z"},
            {"id": "new", "timestamp": 1900000000000i64},
            {"id": "undated", "note": "?"},
        ]});
        let events = extract_events(&raw);
        let order: Vec<_> = events
            .iter()
            .map(|e| e.get("id").unwrap().as_str().unwrap())
            .collect();
        assert_eq!(order, vec!["new", "old", "undated"]);
    }

    #[test]
    fn test_reconcile_synthesizes_missing_stages() {
        let records = extract_records(
            &json!([
                {"id": "l1", "stageId": "new"},
                {"id": "l2", "stageId": "in_progress"},
            ]),
            "leads",
        );
        let backend = vec![Stage {
            id: "new".to_string(),
            title: "Новая".to_string(),
            order: 0,
        }];
        let catalog = reconcile_stages(&records, backend);

        let synthesized = catalog.iter().find(|s| s.id == "in_progress").unwrap();
        assert_eq!(synthesized.title, "In progress");

        // Every record's stageId resolves to a catalog entry.
        for record in &records {
            let stage_id = record_stage_id(record).unwrap();
            assert!(catalog.iter().any(|s| s.id == stage_id));
        }
        // Defaults merged in, no duplicate ids, sorted by order.
        assert!(catalog.iter().any(|s| s.id == "won"));
        let mut seen = std::collections::HashSet::new();
        assert!(catalog.iter().all(|s| seen.insert(s.id.clone())));
        assert!(catalog.windows(2).all(|w| w[0].order <= w[1].order));
    }

    #[test]
    fn test_humanize_stage_id() {
        assert_eq!(humanize_stage_id("in_progress"), "In progress");
        assert_eq!(humanize_stage_id("on-hold"), "On hold");
        assert_eq!(humanize_stage_id("won"), "Won");
        assert_eq!(humanize_stage_id(""), "");
    }
}
