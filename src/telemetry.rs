//! Session telemetry flattening
//!
//! The widget reports auth and backup state as nested records whose shape is
//! not known here. [`flatten`] projects any record into ordered `path = value`
//! rows for the session table. It keeps no state between calls.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::{Number, Value};
use std::fmt;

/// Closed set of values a session record can hold
#[derive(Debug, Clone, PartialEq)]
pub enum SessionValue {
    Null,
    Bool(bool),
    Date(DateTime<Utc>),
    Number(Number),
    Text(String),
    Map(SessionRecord),
    /// Arrays and anything else without a dedicated projection, shown verbatim
    Other(Value),
}

impl From<Value> for SessionValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => SessionValue::Null,
            Value::Bool(b) => SessionValue::Bool(b),
            Value::Number(n) => SessionValue::Number(n),
            Value::String(s) => SessionValue::Text(s),
            Value::Object(map) => SessionValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, SessionValue::from(v)))
                    .collect(),
            ),
            array @ Value::Array(_) => SessionValue::Other(array),
        }
    }
}

impl From<bool> for SessionValue {
    fn from(b: bool) -> Self {
        SessionValue::Bool(b)
    }
}

impl From<&str> for SessionValue {
    fn from(s: &str) -> Self {
        SessionValue::Text(s.to_string())
    }
}

impl From<String> for SessionValue {
    fn from(s: String) -> Self {
        SessionValue::Text(s)
    }
}

impl From<i64> for SessionValue {
    fn from(n: i64) -> Self {
        SessionValue::Number(n.into())
    }
}

impl From<f64> for SessionValue {
    /// NaN has no JSON number form and is treated like a missing value.
    /// Infinities are non-zero, so they stay visible as `Infinity` text.
    fn from(n: f64) -> Self {
        if n.is_infinite() {
            let text = if n > 0.0 { "Infinity" } else { "-Infinity" };
            return SessionValue::Text(text.to_string());
        }
        Number::from_f64(n).map_or(SessionValue::Null, SessionValue::Number)
    }
}

impl From<DateTime<Utc>> for SessionValue {
    fn from(date: DateTime<Utc>) -> Self {
        SessionValue::Date(date)
    }
}

impl From<SessionRecord> for SessionValue {
    fn from(record: SessionRecord) -> Self {
        SessionValue::Map(record)
    }
}

/// Ordered mapping of keys to values. Insertion order is display order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionRecord {
    entries: Vec<(String, SessionValue)>,
}

impl SessionRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    #[cfg(test)]
    pub fn with(mut self, key: &str, value: impl Into<SessionValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace. A replaced key keeps its original position.
    pub fn insert(&mut self, key: &str, value: impl Into<SessionValue>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key.to_string(), value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SessionValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build from a JSON object. Anything other than an object yields `None`.
    pub fn from_json(value: Value) -> Option<Self> {
        match SessionValue::from(value) {
            SessionValue::Map(record) => Some(record),
            _ => None,
        }
    }
}

impl FromIterator<(String, SessionValue)> for SessionRecord {
    fn from_iter<I: IntoIterator<Item = (String, SessionValue)>>(iter: I) -> Self {
        let mut record = SessionRecord::new();
        for (key, value) in iter {
            record.insert(&key, value);
        }
        record
    }
}

impl<'de> Deserialize<'de> for SessionRecord {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        SessionRecord::from_json(value)
            .ok_or_else(|| serde::de::Error::custom("session record must be a JSON object"))
    }
}

/// Display-ready value of one row
#[derive(Debug, Clone, PartialEq)]
pub enum RowValue {
    Text(String),
    Number(Number),
    Other(Value),
}

impl fmt::Display for RowValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowValue::Text(s) => f.write_str(s),
            RowValue::Number(n) => write!(f, "{n}"),
            RowValue::Other(v) => write!(f, "{v}"),
        }
    }
}

/// One `path = value` line of the session table
#[derive(Debug, Clone, PartialEq)]
pub struct FlattenedRow {
    pub path: String,
    pub value: RowValue,
}

impl FlattenedRow {
    fn text(path: String, text: impl Into<String>) -> Self {
        Self {
            path,
            value: RowValue::Text(text.into()),
        }
    }

    /// Text containing an http(s) URL. In auth records this is usually the
    /// user's avatar picture; the session table offers it as a link instead
    /// of rendering the image inline.
    pub fn is_link(&self) -> bool {
        match &self.value {
            RowValue::Text(s) => s.contains("http://") || s.contains("https://"),
            _ => false,
        }
    }
}

/// Flatten `record` depth-first in its own key order.
///
/// Projection priority per leaf:
/// null is dropped; booleans become `True`/`False`; dates become ISO-8601;
/// zero and empty text are dropped; nested maps are recursed without a row of
/// their own; everything else is kept verbatim.
pub fn flatten(record: &SessionRecord) -> Vec<FlattenedRow> {
    let mut rows = Vec::new();
    flatten_into(record, None, &mut rows);
    rows
}

fn flatten_into(record: &SessionRecord, prefix: Option<&str>, rows: &mut Vec<FlattenedRow>) {
    for (key, value) in record.iter() {
        let path = match prefix {
            Some(prefix) => format!("{prefix}.{key}"),
            None => key.to_string(),
        };

        match value {
            SessionValue::Null => {}
            SessionValue::Bool(b) => rows.push(FlattenedRow::text(path, if *b { "True" } else { "False" })),
            SessionValue::Date(date) => {
                rows.push(FlattenedRow::text(path, date.to_rfc3339_opts(SecondsFormat::Millis, true)))
            }
            SessionValue::Number(n) if n.as_f64() == Some(0.0) => {}
            SessionValue::Number(n) => rows.push(FlattenedRow {
                path,
                value: RowValue::Number(n.clone()),
            }),
            SessionValue::Text(s) if s.is_empty() => {}
            SessionValue::Text(s) => rows.push(FlattenedRow::text(path, s.as_str())),
            SessionValue::Map(child) => flatten_into(child, Some(path.as_str()), rows),
            SessionValue::Other(v) => rows.push(FlattenedRow {
                path,
                value: RowValue::Other(v.clone()),
            }),
        }
    }
}

/// Flattened event forwarded from the widget callbacks
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    /// Empty rows mean the session ended
    Auth(Vec<FlattenedRow>),
    Backup(Vec<FlattenedRow>),
}

/// Latest flattened auth and backup rows, as shown in the session table
#[derive(Debug, Default, Clone)]
pub struct SessionView {
    pub auth: Vec<FlattenedRow>,
    pub backup: Vec<FlattenedRow>,
}

impl SessionView {
    /// Auth rows first, then backup rows
    pub fn rows(&self) -> impl Iterator<Item = &FlattenedRow> {
        self.auth.iter().chain(self.backup.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.auth.is_empty() && self.backup.is_empty()
    }

    /// Each update replaces the rows of its kind
    pub fn apply(&mut self, update: SessionUpdate) {
        match update {
            SessionUpdate::Auth(rows) => self.auth = rows,
            SessionUpdate::Backup(rows) => self.backup = rows,
        }
    }

    pub fn clear(&mut self) {
        self.auth.clear();
        self.backup.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn row(path: &str, value: RowValue) -> FlattenedRow {
        FlattenedRow {
            path: path.to_string(),
            value,
        }
    }

    fn text(path: &str, s: &str) -> FlattenedRow {
        row(path, RowValue::Text(s.to_string()))
    }

    #[test]
    fn test_flatten_drops_null_and_zero() {
        let record = SessionRecord::from_json(json!({
            "a": { "b": 1, "c": null },
            "d": false,
            "e": 0
        }))
        .unwrap();

        assert_eq!(
            flatten(&record),
            vec![row("a.b", RowValue::Number(1.into())), text("d", "False")]
        );
    }

    #[test]
    fn test_flatten_auth_info() {
        let record = SessionRecord::from_json(json!({
            "authStatus": "authenticated",
            "authType": "local",
            "userDetails": { "name": "A", "email": "" }
        }))
        .unwrap();

        assert_eq!(
            flatten(&record),
            vec![
                text("authStatus", "authenticated"),
                text("authType", "local"),
                text("userDetails.name", "A"),
            ]
        );
    }

    #[test]
    fn test_flatten_booleans_capitalized() {
        let record = SessionRecord::new().with("yes", true).with("no", false);
        assert_eq!(flatten(&record), vec![text("yes", "True"), text("no", "False")]);
    }

    #[test]
    fn test_flatten_date_is_iso() {
        let date = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
        let record = SessionRecord::new().with("backup", SessionRecord::new().with("lastBackup", date));

        assert_eq!(flatten(&record), vec![text("backup.lastBackup", "2025-03-14T09:26:53.000Z")]);
    }

    #[test]
    fn test_flatten_keeps_key_order_depth_first() {
        let record = SessionRecord::from_json(json!({
            "z": "first",
            "m": { "y": "second", "x": { "w": "third" } },
            "a": "fourth"
        }))
        .unwrap();

        let paths: Vec<_> = flatten(&record).into_iter().map(|r| r.path).collect();
        assert_eq!(paths, vec!["z", "m.y", "m.x.w", "a"]);
    }

    #[test]
    fn test_flatten_arrays_verbatim() {
        let record = SessionRecord::from_json(json!({ "wallets": ["main", "alt"], "empty": [] })).unwrap();
        let rows = flatten(&record);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].value, RowValue::Other(json!(["main", "alt"])));
        assert_eq!(rows[0].value.to_string(), r#"["main","alt"]"#);
        assert_eq!(rows[1].path, "empty");
    }

    #[test]
    fn test_flatten_empty_nested_map_emits_nothing() {
        let record = SessionRecord::from_json(json!({ "userDetails": {}, "float": 0.0, "neg": -2.5 })).unwrap();
        assert_eq!(flatten(&record), vec![row("neg", RowValue::Number(Number::from_f64(-2.5).unwrap()))]);
    }

    #[test]
    fn test_nan_is_dropped() {
        let record = SessionRecord::new().with("ratio", f64::NAN);
        assert!(flatten(&record).is_empty());
    }

    #[test]
    fn test_infinity_is_kept() {
        let record = SessionRecord::new()
            .with("inf", f64::INFINITY)
            .with("neg", f64::NEG_INFINITY);
        assert_eq!(flatten(&record), vec![text("inf", "Infinity"), text("neg", "-Infinity")]);
    }

    #[test]
    fn test_flatten_is_idempotent_on_flat_records() {
        let nested = SessionRecord::from_json(json!({
            "authStatus": "authenticated",
            "userDetails": { "name": "A", "verified": true, "score": 12 },
            "tags": ["x"]
        }))
        .unwrap();
        let once = flatten(&nested);

        let flat: SessionRecord = once
            .iter()
            .map(|r| {
                let value = match &r.value {
                    RowValue::Text(s) => SessionValue::Text(s.clone()),
                    RowValue::Number(n) => SessionValue::Number(n.clone()),
                    RowValue::Other(v) => SessionValue::Other(v.clone()),
                };
                (r.path.clone(), value)
            })
            .collect();

        assert_eq!(flatten(&flat), once);
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut record = SessionRecord::new().with("a", "1").with("b", "2");
        record.insert("a", "3");

        assert_eq!(record.len(), 2);
        assert_eq!(flatten(&record), vec![text("a", "3"), text("b", "2")]);
    }

    #[test]
    fn test_deserialize_rejects_non_object() {
        assert!(serde_json::from_str::<SessionRecord>("[1, 2]").is_err());
        let record: SessionRecord = serde_json::from_str(r#"{"k": "v"}"#).unwrap();
        assert_eq!(record.len(), 1);
    }

    #[test]
    fn test_is_link() {
        assert!(text("userDetails.picture", "https://example.com/a.png").is_link());
        assert!(!text("authType", "local").is_link());
        assert!(!row("n", RowValue::Number(3.into())).is_link());
    }

    #[test]
    fn test_session_view_apply_replaces_kind() {
        let mut view = SessionView::default();
        view.apply(SessionUpdate::Auth(vec![text("authStatus", "authenticated")]));
        view.apply(SessionUpdate::Backup(vec![text("backupsNeeded", "1")]));
        view.apply(SessionUpdate::Auth(Vec::new()));

        assert!(view.auth.is_empty());
        assert_eq!(view.backup.len(), 1);
        assert!(!view.is_empty());
    }

    #[test]
    fn test_session_view_orders_auth_before_backup() {
        let view = SessionView {
            auth: vec![text("authStatus", "authenticated")],
            backup: vec![text("backupsNeeded", "2")],
        };
        let paths: Vec<_> = view.rows().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["authStatus", "backupsNeeded"]);
    }
}
