//! `filter=[status=active,price=gt:100,category.name=Web]`
//!
//! Parsing is lenient: a clause that cannot be understood is dropped and the
//! rest of the filter survives. Type checking against the real columns
//! happens later, when the filter is turned into SQL.

use std::collections::BTreeMap;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// Field names treated as numeric regardless of the entity.
pub const NUMERIC_FIELDS: &[&str] = &[
    "id", "order", "level", "size", "price", "quantity", "age", "year", "count", "rating",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterOp {
    Equals,
    Gt,
    Lt,
    Gte,
    Lte,
    Contains,
    In,
}

impl FilterOp {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "gt" => Some(Self::Gt),
            "lt" => Some(Self::Lt),
            "gte" => Some(Self::Gte),
            "lte" => Some(Self::Lte),
            "contains" => Some(Self::Contains),
            "in" => Some(Self::In),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::Gt => "gt",
            Self::Lt => "lt",
            Self::Gte => "gte",
            Self::Lte => "lte",
            Self::Contains => "contains",
            Self::In => "in",
        }
    }

    fn is_comparison(&self) -> bool {
        matches!(self, Self::Gt | Self::Lt | Self::Gte | Self::Lte)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl Scalar {
    /// Integer first, then float.
    pub fn number(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Ok(i) = raw.parse::<i64>() {
            return Some(Self::Int(i));
        }
        raw.parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(Self::Float)
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Operand {
    One(Scalar),
    Many(Vec<Scalar>),
}

/// What a single key of a `where` document constrains.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Equals(Scalar),
    Ops(BTreeMap<FilterOp, Operand>),
    /// Constraint on a related record, from a dotted key.
    Relation(Filter),
}

impl Serialize for Condition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Condition::Equals(v) => v.serialize(serializer),
            Condition::Ops(ops) => {
                let mut map = serializer.serialize_map(Some(ops.len()))?;
                for (op, operand) in ops {
                    map.serialize_entry(op.as_str(), operand)?;
                }
                map.end()
            }
            Condition::Relation(filter) => filter.serialize(serializer),
        }
    }
}

/// A `where` document: field name to condition.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Filter(pub BTreeMap<String, Condition>);

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Condition)> {
        self.0.iter()
    }

    /// Builder used by services for fixed constraints like `isActive=true`.
    pub fn with_eq(mut self, field: &str, value: Scalar) -> Self {
        self.0.insert(field.to_string(), Condition::Equals(value));
        self
    }

    /// Inserts `condition` at the dotted `path`, merging with what is there.
    pub fn insert_path(&mut self, path: &[&str], condition: Condition) {
        let Some((head, rest)) = path.split_first() else {
            return;
        };
        if rest.is_empty() {
            let merged = match (self.0.remove(*head), condition) {
                (Some(Condition::Ops(mut existing)), Condition::Ops(new)) => {
                    existing.extend(new);
                    Condition::Ops(existing)
                }
                (_, new) => new,
            };
            self.0.insert(head.to_string(), merged);
            return;
        }
        let entry = self
            .0
            .entry(head.to_string())
            .or_insert_with(|| Condition::Relation(Filter::new()));
        if !matches!(entry, Condition::Relation(_)) {
            *entry = Condition::Relation(Filter::new());
        }
        if let Condition::Relation(inner) = entry {
            inner.insert_path(rest, condition);
        }
    }
}

pub fn is_numeric_field(field: &str) -> bool {
    NUMERIC_FIELDS.contains(&field) || field.ends_with("Id") || field.ends_with("_id")
}

/// Parses the raw `filter` query value. `None` when no clause survives.
pub fn parse_filter(raw: &str) -> Option<Filter> {
    let body = raw.trim();
    let body = body.strip_prefix('[').unwrap_or(body);
    let body = body.strip_suffix(']').unwrap_or(body);

    let mut filter = Filter::new();
    for clause in body.split(',') {
        let Some((key, value)) = clause.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();
        if key.is_empty() || value.is_empty() {
            continue;
        }
        let path: Vec<&str> = key.split('.').map(str::trim).collect();
        if path.iter().any(|segment| segment.is_empty()) {
            continue;
        }
        let leaf = path[path.len() - 1];
        if let Some(condition) = parse_condition(leaf, value) {
            filter.insert_path(&path, condition);
        }
    }

    if filter.is_empty() {
        None
    } else {
        Some(filter)
    }
}

fn parse_condition(field: &str, value: &str) -> Option<Condition> {
    let numeric = is_numeric_field(field);

    if let Some((op, operand)) = value.split_once(':') {
        if let Some(op) = FilterOp::parse(op.trim()) {
            let operand = operand.trim();
            if operand.is_empty() {
                return None;
            }
            let operand = match op {
                FilterOp::In => Operand::Many(
                    operand
                        .split('|')
                        .map(|v| coerce(v, numeric, false))
                        .collect::<Option<Vec<_>>>()?,
                ),
                FilterOp::Contains => Operand::One(Scalar::Text(operand.to_string())),
                _ => Operand::One(coerce(operand, numeric, op.is_comparison())?),
            };
            return Some(Condition::Ops(BTreeMap::from([(op, operand)])));
        }
    }

    if value.contains('|') {
        let values = value
            .split('|')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| coerce(v, numeric, false))
            .collect::<Option<Vec<_>>>()?;
        if values.is_empty() {
            return None;
        }
        return Some(Condition::Ops(BTreeMap::from([(
            FilterOp::In,
            Operand::Many(values),
        )])));
    }

    Some(Condition::Equals(coerce(value, numeric, false)?))
}

/// Numeric fields must parse or the clause is dropped; comparison operands
/// become numbers when they look like numbers and stay text otherwise.
fn coerce(raw: &str, numeric: bool, comparison: bool) -> Option<Scalar> {
    let raw = raw.trim();
    if numeric {
        return Scalar::number(raw);
    }
    if comparison {
        if let Some(n) = Scalar::number(raw) {
            return Some(n);
        }
    }
    Some(Scalar::Text(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parsed(raw: &str) -> serde_json::Value {
        serde_json::to_value(parse_filter(raw).expect("filter should parse")).unwrap()
    }

    #[test]
    fn test_simple_equality() {
        assert_eq!(parsed("[status=active]"), json!({ "status": "active" }));
    }

    #[test]
    fn test_brackets_are_optional() {
        assert_eq!(parsed("status=active"), json!({ "status": "active" }));
    }

    #[test]
    fn test_operator_on_numeric_field() {
        assert_eq!(parsed("[price=gt:100]"), json!({ "price": { "gt": 100 } }));
    }

    #[test]
    fn test_comparison_coerces_numeric_looking_values() {
        assert_eq!(parsed("[stars=gte:5]"), json!({ "stars": { "gte": 5 } }));
        assert_eq!(parsed("[score=lt:2.5]"), json!({ "score": { "lt": 2.5 } }));
    }

    #[test]
    fn test_comparison_keeps_non_numeric_text() {
        assert_eq!(
            parsed("[createdAt=gte:2024-01-01]"),
            json!({ "createdAt": { "gte": "2024-01-01" } })
        );
    }

    #[test]
    fn test_contains_never_coerces() {
        assert_eq!(
            parsed("[title=contains:5]"),
            json!({ "title": { "contains": "5" } })
        );
    }

    #[test]
    fn test_pipe_alternatives_become_in() {
        assert_eq!(
            parsed("[lang=EN|AR]"),
            json!({ "lang": { "in": ["EN", "AR"] } })
        );
    }

    #[test]
    fn test_in_operator_on_id_field_coerces_each_value() {
        assert_eq!(
            parsed("[categoryId=in:1|2|3]"),
            json!({ "categoryId": { "in": [1, 2, 3] } })
        );
    }

    #[test]
    fn test_id_suffix_coerces_to_number() {
        assert_eq!(parsed("[imageId=7]"), json!({ "imageId": 7 }));
        assert_eq!(parsed("[image_id=7]"), json!({ "image_id": 7 }));
    }

    #[test]
    fn test_failed_numeric_coercion_drops_only_that_clause() {
        assert_eq!(
            parsed("[order=abc,title=Hello]"),
            json!({ "title": "Hello" })
        );
    }

    #[test]
    fn test_all_clauses_dropped_returns_none() {
        assert!(parse_filter("[order=abc]").is_none());
        assert!(parse_filter("[]").is_none());
        assert!(parse_filter("garbage").is_none());
        assert!(parse_filter("").is_none());
    }

    #[test]
    fn test_dot_keys_nest() {
        assert_eq!(
            parsed("[category.name=Web,category.order=lte:3]"),
            json!({ "category": { "name": "Web", "order": { "lte": 3 } } })
        );
    }

    #[test]
    fn test_operators_on_same_field_merge() {
        assert_eq!(
            parsed("[price=gt:1,price=lt:9]"),
            json!({ "price": { "gt": 1, "lt": 9 } })
        );
    }

    #[test]
    fn test_unknown_operator_is_plain_value() {
        assert_eq!(
            parsed("[link=https://example.com]"),
            json!({ "link": "https://example.com" })
        );
    }

    #[test]
    fn test_malformed_clauses_are_skipped() {
        assert_eq!(
            parsed("[=x,novalue,title=,a..b=1,name=ok]"),
            json!({ "name": "ok" })
        );
    }

    #[test]
    fn test_scalar_number_prefers_integers() {
        assert_eq!(Scalar::number("12"), Some(Scalar::Int(12)));
        assert_eq!(Scalar::number("1.5"), Some(Scalar::Float(1.5)));
        assert_eq!(Scalar::number("NaN"), None);
        assert_eq!(Scalar::number("x"), None);
    }
}
