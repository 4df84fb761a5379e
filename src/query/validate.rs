//! Strict validation of JSON query documents (`POST /api/<entity>/query`).
//!
//! Unlike the query-string parsers nothing here is dropped silently: every
//! malformed descriptor is reported back as a validation detail.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::fields::{FieldTree, Node};
use super::filter::{Condition, Filter, FilterOp, Operand, Scalar};
use super::pagination::{Pagination, DEFAULT_LIMIT, DEFAULT_PAGE, MAX_LIMIT};
use super::sort::{SortDirection, SortField};
use super::QueryOptions;
use crate::error::{ApiError, ErrorDetail};

const KNOWN_KEYS: &[&str] = &[
    "where", "filter", "orderBy", "sort", "select", "fields", "include", "nested", "page", "limit",
    "meta",
];

/// Builds [`QueryOptions`] from a JSON document, collecting every problem.
pub fn options_from_json(doc: &Value) -> Result<QueryOptions, ApiError> {
    let Some(obj) = doc.as_object() else {
        return Err(ApiError::validation(vec![ErrorDetail::new(
            None,
            "query document must be a JSON object",
        )]));
    };

    let mut errors = Vec::new();
    for key in obj.keys() {
        if !KNOWN_KEYS.contains(&key.as_str()) {
            errors.push(ErrorDetail::new(
                Some(key.clone()),
                "is not a recognised query option",
            ));
        }
    }

    let filter = collect(&mut errors, "where", either(obj, "where", "filter"), validate_where);
    let sort = collect(&mut errors, "orderBy", either(obj, "orderBy", "sort"), validate_order_by);
    let select = collect(&mut errors, "select", either(obj, "select", "fields"), |v| {
        validate_tree(v, "select")
    });
    let include = collect(&mut errors, "include", either(obj, "include", "nested"), |v| {
        validate_tree(v, "include")
    });
    let page = collect(&mut errors, "page", obj.get("page"), |v| {
        validate_positive(v, u32::MAX)
    });
    let limit = collect(&mut errors, "limit", obj.get("limit"), |v| {
        validate_positive(v, MAX_LIMIT)
    });
    let meta = collect(&mut errors, "meta", obj.get("meta"), |v| {
        v.as_bool().ok_or_else(|| "must be a boolean".to_string())
    });

    if !errors.is_empty() {
        return Err(ApiError::validation(errors));
    }

    let pagination = match (page, limit) {
        (None, None) => None,
        (page, limit) => Some(Pagination {
            page: page.unwrap_or(DEFAULT_PAGE),
            limit: limit.unwrap_or(DEFAULT_LIMIT),
        }),
    };

    Ok(QueryOptions {
        filter,
        pagination,
        sort,
        select,
        include,
        meta: meta.unwrap_or(true),
    })
}

fn either<'a>(obj: &'a Map<String, Value>, key: &str, alias: &str) -> Option<&'a Value> {
    obj.get(key).or_else(|| obj.get(alias))
}

fn collect<T>(
    errors: &mut Vec<ErrorDetail>,
    field: &str,
    value: Option<&Value>,
    validate: impl FnOnce(&Value) -> Result<T, String>,
) -> Option<T> {
    match value {
        None | Some(Value::Null) => None,
        Some(v) => match validate(v) {
            Ok(t) => Some(t),
            Err(reason) => {
                errors.push(ErrorDetail::new(Some(field.to_string()), reason));
                None
            }
        },
    }
}

fn validate_positive(value: &Value, max: u32) -> Result<u32, String> {
    match value.as_u64() {
        Some(n) if n >= 1 && n <= u64::from(max) => Ok(n as u32),
        _ if max == u32::MAX => Err("must be a positive integer".to_string()),
        _ => Err(format!("must be an integer between 1 and {}", max)),
    }
}

fn validate_order_by(value: &Value) -> Result<Vec<SortField>, String> {
    let entries: Vec<&Map<String, Value>> = match value {
        Value::Object(obj) => vec![obj],
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_object()
                    .ok_or_else(|| "entries must be objects like {\"field\": \"asc\"}".to_string())
            })
            .collect::<Result<_, _>>()?,
        _ => return Err("must be an object or an array of objects".to_string()),
    };

    let mut fields = Vec::new();
    for entry in entries {
        for (field, direction) in entry {
            if field.is_empty() {
                return Err("field names cannot be empty".to_string());
            }
            let direction = match direction.as_str() {
                Some("asc") => SortDirection::Asc,
                Some("desc") => SortDirection::Desc,
                _ => return Err(format!("direction for '{}' must be \"asc\" or \"desc\"", field)),
            };
            fields.push(SortField::new(field.clone(), direction));
        }
    }
    if fields.is_empty() {
        return Err("must name at least one field".to_string());
    }
    Ok(fields)
}

fn validate_tree(value: &Value, wrapper: &str) -> Result<FieldTree, String> {
    let Value::Object(obj) = value else {
        return Err("must be an object of field names".to_string());
    };
    if obj.is_empty() {
        return Err("must not be empty".to_string());
    }
    let mut tree = FieldTree::new();
    for (field, node) in obj {
        let node = match node {
            Value::Bool(true) => Node::All,
            Value::Object(inner) => {
                let inner = match inner.get(wrapper) {
                    Some(wrapped) if inner.len() == 1 => wrapped,
                    _ => node,
                };
                Node::Nested(
                    validate_tree(inner, wrapper).map_err(|e| format!("{}: {}", field, e))?,
                )
            }
            _ => return Err(format!("'{}' must be true or a nested object", field)),
        };
        tree.insert(field.clone(), node);
    }
    Ok(tree)
}

fn validate_where(value: &Value) -> Result<Filter, String> {
    let Value::Object(obj) = value else {
        return Err("must be an object".to_string());
    };
    let mut filter = Filter::new();
    for (field, condition) in obj {
        let condition = validate_condition(condition).map_err(|e| format!("{}: {}", field, e))?;
        filter.0.insert(field.clone(), condition);
    }
    Ok(filter)
}

fn validate_condition(value: &Value) -> Result<Condition, String> {
    if let Some(scalar) = scalar(value) {
        return Ok(Condition::Equals(scalar));
    }
    let Value::Object(obj) = value else {
        return Err("must be a scalar, an operator object or a relation filter".to_string());
    };
    if obj.is_empty() {
        return Err("must not be empty".to_string());
    }

    let is_operator = |k: &str| k == "equals" || FilterOp::parse(k).is_some();
    let operators = obj.keys().filter(|k| is_operator(k)).count();
    if operators == 0 {
        return validate_where(value).map(Condition::Relation);
    }
    if operators != obj.len() {
        return Err("cannot mix operators with relation fields".to_string());
    }

    let mut ops = BTreeMap::new();
    for (key, operand) in obj {
        let op = FilterOp::parse(key).unwrap_or(FilterOp::Equals);
        let operand = match op {
            FilterOp::In => {
                let items = operand
                    .as_array()
                    .ok_or_else(|| "'in' expects an array".to_string())?;
                Operand::Many(
                    items
                        .iter()
                        .map(|item| scalar(item).ok_or_else(|| "'in' values must be scalars".to_string()))
                        .collect::<Result<_, _>>()?,
                )
            }
            FilterOp::Contains => match operand {
                Value::String(s) => Operand::One(Scalar::Text(s.clone())),
                _ => return Err("'contains' expects a string".to_string()),
            },
            _ => Operand::One(
                scalar(operand).ok_or_else(|| format!("'{}' expects a scalar", key))?,
            ),
        };
        ops.insert(op, operand);
    }
    Ok(Condition::Ops(ops))
}

fn scalar(value: &Value) -> Option<Scalar> {
    match value {
        Value::Bool(b) => Some(Scalar::Bool(*b)),
        Value::String(s) => Some(Scalar::Text(s.clone())),
        Value::Number(n) => n
            .as_i64()
            .map(Scalar::Int)
            .or_else(|| n.as_f64().map(Scalar::Float)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorDetails;
    use serde_json::json;

    fn fields_of(err: ApiError) -> Vec<String> {
        match err.details {
            Some(ErrorDetails::List(list)) => list.into_iter().filter_map(|d| d.field).collect(),
            other => panic!("unexpected details: {:?}", other),
        }
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let options = options_from_json(&json!({})).unwrap();
        assert!(options.filter.is_none());
        assert!(options.pagination.is_none());
        assert!(options.meta);
    }

    #[test]
    fn test_full_document() {
        let options = options_from_json(&json!({
            "where": { "lang": "EN", "order": { "gte": 2 }, "category": { "name": "Web" } },
            "orderBy": [{ "order": "asc" }, { "title": "desc" }],
            "select": { "title": true, "category": { "select": { "name": true } } },
            "include": { "image": true },
            "page": 2,
            "limit": 5,
            "meta": false
        }))
        .unwrap();

        assert_eq!(
            serde_json::to_value(options.filter.unwrap()).unwrap(),
            json!({ "lang": "EN", "order": { "gte": 2 }, "category": { "name": "Web" } })
        );
        assert_eq!(
            options.sort.unwrap(),
            vec![SortField::asc("order"), SortField::desc("title")]
        );
        assert_eq!(
            options.select.unwrap().to_value("select"),
            json!({ "title": true, "category": { "select": { "name": true } } })
        );
        assert_eq!(options.pagination, Some(Pagination { page: 2, limit: 5 }));
        assert!(!options.meta);
    }

    #[test]
    fn test_every_bad_descriptor_is_reported() {
        let err = options_from_json(&json!({
            "page": 0,
            "limit": 500,
            "orderBy": { "title": "up" },
            "select": { "title": false },
            "bogus": 1
        }))
        .unwrap_err();
        assert_eq!(err.code, "VALIDATION_ERROR");
        let mut fields = fields_of(err);
        fields.sort();
        assert_eq!(fields, vec!["bogus", "limit", "orderBy", "page", "select"]);
    }

    #[test]
    fn test_in_requires_array() {
        let err = options_from_json(&json!({ "where": { "id": { "in": 3 } } })).unwrap_err();
        assert_eq!(fields_of(err), vec!["where"]);
    }

    #[test]
    fn test_mixed_operator_and_relation_keys_rejected() {
        let err =
            options_from_json(&json!({ "where": { "category": { "gt": 1, "name": "x" } } }))
                .unwrap_err();
        assert_eq!(fields_of(err), vec!["where"]);
    }

    #[test]
    fn test_non_object_document_rejected() {
        assert!(options_from_json(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_aliases_are_accepted() {
        let options = options_from_json(&json!({
            "filter": { "isActive": true },
            "sort": { "order": "asc" },
            "nested": { "skills": true }
        }))
        .unwrap();
        assert!(options.filter.is_some());
        assert!(options.sort.is_some());
        assert!(options.include.is_some());
    }
}
