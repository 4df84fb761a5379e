//! SQL generation for the generic repository.
//!
//! Every statement returns rows as a single JSON document built with
//! `json_build_object`, so field selection and relation inclusion are
//! resolved by Postgres in one round trip. Identifiers come only from the
//! static schemas; every value is bound.

use serde_json::{Map, Value};
use sqlx::{Postgres, QueryBuilder};

use super::models::Lang;
use super::schema::{Column, ColumnKind, EntitySchema, Link, Relation};
use crate::error::ApiError;
use crate::query::{Condition, FieldTree, Filter, FilterOp, FindArgs, Node, Operand, Scalar, SortField};

pub type Builder = QueryBuilder<'static, Postgres>;

pub fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn alias(depth: usize) -> String {
    format!("t{}", depth)
}

/// A value ready to bind, already coerced to the column's type.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    IntList(Vec<i64>),
    FloatList(Vec<f64>),
    TextList(Vec<String>),
    BoolList(Vec<bool>),
    Null,
}

fn cast(kind: ColumnKind, list: bool) -> &'static str {
    match (kind, list) {
        (ColumnKind::Lang, false) => "::language",
        (ColumnKind::Lang, true) => "::language[]",
        (ColumnKind::Timestamp, false) => "::timestamptz",
        (ColumnKind::Timestamp, true) => "::timestamptz[]",
        _ => "",
    }
}

fn push_value(qb: &mut Builder, value: BindValue, kind: ColumnKind) {
    let list = matches!(
        value,
        BindValue::IntList(_) | BindValue::FloatList(_) | BindValue::TextList(_) | BindValue::BoolList(_)
    );
    match value {
        BindValue::Int(v) => qb.push_bind(v),
        BindValue::Float(v) => qb.push_bind(v),
        BindValue::Text(v) => qb.push_bind(v),
        BindValue::Bool(v) => qb.push_bind(v),
        BindValue::IntList(v) => qb.push_bind(v),
        BindValue::FloatList(v) => qb.push_bind(v),
        BindValue::TextList(v) => qb.push_bind(v),
        BindValue::BoolList(v) => qb.push_bind(v),
        BindValue::Null => qb.push("NULL"),
    };
    // text[] columns bind Vec<String> natively
    if kind != ColumnKind::TextArray {
        qb.push(cast(kind, list));
    }
}

fn invalid(column: &Column, expected: &str) -> ApiError {
    ApiError::bad_request(format!("Invalid value for '{}'", column.field))
        .field(column.field)
        .reason(format!("expected {}", expected))
}

/// Coerces a filter operand to the column's type.
pub fn scalar_value(column: &Column, value: &Scalar) -> Result<BindValue, ApiError> {
    match column.kind {
        ColumnKind::Id | ColumnKind::Int | ColumnKind::BigInt => match value {
            Scalar::Int(i) => Ok(BindValue::Int(*i)),
            Scalar::Float(f) => Ok(BindValue::Float(*f)),
            Scalar::Text(s) => match Scalar::number(s) {
                Some(Scalar::Int(i)) => Ok(BindValue::Int(i)),
                Some(Scalar::Float(f)) => Ok(BindValue::Float(f)),
                _ => Err(invalid(column, "a number")),
            },
            Scalar::Bool(_) => Err(invalid(column, "a number")),
        },
        ColumnKind::Bool => match value {
            Scalar::Bool(b) => Ok(BindValue::Bool(*b)),
            Scalar::Text(s) if s.eq_ignore_ascii_case("true") => Ok(BindValue::Bool(true)),
            Scalar::Text(s) if s.eq_ignore_ascii_case("false") => Ok(BindValue::Bool(false)),
            _ => Err(invalid(column, "true or false")),
        },
        ColumnKind::Lang => match value {
            Scalar::Text(s) => s
                .parse::<Lang>()
                .map(|lang| BindValue::Text(lang.as_str().to_string()))
                .map_err(|_| invalid(column, "EN or AR")),
            _ => Err(invalid(column, "EN or AR")),
        },
        ColumnKind::Timestamp => match value {
            Scalar::Text(s) => Ok(BindValue::Text(s.clone())),
            _ => Err(invalid(column, "a date")),
        },
        ColumnKind::Text | ColumnKind::TextArray => Ok(BindValue::Text(match value {
            Scalar::Text(s) => s.clone(),
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Bool(b) => b.to_string(),
        })),
    }
}

fn list_value(column: &Column, values: &[Scalar]) -> Result<BindValue, ApiError> {
    let values = values
        .iter()
        .map(|v| scalar_value(column, v))
        .collect::<Result<Vec<_>, _>>()?;

    if values.iter().all(|v| matches!(v, BindValue::Int(_))) && column.kind.is_numeric() {
        return Ok(BindValue::IntList(
            values
                .into_iter()
                .filter_map(|v| match v {
                    BindValue::Int(i) => Some(i),
                    _ => None,
                })
                .collect(),
        ));
    }
    if column.kind.is_numeric() {
        return Ok(BindValue::FloatList(
            values
                .into_iter()
                .filter_map(|v| match v {
                    BindValue::Int(i) => Some(i as f64),
                    BindValue::Float(f) => Some(f),
                    _ => None,
                })
                .collect(),
        ));
    }
    if column.kind == ColumnKind::Bool {
        return Ok(BindValue::BoolList(
            values
                .into_iter()
                .filter_map(|v| match v {
                    BindValue::Bool(b) => Some(b),
                    _ => None,
                })
                .collect(),
        ));
    }
    Ok(BindValue::TextList(
        values
            .into_iter()
            .filter_map(|v| match v {
                BindValue::Text(s) => Some(s),
                _ => None,
            })
            .collect(),
    ))
}

/// Coerces a payload value for a write.
pub fn json_value(column: &Column, value: &Value) -> Result<BindValue, ApiError> {
    if value.is_null() {
        return Ok(BindValue::Null);
    }
    match column.kind {
        ColumnKind::Id | ColumnKind::Int | ColumnKind::BigInt => value
            .as_i64()
            .map(BindValue::Int)
            .ok_or_else(|| invalid(column, "an integer")),
        ColumnKind::Bool => value
            .as_bool()
            .map(BindValue::Bool)
            .ok_or_else(|| invalid(column, "true or false")),
        ColumnKind::Text | ColumnKind::Timestamp => value
            .as_str()
            .map(|s| BindValue::Text(s.to_string()))
            .ok_or_else(|| invalid(column, "a string")),
        ColumnKind::Lang => value
            .as_str()
            .and_then(|s| s.parse::<Lang>().ok())
            .map(|lang| BindValue::Text(lang.as_str().to_string()))
            .ok_or_else(|| invalid(column, "EN or AR")),
        ColumnKind::TextArray => value
            .as_array()
            .and_then(|items| {
                items
                    .iter()
                    .map(|item| item.as_str().map(str::to_string))
                    .collect::<Option<Vec<_>>>()
            })
            .map(BindValue::TextList)
            .ok_or_else(|| invalid(column, "a list of strings")),
    }
}

fn unknown_field(schema: &EntitySchema, field: &str) -> ApiError {
    ApiError::bad_request(format!("Unknown field '{}' on {}", field, schema.name))
        .field(field)
        .suggestion("Check the field name against the resource's documented fields")
}

// ============================================================================
// Projection
// ============================================================================

fn column_entry(column: &Column, alias: &str) -> String {
    format!("'{}', {}.{}", column.field, alias, quote(column.column))
}

fn relation_entry(
    relation: &Relation,
    outer: &str,
    depth: usize,
    inner: String,
    public: bool,
) -> String {
    let target = relation.target;
    let me = alias(depth);
    let visible = if public && target.has_column("isActive") {
        format!(" AND {}.\"is_active\" = true", me)
    } else {
        String::new()
    };
    match relation.link {
        Link::BelongsTo { column } => format!(
            "'{}', (SELECT {} FROM {} AS {} WHERE {}.\"id\" = {}.{}{})",
            relation.field,
            inner,
            quote(target.table),
            me,
            me,
            outer,
            quote(column),
            visible
        ),
        Link::HasMany { foreign_column } => {
            let order = if target.has_column("order") {
                format!("{}.\"order\", {}.\"id\"", me, me)
            } else {
                format!("{}.\"id\"", me)
            };
            format!(
                "'{}', COALESCE((SELECT json_agg({} ORDER BY {}) FROM {} AS {} WHERE {}.{} = {}.\"id\"{}), '[]'::json)",
                relation.field,
                inner,
                order,
                quote(target.table),
                me,
                me,
                quote(foreign_column),
                outer,
                visible
            )
        }
    }
}

/// `json_build_object(...)` for one row of `schema` aliased `t<depth>`.
///
/// `select` limits the columns and relations returned; `include` adds
/// relations on top of whatever the columns are. A `public` projection drops
/// admin-only columns and inactive related rows.
pub fn projection(
    schema: &'static EntitySchema,
    depth: usize,
    select: Option<&FieldTree>,
    include: Option<&FieldTree>,
    public: bool,
) -> Result<String, ApiError> {
    let me = alias(depth);
    let mut parts = Vec::new();

    match select {
        Some(tree) => {
            for (field, node) in tree.iter() {
                if let Some(column) = schema.column(field) {
                    if matches!(node, Node::Nested(_)) {
                        return Err(ApiError::bad_request(format!(
                            "'{}' on {} is not a relation",
                            field, schema.name
                        ))
                        .field(field.as_str()));
                    }
                    if public && !column.public {
                        continue;
                    }
                    parts.push(column_entry(column, &me));
                } else if let Some(relation) = schema.relation(field) {
                    let nested = match node {
                        Node::All => None,
                        Node::Nested(t) => Some(t),
                    };
                    let inner = projection(relation.target, depth + 1, nested, None, public)?;
                    parts.push(relation_entry(relation, &me, depth + 1, inner, public));
                } else {
                    return Err(unknown_field(schema, field));
                }
            }
        }
        None => parts.extend(
            schema
                .columns
                .iter()
                .filter(|c| !public || c.public)
                .map(|c| column_entry(c, &me)),
        ),
    }

    if let Some(tree) = include {
        for (field, node) in tree.iter() {
            if let Some(relation) = schema.relation(field) {
                if select.is_some_and(|s| s.get(field).is_some()) {
                    continue;
                }
                let nested = match node {
                    Node::All => None,
                    Node::Nested(t) => Some(t),
                };
                let inner = projection(relation.target, depth + 1, None, nested, public)?;
                parts.push(relation_entry(relation, &me, depth + 1, inner, public));
            } else if schema.column(field).is_none() {
                return Err(unknown_field(schema, field));
            }
        }
    }

    Ok(format!("json_build_object({})", parts.join(", ")))
}

// ============================================================================
// WHERE
// ============================================================================

fn push_filter(
    qb: &mut Builder,
    schema: &'static EntitySchema,
    depth: usize,
    filter: &Filter,
) -> Result<(), ApiError> {
    if filter.is_empty() {
        qb.push("TRUE");
        return Ok(());
    }
    for (i, (field, condition)) in filter.iter().enumerate() {
        if i > 0 {
            qb.push(" AND ");
        }
        push_condition(qb, schema, depth, field, condition)?;
    }
    Ok(())
}

fn push_condition(
    qb: &mut Builder,
    schema: &'static EntitySchema,
    depth: usize,
    field: &str,
    condition: &Condition,
) -> Result<(), ApiError> {
    if let Some(column) = schema.column(field) {
        return match condition {
            Condition::Equals(value) => {
                push_comparison(qb, depth, column, FilterOp::Equals, &Operand::One(value.clone()))
            }
            Condition::Ops(ops) => {
                qb.push("(");
                for (i, (op, operand)) in ops.iter().enumerate() {
                    if i > 0 {
                        qb.push(" AND ");
                    }
                    push_comparison(qb, depth, column, *op, operand)?;
                }
                qb.push(")");
                Ok(())
            }
            Condition::Relation(_) => Err(ApiError::bad_request(format!(
                "'{}' on {} is not a relation",
                field, schema.name
            ))
            .field(field)),
        };
    }

    let Some(relation) = schema.relation(field) else {
        return Err(unknown_field(schema, field));
    };
    let Condition::Relation(inner) = condition else {
        return Err(ApiError::bad_request(format!(
            "'{}' on {} is a relation",
            field, schema.name
        ))
        .field(field)
        .suggestion(format!("Filter on its fields instead, e.g. {}.id=1", field)));
    };

    let me = alias(depth);
    let sub = alias(depth + 1);
    let target = relation.target;
    match relation.link {
        Link::BelongsTo { column } => {
            qb.push(format!(
                "{}.{} IN (SELECT {}.\"id\" FROM {} AS {} WHERE ",
                me,
                quote(column),
                sub,
                quote(target.table),
                sub
            ));
        }
        Link::HasMany { foreign_column } => {
            qb.push(format!(
                "EXISTS (SELECT 1 FROM {} AS {} WHERE {}.{} = {}.\"id\" AND ",
                quote(target.table),
                sub,
                sub,
                quote(foreign_column),
                me
            ));
        }
    }
    push_filter(qb, target, depth + 1, inner)?;
    qb.push(")");
    Ok(())
}

fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn push_comparison(
    qb: &mut Builder,
    depth: usize,
    column: &'static Column,
    op: FilterOp,
    operand: &Operand,
) -> Result<(), ApiError> {
    let target = format!("{}.{}", alias(depth), quote(column.column));

    let value = match (op, operand) {
        (FilterOp::In, Operand::Many(values)) if column.kind == ColumnKind::TextArray => {
            // any listed value among the array's elements
            qb.push(format!("{} && ", target));
            push_value(qb, list_value(column, values)?, column.kind);
            return Ok(());
        }
        (FilterOp::In, Operand::Many(values)) => {
            qb.push(format!("{} = ANY(", target));
            push_value(qb, list_value(column, values)?, column.kind);
            qb.push(")");
            return Ok(());
        }
        (FilterOp::In, Operand::One(value)) => {
            return push_comparison(qb, depth, column, op, &Operand::Many(vec![value.clone()]));
        }
        (_, Operand::Many(_)) => {
            return Err(ApiError::bad_request(format!(
                "'{}' on '{}' expects a single value",
                op.as_str(),
                column.field
            ))
            .field(column.field));
        }
        (_, Operand::One(value)) => value,
    };

    match op {
        FilterOp::Contains => {
            let BindValue::Text(text) = scalar_value(column, value)? else {
                return Err(invalid(column, "a text field for 'contains'"));
            };
            match column.kind {
                ColumnKind::Text => {
                    qb.push(format!("{} LIKE '%' || ", target));
                    qb.push_bind(escape_like(&text));
                    qb.push(" || '%'");
                }
                ColumnKind::TextArray => {
                    qb.push_bind(text);
                    qb.push(format!(" = ANY({})", target));
                }
                _ => return Err(invalid(column, "a text field for 'contains'")),
            }
        }
        FilterOp::Equals if column.kind == ColumnKind::TextArray => {
            push_value(qb, scalar_value(column, value)?, ColumnKind::Text);
            qb.push(format!(" = ANY({})", target));
        }
        FilterOp::Equals => {
            qb.push(format!("{} = ", target));
            push_value(qb, scalar_value(column, value)?, column.kind);
        }
        FilterOp::Gt | FilterOp::Lt | FilterOp::Gte | FilterOp::Lte => {
            if !column.kind.is_ordered() {
                return Err(ApiError::bad_request(format!(
                    "'{}' cannot be compared with '{}'",
                    column.field,
                    op.as_str()
                ))
                .field(column.field));
            }
            let symbol = match op {
                FilterOp::Gt => ">",
                FilterOp::Lt => "<",
                FilterOp::Gte => ">=",
                _ => "<=",
            };
            qb.push(format!("{} {} ", target, symbol));
            push_value(qb, scalar_value(column, value)?, column.kind);
        }
        FilterOp::In => {}
    }
    Ok(())
}

/// Appends ` WHERE (a) AND (b)` for every non-empty filter.
pub fn push_where(
    qb: &mut Builder,
    schema: &'static EntitySchema,
    filters: &[Option<&Filter>],
) -> Result<(), ApiError> {
    let filters: Vec<&Filter> = filters
        .iter()
        .flatten()
        .copied()
        .filter(|f| !f.is_empty())
        .collect();
    for (i, filter) in filters.iter().enumerate() {
        qb.push(if i == 0 { " WHERE (" } else { " AND (" });
        push_filter(qb, schema, 0, filter)?;
        qb.push(")");
    }
    Ok(())
}

fn push_order_by(
    qb: &mut Builder,
    schema: &'static EntitySchema,
    order_by: &[SortField],
) -> Result<(), ApiError> {
    if order_by.is_empty() {
        return Ok(());
    }
    let mut clauses = Vec::with_capacity(order_by.len() + 1);
    for sort in order_by {
        let column = schema
            .column(&sort.field)
            .ok_or_else(|| unknown_field(schema, &sort.field))?;
        clauses.push(format!("t0.{} {}", quote(column.column), sort.direction.as_sql()));
    }
    if !order_by
        .iter()
        .any(|s| schema.column(&s.field).is_some_and(|c| c.column == "id"))
    {
        clauses.push("t0.\"id\" ASC".to_string());
    }
    qb.push(" ORDER BY ");
    qb.push(clauses.join(", "));
    Ok(())
}

// ============================================================================
// Statements
// ============================================================================

/// `SELECT <doc> FROM table` with the scope and the caller's arguments.
pub fn select_docs(
    schema: &'static EntitySchema,
    scope: Option<&Filter>,
    args: &FindArgs,
) -> Result<Builder, ApiError> {
    let projection = projection(
        schema,
        0,
        args.select.as_ref(),
        args.include.as_ref(),
        args.public,
    )?;
    let mut qb = Builder::new(format!(
        "SELECT {} AS doc FROM {} AS t0",
        projection,
        quote(schema.table)
    ));
    push_where(&mut qb, schema, &[scope, args.filter.as_ref()])?;
    push_order_by(&mut qb, schema, &args.order_by)?;
    if let Some(take) = args.take {
        qb.push(" LIMIT ");
        qb.push_bind(take as i64);
    }
    if let Some(skip) = args.skip {
        qb.push(" OFFSET ");
        qb.push_bind(skip as i64);
    }
    Ok(qb)
}

pub fn count(schema: &'static EntitySchema, filters: &[Option<&Filter>]) -> Result<Builder, ApiError> {
    let mut qb = Builder::new(format!("SELECT COUNT(*) FROM {} AS t0", quote(schema.table)));
    push_where(&mut qb, schema, filters)?;
    Ok(qb)
}

/// Payload fields to write. `null` values are skipped, so absent and null
/// fields both leave the column untouched.
pub fn assignments(
    schema: &'static EntitySchema,
    data: &Map<String, Value>,
) -> Result<Vec<(&'static Column, BindValue)>, ApiError> {
    for (field, value) in data {
        let column = schema.column(field).ok_or_else(|| unknown_field(schema, field))?;
        if !column.writable && !value.is_null() {
            return Err(ApiError::bad_request(format!("'{}' cannot be set", column.field))
                .field(column.field));
        }
    }

    // Schema order keeps the generated SQL stable.
    let mut out = Vec::new();
    for column in schema.columns.iter().filter(|c| c.writable) {
        let value = data.get(column.field).or_else(|| data.get(column.column));
        match value {
            Some(v) if !v.is_null() => out.push((column, json_value(column, v)?)),
            _ => {}
        }
    }
    Ok(out)
}

pub fn insert(schema: &'static EntitySchema, data: &Map<String, Value>) -> Result<Builder, ApiError> {
    let values = assignments(schema, data)?;
    let mut qb = Builder::new(format!("WITH written AS (INSERT INTO {}", quote(schema.table)));
    if values.is_empty() {
        qb.push(" DEFAULT VALUES");
    } else {
        let columns: Vec<String> = values.iter().map(|(c, _)| quote(c.column)).collect();
        qb.push(format!(" ({}) VALUES (", columns.join(", ")));
        for (i, (column, value)) in values.into_iter().enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            push_value(&mut qb, value, column.kind);
        }
        qb.push(")");
    }
    qb.push(format!(
        " RETURNING *) SELECT {} AS doc FROM written AS t0",
        projection(schema, 0, None, None, false)?
    ));
    Ok(qb)
}

pub fn update(
    schema: &'static EntitySchema,
    id: i64,
    data: &Map<String, Value>,
) -> Result<Builder, ApiError> {
    let values = assignments(schema, data)?;
    let mut qb = Builder::new(format!("WITH written AS (UPDATE {} SET ", quote(schema.table)));
    let mut first = true;
    for (column, value) in values {
        if !first {
            qb.push(", ");
        }
        first = false;
        qb.push(format!("{} = ", quote(column.column)));
        push_value(&mut qb, value, column.kind);
    }
    if schema.has_column("updatedAt") {
        if !first {
            qb.push(", ");
        }
        first = false;
        qb.push("\"updated_at\" = now()");
    }
    if first {
        qb.push("\"id\" = \"id\"");
    }
    qb.push(" WHERE \"id\" = ");
    qb.push_bind(id);
    qb.push(format!(
        " RETURNING *) SELECT {} AS doc FROM written AS t0",
        projection(schema, 0, None, None, false)?
    ));
    Ok(qb)
}

pub fn delete(schema: &'static EntitySchema, id: i64) -> Builder {
    let mut qb = Builder::new(format!("DELETE FROM {} WHERE \"id\" = ", quote(schema.table)));
    qb.push_bind(id);
    qb
}

/// Locks the row for the rest of the transaction.
pub fn lock_row(schema: &'static EntitySchema, id: i64) -> Builder {
    let mut qb = Builder::new(format!("SELECT \"id\" FROM {} WHERE \"id\" = ", quote(schema.table)));
    qb.push_bind(id);
    qb.push(" FOR UPDATE");
    qb
}
