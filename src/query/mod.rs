/**
 * Query options
 *
 * Turns raw list-query parameters into typed options and expands them into
 * the arguments the repository understands.
 */
pub mod fields;
pub mod filter;
pub mod pagination;
pub mod sort;
pub mod validate;

use std::collections::HashMap;

use crate::error::{ApiError, ErrorDetail};

pub use fields::{FieldTree, Node};
pub use filter::{Condition, Filter, FilterOp, Operand, Scalar};
pub use pagination::{Pagination, MAX_LIMIT};
pub use sort::{SortDirection, SortField};

#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    pub filter: Option<Filter>,
    pub pagination: Option<Pagination>,
    pub sort: Option<Vec<SortField>>,
    pub select: Option<FieldTree>,
    pub include: Option<FieldTree>,
    /// When false, lists come back without pagination metadata (and without
    /// pagination).
    pub meta: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            filter: None,
            pagination: None,
            sort: None,
            select: None,
            include: None,
            meta: true,
        }
    }
}

/// Arguments for one repository read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindArgs {
    pub skip: Option<u64>,
    pub take: Option<u64>,
    pub filter: Option<Filter>,
    pub order_by: Vec<SortField>,
    pub select: Option<FieldTree>,
    pub include: Option<FieldTree>,
    /// Anonymous read: included relations are limited to active rows and
    /// admin-only columns are left out.
    pub public: bool,
}

/// Constraints a service always applies, whatever the caller asked for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scope {
    pub filter: Filter,
    pub order_by: Vec<SortField>,
    pub public: bool,
}

impl Scope {
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            order_by: Vec::new(),
            public: false,
        }
    }

    pub fn ordered(mut self, order_by: Vec<SortField>) -> Self {
        self.order_by = order_by;
        self
    }

    pub fn public(mut self) -> Self {
        self.public = true;
        self
    }
}

impl QueryOptions {
    /// Runs every query-string parser. Never fails: unparseable parameters are
    /// simply absent from the result.
    pub fn process(params: &HashMap<String, String>) -> Self {
        let get = |key: &str| params.get(key).map(String::as_str);

        let pagination = if get("page").is_some() || get("limit").is_some() {
            Some(pagination::parse_pagination(get("page"), get("limit")))
        } else {
            None
        };

        let meta = !matches!(get("meta").map(str::trim), Some("false") | Some("0"));

        Self {
            filter: get("filter").and_then(filter::parse_filter),
            pagination,
            sort: get("sort").and_then(sort::parse_sort),
            select: get("fields").and_then(fields::parse_fields),
            include: get("nested")
                .or_else(|| get("include"))
                .and_then(fields::parse_nested),
            meta,
        }
    }

    /// Re-checks the typed descriptors, reporting each offending one.
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = Vec::new();
        if let Some(p) = &self.pagination {
            if p.page < 1 {
                errors.push(ErrorDetail::new(Some("page".into()), "must be at least 1"));
            }
            if p.limit < 1 || p.limit > MAX_LIMIT {
                errors.push(ErrorDetail::new(
                    Some("limit".into()),
                    format!("must be between 1 and {}", MAX_LIMIT),
                ));
            }
        }
        if let Some(sort) = &self.sort {
            if sort.is_empty() || sort.iter().any(|s| s.field.is_empty()) {
                errors.push(ErrorDetail::new(
                    Some("sort".into()),
                    "field names cannot be empty",
                ));
            }
        }
        for (name, tree) in [("select", &self.select), ("include", &self.include)] {
            if tree.as_ref().is_some_and(has_empty_branch) {
                errors.push(ErrorDetail::new(
                    Some(name.into()),
                    "nested selections cannot be empty",
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation(errors))
        }
    }

    /// Expands into repository arguments. Unique fetches and `meta=false`
    /// lists keep only `include`.
    pub fn find_args(&self, unique: bool) -> FindArgs {
        if unique || !self.meta {
            return FindArgs {
                include: self.include.clone().filter(|t| !t.is_empty()),
                ..FindArgs::default()
            };
        }

        let pagination = self.pagination.unwrap_or_default();
        FindArgs {
            skip: Some(pagination.skip()),
            take: Some(pagination.take()),
            filter: self.filter.clone().filter(|f| !f.is_empty()),
            order_by: self
                .sort
                .clone()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| vec![SortField::desc("id")]),
            select: self.select.clone().filter(|t| !t.is_empty()),
            include: self.include.clone().filter(|t| !t.is_empty()),
            public: false,
        }
    }

    pub fn page(&self) -> Pagination {
        self.pagination.unwrap_or_default()
    }
}

fn has_empty_branch(tree: &FieldTree) -> bool {
    tree.is_empty()
        || tree.iter().any(|(_, node)| match node {
            Node::All => false,
            Node::Nested(inner) => has_empty_branch(inner),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_process_runs_every_parser() {
        let options = QueryOptions::process(&params(&[
            ("filter", "[status=active]"),
            ("page", "2"),
            ("limit", "5"),
            ("sort", "title:desc"),
            ("fields", "title"),
            ("nested", "[category]"),
        ]));
        assert!(options.filter.is_some());
        assert_eq!(options.pagination, Some(Pagination { page: 2, limit: 5 }));
        assert_eq!(options.sort, Some(vec![SortField::desc("title")]));
        assert!(options.select.is_some());
        assert!(options.include.is_some());
        assert!(options.meta);
    }

    #[test]
    fn test_meta_false_and_zero() {
        assert!(!QueryOptions::process(&params(&[("meta", "false")])).meta);
        assert!(!QueryOptions::process(&params(&[("meta", "0")])).meta);
        assert!(QueryOptions::process(&params(&[("meta", "yes")])).meta);
        assert!(QueryOptions::process(&params(&[])).meta);
    }

    #[test]
    fn test_find_args_defaults() {
        let args = QueryOptions::default().find_args(false);
        assert_eq!(args.skip, Some(0));
        assert_eq!(args.take, Some(10));
        assert_eq!(args.order_by, vec![SortField::desc("id")]);
        assert!(args.filter.is_none());
        assert!(args.select.is_none());
    }

    #[test]
    fn test_find_args_paginates() {
        let options = QueryOptions::process(&params(&[("page", "3"), ("limit", "20")]));
        let args = options.find_args(false);
        assert_eq!(args.skip, Some(40));
        assert_eq!(args.take, Some(20));
    }

    #[test]
    fn test_unique_and_meta_false_keep_only_include() {
        let options = QueryOptions::process(&params(&[
            ("filter", "[status=active]"),
            ("sort", "title"),
            ("nested", "[category]"),
            ("meta", "false"),
        ]));
        let args = options.find_args(false);
        assert_eq!(args.skip, None);
        assert_eq!(args.take, None);
        assert!(args.filter.is_none());
        assert!(args.order_by.is_empty());
        assert!(args.include.is_some());

        let mut options = options;
        options.meta = true;
        let unique = options.find_args(true);
        assert!(unique.filter.is_none());
        assert!(unique.include.is_some());
    }

    #[test]
    fn test_validate_catches_out_of_range_typed_options() {
        let options = QueryOptions {
            pagination: Some(Pagination { page: 0, limit: 101 }),
            sort: Some(vec![]),
            include: Some(FieldTree::new()),
            ..QueryOptions::default()
        };
        let err = options.validate().unwrap_err();
        let detail = serde_json::to_value(err.details.unwrap()).unwrap();
        let fields: Vec<_> = detail
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["field"].clone())
            .collect();
        assert_eq!(
            fields,
            vec![json!("page"), json!("limit"), json!("sort"), json!("include")]
        );
    }

    #[test]
    fn test_parsed_options_always_validate() {
        let options = QueryOptions::process(&params(&[
            ("page", "-1"),
            ("limit", "9999"),
            ("sort", ",,"),
            ("fields", "a.b,a"),
        ]));
        assert!(options.validate().is_ok());
    }
}
