//! Field selection trees for `fields=` and `include=`.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// The whole field or relation.
    All,
    /// Only part of a relation.
    Nested(FieldTree),
}

impl Node {
    /// `All` absorbs anything; two nested trees merge recursively.
    fn merge(self, other: Node) -> Node {
        match (self, other) {
            (Node::Nested(mut a), Node::Nested(b)) => {
                a.merge(b);
                Node::Nested(a)
            }
            _ => Node::All,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldTree(pub BTreeMap<String, Node>);

impl FieldTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&Node> {
        self.0.get(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Node)> {
        self.0.iter()
    }

    pub fn insert(&mut self, field: String, node: Node) {
        let merged = match self.0.remove(&field) {
            Some(existing) => existing.merge(node),
            None => node,
        };
        self.0.insert(field, merged);
    }

    pub fn merge(&mut self, other: FieldTree) {
        for (field, node) in other.0 {
            self.insert(field, node);
        }
    }

    fn insert_path(&mut self, path: &[&str]) {
        let Some((head, rest)) = path.split_first() else {
            return;
        };
        let node = if rest.is_empty() {
            Node::All
        } else {
            let mut nested = FieldTree::new();
            nested.insert_path(rest);
            Node::Nested(nested)
        };
        self.insert(head.to_string(), node);
    }

    /// Renders the tree in the `{ field: true, rel: { <key>: { ... } } }`
    /// shape, with `key` being `select` or `include`.
    pub fn to_value(&self, key: &str) -> Value {
        let mut map = Map::new();
        for (field, node) in &self.0 {
            let value = match node {
                Node::All => Value::Bool(true),
                Node::Nested(tree) => {
                    let mut wrapper = Map::new();
                    wrapper.insert(key.to_string(), tree.to_value(key));
                    Value::Object(wrapper)
                }
            };
            map.insert(field.clone(), value);
        }
        Value::Object(map)
    }
}

fn split_paths(raw: &str) -> impl Iterator<Item = Vec<&str>> {
    raw.split(',').filter_map(|part| {
        let part = part.trim();
        if part.is_empty() {
            return None;
        }
        let path: Vec<&str> = part.split('.').map(str::trim).collect();
        if path.iter().any(|s| s.is_empty()) {
            None
        } else {
            Some(path)
        }
    })
}

/// `fields=title,category.name` -> `{title, category{name}}`.
pub fn parse_fields(raw: &str) -> Option<FieldTree> {
    let mut tree = FieldTree::new();
    for path in split_paths(raw) {
        tree.insert_path(&path);
    }
    if tree.is_empty() {
        None
    } else {
        Some(tree)
    }
}

/// Same as [`parse_fields`] but tolerates surrounding brackets, as used by
/// `include=[category,image]`.
pub fn parse_nested(raw: &str) -> Option<FieldTree> {
    let body = raw.trim();
    let body = body.strip_prefix('[').unwrap_or(body);
    let body = body.strip_suffix(']').unwrap_or(body);
    parse_fields(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flat_fields() {
        let tree = parse_fields("title,description").unwrap();
        assert_eq!(
            tree.to_value("select"),
            json!({ "title": true, "description": true })
        );
    }

    #[test]
    fn test_dot_path_nests() {
        let tree = parse_fields("title,category.name").unwrap();
        assert_eq!(
            tree.to_value("select"),
            json!({ "title": true, "category": { "select": { "name": true } } })
        );
    }

    #[test]
    fn test_siblings_merge_under_same_parent() {
        let tree = parse_fields("category.name,category.order").unwrap();
        assert_eq!(
            tree.to_value("select"),
            json!({ "category": { "select": { "name": true, "order": true } } })
        );
    }

    #[test]
    fn test_whole_relation_wins_over_partial() {
        let a = parse_fields("category,category.name").unwrap();
        let b = parse_fields("category.name,category").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.get("category"), Some(&Node::All));
    }

    #[test]
    fn test_include_brackets_and_nesting() {
        let tree = parse_nested("[category,image.url]").unwrap();
        assert_eq!(
            tree.to_value("include"),
            json!({ "category": true, "image": { "include": { "url": true } } })
        );
    }

    #[test]
    fn test_empty_yields_none() {
        assert!(parse_fields("").is_none());
        assert!(parse_fields(" , ,").is_none());
        assert!(parse_nested("[]").is_none());
        assert!(parse_fields("a..b").is_none());
    }
}
