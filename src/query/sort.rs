use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// One `orderBy` entry; serializes as `{ "<field>": "asc" | "desc" }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortField {
    pub field: String,
    pub direction: SortDirection,
}

impl SortField {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Asc)
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Desc)
    }
}

impl Serialize for SortField {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.field, &self.direction)?;
        map.end()
    }
}

/// `sort=title:desc,order` -> `[{title: desc}, {order: asc}]`, first entry
/// is the primary key.
pub fn parse_sort(raw: &str) -> Option<Vec<SortField>> {
    let fields: Vec<SortField> = raw
        .split(',')
        .filter_map(|part| {
            let (field, direction) = match part.split_once(':') {
                Some((f, d)) => (f.trim(), d.trim()),
                None => (part.trim(), ""),
            };
            if field.is_empty() {
                return None;
            }
            let direction = if direction.eq_ignore_ascii_case("desc") {
                SortDirection::Desc
            } else {
                SortDirection::Asc
            };
            Some(SortField::new(field, direction))
        })
        .collect();

    if fields.is_empty() {
        None
    } else {
        Some(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_preserves_declared_order() {
        let sort = parse_sort("title:desc,order:asc").unwrap();
        assert_eq!(
            serde_json::to_value(&sort).unwrap(),
            json!([{ "title": "desc" }, { "order": "asc" }])
        );
    }

    #[test]
    fn test_direction_defaults_to_asc() {
        let sort = parse_sort("order,title:sideways").unwrap();
        assert_eq!(sort[0], SortField::asc("order"));
        assert_eq!(sort[1], SortField::asc("title"));
    }

    #[test]
    fn test_desc_is_case_insensitive() {
        assert_eq!(parse_sort("title:DESC").unwrap()[0], SortField::desc("title"));
        assert_eq!(parse_sort("title:Desc").unwrap()[0], SortField::desc("title"));
    }

    #[test]
    fn test_empty_entries_are_ignored() {
        assert_eq!(parse_sort(",,:desc, ").map(|s| s.len()), None);
        assert_eq!(parse_sort("a,,b").unwrap().len(), 2);
    }
}
