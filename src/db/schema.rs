//! Static table descriptions.
//!
//! Every entity served by the generic repository describes its table once:
//! the API field name and column of each attribute, how values bind, which
//! relations can be included and which unique keys exist. SQL generation in
//! [`super::sql`] never sees a name that is not listed here.

use serde::{de::DeserializeOwned, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Id,
    Int,
    BigInt,
    Text,
    Bool,
    /// Postgres enum `language`.
    Lang,
    Timestamp,
    TextArray,
}

impl ColumnKind {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Id | Self::Int | Self::BigInt)
    }

    pub fn is_ordered(&self) -> bool {
        matches!(
            self,
            Self::Id | Self::Int | Self::BigInt | Self::Text | Self::Lang | Self::Timestamp
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    /// camelCase name used in JSON.
    pub field: &'static str,
    /// snake_case name in the table.
    pub column: &'static str,
    pub kind: ColumnKind,
    /// Whether create/update payloads may set it.
    pub writable: bool,
    /// Whether anonymous readers get it back.
    pub public: bool,
}

impl Column {
    pub const fn new(field: &'static str, column: &'static str, kind: ColumnKind) -> Self {
        Self {
            field,
            column,
            kind,
            writable: true,
            public: true,
        }
    }

    pub const fn read_only(field: &'static str, column: &'static str, kind: ColumnKind) -> Self {
        Self {
            field,
            column,
            kind,
            writable: false,
            public: true,
        }
    }

    /// Left out of projections built for anonymous readers.
    pub const fn admin_only(self) -> Self {
        Self {
            public: false,
            ..self
        }
    }
}

pub const ID: Column = Column::read_only("id", "id", ColumnKind::Id);
pub const LANG: Column = Column::new("lang", "lang", ColumnKind::Lang);
pub const ORDER: Column = Column::new("order", "order", ColumnKind::Int);
pub const IS_ACTIVE: Column = Column::new("isActive", "is_active", ColumnKind::Bool);
pub const CREATED_AT: Column = Column::read_only("createdAt", "created_at", ColumnKind::Timestamp);
pub const UPDATED_AT: Column = Column::read_only("updatedAt", "updated_at", ColumnKind::Timestamp);

#[derive(Debug, Clone, Copy)]
pub enum Link {
    /// This table holds `column` pointing at the target's id.
    BelongsTo { column: &'static str },
    /// The target table holds `foreign_column` pointing at our id.
    HasMany { foreign_column: &'static str },
}

#[derive(Clone, Copy)]
pub struct Relation {
    pub field: &'static str,
    pub target: &'static EntitySchema,
    pub link: Link,
}

// Schemas reference each other, so only print the target's name.
impl std::fmt::Debug for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relation")
            .field("field", &self.field)
            .field("target", &self.target.name)
            .field("link", &self.link)
            .finish()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct UniqueKey {
    pub constraint: &'static str,
    /// API field names, in the order they appear in messages.
    pub fields: &'static [&'static str],
}

#[derive(Debug)]
pub struct EntitySchema {
    /// Display name used in messages (`Project with id 3 not found`).
    pub name: &'static str,
    pub table: &'static str,
    pub columns: &'static [Column],
    pub relations: &'static [Relation],
    pub unique: &'static [UniqueKey],
}

impl EntitySchema {
    /// Looks a column up by API field name, falling back to the column name.
    pub fn column(&self, name: &str) -> Option<&'static Column> {
        self.columns
            .iter()
            .find(|c| c.field == name)
            .or_else(|| self.columns.iter().find(|c| c.column == name))
    }

    pub fn relation(&self, name: &str) -> Option<&'static Relation> {
        self.relations.iter().find(|r| r.field == name)
    }

    pub fn has_column(&self, field: &str) -> bool {
        self.columns.iter().any(|c| c.field == field)
    }

    pub fn unique_key(&self, constraint: &str) -> Option<&'static UniqueKey> {
        self.unique.iter().find(|u| u.constraint == constraint)
    }

    /// The relation whose foreign key Postgres names `constraint`
    /// (`<table>_<column>_fkey` by default).
    pub fn relation_for_constraint(&self, constraint: &str) -> Option<&'static Relation> {
        self.relations.iter().find(|r| match r.link {
            Link::BelongsTo { column } => {
                constraint == format!("{}_{}_fkey", self.table, column)
            }
            Link::HasMany { foreign_column } => {
                constraint == format!("{}_{}_fkey", r.target.table, foreign_column)
            }
        })
    }

    /// Field names for a violated constraint, for error details.
    pub fn fields_for_constraint(&self, constraint: &str) -> String {
        if let Some(key) = self.unique_key(constraint) {
            return key.fields.join(", ");
        }
        if let Some(relation) = self.relation_for_constraint(constraint) {
            return relation.field.to_string();
        }
        constraint.to_string()
    }
}

/// A record type the generic repository can serve.
pub trait Entity: DeserializeOwned + Serialize + Send + Sync + Unpin + 'static {
    type Create: DeserializeOwned + Serialize + Validate + Send + Sync + 'static;
    type Update: DeserializeOwned + Serialize + Validate + Send + Sync + 'static;

    const SCHEMA: &'static EntitySchema;

    fn name() -> &'static str {
        Self::SCHEMA.name
    }
}

#[cfg(test)]
mod tests {
    use crate::db::models::{CONTACT_INFO, SKILL, SKILL_CATEGORY};

    #[test]
    fn test_column_lookup_accepts_field_or_column_name() {
        assert_eq!(SKILL.column("categoryId").map(|c| c.column), Some("category_id"));
        assert_eq!(SKILL.column("category_id").map(|c| c.field), Some("categoryId"));
        assert!(SKILL.column("nope").is_none());
    }

    #[test]
    fn test_unique_constraint_names_fields() {
        assert_eq!(
            CONTACT_INFO.fields_for_constraint("contact_infos_lang_type_key"),
            "type, lang"
        );
    }

    #[test]
    fn test_foreign_key_constraint_names_relation() {
        assert_eq!(SKILL.fields_for_constraint("skills_category_id_fkey"), "category");
        assert_eq!(
            SKILL_CATEGORY.fields_for_constraint("skills_category_id_fkey"),
            "skills"
        );
    }

    #[test]
    fn test_unknown_constraint_is_echoed() {
        assert_eq!(SKILL.fields_for_constraint("whatever"), "whatever");
    }
}
