//! Content service: the generic repository plus the rules every content
//! type shares (visibility, language, ordering, uniqueness per language).

use std::collections::HashSet;
use std::future::Future;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::db::models::{
    AboutCard, Achievement, ContactInfo, HeroContent, Lang, PersonalInfo, Project, Skill,
    SkillCategory, SocialLink,
};
use crate::db::repository::update_locked;
use crate::db::{Database, Entity, Page, Repository};
use crate::error::{ApiError, ApiResult, ErrorDetail};
use crate::query::{Filter, QueryOptions, Scalar, Scope, SortField};

/// Specialised list parameters that bypass the generic query pipeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListParams {
    pub lang: Option<Lang>,
    pub featured: bool,
    pub category: Option<i64>,
    pub primary: bool,
}

/// What a list endpoint returns: a page, or one record for singletons.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Listing {
    Many(Page),
    One(Value),
}

pub struct ContentService<E: Entity> {
    repo: Repository<E>,
}

impl<E: Entity> Clone for ContentService<E> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
        }
    }
}

pub fn active() -> Filter {
    Filter::new().with_eq("isActive", Scalar::Bool(true))
}

pub fn active_in(lang: Lang) -> Filter {
    active().with_eq("lang", Scalar::Text(lang.as_str().to_string()))
}

fn by_order() -> Vec<SortField> {
    vec![SortField::asc("order")]
}

fn json_scalar(value: &Value) -> Option<Scalar> {
    match value {
        Value::String(s) => Some(Scalar::Text(s.clone())),
        Value::Bool(b) => Some(Scalar::Bool(*b)),
        Value::Number(n) => n.as_i64().map(Scalar::Int),
        _ => None,
    }
}

impl<E: Entity> ContentService<E> {
    pub fn new(db: Database) -> Self {
        Self {
            repo: Repository::new(db),
        }
    }

    pub fn repo(&self) -> &Repository<E> {
        &self.repo
    }

    /// Active records in `lang`, in display order.
    pub async fn find_by_language(&self, lang: Lang, options: &QueryOptions) -> ApiResult<Page> {
        let scope = Scope::new(active_in(lang)).ordered(by_order()).public();
        self.repo.find_many_scoped(&scope, options).await
    }

    /// For content that exists once per language.
    pub async fn find_first_by_language(
        &self,
        lang: Lang,
        options: &QueryOptions,
    ) -> ApiResult<Option<Value>> {
        let scope = Scope::new(active_in(lang)).ordered(by_order()).public();
        self.repo.find_first(&scope, options).await
    }

    pub async fn find_visible_by_id(&self, id: i64, options: &QueryOptions) -> ApiResult<Value> {
        self.repo
            .find_by_id_scoped(id, Some(&Scope::new(active()).public()), options)
            .await
    }

    /// Generic list. Anonymous callers only see active records.
    pub async fn list(&self, options: &QueryOptions, include_inactive: bool) -> ApiResult<Page> {
        if include_inactive {
            self.repo.find_many(options).await
        } else {
            self.repo
                .find_many_scoped(&Scope::new(active()).public(), options)
                .await
        }
    }

    pub async fn find_by_id(
        &self,
        id: i64,
        options: &QueryOptions,
        include_inactive: bool,
    ) -> ApiResult<Value> {
        if include_inactive {
            self.repo.find_by_id(id, options).await
        } else {
            self.find_visible_by_id(id, options).await
        }
    }

    /// Creates after checking the schema's unique keys, so the conflict can
    /// name the clashing values.
    pub async fn create(&self, data: &E::Create) -> ApiResult<Value> {
        let payload = match serde_json::to_value(data) {
            Ok(Value::Object(map)) => map,
            _ => return Err(ApiError::bad_request("Request body must be a JSON object")),
        };
        self.check_unique(&payload).await?;
        self.repo.create(data).await
    }

    async fn check_unique(&self, payload: &Map<String, Value>) -> ApiResult<()> {
        for key in E::SCHEMA.unique {
            let mut filter = Filter::new();
            let mut complete = true;
            for field in key.fields {
                match payload.get(*field).and_then(json_scalar) {
                    Some(value) => filter = filter.with_eq(field, value),
                    None => complete = false,
                }
            }
            if !complete {
                continue;
            }
            if self.repo.count(Some(&filter)).await? > 0 {
                return Err(ApiError::conflict(conflict_message(E::name(), key.fields, payload))
                    .field(key.fields.join(", ")));
            }
        }
        Ok(())
    }

    pub async fn update_by_id(&self, id: i64, data: &E::Update) -> ApiResult<Value> {
        self.repo.update(id, data).await
    }

    pub async fn delete_by_id(&self, id: i64) -> ApiResult<()> {
        self.repo.delete(id).await
    }

    /// Sets `order` to each id's position in `ids`, all or nothing.
    pub async fn reorder(&self, ids: Vec<i64>) -> ApiResult<Vec<Value>> {
        if ids.is_empty() {
            return Err(ApiError::validation(vec![ErrorDetail::new(
                Some("ids".into()),
                "must contain at least one id",
            )]));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = ids.iter().find(|id| !seen.insert(**id)) {
            return Err(ApiError::validation(vec![ErrorDetail::new(
                Some("ids".into()),
                format!("id {} appears more than once", dup),
            )]));
        }

        let count = ids.len();
        let docs = self
            .repo
            .transaction(move |conn| {
                Box::pin(async move {
                    let mut docs = Vec::with_capacity(ids.len());
                    for (position, id) in ids.into_iter().enumerate() {
                        let mut payload = Map::new();
                        payload.insert("order".to_string(), Value::from(position as i64));
                        docs.push(update_locked(E::SCHEMA, &mut *conn, id, &payload).await?);
                    }
                    Ok(docs)
                })
            })
            .await?;
        tracing::info!("Reordered {} {} records", count, E::name());
        Ok(docs)
    }
}

fn conflict_message(name: &str, fields: &[&str], payload: &Map<String, Value>) -> String {
    let lang = payload
        .get("lang")
        .and_then(Value::as_str)
        .unwrap_or("this language");
    let described: Vec<String> = fields
        .iter()
        .filter(|f| **f != "lang")
        .map(|f| {
            let value = match payload.get(*f) {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => String::new(),
            };
            format!("{} '{}'", f, value)
        })
        .collect();
    if described.is_empty() {
        format!("{} already exists for language {}", name, lang)
    } else {
        format!(
            "{} with {} already exists for language {}",
            name,
            described.join(" and "),
            lang
        )
    }
}

// ============================================================================
// Per-entity list behaviour
// ============================================================================

/// Content types exposed through the generic routes.
pub trait ContentEntity: Entity + Sized {
    /// One record per language (personal info, hero).
    const SINGLETON: bool = false;

    /// Handles `featured`, `category` and `primary` for the types that
    /// support them. `None` falls through to the generic listing.
    fn list_special(
        _service: &ContentService<Self>,
        _params: &ListParams,
        _options: &QueryOptions,
    ) -> impl Future<Output = ApiResult<Option<Listing>>> + Send {
        async { Ok(None) }
    }
}

impl<E: ContentEntity> ContentService<E> {
    /// Dispatches a public list request: specialised lookups first, then
    /// by-language, then the generic query pipeline.
    pub async fn list_for(
        &self,
        params: &ListParams,
        options: &QueryOptions,
        include_inactive: bool,
    ) -> ApiResult<Listing> {
        if let Some(listing) = E::list_special(self, params, options).await? {
            return Ok(listing);
        }
        match params.lang {
            Some(lang) if E::SINGLETON => self
                .find_first_by_language(lang, options)
                .await?
                .map(Listing::One)
                .ok_or_else(|| {
                    ApiError::new(
                        axum::http::StatusCode::NOT_FOUND,
                        "NOT_FOUND",
                        format!("{} for language {} not found", E::name(), lang),
                    )
                    .field("lang")
                }),
            Some(lang) => self.find_by_language(lang, options).await.map(Listing::Many),
            None => self.list(options, include_inactive).await.map(Listing::Many),
        }
    }
}

impl ContentService<Project> {
    pub async fn find_featured_by_language(
        &self,
        lang: Lang,
        options: &QueryOptions,
    ) -> ApiResult<Page> {
        let filter = active_in(lang).with_eq("isFeatured", Scalar::Bool(true));
        let scope = Scope::new(filter).ordered(by_order()).public();
        self.repo.find_many_scoped(&scope, options).await
    }
}

impl ContentService<ContactInfo> {
    pub async fn find_primary_by_language(
        &self,
        lang: Lang,
        options: &QueryOptions,
    ) -> ApiResult<Option<Value>> {
        let filter = active_in(lang).with_eq("isPrimary", Scalar::Bool(true));
        let scope = Scope::new(filter).ordered(by_order()).public();
        self.repo.find_first(&scope, options).await
    }
}

impl ContentService<Skill> {
    pub async fn find_by_category(
        &self,
        category_id: i64,
        lang: Option<Lang>,
        options: &QueryOptions,
    ) -> ApiResult<Page> {
        let base = match lang {
            Some(lang) => active_in(lang),
            None => active(),
        };
        let scope = Scope::new(base.with_eq("categoryId", Scalar::Int(category_id)))
            .ordered(by_order())
            .public();
        self.repo.find_many_scoped(&scope, options).await
    }
}

impl ContentEntity for PersonalInfo {
    const SINGLETON: bool = true;
}

impl ContentEntity for HeroContent {
    const SINGLETON: bool = true;
}

impl ContentEntity for AboutCard {}

impl ContentEntity for SkillCategory {}

impl ContentEntity for Achievement {}

impl ContentEntity for SocialLink {}

impl ContentEntity for Project {
    async fn list_special(
        service: &ContentService<Self>,
        params: &ListParams,
        options: &QueryOptions,
    ) -> ApiResult<Option<Listing>> {
        match (params.featured, params.lang) {
            (true, Some(lang)) => service
                .find_featured_by_language(lang, options)
                .await
                .map(|page| Some(Listing::Many(page))),
            (true, None) => Err(ApiError::bad_request("featured requires lang").field("lang")),
            _ => Ok(None),
        }
    }
}

impl ContentEntity for ContactInfo {
    async fn list_special(
        service: &ContentService<Self>,
        params: &ListParams,
        options: &QueryOptions,
    ) -> ApiResult<Option<Listing>> {
        match (params.primary, params.lang) {
            (true, Some(lang)) => {
                let doc = service.find_primary_by_language(lang, options).await?;
                Ok(Some(Listing::One(doc.unwrap_or(Value::Null))))
            }
            (true, None) => Err(ApiError::bad_request("primary requires lang").field("lang")),
            _ => Ok(None),
        }
    }
}

impl ContentEntity for Skill {
    async fn list_special(
        service: &ContentService<Self>,
        params: &ListParams,
        options: &QueryOptions,
    ) -> ApiResult<Option<Listing>> {
        match params.category {
            Some(category) => service
                .find_by_category(category, params.lang, options)
                .await
                .map(|page| Some(Listing::Many(page))),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_conflict_message_names_values_and_language() {
        let payload = object(json!({ "lang": "EN", "type": "email", "value": "a@b.c" }));
        assert_eq!(
            conflict_message("ContactInfo", &["type", "lang"], &payload),
            "ContactInfo with type 'email' already exists for language EN"
        );
    }

    #[test]
    fn test_conflict_message_for_language_only_key() {
        let payload = object(json!({ "lang": "AR", "name": "x" }));
        assert_eq!(
            conflict_message("PersonalInfo", &["lang"], &payload),
            "PersonalInfo already exists for language AR"
        );
    }

    #[test]
    fn test_active_in_builds_language_scope() {
        let filter = serde_json::to_value(active_in(Lang::Ar)).unwrap();
        assert_eq!(filter, json!({ "isActive": true, "lang": "AR" }));
    }

    #[tokio::test]
    async fn test_reorder_rejects_empty_and_duplicate_ids() {
        let db = Database::connect_lazy("postgres://postgres@127.0.0.1:1/none").unwrap();
        let service: ContentService<Skill> = ContentService::new(db);

        let err = service.reorder(vec![]).await.unwrap_err();
        assert_eq!(err.code, "VALIDATION_ERROR");

        let err = service.reorder(vec![3, 1, 3]).await.unwrap_err();
        assert_eq!(err.code, "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_featured_without_language_is_bad_request() {
        let db = Database::connect_lazy("postgres://postgres@127.0.0.1:1/none").unwrap();
        let service: ContentService<Project> = ContentService::new(db);
        let params = ListParams {
            featured: true,
            ..ListParams::default()
        };
        let err = service
            .list_for(&params, &QueryOptions::default(), false)
            .await
            .unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::BAD_REQUEST);
    }
}
