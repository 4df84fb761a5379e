//! Generic CRUD over any [`Entity`].
//!
//! Reads return JSON documents built by Postgres (see [`super::sql`]) so
//! `fields`/`nested` selections need no per-entity code. Writes take the
//! entity's typed payloads.

use std::marker::PhantomData;

use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::PgConnection;

use super::schema::{Entity, EntitySchema};
use super::{sql, Database};
use crate::error::{ApiError, ApiResult};
use crate::query::{Filter, QueryOptions, Scalar, Scope};

/// Pagination metadata returned next to list data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub has_more: bool,
    pub total_pages: i64,
}

impl PageMeta {
    pub fn new(total: i64, page: u32, limit: u32) -> Self {
        let limit_i = i64::from(limit.max(1));
        Self {
            total,
            page,
            limit,
            has_more: total > i64::from(page) * limit_i,
            total_pages: (total + limit_i - 1) / limit_i,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub data: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<PageMeta>,
}

pub struct Repository<E: Entity> {
    db: Database,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self::new(self.db.clone())
    }
}

impl<E: Entity> Repository<E> {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            _entity: PhantomData,
        }
    }

    pub fn schema(&self) -> &'static EntitySchema {
        E::SCHEMA
    }

    pub async fn create(&self, data: &E::Create) -> ApiResult<Value> {
        let payload = to_object(data)?;
        let mut qb = sql::insert(E::SCHEMA, &payload)?;
        let doc = qb
            .build_query_scalar::<Value>()
            .fetch_one(self.db.pool())
            .await
            .map_err(|e| write_error(E::SCHEMA, "create", e))?;
        tracing::info!("Created {} {}", E::name(), doc["id"]);
        Ok(doc)
    }

    /// Unique fetch; only `include` from `options` applies.
    pub async fn find_by_id(&self, id: i64, options: &QueryOptions) -> ApiResult<Value> {
        self.find_by_id_scoped(id, None, options).await
    }

    /// Like [`find_by_id`](Self::find_by_id) but the row must also match `scope`.
    pub async fn find_by_id_scoped(
        &self,
        id: i64,
        scope: Option<&Scope>,
        options: &QueryOptions,
    ) -> ApiResult<Value> {
        let mut args = options.find_args(true);
        if let Some(scope) = scope {
            args.filter = Some(scope.filter.clone());
            args.public = scope.public;
        }
        let by_id = Filter::new().with_eq("id", Scalar::Int(id));
        let mut qb = sql::select_docs(E::SCHEMA, Some(&by_id), &args)?;
        qb.build_query_scalar::<Value>()
            .fetch_optional(self.db.pool())
            .await
            .map_err(|e| read_error(E::SCHEMA, e))?
            .ok_or_else(|| ApiError::not_found(E::name(), id))
    }

    pub async fn find_many(&self, options: &QueryOptions) -> ApiResult<Page> {
        self.find_many_scoped(&Scope::default(), options).await
    }

    /// Lists rows matching both `scope` and the caller's filter. With `meta`
    /// the count runs concurrently with the same filter.
    pub async fn find_many_scoped(&self, scope: &Scope, options: &QueryOptions) -> ApiResult<Page> {
        let mut args = options.find_args(false);
        args.public = scope.public;
        if options.sort.is_none() && !scope.order_by.is_empty() {
            args.order_by = scope.order_by.clone();
        }
        let scope_filter = Some(&scope.filter);
        let mut data_qb = sql::select_docs(E::SCHEMA, scope_filter, &args)?;

        if !options.meta {
            let data = data_qb
                .build_query_scalar::<Value>()
                .fetch_all(self.db.pool())
                .await
                .map_err(|e| read_error(E::SCHEMA, e))?;
            return Ok(Page { data, meta: None });
        }

        let mut count_qb = sql::count(E::SCHEMA, &[scope_filter, args.filter.as_ref()])?;
        let (data, total) = tokio::try_join!(
            data_qb.build_query_scalar::<Value>().fetch_all(self.db.pool()),
            count_qb.build_query_scalar::<i64>().fetch_one(self.db.pool()),
        )
        .map_err(|e| read_error(E::SCHEMA, e))?;

        let page = options.page();
        Ok(Page {
            data,
            meta: Some(PageMeta::new(total, page.page, page.limit)),
        })
    }

    pub async fn find_first(&self, scope: &Scope, options: &QueryOptions) -> ApiResult<Option<Value>> {
        let mut args = options.find_args(false);
        args.public = scope.public;
        if options.sort.is_none() && !scope.order_by.is_empty() {
            args.order_by = scope.order_by.clone();
        }
        args.skip = Some(0);
        args.take = Some(1);
        let mut qb = sql::select_docs(E::SCHEMA, Some(&scope.filter), &args)?;
        qb.build_query_scalar::<Value>()
            .fetch_optional(self.db.pool())
            .await
            .map_err(|e| read_error(E::SCHEMA, e))
    }

    pub async fn count(&self, scope: Option<&Filter>) -> ApiResult<i64> {
        let mut qb = sql::count(E::SCHEMA, &[scope])?;
        qb.build_query_scalar::<i64>()
            .fetch_one(self.db.pool())
            .await
            .map_err(|e| read_error(E::SCHEMA, e))
    }

    /// Typed fetch of a whole record.
    pub async fn get(&self, id: i64) -> ApiResult<E> {
        let doc = self.find_by_id(id, &QueryOptions::default()).await?;
        serde_json::from_value(doc).map_err(|e| {
            tracing::error!("Failed to decode {} {}: {}", E::name(), id, e);
            ApiError::internal(format!("Failed to read {}", E::name())).reason(e.to_string())
        })
    }

    /// Locks the row, then applies the non-null payload fields.
    pub async fn update(&self, id: i64, data: &E::Update) -> ApiResult<Value> {
        let payload = to_object(data)?;
        let doc = self
            .db
            .transaction(move |conn| {
                Box::pin(async move { update_locked(E::SCHEMA, conn, id, &payload).await })
            })
            .await?;
        tracing::info!("Updated {} {}", E::name(), id);
        Ok(doc)
    }

    pub async fn delete(&self, id: i64) -> ApiResult<()> {
        let result = sql::delete(E::SCHEMA, id)
            .build()
            .execute(self.db.pool())
            .await
            .map_err(|e| delete_error(E::SCHEMA, e))?;
        if result.rows_affected() == 0 {
            return Err(ApiError::not_found(E::name(), id));
        }
        tracing::info!("Deleted {} {}", E::name(), id);
        Ok(())
    }

    pub async fn transaction<T, F>(&self, f: F) -> ApiResult<T>
    where
        T: Send,
        F: for<'c> FnOnce(&'c mut PgConnection) -> BoxFuture<'c, ApiResult<T>> + Send,
    {
        self.db.transaction(f).await
    }
}

/// Update inside an open transaction: existence check under `FOR UPDATE`,
/// then the write.
pub async fn update_locked(
    schema: &'static EntitySchema,
    conn: &mut PgConnection,
    id: i64,
    payload: &Map<String, Value>,
) -> ApiResult<Value> {
    let exists = sql::lock_row(schema, id)
        .build()
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| read_error(schema, e))?;
    if exists.is_none() {
        return Err(ApiError::not_found(schema.name, id));
    }
    let mut qb = sql::update(schema, id, payload)?;
    qb.build_query_scalar::<Value>()
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| write_error(schema, "update", e))
}

fn to_object<T: Serialize>(data: &T) -> ApiResult<Map<String, Value>> {
    match serde_json::to_value(data) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ApiError::bad_request("Request body must be a JSON object")),
        Err(e) => Err(ApiError::internal("Failed to encode payload").reason(e.to_string())),
    }
}

fn read_error(schema: &EntitySchema, err: sqlx::Error) -> ApiError {
    let mapped = ApiError::from(err);
    if mapped.status.is_server_error() {
        tracing::error!("Failed to read {}: {:?}", schema.name, mapped.details);
    }
    mapped
}

/// Unique violations become Conflict naming the fields, foreign-key
/// violations BadRequest naming the relation.
pub fn write_error(schema: &EntitySchema, action: &str, err: sqlx::Error) -> ApiError {
    let message = err.to_string();
    if let sqlx::Error::Database(db_err) = &err {
        let constraint = db_err.constraint().unwrap_or_default();
        if db_err.is_unique_violation() {
            let fields = schema.fields_for_constraint(constraint);
            return ApiError::conflict(format!(
                "{} with the same {} already exists",
                schema.name, fields
            ))
            .field(fields)
            .reason(db_err.message().to_string());
        }
        if db_err.is_foreign_key_violation() {
            let relation = schema.fields_for_constraint(constraint);
            return ApiError::bad_request(format!("Related {} not found", relation))
                .field(relation)
                .reason(db_err.message().to_string());
        }
    }

    let mapped = ApiError::from(err);
    if mapped.status.is_client_error() {
        return mapped;
    }
    tracing::error!("Failed to {} {}: {}", action, schema.name, message);
    ApiError::internal(format!("Failed to {} {}", action, schema.name)).reason(message)
}

fn delete_error(schema: &EntitySchema, err: sqlx::Error) -> ApiError {
    if let sqlx::Error::Database(db_err) = &err {
        let restrict = db_err.code().is_some_and(|c| c == "23001");
        if db_err.is_foreign_key_violation() || restrict {
            return ApiError::conflict(format!(
                "Cannot delete {}: related records exist",
                schema.name
            ))
            .reason(db_err.message().to_string())
            .suggestion("Delete or reassign the related records first");
        }
    }
    write_error(schema, "delete", err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Skill;

    #[test]
    fn test_page_meta_has_more() {
        let meta = PageMeta::new(25, 1, 10);
        assert!(meta.has_more);
        assert_eq!(meta.total_pages, 3);

        let meta = PageMeta::new(25, 3, 10);
        assert!(!meta.has_more);

        let meta = PageMeta::new(20, 2, 10);
        assert!(!meta.has_more);
        assert_eq!(meta.total_pages, 2);
    }

    #[test]
    fn test_page_meta_serializes_camel_case() {
        let json = serde_json::to_value(PageMeta::new(0, 1, 10)).unwrap();
        assert_eq!(json["hasMore"], false);
        assert_eq!(json["totalPages"], 0);
    }

    #[test]
    fn test_page_without_meta_omits_key() {
        let page = Page {
            data: vec![],
            meta: None,
        };
        let json = serde_json::to_value(page).unwrap();
        assert!(json.get("meta").is_none());
        assert_eq!(json["data"], serde_json::json!([]));
    }

    #[test]
    fn test_non_database_write_error_is_internal() {
        let err = write_error(
            &crate::db::models::SKILL,
            "create",
            sqlx::Error::PoolTimedOut,
        );
        assert_eq!(err.status, axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "Failed to create Skill");
    }

    #[tokio::test]
    async fn test_lazy_repository_reports_schema() {
        let db = Database::connect_lazy("postgres://localhost/unused").unwrap();
        let repo: Repository<Skill> = Repository::new(db);
        assert_eq!(repo.schema().table, "skills");
    }
}
