/**
 * Content Routes
 * One generic set of CRUD handlers mounted once per content type
 */
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use super::auth::Viewer;
use super::middleware::{json_rejection, ApiQuery, ValidatedJson};
use super::SuccessResponse;
use crate::db::models::Lang;
use crate::db::Page;
use crate::error::{ApiError, ApiResult, ErrorDetail};
use crate::query::validate::options_from_json;
use crate::services::{ContentEntity, ContentService, ListParams, Listing};
use crate::state::AppState;

// ============================================================================
// Request Types
// ============================================================================

/// Query parameters that select a specialised listing.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub lang: Option<String>,
    pub featured: Option<String>,
    pub category: Option<String>,
    pub primary: Option<String>,
}

fn flag(raw: &Option<String>) -> bool {
    raw.as_deref()
        .map(str::trim)
        .is_some_and(|v| v.eq_ignore_ascii_case("true") || v == "1")
}

impl ListQuery {
    pub fn params(&self) -> ApiResult<ListParams> {
        let mut errors = Vec::new();

        let lang = match self.lang.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
            Some(raw) => match raw.parse::<Lang>() {
                Ok(lang) => Some(lang),
                Err(reason) => {
                    errors.push(ErrorDetail::new(Some("lang".into()), reason));
                    None
                }
            },
            None => None,
        };

        let category = match self.category.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            Some(raw) => match raw.parse::<i64>() {
                Ok(id) if id > 0 => Some(id),
                _ => {
                    errors.push(ErrorDetail::new(
                        Some("category".into()),
                        format!("'{}' is not a valid category id", raw),
                    ));
                    None
                }
            },
            None => None,
        };

        if !errors.is_empty() {
            return Err(ApiError::validation(errors));
        }

        Ok(ListParams {
            lang,
            featured: flag(&self.featured),
            category,
            primary: flag(&self.primary),
        })
    }
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct ReorderRequest {
    #[validate(length(min = 1, message = "must contain at least one id"))]
    pub ids: Vec<i64>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/<resource>
pub async fn list<E: ContentEntity>(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(query): Query<ListQuery>,
    ApiQuery(options): ApiQuery,
) -> ApiResult<Json<Listing>> {
    let params = query.params()?;
    let listing = ContentService::<E>::new(state.db.clone())
        .list_for(&params, &options, viewer.is_admin())
        .await?;
    Ok(Json(listing))
}

/// POST /api/<resource>/query
pub async fn query<E: ContentEntity>(
    State(state): State<AppState>,
    viewer: Viewer,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Page>> {
    let Json(doc) = body.map_err(json_rejection)?;
    let options = options_from_json(&doc)?;
    let page = ContentService::<E>::new(state.db.clone())
        .list(&options, viewer.is_admin())
        .await?;
    Ok(Json(page))
}

/// POST /api/<resource>
pub async fn create<E: ContentEntity>(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<E::Create>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let doc = ContentService::<E>::new(state.db.clone())
        .create(&payload)
        .await?;
    tracing::info!("Created {}", E::name());
    Ok((StatusCode::CREATED, Json(doc)))
}

/// GET /api/<resource>/{id}
pub async fn get_one<E: ContentEntity>(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
    ApiQuery(options): ApiQuery,
) -> ApiResult<Json<Value>> {
    let doc = ContentService::<E>::new(state.db.clone())
        .find_by_id(id, &options, viewer.is_admin())
        .await?;
    Ok(Json(doc))
}

/// PUT /api/<resource>/{id}
pub async fn update<E: ContentEntity>(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ValidatedJson(payload): ValidatedJson<E::Update>,
) -> ApiResult<Json<Value>> {
    let doc = ContentService::<E>::new(state.db.clone())
        .update_by_id(id, &payload)
        .await?;
    tracing::info!("Updated {} {}", E::name(), id);
    Ok(Json(doc))
}

/// DELETE /api/<resource>/{id}
pub async fn remove<E: ContentEntity>(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<SuccessResponse>> {
    ContentService::<E>::new(state.db.clone())
        .delete_by_id(id)
        .await?;
    tracing::info!("Deleted {} {}", E::name(), id);
    Ok(Json(SuccessResponse { success: true }))
}

/// PUT /api/<resource>/reorder
pub async fn reorder<E: ContentEntity>(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<ReorderRequest>,
) -> ApiResult<Json<Page>> {
    let data = ContentService::<E>::new(state.db.clone())
        .reorder(payload.ids)
        .await?;
    Ok(Json(Page { data, meta: None }))
}

/// The full route set for one content type, to be nested under its path.
pub fn routes<E: ContentEntity>() -> Router<AppState> {
    Router::new()
        .route("/", get(list::<E>).post(create::<E>))
        .route("/query", post(query::<E>))
        .route("/reorder", put(reorder::<E>))
        .route(
            "/{id}",
            get(get_one::<E>).put(update::<E>).delete(remove::<E>),
        )
}
