/**
 * Dashboard Routes
 * Admin overview of how much content exists
 */
use axum::{extract::State, Json};
use chrono::Utc;
use serde::Serialize;

use crate::error::ApiResult;
use crate::services::aggregate::{self, Overview};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct OverviewResponse {
    pub success: bool,
    pub data: Overview,
    pub total: i64,
    pub timestamp: String,
}

/// GET /api/dashboard/overview
pub async fn overview(State(state): State<AppState>) -> ApiResult<Json<OverviewResponse>> {
    let data = aggregate::overview(&state.db).await?;
    Ok(Json(OverviewResponse {
        success: true,
        total: data.total(),
        data,
        timestamp: Utc::now().to_rfc3339(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::db::Database;
    use axum::body::Body;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    #[test]
    fn test_overview_response_is_camel_case() {
        let response = OverviewResponse {
            success: true,
            data: Overview {
                skill_categories: 2,
                ..Overview::default()
            },
            total: 2,
            timestamp: Utc::now().to_rfc3339(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["data"]["skillCategories"], 2);
        assert_eq!(json["data"]["socialLinks"], 0);
        assert_eq!(json["total"], 2);
    }

    #[tokio::test]
    async fn test_overview_fails_as_a_whole_when_store_is_down() {
        let db = Database::connect_lazy("postgres://postgres@127.0.0.1:1/none").unwrap();
        let app = Router::new()
            .route("/api/dashboard/overview", get(overview))
            .with_state(AppState::new(db, AppConfig::default()));
        let req = axum::http::Request::get("/api/dashboard/overview")
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
