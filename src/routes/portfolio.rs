/**
 * Portfolio Routes
 * Everything the public site renders for one language, in one request
 */
use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::db::models::Lang;
use crate::error::{ApiError, ApiResult, ErrorDetail};
use crate::services::aggregate::{self, PortfolioData};
use crate::state::AppState;

/// Query parameters for GET /api/portfolio
#[derive(Debug, Default, Deserialize)]
pub struct PortfolioQuery {
    pub lang: Option<String>,
}

impl PortfolioQuery {
    /// Defaults to English when absent.
    pub fn language(&self) -> ApiResult<Lang> {
        match self.lang.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
            None => Ok(Lang::En),
            Some(raw) => raw.parse().map_err(|reason: String| {
                ApiError::validation(vec![ErrorDetail::new(Some("lang".into()), reason)])
            }),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PortfolioResponse {
    pub success: bool,
    pub data: PortfolioData,
    pub language: Lang,
    pub timestamp: String,
}

/// GET /api/portfolio
pub async fn get_portfolio(
    State(state): State<AppState>,
    Query(query): Query<PortfolioQuery>,
) -> ApiResult<Json<PortfolioResponse>> {
    let language = query.language()?;
    let data = aggregate::portfolio(&state.db, language).await.map_err(|e| {
        tracing::error!("Failed to load portfolio for {}: {}", language, e);
        e
    })?;

    Ok(Json(PortfolioResponse {
        success: true,
        data,
        language,
        timestamp: Utc::now().to_rfc3339(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_defaults_to_english() {
        assert_eq!(PortfolioQuery::default().language().unwrap(), Lang::En);
        let blank = PortfolioQuery {
            lang: Some("  ".into()),
        };
        assert_eq!(blank.language().unwrap(), Lang::En);
    }

    #[test]
    fn test_language_is_case_insensitive() {
        let query = PortfolioQuery {
            lang: Some("ar".into()),
        };
        assert_eq!(query.language().unwrap(), Lang::Ar);
    }

    #[test]
    fn test_unknown_language_is_a_validation_error() {
        let query = PortfolioQuery {
            lang: Some("de".into()),
        };
        let err = query.language().unwrap_err();
        assert_eq!(err.code, "VALIDATION_ERROR");
    }

    #[test]
    fn test_response_shape() {
        let response = PortfolioResponse {
            success: true,
            data: PortfolioData {
                personal_info: None,
                hero: None,
                about_cards: vec![],
                skill_categories: vec![],
                projects: vec![],
                achievements: vec![],
                contact_info: vec![],
                social_links: vec![],
            },
            language: Lang::Ar,
            timestamp: Utc::now().to_rfc3339(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["language"], "AR");
        assert!(json["data"]["skillCategories"].is_array());
        assert!(json["data"]["personalInfo"].is_null());
    }
}
