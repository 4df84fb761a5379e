//! HTTP round trips through the full router against a real Postgres.

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use portfolio_cms::config::AppConfig;
use portfolio_cms::create_app;
use portfolio_cms::db::models::{
    FileRecord, NewFile, NewProject, NewSkill, NewSkillCategory, Project, Skill, SkillCategory,
};
use portfolio_cms::db::{ensure_admin, Database, Repository};
use portfolio_cms::services::ContentService;
use portfolio_cms::state::AppState;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{dto, id_of, setup};

const ADMIN_EMAIL: &str = "admin@example.com";
const ADMIN_PASSWORD: &str = "correct horse battery";

fn app(db: &Database) -> Router {
    let mut config = AppConfig::default();
    config.storage.dir = std::env::temp_dir().join("portfolio-cms-api-tests");
    create_app(AppState::new(db.clone(), config))
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut req = Request::get(uri);
    if let Some(token) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    req.body(Body::empty()).unwrap()
}

fn json_req(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut req = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    req.body(Body::from(body.to_string())).unwrap()
}

async fn login(db: &Database, app: &Router) -> String {
    let hash = bcrypt::hash(ADMIN_PASSWORD, 4).unwrap();
    ensure_admin(db.pool(), Some(ADMIN_EMAIL), Some(&hash))
        .await
        .unwrap();
    let (status, body) = send(
        app,
        json_req(
            "POST",
            "/api/auth/login",
            None,
            json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn featured_projects_over_http() {
    let Some((db, _guard)) = setup().await else { return };
    let app = app(&db);
    let projects = ContentService::<Project>::new(db.clone());
    for (title, featured, order) in [("Later", true, 2), ("Sooner", true, 1), ("Plain", false, 0)] {
        let project: NewProject = dto(json!({
            "lang": "EN",
            "title": title,
            "description": "d",
            "isFeatured": featured,
            "order": order,
        }));
        projects.create(&project).await.unwrap();
    }

    let (status, body) = send(&app, get("/api/projects?lang=EN&featured=true", None)).await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<_> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Sooner", "Later"]);
    assert_eq!(body["meta"]["total"], 2);
}

#[tokio::test]
async fn portfolio_over_http_hides_inactive_skills() {
    let Some((db, _guard)) = setup().await else { return };
    let app = app(&db);
    let categories = ContentService::<SkillCategory>::new(db.clone());
    let skills = ContentService::<Skill>::new(db.clone());
    let category: NewSkillCategory = dto(json!({ "lang": "EN", "name": "Backend" }));
    let category = id_of(&categories.create(&category).await.unwrap());
    for (name, active) in [("Visible", true), ("HiddenSkill", false)] {
        let skill: NewSkill = dto(json!({
            "lang": "EN",
            "name": name,
            "level": 60,
            "isActive": active,
            "categoryId": category,
        }));
        skills.create(&skill).await.unwrap();
    }

    let (status, body) = send(&app, get("/api/portfolio?lang=EN", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["language"], "EN");
    let listed = &body["data"]["skillCategories"][0]["skills"];
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["name"], "Visible");

    let (_, body) = send(&app, get("/api/skill-categories?nested=skills", None)).await;
    assert_eq!(body["data"][0]["skills"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn login_then_create_with_token() {
    let Some((db, _guard)) = setup().await else { return };
    let app = app(&db);
    let token = login(&db, &app).await;

    let project = json!({ "lang": "EN", "title": "Portfolio", "description": "d" });
    let (status, _) = send(&app, json_req("POST", "/api/projects", None, project.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, json_req("POST", "/api/projects", Some(&token), project)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["title"], "Portfolio");

    let (status, body) = send(
        &app,
        json_req(
            "POST",
            "/api/auth/login",
            None,
            json!({ "email": ADMIN_EMAIL, "password": "wrong password" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid credentials");
}

#[tokio::test]
async fn deleting_referenced_category_is_a_conflict_envelope() {
    let Some((db, _guard)) = setup().await else { return };
    let app = app(&db);
    let token = login(&db, &app).await;

    let (_, category) = send(
        &app,
        json_req(
            "POST",
            "/api/skill-categories",
            Some(&token),
            json!({ "lang": "EN", "name": "Backend" }),
        ),
    )
    .await;
    let category = id_of(&category);
    let (status, _) = send(
        &app,
        json_req(
            "POST",
            "/api/skills",
            Some(&token),
            json!({ "lang": "EN", "name": "Rust", "level": 90, "categoryId": category }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let uri = format!("/api/skill-categories/{}", category);
    let req = Request::delete(uri.as_str())
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["statusCode"], 409);
    assert_eq!(body["path"], uri);
    assert_eq!(body["message"], "Cannot delete SkillCategory: related records exist");
}

#[tokio::test]
async fn anonymous_file_listing_omits_inline_data() {
    let Some((db, _guard)) = setup().await else { return };
    let app = app(&db);
    let token = login(&db, &app).await;
    let file: NewFile = dto(json!({
        "name": "logo.png",
        "url": "http://localhost:3001/storage/files/logo.png",
        "path": "logo.png",
        "type": "image/png",
        "size": 2,
        "data": "aGk=",
    }));
    Repository::<FileRecord>::new(db.clone())
        .create(&file)
        .await
        .unwrap();

    let (status, body) = send(&app, get("/api/files", None)).await;
    assert_eq!(status, StatusCode::OK);
    let listed = body["data"][0].as_object().unwrap();
    assert_eq!(listed["name"], "logo.png");
    assert!(!listed.contains_key("data"));

    let (_, body) = send(&app, get("/api/files", Some(&token))).await;
    assert_eq!(body["data"][0]["data"], "aGk=");
}
