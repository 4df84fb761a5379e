//! Shared setup for the Postgres-backed tests.
//!
//! Skipped unless `TEST_DATABASE_URL` points at a disposable database; every
//! test truncates all tables first.

use portfolio_cms::db::{run_migrations, Database, DbConfig};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{Mutex, MutexGuard};

static DB_LOCK: Mutex<()> = Mutex::const_new(());

pub async fn setup() -> Option<(Database, MutexGuard<'static, ()>)> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let guard = DB_LOCK.lock().await;
    let db = Database::connect(&DbConfig {
        url,
        max_connections: 4,
        min_connections: 1,
        ..DbConfig::default()
    })
    .await
    .unwrap();
    run_migrations(db.pool()).await.unwrap();
    sqlx::query(
        "TRUNCATE skills, skill_categories, projects, contact_infos, personal_infos, \
         hero_contents, about_cards, achievements, social_links, files, users \
         RESTART IDENTITY CASCADE",
    )
    .execute(db.pool())
    .await
    .unwrap();
    Some((db, guard))
}

pub fn dto<T: DeserializeOwned>(value: Value) -> T {
    serde_json::from_value(value).unwrap()
}

pub fn id_of(doc: &Value) -> i64 {
    doc["id"].as_i64().unwrap()
}
