pub mod models;
pub mod repository;
pub mod schema;
pub mod sql;

use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use sqlx::{postgres::PgPoolOptions, PgConnection, PgPool};

use crate::error::ApiResult;

pub use repository::{Page, PageMeta, Repository};
pub use schema::Entity;

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/portfolio".to_string(),
            max_connections: 10,
            min_connections: 2,
            connect_timeout_secs: 10,
            idle_timeout_secs: 300,
        }
    }
}

impl DbConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            url: std::env::var("DATABASE_URL").unwrap_or(defaults.url),
            max_connections: env_parse("DB_POOL_MAX").unwrap_or(defaults.max_connections),
            min_connections: env_parse("DB_POOL_MIN").unwrap_or(defaults.min_connections),
            connect_timeout_secs: env_parse("DB_CONNECT_TIMEOUT")
                .unwrap_or(defaults.connect_timeout_secs),
            idle_timeout_secs: env_parse("DB_IDLE_TIMEOUT").unwrap_or(defaults.idle_timeout_secs),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

/// Handle to the connection pool. Created once at startup and shared through
/// the application state.
#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn connect(config: &DbConfig) -> Result<Self, sqlx::Error> {
        tracing::info!("Initializing database connection pool...");
        tracing::debug!(
            "Database URL: {}",
            config.url.replace(
                |c: char| !c.is_ascii_alphanumeric() && c != ':' && c != '/' && c != '@' && c != '.',
                "*"
            )
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(1800))
            .test_before_acquire(true)
            .connect(&config.url)
            .await?;

        sqlx::query("SELECT 1").fetch_one(&pool).await?;

        tracing::info!("Database connection pool initialized successfully");

        Ok(Self { pool })
    }

    /// Pool that connects on first use.
    pub fn connect_lazy(url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(Duration::from_secs(1))
            .connect_lazy(url)?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<Duration, sqlx::Error> {
        let start = Instant::now();
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(start.elapsed())
    }

    pub async fn close(&self) {
        tracing::info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// Runs `f` in a transaction, committing on `Ok` and rolling back on `Err`.
    pub async fn transaction<T, F>(&self, f: F) -> ApiResult<T>
    where
        T: Send,
        F: for<'c> FnOnce(&'c mut PgConnection) -> BoxFuture<'c, ApiResult<T>> + Send,
    {
        let mut tx = self.pool.begin().await?;
        match f(&mut *tx).await {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::error!("Transaction rollback failed: {}", rollback);
                }
                Err(err)
            }
        }
    }
}

const CONTENT_COLUMNS: &str = r#"
            "order" INTEGER NOT NULL DEFAULT 0,
            is_active BOOLEAN NOT NULL DEFAULT true,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()"#;

fn migrations() -> Vec<String> {
    let content = |table: &str, columns: &str, constraints: &str| {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n            id BIGSERIAL PRIMARY KEY,\n            lang language NOT NULL,{},{}{}\n        )",
            table, columns, CONTENT_COLUMNS, constraints
        )
    };

    let mut statements = vec![
        r#"
        DO $$ BEGIN
            CREATE TYPE language AS ENUM ('EN', 'AR');
        EXCEPTION WHEN duplicate_object THEN NULL;
        END $$
        "#
        .to_string(),
        r#"
        CREATE TABLE IF NOT EXISTS files (
            id BIGSERIAL PRIMARY KEY,
            name TEXT NOT NULL,
            url TEXT NOT NULL,
            path TEXT NOT NULL,
            type TEXT NOT NULL,
            size BIGINT NOT NULL DEFAULT 0,
            data TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#
        .to_string(),
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id BIGSERIAL PRIMARY KEY,
            email TEXT UNIQUE NOT NULL,
            password_hash TEXT NOT NULL,
            last_login TIMESTAMPTZ,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#
        .to_string(),
        content(
            "personal_infos",
            r#"
            name TEXT NOT NULL,
            title TEXT NOT NULL,
            bio TEXT,
            location TEXT,
            email TEXT,
            phone TEXT,
            avatar_id BIGINT REFERENCES files(id) ON DELETE SET NULL,
            resume_id BIGINT REFERENCES files(id) ON DELETE SET NULL"#,
            ",\n            CONSTRAINT personal_infos_lang_key UNIQUE (lang)",
        ),
        content(
            "hero_contents",
            r#"
            greeting TEXT,
            title TEXT NOT NULL,
            subtitle TEXT,
            description TEXT,
            cta_text TEXT,
            cta_link TEXT,
            image_id BIGINT REFERENCES files(id) ON DELETE SET NULL"#,
            ",\n            CONSTRAINT hero_contents_lang_key UNIQUE (lang)",
        ),
        content(
            "about_cards",
            r#"
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            icon TEXT"#,
            "",
        ),
        content(
            "skill_categories",
            r#"
            name TEXT NOT NULL,
            icon TEXT"#,
            "",
        ),
        content(
            "skills",
            r#"
            name TEXT NOT NULL,
            level INTEGER NOT NULL CHECK (level BETWEEN 0 AND 100),
            icon TEXT,
            category_id BIGINT NOT NULL REFERENCES skill_categories(id) ON DELETE RESTRICT"#,
            "",
        ),
        content(
            "projects",
            r#"
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            technologies TEXT[] NOT NULL DEFAULT '{}',
            github_url TEXT,
            live_url TEXT,
            image_id BIGINT REFERENCES files(id) ON DELETE SET NULL,
            is_featured BOOLEAN NOT NULL DEFAULT false"#,
            "",
        ),
        content(
            "achievements",
            r#"
            title TEXT NOT NULL,
            description TEXT,
            issuer TEXT,
            date TIMESTAMPTZ,
            link TEXT,
            image_id BIGINT REFERENCES files(id) ON DELETE SET NULL"#,
            "",
        ),
        content(
            "contact_infos",
            r#"
            type TEXT NOT NULL,
            value TEXT NOT NULL,
            label TEXT,
            icon TEXT,
            is_primary BOOLEAN NOT NULL DEFAULT false"#,
            ",\n            CONSTRAINT contact_infos_lang_type_key UNIQUE (lang, type)",
        ),
        content(
            "social_links",
            r#"
            name TEXT NOT NULL,
            url TEXT NOT NULL,
            icon TEXT"#,
            ",\n            CONSTRAINT social_links_lang_name_key UNIQUE (lang, name)",
        ),
    ];

    for table in CONTENT_TABLES {
        statements.push(format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_lang_active_order ON {table}(lang, is_active, \"order\")"
        ));
    }
    statements.push(
        "CREATE INDEX IF NOT EXISTS idx_skills_category_id ON skills(category_id)".to_string(),
    );
    statements
}

const CONTENT_TABLES: &[&str] = &[
    "personal_infos",
    "hero_contents",
    "about_cards",
    "skill_categories",
    "skills",
    "projects",
    "achievements",
    "contact_infos",
    "social_links",
];

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    tracing::info!("Running database migrations...");

    for statement in migrations() {
        sqlx::query(&statement).execute(pool).await?;
    }

    tracing::info!("Database migrations completed successfully");

    Ok(())
}

/// Creates the first admin account when the users table is empty.
/// Returns whether an account was created.
pub async fn ensure_admin(
    pool: &PgPool,
    email: Option<&str>,
    password_hash: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        return Ok(false);
    }

    let (Some(email), Some(password_hash)) = (email, password_hash) else {
        tracing::warn!("No admin account exists; set ADMIN_EMAIL and ADMIN_PASSWORD_HASH to create one");
        return Ok(false);
    };

    sqlx::query(
        "INSERT INTO users (email, password_hash) VALUES ($1, $2) ON CONFLICT (email) DO NOTHING",
    )
    .bind(email.trim().to_lowercase())
    .bind(password_hash)
    .execute(pool)
    .await?;

    tracing::info!("Created admin account for {}", email);
    Ok(true)
}
