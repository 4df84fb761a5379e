//! Database Models - content records, their payloads and table schemas.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::schema::{
    Column, ColumnKind, Entity, EntitySchema, Link, Relation, UniqueKey, CREATED_AT, ID,
    IS_ACTIVE, LANG, ORDER, UPDATED_AT,
};

// ============================================================================
// Language
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Lang {
    #[serde(alias = "en")]
    En,
    #[serde(alias = "ar")]
    Ar,
}

impl Lang {
    pub const ALL: [Lang; 2] = [Lang::En, Lang::Ar];

    pub fn as_str(&self) -> &'static str {
        match self {
            Lang::En => "EN",
            Lang::Ar => "AR",
        }
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Lang {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EN" => Ok(Lang::En),
            "AR" => Ok(Lang::Ar),
            other => Err(format!("Unsupported language '{}', expected EN or AR", other)),
        }
    }
}

// ============================================================================
// Files
// ============================================================================

/// Stored upload. Content records point at it; it never knows who does.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub path: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub file_type: String,
    pub size: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewFile {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1))]
    pub url: String,
    #[validate(length(min = 1))]
    pub path: String,
    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 100))]
    pub file_type: String,
    #[validate(range(min = 0))]
    pub size: i64,
    pub data: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFile {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
}

pub static FILE: EntitySchema = EntitySchema {
    name: "File",
    table: "files",
    columns: &[
        ID,
        Column::new("name", "name", ColumnKind::Text),
        Column::new("url", "url", ColumnKind::Text),
        Column::new("path", "path", ColumnKind::Text),
        Column::new("type", "type", ColumnKind::Text),
        Column::new("size", "size", ColumnKind::BigInt),
        Column::new("data", "data", ColumnKind::Text).admin_only(),
        CREATED_AT,
        UPDATED_AT,
    ],
    relations: &[],
    unique: &[],
};

impl Entity for FileRecord {
    type Create = NewFile;
    type Update = UpdateFile;
    const SCHEMA: &'static EntitySchema = &FILE;
}

// ============================================================================
// Users
// ============================================================================

/// Admin account. Only the auth routes read this table.
#[derive(Debug, Clone, FromRow)]
pub struct UserRecord {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Personal info
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalInfo {
    pub id: i64,
    pub lang: Lang,
    pub name: String,
    pub title: String,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub avatar_id: Option<i64>,
    pub resume_id: Option<i64>,
    pub order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewPersonalInfo {
    pub lang: Lang,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 5000))]
    pub bio: Option<String>,
    #[validate(length(max = 200))]
    pub location: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    pub avatar_id: Option<i64>,
    pub resume_id: Option<i64>,
    pub order: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePersonalInfo {
    pub lang: Option<Lang>,
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 5000))]
    pub bio: Option<String>,
    #[validate(length(max = 200))]
    pub location: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    pub avatar_id: Option<i64>,
    pub resume_id: Option<i64>,
    pub order: Option<i32>,
    pub is_active: Option<bool>,
}

pub static PERSONAL_INFO: EntitySchema = EntitySchema {
    name: "PersonalInfo",
    table: "personal_infos",
    columns: &[
        ID,
        LANG,
        Column::new("name", "name", ColumnKind::Text),
        Column::new("title", "title", ColumnKind::Text),
        Column::new("bio", "bio", ColumnKind::Text),
        Column::new("location", "location", ColumnKind::Text),
        Column::new("email", "email", ColumnKind::Text),
        Column::new("phone", "phone", ColumnKind::Text),
        Column::new("avatarId", "avatar_id", ColumnKind::BigInt),
        Column::new("resumeId", "resume_id", ColumnKind::BigInt),
        ORDER,
        IS_ACTIVE,
        CREATED_AT,
        UPDATED_AT,
    ],
    relations: &[
        Relation {
            field: "avatar",
            target: &FILE,
            link: Link::BelongsTo { column: "avatar_id" },
        },
        Relation {
            field: "resume",
            target: &FILE,
            link: Link::BelongsTo { column: "resume_id" },
        },
    ],
    unique: &[UniqueKey {
        constraint: "personal_infos_lang_key",
        fields: &["lang"],
    }],
};

impl Entity for PersonalInfo {
    type Create = NewPersonalInfo;
    type Update = UpdatePersonalInfo;
    const SCHEMA: &'static EntitySchema = &PERSONAL_INFO;
}

// ============================================================================
// Hero
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroContent {
    pub id: i64,
    pub lang: Lang,
    pub greeting: Option<String>,
    pub title: String,
    pub subtitle: Option<String>,
    pub description: Option<String>,
    pub cta_text: Option<String>,
    pub cta_link: Option<String>,
    pub image_id: Option<i64>,
    pub order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewHeroContent {
    pub lang: Lang,
    #[validate(length(max = 200))]
    pub greeting: Option<String>,
    #[validate(length(min = 1, max = 300))]
    pub title: String,
    #[validate(length(max = 300))]
    pub subtitle: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(length(max = 100))]
    pub cta_text: Option<String>,
    #[validate(length(max = 500))]
    pub cta_link: Option<String>,
    pub image_id: Option<i64>,
    pub order: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateHeroContent {
    pub lang: Option<Lang>,
    #[validate(length(max = 200))]
    pub greeting: Option<String>,
    #[validate(length(min = 1, max = 300))]
    pub title: Option<String>,
    #[validate(length(max = 300))]
    pub subtitle: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(length(max = 100))]
    pub cta_text: Option<String>,
    #[validate(length(max = 500))]
    pub cta_link: Option<String>,
    pub image_id: Option<i64>,
    pub order: Option<i32>,
    pub is_active: Option<bool>,
}

pub static HERO_CONTENT: EntitySchema = EntitySchema {
    name: "HeroContent",
    table: "hero_contents",
    columns: &[
        ID,
        LANG,
        Column::new("greeting", "greeting", ColumnKind::Text),
        Column::new("title", "title", ColumnKind::Text),
        Column::new("subtitle", "subtitle", ColumnKind::Text),
        Column::new("description", "description", ColumnKind::Text),
        Column::new("ctaText", "cta_text", ColumnKind::Text),
        Column::new("ctaLink", "cta_link", ColumnKind::Text),
        Column::new("imageId", "image_id", ColumnKind::BigInt),
        ORDER,
        IS_ACTIVE,
        CREATED_AT,
        UPDATED_AT,
    ],
    relations: &[Relation {
        field: "image",
        target: &FILE,
        link: Link::BelongsTo { column: "image_id" },
    }],
    unique: &[UniqueKey {
        constraint: "hero_contents_lang_key",
        fields: &["lang"],
    }],
};

impl Entity for HeroContent {
    type Create = NewHeroContent;
    type Update = UpdateHeroContent;
    const SCHEMA: &'static EntitySchema = &HERO_CONTENT;
}

// ============================================================================
// About cards
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AboutCard {
    pub id: i64,
    pub lang: Lang,
    pub title: String,
    pub description: String,
    pub icon: Option<String>,
    pub order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewAboutCard {
    pub lang: Lang,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 5000))]
    pub description: String,
    #[validate(length(max = 100))]
    pub icon: Option<String>,
    pub order: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAboutCard {
    pub lang: Option<Lang>,
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 5000))]
    pub description: Option<String>,
    #[validate(length(max = 100))]
    pub icon: Option<String>,
    pub order: Option<i32>,
    pub is_active: Option<bool>,
}

pub static ABOUT_CARD: EntitySchema = EntitySchema {
    name: "AboutCard",
    table: "about_cards",
    columns: &[
        ID,
        LANG,
        Column::new("title", "title", ColumnKind::Text),
        Column::new("description", "description", ColumnKind::Text),
        Column::new("icon", "icon", ColumnKind::Text),
        ORDER,
        IS_ACTIVE,
        CREATED_AT,
        UPDATED_AT,
    ],
    relations: &[],
    unique: &[],
};

impl Entity for AboutCard {
    type Create = NewAboutCard;
    type Update = UpdateAboutCard;
    const SCHEMA: &'static EntitySchema = &ABOUT_CARD;
}

// ============================================================================
// Skills
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillCategory {
    pub id: i64,
    pub lang: Lang,
    pub name: String,
    pub icon: Option<String>,
    pub order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewSkillCategory {
    pub lang: Lang,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 100))]
    pub icon: Option<String>,
    pub order: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSkillCategory {
    pub lang: Option<Lang>,
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(max = 100))]
    pub icon: Option<String>,
    pub order: Option<i32>,
    pub is_active: Option<bool>,
}

pub static SKILL_CATEGORY: EntitySchema = EntitySchema {
    name: "SkillCategory",
    table: "skill_categories",
    columns: &[
        ID,
        LANG,
        Column::new("name", "name", ColumnKind::Text),
        Column::new("icon", "icon", ColumnKind::Text),
        ORDER,
        IS_ACTIVE,
        CREATED_AT,
        UPDATED_AT,
    ],
    relations: &[Relation {
        field: "skills",
        target: &SKILL,
        link: Link::HasMany {
            foreign_column: "category_id",
        },
    }],
    unique: &[],
};

impl Entity for SkillCategory {
    type Create = NewSkillCategory;
    type Update = UpdateSkillCategory;
    const SCHEMA: &'static EntitySchema = &SKILL_CATEGORY;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub id: i64,
    pub lang: Lang,
    pub name: String,
    pub level: i32,
    pub icon: Option<String>,
    pub category_id: i64,
    pub order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewSkill {
    pub lang: Lang,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(range(min = 0, max = 100))]
    pub level: i32,
    #[validate(length(max = 100))]
    pub icon: Option<String>,
    pub category_id: i64,
    pub order: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSkill {
    pub lang: Option<Lang>,
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(range(min = 0, max = 100))]
    pub level: Option<i32>,
    #[validate(length(max = 100))]
    pub icon: Option<String>,
    pub category_id: Option<i64>,
    pub order: Option<i32>,
    pub is_active: Option<bool>,
}

pub static SKILL: EntitySchema = EntitySchema {
    name: "Skill",
    table: "skills",
    columns: &[
        ID,
        LANG,
        Column::new("name", "name", ColumnKind::Text),
        Column::new("level", "level", ColumnKind::Int),
        Column::new("icon", "icon", ColumnKind::Text),
        Column::new("categoryId", "category_id", ColumnKind::BigInt),
        ORDER,
        IS_ACTIVE,
        CREATED_AT,
        UPDATED_AT,
    ],
    relations: &[Relation {
        field: "category",
        target: &SKILL_CATEGORY,
        link: Link::BelongsTo {
            column: "category_id",
        },
    }],
    unique: &[],
};

impl Entity for Skill {
    type Create = NewSkill;
    type Update = UpdateSkill;
    const SCHEMA: &'static EntitySchema = &SKILL;
}

// ============================================================================
// Projects
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: i64,
    pub lang: Lang,
    pub title: String,
    pub description: String,
    pub technologies: Vec<String>,
    pub github_url: Option<String>,
    pub live_url: Option<String>,
    pub image_id: Option<i64>,
    pub is_featured: bool,
    pub order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub lang: Lang,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 10000))]
    pub description: String,
    #[serde(default)]
    #[validate(length(max = 50))]
    pub technologies: Vec<String>,
    #[validate(url)]
    pub github_url: Option<String>,
    #[validate(url)]
    pub live_url: Option<String>,
    pub image_id: Option<i64>,
    pub is_featured: Option<bool>,
    pub order: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProject {
    pub lang: Option<Lang>,
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 10000))]
    pub description: Option<String>,
    #[validate(length(max = 50))]
    pub technologies: Option<Vec<String>>,
    #[validate(url)]
    pub github_url: Option<String>,
    #[validate(url)]
    pub live_url: Option<String>,
    pub image_id: Option<i64>,
    pub is_featured: Option<bool>,
    pub order: Option<i32>,
    pub is_active: Option<bool>,
}

pub static PROJECT: EntitySchema = EntitySchema {
    name: "Project",
    table: "projects",
    columns: &[
        ID,
        LANG,
        Column::new("title", "title", ColumnKind::Text),
        Column::new("description", "description", ColumnKind::Text),
        Column::new("technologies", "technologies", ColumnKind::TextArray),
        Column::new("githubUrl", "github_url", ColumnKind::Text),
        Column::new("liveUrl", "live_url", ColumnKind::Text),
        Column::new("imageId", "image_id", ColumnKind::BigInt),
        Column::new("isFeatured", "is_featured", ColumnKind::Bool),
        ORDER,
        IS_ACTIVE,
        CREATED_AT,
        UPDATED_AT,
    ],
    relations: &[Relation {
        field: "image",
        target: &FILE,
        link: Link::BelongsTo { column: "image_id" },
    }],
    unique: &[],
};

impl Entity for Project {
    type Create = NewProject;
    type Update = UpdateProject;
    const SCHEMA: &'static EntitySchema = &PROJECT;
}

// ============================================================================
// Achievements
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: i64,
    pub lang: Lang,
    pub title: String,
    pub description: Option<String>,
    pub issuer: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub link: Option<String>,
    pub image_id: Option<i64>,
    pub order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewAchievement {
    pub lang: Lang,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(length(max = 200))]
    pub issuer: Option<String>,
    pub date: Option<DateTime<Utc>>,
    #[validate(url)]
    pub link: Option<String>,
    pub image_id: Option<i64>,
    pub order: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAchievement {
    pub lang: Option<Lang>,
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(length(max = 200))]
    pub issuer: Option<String>,
    pub date: Option<DateTime<Utc>>,
    #[validate(url)]
    pub link: Option<String>,
    pub image_id: Option<i64>,
    pub order: Option<i32>,
    pub is_active: Option<bool>,
}

pub static ACHIEVEMENT: EntitySchema = EntitySchema {
    name: "Achievement",
    table: "achievements",
    columns: &[
        ID,
        LANG,
        Column::new("title", "title", ColumnKind::Text),
        Column::new("description", "description", ColumnKind::Text),
        Column::new("issuer", "issuer", ColumnKind::Text),
        Column::new("date", "date", ColumnKind::Timestamp),
        Column::new("link", "link", ColumnKind::Text),
        Column::new("imageId", "image_id", ColumnKind::BigInt),
        ORDER,
        IS_ACTIVE,
        CREATED_AT,
        UPDATED_AT,
    ],
    relations: &[Relation {
        field: "image",
        target: &FILE,
        link: Link::BelongsTo { column: "image_id" },
    }],
    unique: &[],
};

impl Entity for Achievement {
    type Create = NewAchievement;
    type Update = UpdateAchievement;
    const SCHEMA: &'static EntitySchema = &ACHIEVEMENT;
}

// ============================================================================
// Contact info
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfo {
    pub id: i64,
    pub lang: Lang,
    #[serde(rename = "type")]
    pub contact_type: String,
    pub value: String,
    pub label: Option<String>,
    pub icon: Option<String>,
    pub is_primary: bool,
    pub order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewContactInfo {
    pub lang: Lang,
    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 50))]
    pub contact_type: String,
    #[validate(length(min = 1, max = 500))]
    pub value: String,
    #[validate(length(max = 100))]
    pub label: Option<String>,
    #[validate(length(max = 100))]
    pub icon: Option<String>,
    pub is_primary: Option<bool>,
    pub order: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContactInfo {
    pub lang: Option<Lang>,
    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 50))]
    pub contact_type: Option<String>,
    #[validate(length(min = 1, max = 500))]
    pub value: Option<String>,
    #[validate(length(max = 100))]
    pub label: Option<String>,
    #[validate(length(max = 100))]
    pub icon: Option<String>,
    pub is_primary: Option<bool>,
    pub order: Option<i32>,
    pub is_active: Option<bool>,
}

pub static CONTACT_INFO: EntitySchema = EntitySchema {
    name: "ContactInfo",
    table: "contact_infos",
    columns: &[
        ID,
        LANG,
        Column::new("type", "type", ColumnKind::Text),
        Column::new("value", "value", ColumnKind::Text),
        Column::new("label", "label", ColumnKind::Text),
        Column::new("icon", "icon", ColumnKind::Text),
        Column::new("isPrimary", "is_primary", ColumnKind::Bool),
        ORDER,
        IS_ACTIVE,
        CREATED_AT,
        UPDATED_AT,
    ],
    relations: &[],
    unique: &[UniqueKey {
        constraint: "contact_infos_lang_type_key",
        fields: &["type", "lang"],
    }],
};

impl Entity for ContactInfo {
    type Create = NewContactInfo;
    type Update = UpdateContactInfo;
    const SCHEMA: &'static EntitySchema = &CONTACT_INFO;
}

// ============================================================================
// Social links
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialLink {
    pub id: i64,
    pub lang: Lang,
    pub name: String,
    pub url: String,
    pub icon: Option<String>,
    pub order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewSocialLink {
    pub lang: Lang,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(url)]
    pub url: String,
    #[validate(length(max = 100))]
    pub icon: Option<String>,
    pub order: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSocialLink {
    pub lang: Option<Lang>,
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(url)]
    pub url: Option<String>,
    #[validate(length(max = 100))]
    pub icon: Option<String>,
    pub order: Option<i32>,
    pub is_active: Option<bool>,
}

pub static SOCIAL_LINK: EntitySchema = EntitySchema {
    name: "SocialLink",
    table: "social_links",
    columns: &[
        ID,
        LANG,
        Column::new("name", "name", ColumnKind::Text),
        Column::new("url", "url", ColumnKind::Text),
        Column::new("icon", "icon", ColumnKind::Text),
        ORDER,
        IS_ACTIVE,
        CREATED_AT,
        UPDATED_AT,
    ],
    relations: &[],
    unique: &[UniqueKey {
        constraint: "social_links_lang_name_key",
        fields: &["name", "lang"],
    }],
};

impl Entity for SocialLink {
    type Create = NewSocialLink;
    type Update = UpdateSocialLink;
    const SCHEMA: &'static EntitySchema = &SOCIAL_LINK;
}
