//! Read-only fan-out over several content types.

use serde::Serialize;
use serde_json::Value;

use super::content::ContentService;
use crate::db::models::{
    AboutCard, Achievement, ContactInfo, FileRecord, HeroContent, Lang, PersonalInfo, Project,
    Skill, SkillCategory, SocialLink,
};
use crate::db::{Database, Entity, Repository};
use crate::error::ApiResult;
use crate::query::{fields, QueryOptions};

/// Everything the public site renders for one language.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioData {
    pub personal_info: Option<Value>,
    pub hero: Option<Value>,
    pub about_cards: Vec<Value>,
    pub skill_categories: Vec<Value>,
    pub projects: Vec<Value>,
    pub achievements: Vec<Value>,
    pub contact_info: Vec<Value>,
    pub social_links: Vec<Value>,
}

/// Full, unpaginated listing with the given relations.
fn everything(include: &str) -> QueryOptions {
    QueryOptions {
        include: fields::parse_nested(include),
        meta: false,
        ..QueryOptions::default()
    }
}

pub async fn portfolio(db: &Database, lang: Lang) -> ApiResult<PortfolioData> {
    let personal = ContentService::<PersonalInfo>::new(db.clone());
    let hero = ContentService::<HeroContent>::new(db.clone());
    let about = ContentService::<AboutCard>::new(db.clone());
    let categories = ContentService::<SkillCategory>::new(db.clone());
    let projects = ContentService::<Project>::new(db.clone());
    let achievements = ContentService::<Achievement>::new(db.clone());
    let contacts = ContentService::<ContactInfo>::new(db.clone());
    let social = ContentService::<SocialLink>::new(db.clone());

    let with_files = everything("avatar,resume");
    let with_image = everything("image");
    let with_skills = everything("skills");
    let plain = everything("");

    let (personal_info, hero, about_cards, skill_categories, projects, achievements, contact_info, social_links) = tokio::try_join!(
        personal.find_first_by_language(lang, &with_files),
        hero.find_first_by_language(lang, &with_image),
        about.find_by_language(lang, &plain),
        categories.find_by_language(lang, &with_skills),
        projects.find_by_language(lang, &with_image),
        achievements.find_by_language(lang, &with_image),
        contacts.find_by_language(lang, &plain),
        social.find_by_language(lang, &plain),
    )?;

    Ok(PortfolioData {
        personal_info,
        hero,
        about_cards: about_cards.data,
        skill_categories: skill_categories.data,
        projects: projects.data,
        achievements: achievements.data,
        contact_info: contact_info.data,
        social_links: social_links.data,
    })
}

/// Row counts per content type, for the admin dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub personal_info: i64,
    pub hero: i64,
    pub about_cards: i64,
    pub skill_categories: i64,
    pub skills: i64,
    pub projects: i64,
    pub achievements: i64,
    pub contact_info: i64,
    pub social_links: i64,
    pub files: i64,
}

impl Overview {
    pub fn total(&self) -> i64 {
        self.personal_info
            + self.hero
            + self.about_cards
            + self.skill_categories
            + self.skills
            + self.projects
            + self.achievements
            + self.contact_info
            + self.social_links
            + self.files
    }
}

async fn count<E: Entity>(db: &Database) -> ApiResult<i64> {
    Repository::<E>::new(db.clone()).count(None).await
}

pub async fn overview(db: &Database) -> ApiResult<Overview> {
    let (
        personal_info,
        hero,
        about_cards,
        skill_categories,
        skills,
        projects,
        achievements,
        contact_info,
        social_links,
        files,
    ) = tokio::try_join!(
        count::<PersonalInfo>(db),
        count::<HeroContent>(db),
        count::<AboutCard>(db),
        count::<SkillCategory>(db),
        count::<Skill>(db),
        count::<Project>(db),
        count::<Achievement>(db),
        count::<ContactInfo>(db),
        count::<SocialLink>(db),
        count::<FileRecord>(db),
    )?;

    Ok(Overview {
        personal_info,
        hero,
        about_cards,
        skill_categories,
        skills,
        projects,
        achievements,
        contact_info,
        social_links,
        files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_everything_is_unpaginated_with_relations() {
        let options = everything("avatar,resume");
        assert!(!options.meta);
        let args = options.find_args(false);
        assert!(args.take.is_none());
        assert!(args.include.is_some());
        assert!(everything("").include.is_none());
    }

    #[test]
    fn test_overview_total_sums_every_type() {
        let overview = Overview {
            projects: 3,
            skills: 10,
            files: 2,
            ..Overview::default()
        };
        assert_eq!(overview.total(), 15);
    }

    #[tokio::test]
    async fn test_overview_fails_when_any_count_fails() {
        let db = Database::connect_lazy("postgres://postgres@127.0.0.1:1/none").unwrap();
        assert!(overview(&db).await.is_err());
    }
}
