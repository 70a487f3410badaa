//! Skill extraction — turns raw CV or JD text into five categorized skill
//! lists via the gateway.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::analysis::prompts::{SKILL_EXTRACT_PROMPT_TEMPLATE, SKILL_EXTRACT_SYSTEM};
use crate::errors::AppError;
use crate::llm_client::{complete_json, LanguageModel};

/// Which side of the match a document belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectType {
    Cv,
    Jd,
}

impl SubjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectType::Cv => "cv",
            SubjectType::Jd => "jd",
        }
    }

    fn prompt_label(&self) -> &'static str {
        match self {
            SubjectType::Cv => "candidate CV",
            SubjectType::Jd => "job description",
        }
    }
}

/// The five skill categories extracted for each side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkillCategory {
    Technical,
    Soft,
    Domain,
    Experience,
    Education,
}

impl SkillCategory {
    pub const ALL: [SkillCategory; 5] = [
        SkillCategory::Technical,
        SkillCategory::Soft,
        SkillCategory::Domain,
        SkillCategory::Experience,
        SkillCategory::Education,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SkillCategory::Technical => "technical",
            SkillCategory::Soft => "soft",
            SkillCategory::Domain => "domain",
            SkillCategory::Experience => "experience",
            SkillCategory::Education => "education",
        }
    }
}

/// One side's extracted skills. Each category behaves as a set:
/// case-insensitive dedup, first-seen casing preserved for display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillSet {
    pub technical: Vec<String>,
    pub soft: Vec<String>,
    pub domain: Vec<String>,
    pub experience: Vec<String>,
    pub education: Vec<String>,
}

impl SkillSet {
    pub fn category(&self, category: SkillCategory) -> &[String] {
        match category {
            SkillCategory::Technical => &self.technical,
            SkillCategory::Soft => &self.soft,
            SkillCategory::Domain => &self.domain,
            SkillCategory::Experience => &self.experience,
            SkillCategory::Education => &self.education,
        }
    }

    pub fn total(&self) -> usize {
        SkillCategory::ALL
            .iter()
            .map(|c| self.category(*c).len())
            .sum()
    }
}

/// Defensive schema for the gateway payload: every category optional, so a
/// payload with none of them is distinguishable from one with empty lists.
#[derive(Debug, Deserialize)]
struct RawSkillSet {
    technical: Option<Vec<String>>,
    soft: Option<Vec<String>>,
    domain: Option<Vec<String>>,
    experience: Option<Vec<String>>,
    education: Option<Vec<String>>,
}

impl RawSkillSet {
    fn is_vacant(&self) -> bool {
        self.technical.is_none()
            && self.soft.is_none()
            && self.domain.is_none()
            && self.experience.is_none()
            && self.education.is_none()
    }
}

/// Extracts a categorized `SkillSet` from raw document text.
///
/// Rejects blank input before any gateway call. Unparseable gateway output
/// surfaces as `InvalidResponseFormat` — never a silently empty set.
pub async fn extract_skills(
    llm: &dyn LanguageModel,
    text: &str,
    subject: SubjectType,
) -> Result<SkillSet, AppError> {
    if text.trim().is_empty() {
        return Err(AppError::EmptyInput(format!(
            "{} text cannot be empty",
            subject.as_str()
        )));
    }

    let prompt = SKILL_EXTRACT_PROMPT_TEMPLATE
        .replace("{subject_kind}", subject.prompt_label())
        .replace("{text}", text);

    let raw: RawSkillSet = complete_json(llm, &prompt, SKILL_EXTRACT_SYSTEM)
        .await
        .map_err(AppError::from_gateway)?;

    if raw.is_vacant() {
        return Err(AppError::InvalidResponseFormat(
            "gateway payload contains none of the five skill categories".to_string(),
        ));
    }

    let skills = SkillSet {
        technical: dedup_case_insensitive(raw.technical.unwrap_or_default()),
        soft: dedup_case_insensitive(raw.soft.unwrap_or_default()),
        domain: dedup_case_insensitive(raw.domain.unwrap_or_default()),
        experience: dedup_case_insensitive(raw.experience.unwrap_or_default()),
        education: dedup_case_insensitive(raw.education.unwrap_or_default()),
    };

    info!(
        "Extracted {} skills from {} text",
        skills.total(),
        subject.as_str()
    );

    Ok(skills)
}

/// Stable content hash used to cache extraction results for unchanged input.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.trim().as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Set semantics over free-text items: trims, drops blanks, drops
/// case-insensitive duplicates while keeping the first-seen casing.
pub(crate) fn dedup_case_insensitive(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.to_lowercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::{DownGateway, StaticGateway};

    #[tokio::test]
    async fn test_empty_input_rejected_before_gateway_call() {
        let gateway = DownGateway; // would fail if actually called
        let result = extract_skills(&gateway, "   \n ", SubjectType::Cv).await;
        assert!(matches!(result, Err(AppError::EmptyInput(_))));
    }

    #[tokio::test]
    async fn test_extracts_five_categories() {
        let gateway = StaticGateway(
            r#"{
                "technical": ["SQL", "Power BI"],
                "soft": ["communication"],
                "domain": ["retail analytics"],
                "experience": ["3 years as analyst"],
                "education": ["BSc Statistics"]
            }"#
            .to_string(),
        );
        let skills = extract_skills(&gateway, "some cv text", SubjectType::Cv)
            .await
            .unwrap();
        assert_eq!(skills.technical, vec!["SQL", "Power BI"]);
        assert_eq!(skills.total(), 6);
    }

    #[tokio::test]
    async fn test_unparseable_payload_is_invalid_response_format() {
        let gateway = StaticGateway("sorry, here are the skills: SQL".to_string());
        let result = extract_skills(&gateway, "cv text", SubjectType::Cv).await;
        assert!(matches!(result, Err(AppError::InvalidResponseFormat(_))));
    }

    #[tokio::test]
    async fn test_vacant_payload_is_not_a_silent_empty_set() {
        let gateway = StaticGateway(r#"{"something_else": true}"#.to_string());
        let result = extract_skills(&gateway, "cv text", SubjectType::Cv).await;
        assert!(matches!(result, Err(AppError::InvalidResponseFormat(_))));
    }

    #[tokio::test]
    async fn test_missing_categories_default_to_empty_when_any_present() {
        let gateway = StaticGateway(r#"{"technical": ["Rust"]}"#.to_string());
        let skills = extract_skills(&gateway, "cv text", SubjectType::Jd)
            .await
            .unwrap();
        assert_eq!(skills.technical, vec!["Rust"]);
        assert!(skills.soft.is_empty());
    }

    #[tokio::test]
    async fn test_gateway_outage_surfaces_as_gateway_error() {
        let result = extract_skills(&DownGateway, "cv text", SubjectType::Cv).await;
        assert!(matches!(result, Err(AppError::Gateway(_))));
    }

    #[test]
    fn test_dedup_is_case_insensitive_and_keeps_first_casing() {
        let items = vec![
            "Power BI".to_string(),
            "power bi".to_string(),
            " SQL ".to_string(),
            "".to_string(),
            "sql".to_string(),
        ];
        assert_eq!(dedup_case_insensitive(items), vec!["Power BI", "SQL"]);
    }

    #[test]
    fn test_content_hash_stable_and_whitespace_insensitive_at_edges() {
        let a = content_hash("the same text");
        let b = content_hash("  the same text \n");
        let c = content_hash("different text");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }
}
