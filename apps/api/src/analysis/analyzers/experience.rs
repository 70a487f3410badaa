//! Experience Alignment — CV years of experience against the JD's stated
//! requirement.
//!
//! The required-years figure is detected deterministically from the JD text;
//! when the JD states none, the analyzer records "not specified" and scores
//! on absolute sufficiency only. It never scores a gap to an invented number.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;

use crate::analysis::analyzers::{clamp_pct, AnalyzerInput, ComponentAnalyzer, ComponentScore, Dimension};
use crate::analysis::prompts::{ANALYZER_SYSTEM, EXPERIENCE_ALIGNMENT_PROMPT_TEMPLATE};
use crate::errors::AppError;
use crate::llm_client::{complete_json, LanguageModel};

pub struct ExperienceAlignment;

#[derive(Debug, Deserialize)]
struct RawExperience {
    cv_years: f64,
    #[serde(default)]
    rationale: String,
}

/// Finds an explicit years-of-experience statement in JD text
/// ("5+ years", "minimum 3 years", "at least 7 years"). Returns the largest
/// figure stated, or None when the JD states none.
pub(crate) fn detect_required_years(jd_text: &str) -> Option<f64> {
    static YEARS_RE: OnceLock<Regex> = OnceLock::new();
    let re = YEARS_RE.get_or_init(|| {
        Regex::new(r"(?i)(\d{1,2})\s*\+?\s*years?").expect("valid years regex")
    });
    re.captures_iter(jd_text)
        .filter_map(|c| c.get(1)?.as_str().parse::<f64>().ok())
        .fold(None, |max, n| match max {
            Some(m) if m >= n => Some(m),
            _ => Some(n),
        })
}

/// Coverage-ratio bands when the JD states a requirement.
fn score_against_requirement(cv_years: f64, required: f64) -> f64 {
    let ratio = cv_years / required;
    if ratio >= 1.0 {
        95.0
    } else if ratio >= 0.75 {
        75.0
    } else if ratio >= 0.5 {
        55.0
    } else if ratio > 0.0 {
        35.0
    } else {
        20.0
    }
}

/// Absolute-sufficiency bands when the JD states no requirement.
fn score_on_sufficiency(cv_years: f64) -> f64 {
    if cv_years >= 8.0 {
        85.0
    } else if cv_years >= 4.0 {
        70.0
    } else if cv_years >= 2.0 {
        55.0
    } else if cv_years > 0.0 {
        40.0
    } else {
        25.0
    }
}

#[async_trait]
impl ComponentAnalyzer for ExperienceAlignment {
    fn dimension(&self) -> Dimension {
        Dimension::Experience
    }

    async fn analyze(
        &self,
        llm: &dyn LanguageModel,
        input: &AnalyzerInput<'_>,
    ) -> Result<ComponentScore, AppError> {
        let prompt = EXPERIENCE_ALIGNMENT_PROMPT_TEMPLATE
            .replace("{cv}", input.cv_text)
            .replace("{jd}", &input.jd_context());

        let raw: RawExperience = complete_json(llm, &prompt, ANALYZER_SYSTEM)
            .await
            .map_err(AppError::from_gateway)?;

        let cv_years = raw.cv_years.max(0.0);
        let required = detect_required_years(input.jd_text);

        let mut sub_metrics = BTreeMap::new();
        sub_metrics.insert("cv_years".to_string(), cv_years.min(100.0));

        let mut details = BTreeMap::new();
        let score = match required {
            Some(req) if req > 0.0 => {
                details.insert("jd_required_years".to_string(), format!("{req}"));
                sub_metrics.insert(
                    "coverage_ratio_pct".to_string(),
                    clamp_pct(100.0 * cv_years / req),
                );
                score_against_requirement(cv_years, req)
            }
            _ => {
                details.insert("jd_required_years".to_string(), "not specified".to_string());
                score_on_sufficiency(cv_years)
            }
        };
        sub_metrics.insert("experience_match_pct".to_string(), score);

        Ok(ComponentScore {
            dimension: Dimension::Experience,
            score,
            sub_metrics,
            details,
            rationale: raw.rationale,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::requirements::JdRequirements;
    use crate::llm_client::testing::StaticGateway;

    fn input<'a>(jd_text: &'a str, reqs: &'a JdRequirements) -> AnalyzerInput<'a> {
        AnalyzerInput {
            cv_text: "cv with roles",
            jd_text,
            cv_skills: None,
            jd_skills: None,
            requirements: reqs,
        }
    }

    #[test]
    fn test_detect_required_years_plus_form() {
        assert_eq!(detect_required_years("5+ years of Rust required"), Some(5.0));
    }

    #[test]
    fn test_detect_required_years_takes_largest() {
        assert_eq!(
            detect_required_years("2 years SQL, minimum 7 years engineering"),
            Some(7.0)
        );
    }

    #[test]
    fn test_detect_required_years_absent() {
        assert_eq!(
            detect_required_years("Join our collaborative platform team."),
            None
        );
    }

    #[tokio::test]
    async fn test_unstated_requirement_is_never_fabricated() {
        // No years figure anywhere in the JD text.
        let gateway = StaticGateway(r#"{"cv_years": 6.0, "rationale": "two roles"}"#.to_string());
        let reqs = JdRequirements::default();
        let input = input("Join our collaborative platform team.", &reqs);
        let score = ExperienceAlignment.analyze(&gateway, &input).await.unwrap();
        assert_eq!(score.details["jd_required_years"], "not specified");
        assert!(!score.sub_metrics.contains_key("coverage_ratio_pct"));
        // Sufficiency band for 6 years.
        assert!((score.score - 70.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_meeting_the_stated_requirement_scores_high() {
        let gateway = StaticGateway(r#"{"cv_years": 6.0, "rationale": ""}"#.to_string());
        let reqs = JdRequirements::default();
        let input = input("Requires 5+ years of engineering experience.", &reqs);
        let score = ExperienceAlignment.analyze(&gateway, &input).await.unwrap();
        assert_eq!(score.details["jd_required_years"], "5");
        assert!((score.score - 95.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_partial_coverage_scores_partial() {
        let gateway = StaticGateway(r#"{"cv_years": 3.0, "rationale": ""}"#.to_string());
        let reqs = JdRequirements::default();
        let input = input("Minimum 6 years in data engineering.", &reqs);
        let score = ExperienceAlignment.analyze(&gateway, &input).await.unwrap();
        // ratio 0.5 → 55
        assert!((score.score - 55.0).abs() < f64::EPSILON);
        assert_eq!(score.sub_metrics["coverage_ratio_pct"], 50.0);
    }

    #[tokio::test]
    async fn test_negative_cv_years_clamped_to_zero() {
        let gateway = StaticGateway(r#"{"cv_years": -2.0, "rationale": ""}"#.to_string());
        let reqs = JdRequirements::default();
        let input = input("No years here.", &reqs);
        let score = ExperienceAlignment.analyze(&gateway, &input).await.unwrap();
        assert_eq!(score.sub_metrics["cv_years"], 0.0);
        assert!((score.score - 25.0).abs() < f64::EPSILON);
    }
}
