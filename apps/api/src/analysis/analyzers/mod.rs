//! Component analyzers — five peer strategies scoring one dimension of
//! CV/JD fit each, behind a single `ComponentAnalyzer` trait.
//!
//! The `analyze_all` combinator runs all five concurrently and collects
//! whatever subset succeeds; a failed analyzer is recorded per dimension and
//! never blocks its peers. The aggregator handles a missing score by
//! excluding the dimension, not by substituting a fabricated one.

pub mod experience;
pub mod industry;
pub mod seniority;
pub mod skills_relevance;
pub mod technical;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::analysis::requirements::JdRequirements;
use crate::analysis::skills::SkillSet;
use crate::analysis::weights::ScoringWeights;
use crate::errors::AppError;
use crate::llm_client::LanguageModel;

pub use experience::ExperienceAlignment;
pub use industry::IndustryFit;
pub use seniority::RoleSeniority;
pub use skills_relevance::SkillsRelevance;
pub use technical::TechnicalDepth;

/// The five analysis dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Skills,
    Experience,
    Industry,
    Seniority,
    Technical,
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Dimension::Skills,
        Dimension::Experience,
        Dimension::Industry,
        Dimension::Seniority,
        Dimension::Technical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Skills => "skills",
            Dimension::Experience => "experience",
            Dimension::Industry => "industry",
            Dimension::Seniority => "seniority",
            Dimension::Technical => "technical",
        }
    }
}

/// One analyzer's output. `score` and every `sub_metrics` value lie in
/// [0, 100]; non-numeric findings (e.g. "jd_required_years: not specified")
/// go into `details`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentScore {
    pub dimension: Dimension,
    pub score: f64,
    pub sub_metrics: BTreeMap<String, f64>,
    #[serde(default)]
    pub details: BTreeMap<String, String>,
    pub rationale: String,
}

/// A recorded per-dimension failure — observable, not swallowed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerFailure {
    pub dimension: Dimension,
    pub message: String,
}

/// What the five analyzers produced for one run: the scores that succeeded
/// and the failures that did not.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComponentAnalysis {
    pub scores: Vec<ComponentScore>,
    pub failures: Vec<AnalyzerFailure>,
}

impl ComponentAnalysis {
    pub fn score(&self, dimension: Dimension) -> Option<&ComponentScore> {
        self.scores.iter().find(|s| s.dimension == dimension)
    }
}

/// Everything an analyzer may consume. Skill sets are optional: when
/// extraction failed upstream, analyzers fall back to the raw text.
pub struct AnalyzerInput<'a> {
    pub cv_text: &'a str,
    pub jd_text: &'a str,
    pub cv_skills: Option<&'a SkillSet>,
    pub jd_skills: Option<&'a SkillSet>,
    pub requirements: &'a JdRequirements,
}

impl AnalyzerInput<'_> {
    /// CV context for prompts: the structured skill set when available,
    /// otherwise the raw text.
    pub fn cv_context(&self) -> String {
        match self.cv_skills {
            Some(skills) => serde_json::to_string_pretty(skills)
                .unwrap_or_else(|_| self.cv_text.to_string()),
            None => self.cv_text.to_string(),
        }
    }

    /// JD context for prompts: skill set plus the extracted requirements
    /// (the single source of truth for required/preferred items), falling
    /// back to raw text.
    pub fn jd_context(&self) -> String {
        let base = match self.jd_skills {
            Some(skills) => serde_json::to_string_pretty(skills)
                .unwrap_or_else(|_| self.jd_text.to_string()),
            None => self.jd_text.to_string(),
        };
        if self.requirements.is_empty() {
            return base;
        }
        format!(
            "{base}\n\nSTATED REQUIREMENTS:\nrequired: {}\npreferred: {}",
            self.requirements.required.join("; "),
            self.requirements.preferred.join("; ")
        )
    }
}

/// The analyzer seam. One implementation per dimension; all five share this
/// contract so the combinator and the tests treat them uniformly.
#[async_trait]
pub trait ComponentAnalyzer: Send + Sync {
    fn dimension(&self) -> Dimension;

    async fn analyze(
        &self,
        llm: &dyn LanguageModel,
        input: &AnalyzerInput<'_>,
    ) -> Result<ComponentScore, AppError>;
}

/// Runs all five analyzers concurrently and collects whatever succeeds.
pub async fn analyze_all(
    llm: &dyn LanguageModel,
    input: &AnalyzerInput<'_>,
    weights: &ScoringWeights,
) -> ComponentAnalysis {
    let skills = SkillsRelevance::new(weights.skills.clone());
    let experience = ExperienceAlignment;
    let industry = IndustryFit::new(weights.industry.clone());
    let seniority = RoleSeniority;
    let technical = TechnicalDepth::new(weights.technical.clone());

    let (a, b, c, d, e) = tokio::join!(
        skills.analyze(llm, input),
        experience.analyze(llm, input),
        industry.analyze(llm, input),
        seniority.analyze(llm, input),
        technical.analyze(llm, input),
    );

    let mut analysis = ComponentAnalysis::default();
    let results = [
        (skills.dimension(), a),
        (experience.dimension(), b),
        (industry.dimension(), c),
        (seniority.dimension(), d),
        (technical.dimension(), e),
    ];
    for (dimension, result) in results {
        match result {
            Ok(score) => analysis.scores.push(score),
            Err(e) => {
                let failure = AppError::AnalyzerFailure {
                    dimension: dimension.as_str().to_string(),
                    message: e.to_string(),
                };
                warn!("{failure}");
                analysis.failures.push(AnalyzerFailure {
                    dimension,
                    message: e.to_string(),
                });
            }
        }
    }
    analysis
}

/// Clamps a gateway-reported percentage into [0, 100].
pub(crate) fn clamp_pct(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::{DownGateway, RoutedGateway};

    fn empty_requirements() -> JdRequirements {
        JdRequirements::default()
    }

    fn routed_all_ok() -> RoutedGateway {
        RoutedGateway::new(vec![
            (
                "SKILLS RELEVANCE",
                r#"{"technical_match_pct": 80, "soft_match_pct": 60, "rationale": "r"}"#.to_string(),
            ),
            (
                "EXPERIENCE ALIGNMENT",
                r#"{"cv_years": 5.0, "rationale": "r"}"#.to_string(),
            ),
            (
                "INDUSTRY FIT",
                r#"{"domain_overlap_pct": 70, "data_tooling_pct": 70, "stakeholder_fit_pct": 60, "business_cycle_pct": 50, "rationale": "r"}"#.to_string(),
            ),
            (
                "ROLE SENIORITY",
                r#"{"experience_match_pct": 60, "responsibility_fit_pct": 60, "leadership_readiness": 50, "growth_trajectory": 70, "rationale": "r"}"#.to_string(),
            ),
            (
                "TECHNICAL DEPTH",
                r#"{"core_skills_match_pct": 70, "stack_fit_pct": 60, "complexity_readiness": 55, "learning_agility": 75, "jd_problem_complexity": 6, "rationale": "r"}"#.to_string(),
            ),
        ])
    }

    #[tokio::test]
    async fn test_analyze_all_collects_five_scores() {
        let reqs = empty_requirements();
        let input = AnalyzerInput {
            cv_text: "cv",
            jd_text: "jd",
            cv_skills: None,
            jd_skills: None,
            requirements: &reqs,
        };
        let analysis = analyze_all(&routed_all_ok(), &input, &ScoringWeights::default()).await;
        assert_eq!(analysis.scores.len(), 5);
        assert!(analysis.failures.is_empty());
        for dimension in Dimension::ALL {
            assert!(analysis.score(dimension).is_some());
        }
    }

    #[tokio::test]
    async fn test_one_failure_does_not_block_peers() {
        // Route everything except seniority; that one call fails.
        let gateway = RoutedGateway::new(
            routed_all_ok_routes_without("ROLE SENIORITY"),
        );
        let reqs = empty_requirements();
        let input = AnalyzerInput {
            cv_text: "cv",
            jd_text: "jd",
            cv_skills: None,
            jd_skills: None,
            requirements: &reqs,
        };
        let analysis = analyze_all(&gateway, &input, &ScoringWeights::default()).await;
        assert_eq!(analysis.scores.len(), 4);
        assert_eq!(analysis.failures.len(), 1);
        assert_eq!(analysis.failures[0].dimension, Dimension::Seniority);
    }

    fn routed_all_ok_routes_without(skip: &str) -> Vec<(&'static str, String)> {
        let routes = vec![
            (
                "SKILLS RELEVANCE",
                r#"{"technical_match_pct": 80, "soft_match_pct": 60, "rationale": "r"}"#.to_string(),
            ),
            (
                "EXPERIENCE ALIGNMENT",
                r#"{"cv_years": 5.0, "rationale": "r"}"#.to_string(),
            ),
            (
                "INDUSTRY FIT",
                r#"{"domain_overlap_pct": 70, "data_tooling_pct": 70, "stakeholder_fit_pct": 60, "business_cycle_pct": 50, "rationale": "r"}"#.to_string(),
            ),
            (
                "ROLE SENIORITY",
                r#"{"experience_match_pct": 60, "responsibility_fit_pct": 60, "leadership_readiness": 50, "growth_trajectory": 70, "rationale": "r"}"#.to_string(),
            ),
            (
                "TECHNICAL DEPTH",
                r#"{"core_skills_match_pct": 70, "stack_fit_pct": 60, "complexity_readiness": 55, "learning_agility": 75, "jd_problem_complexity": 6, "rationale": "r"}"#.to_string(),
            ),
        ];
        routes.into_iter().filter(|(k, _)| *k != skip).collect()
    }

    #[tokio::test]
    async fn test_total_outage_records_five_failures() {
        let reqs = empty_requirements();
        let input = AnalyzerInput {
            cv_text: "cv",
            jd_text: "jd",
            cv_skills: None,
            jd_skills: None,
            requirements: &reqs,
        };
        let analysis = analyze_all(&DownGateway, &input, &ScoringWeights::default()).await;
        assert!(analysis.scores.is_empty());
        assert_eq!(analysis.failures.len(), 5);
    }

    #[test]
    fn test_jd_context_includes_stated_requirements() {
        let reqs = JdRequirements {
            required: vec!["SQL".to_string()],
            preferred: vec!["Kafka".to_string()],
        };
        let input = AnalyzerInput {
            cv_text: "cv",
            jd_text: "jd text",
            cv_skills: None,
            jd_skills: None,
            requirements: &reqs,
        };
        let context = input.jd_context();
        assert!(context.contains("jd text"));
        assert!(context.contains("required: SQL"));
        assert!(context.contains("preferred: Kafka"));
    }
}
