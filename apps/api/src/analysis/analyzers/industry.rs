//! Industry Fit — domain/sector overlap between the CV's work history and
//! the JD's industry.
//!
//! Conservative scoring: when domain overlap comes back below the configured
//! threshold, the overall score is clamped to the configured ceiling — a
//! candidate from an unrelated sector cannot score "good fit" merely because
//! some skills transfer.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use crate::analysis::analyzers::{clamp_pct, AnalyzerInput, ComponentAnalyzer, ComponentScore, Dimension};
use crate::analysis::prompts::{ANALYZER_SYSTEM, INDUSTRY_FIT_PROMPT_TEMPLATE};
use crate::analysis::weights::IndustryWeights;
use crate::errors::AppError;
use crate::llm_client::{complete_json, LanguageModel};

pub struct IndustryFit {
    weights: IndustryWeights,
}

impl IndustryFit {
    pub fn new(weights: IndustryWeights) -> Self {
        Self { weights }
    }
}

#[derive(Debug, Deserialize)]
struct RawIndustry {
    domain_overlap_pct: f64,
    data_tooling_pct: f64,
    stakeholder_fit_pct: f64,
    business_cycle_pct: f64,
    #[serde(default)]
    rationale: String,
}

#[async_trait]
impl ComponentAnalyzer for IndustryFit {
    fn dimension(&self) -> Dimension {
        Dimension::Industry
    }

    async fn analyze(
        &self,
        llm: &dyn LanguageModel,
        input: &AnalyzerInput<'_>,
    ) -> Result<ComponentScore, AppError> {
        let prompt = INDUSTRY_FIT_PROMPT_TEMPLATE
            .replace("{cv}", input.cv_text)
            .replace("{jd}", &input.jd_context());

        let raw: RawIndustry = complete_json(llm, &prompt, ANALYZER_SYSTEM)
            .await
            .map_err(AppError::from_gateway)?;

        let domain_overlap = clamp_pct(raw.domain_overlap_pct);
        let data_tooling = clamp_pct(raw.data_tooling_pct);
        let stakeholder_fit = clamp_pct(raw.stakeholder_fit_pct);
        let business_cycle = clamp_pct(raw.business_cycle_pct);

        let weighted = domain_overlap * self.weights.domain_overlap
            + data_tooling * self.weights.data_tooling
            + stakeholder_fit * self.weights.stakeholder_fit
            + business_cycle * self.weights.business_cycle;

        let mut details = BTreeMap::new();
        let score = if domain_overlap < self.weights.cap_overlap_threshold {
            let capped = weighted.min(self.weights.conservative_cap);
            if capped < weighted {
                info!(
                    "Industry fit capped at {capped:.1} (domain overlap {domain_overlap:.1}% \
                     below threshold {:.1}%)",
                    self.weights.cap_overlap_threshold
                );
                details.insert("conservative_cap".to_string(), "applied".to_string());
            }
            capped
        } else {
            weighted
        };

        let mut sub_metrics = BTreeMap::new();
        sub_metrics.insert("domain_overlap_pct".to_string(), domain_overlap);
        sub_metrics.insert("data_tooling_pct".to_string(), data_tooling);
        sub_metrics.insert("stakeholder_fit_pct".to_string(), stakeholder_fit);
        sub_metrics.insert("business_cycle_pct".to_string(), business_cycle);

        Ok(ComponentScore {
            dimension: Dimension::Industry,
            score: clamp_pct(score),
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

    fn input(reqs: &JdRequirements) -> AnalyzerInput<'_> {
        AnalyzerInput {
            cv_text: "academic research CV",
            jd_text: "non-profit fundraising role",
            cv_skills: None,
            jd_skills: None,
            requirements: reqs,
        }
    }

    #[tokio::test]
    async fn test_unrelated_sector_is_capped() {
        // Low domain overlap, everything else glowing.
        let gateway = StaticGateway(
            r#"{
                "domain_overlap_pct": 10,
                "data_tooling_pct": 95,
                "stakeholder_fit_pct": 90,
                "business_cycle_pct": 90,
                "rationale": "skills transfer"
            }"#
            .to_string(),
        );
        let reqs = JdRequirements::default();
        let analyzer = IndustryFit::new(IndustryWeights::default());
        let score = analyzer.analyze(&gateway, &input(&reqs)).await.unwrap();
        assert!(
            score.score <= 55.0,
            "expected conservative cap, got {}",
            score.score
        );
        assert_eq!(score.details["conservative_cap"], "applied");
    }

    #[tokio::test]
    async fn test_matching_sector_is_not_capped() {
        let gateway = StaticGateway(
            r#"{
                "domain_overlap_pct": 80,
                "data_tooling_pct": 80,
                "stakeholder_fit_pct": 70,
                "business_cycle_pct": 60,
                "rationale": "same sector"
            }"#
            .to_string(),
        );
        let reqs = JdRequirements::default();
        let analyzer = IndustryFit::new(IndustryWeights::default());
        let score = analyzer.analyze(&gateway, &input(&reqs)).await.unwrap();
        // 80*0.4 + 80*0.25 + 70*0.2 + 60*0.15 = 75
        assert!((score.score - 75.0).abs() < 1e-9);
        assert!(!score.details.contains_key("conservative_cap"));
    }

    #[tokio::test]
    async fn test_low_overlap_with_already_low_score_not_marked_capped() {
        let gateway = StaticGateway(
            r#"{
                "domain_overlap_pct": 10,
                "data_tooling_pct": 20,
                "stakeholder_fit_pct": 20,
                "business_cycle_pct": 20,
                "rationale": "poor fit overall"
            }"#
            .to_string(),
        );
        let reqs = JdRequirements::default();
        let analyzer = IndustryFit::new(IndustryWeights::default());
        let score = analyzer.analyze(&gateway, &input(&reqs)).await.unwrap();
        assert!(score.score < 55.0);
        assert!(!score.details.contains_key("conservative_cap"));
    }

    #[tokio::test]
    async fn test_all_four_sub_metrics_recorded() {
        let gateway = StaticGateway(
            r#"{"domain_overlap_pct": 50, "data_tooling_pct": 50, "stakeholder_fit_pct": 50, "business_cycle_pct": 50, "rationale": ""}"#
                .to_string(),
        );
        let reqs = JdRequirements::default();
        let analyzer = IndustryFit::new(IndustryWeights::default());
        let score = analyzer.analyze(&gateway, &input(&reqs)).await.unwrap();
        assert_eq!(score.sub_metrics.len(), 4);
    }
}
