//! Role Seniority — demonstrated seniority and leadership signals against
//! the level the JD asks for.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;

use crate::analysis::analyzers::{clamp_pct, AnalyzerInput, ComponentAnalyzer, ComponentScore, Dimension};
use crate::analysis::prompts::{ANALYZER_SYSTEM, ROLE_SENIORITY_PROMPT_TEMPLATE};
use crate::errors::AppError;
use crate::llm_client::{complete_json, LanguageModel};

pub struct RoleSeniority;

#[derive(Debug, Deserialize)]
struct RawSeniority {
    experience_match_pct: f64,
    responsibility_fit_pct: f64,
    leadership_readiness: f64,
    growth_trajectory: f64,
    #[serde(default)]
    rationale: String,
}

#[async_trait]
impl ComponentAnalyzer for RoleSeniority {
    fn dimension(&self) -> Dimension {
        Dimension::Seniority
    }

    async fn analyze(
        &self,
        llm: &dyn LanguageModel,
        input: &AnalyzerInput<'_>,
    ) -> Result<ComponentScore, AppError> {
        let prompt = ROLE_SENIORITY_PROMPT_TEMPLATE
            .replace("{cv}", input.cv_text)
            .replace("{jd}", &input.jd_context());

        let raw: RawSeniority = complete_json(llm, &prompt, ANALYZER_SYSTEM)
            .await
            .map_err(AppError::from_gateway)?;

        let experience_match = clamp_pct(raw.experience_match_pct);
        let responsibility_fit = clamp_pct(raw.responsibility_fit_pct);
        let leadership_readiness = clamp_pct(raw.leadership_readiness);
        let growth_trajectory = clamp_pct(raw.growth_trajectory);

        let score =
            (experience_match + responsibility_fit + leadership_readiness + growth_trajectory)
                / 4.0;

        let mut sub_metrics = BTreeMap::new();
        sub_metrics.insert("experience_match_pct".to_string(), experience_match);
        sub_metrics.insert("responsibility_fit_pct".to_string(), responsibility_fit);
        sub_metrics.insert("leadership_readiness".to_string(), leadership_readiness);
        sub_metrics.insert("growth_trajectory".to_string(), growth_trajectory);

        Ok(ComponentScore {
            dimension: Dimension::Seniority,
            score,
            sub_metrics,
            details: BTreeMap::new(),
            rationale: raw.rationale,
        })
    }
}
