//! Technical Depth — depth and complexity of the candidate's technical work
//! against the complexity the JD implies.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;

use crate::analysis::analyzers::{clamp_pct, AnalyzerInput, ComponentAnalyzer, ComponentScore, Dimension};
use crate::analysis::prompts::{ANALYZER_SYSTEM, TECHNICAL_DEPTH_PROMPT_TEMPLATE};
use crate::analysis::weights::TechnicalDepthWeights;
use crate::errors::AppError;
use crate::llm_client::{complete_json, LanguageModel};

pub struct TechnicalDepth {
    weights: TechnicalDepthWeights,
}

impl TechnicalDepth {
    pub fn new(weights: TechnicalDepthWeights) -> Self {
        Self { weights }
    }
}

#[derive(Debug, Deserialize)]
struct RawTechnical {
    core_skills_match_pct: f64,
    stack_fit_pct: f64,
    complexity_readiness: f64,
    learning_agility: f64,
    /// 0-10 rating of the JD's problem complexity, recorded as a sub-metric
    /// but excluded from the weighted score.
    jd_problem_complexity: f64,
    #[serde(default)]
    rationale: String,
}

#[async_trait]
impl ComponentAnalyzer for TechnicalDepth {
    fn dimension(&self) -> Dimension {
        Dimension::Technical
    }

    async fn analyze(
        &self,
        llm: &dyn LanguageModel,
        input: &AnalyzerInput<'_>,
    ) -> Result<ComponentScore, AppError> {
        let prompt = TECHNICAL_DEPTH_PROMPT_TEMPLATE
            .replace("{cv}", &input.cv_context())
            .replace("{jd}", &input.jd_context());

        let raw: RawTechnical = complete_json(llm, &prompt, ANALYZER_SYSTEM)
            .await
            .map_err(AppError::from_gateway)?;

        let core_skills = clamp_pct(raw.core_skills_match_pct);
        let stack_fit = clamp_pct(raw.stack_fit_pct);
        let complexity_readiness = clamp_pct(raw.complexity_readiness);
        let learning_agility = clamp_pct(raw.learning_agility);
        let jd_problem_complexity = raw.jd_problem_complexity.clamp(0.0, 10.0);

        let score = clamp_pct(
            core_skills * self.weights.core_skills
                + stack_fit * self.weights.stack_fit
                + complexity_readiness * self.weights.complexity_readiness
                + learning_agility * self.weights.learning_agility,
        );

        let mut sub_metrics = BTreeMap::new();
        sub_metrics.insert("core_skills_match_pct".to_string(), core_skills);
        sub_metrics.insert("stack_fit_pct".to_string(), stack_fit);
        sub_metrics.insert("complexity_readiness".to_string(), complexity_readiness);
        sub_metrics.insert("learning_agility".to_string(), learning_agility);
        sub_metrics.insert("jd_problem_complexity".to_string(), jd_problem_complexity);

        Ok(ComponentScore {
            dimension: Dimension::Technical,
            score,
            sub_metrics,
            details: BTreeMap::new(),
            rationale: raw.rationale,
        })
    }
}
