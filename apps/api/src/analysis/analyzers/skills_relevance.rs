//! Skills Relevance — overlap between CV and JD skill sets, weighted toward
//! technical skills.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;

use crate::analysis::analyzers::{clamp_pct, AnalyzerInput, ComponentAnalyzer, ComponentScore, Dimension};
use crate::analysis::prompts::{ANALYZER_SYSTEM, SKILLS_RELEVANCE_PROMPT_TEMPLATE};
use crate::analysis::weights::SkillsRelevanceWeights;
use crate::errors::AppError;
use crate::llm_client::{complete_json, LanguageModel};

pub struct SkillsRelevance {
    weights: SkillsRelevanceWeights,
}

impl SkillsRelevance {
    pub fn new(weights: SkillsRelevanceWeights) -> Self {
        Self { weights }
    }
}

#[derive(Debug, Deserialize)]
struct RawSkillsRelevance {
    technical_match_pct: f64,
    soft_match_pct: f64,
    #[serde(default)]
    rationale: String,
}

#[async_trait]
impl ComponentAnalyzer for SkillsRelevance {
    fn dimension(&self) -> Dimension {
        Dimension::Skills
    }

    async fn analyze(
        &self,
        llm: &dyn LanguageModel,
        input: &AnalyzerInput<'_>,
    ) -> Result<ComponentScore, AppError> {
        let prompt = SKILLS_RELEVANCE_PROMPT_TEMPLATE
            .replace("{cv}", &input.cv_context())
            .replace("{jd}", &input.jd_context());

        let raw: RawSkillsRelevance = complete_json(llm, &prompt, ANALYZER_SYSTEM)
            .await
            .map_err(AppError::from_gateway)?;

        let technical = clamp_pct(raw.technical_match_pct);
        let soft = clamp_pct(raw.soft_match_pct);
        let score = clamp_pct(technical * self.weights.technical + soft * self.weights.soft);

        let mut sub_metrics = BTreeMap::new();
        sub_metrics.insert("technical_match_pct".to_string(), technical);
        sub_metrics.insert("soft_match_pct".to_string(), soft);

        Ok(ComponentScore {
            dimension: Dimension::Skills,
            score,
            sub_metrics,
            details: BTreeMap::new(),
            rationale: raw.rationale,
        })
    }
}
