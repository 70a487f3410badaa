//! Pipeline orchestration — drives extraction → comparison → component
//! analysis → bonus → aggregation for one (cv, company) pair.
//!
//! Every step writes an explicit status record whether it succeeds or fails;
//! a failed step blocks only its direct dependents. The analyzers consume
//! raw text, so they run even when extraction or comparison failed, and the
//! aggregator degrades to whatever inputs survived.
//!
//! `execute_pipeline` is pure with respect to storage: it takes the gateway
//! and the input texts and returns a `PipelineOutcome`; persisting the
//! artifacts is the caller's concern. That keeps the whole state machine
//! testable against a scripted gateway.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::analysis::aggregator::{aggregate, AtsScore};
use crate::analysis::analyzers::{analyze_all, AnalyzerInput, ComponentAnalysis, Dimension};
use crate::analysis::bonus::{calculate_bonus, RequirementBonus};
use crate::analysis::comparator::{compare_skills, ComparisonResult};
use crate::analysis::requirements::extract_requirements;
use crate::analysis::skills::{extract_skills, SkillSet, SubjectType};
use crate::analysis::weights::ScoringWeights;
use crate::errors::AppError;
use crate::llm_client::LanguageModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

/// One step's outcome, recorded regardless of success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub name: String,
    pub status: StepStatus,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl StepResult {
    fn succeeded(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: StepStatus::Succeeded,
            error: None,
            timestamp: Utc::now(),
        }
    }

    fn failed(name: &str, error: String) -> Self {
        Self {
            name: name.to_string(),
            status: StepStatus::Failed,
            error: Some(error),
            timestamp: Utc::now(),
        }
    }
}

/// Overall run status: complete (all steps succeeded), partial (some did),
/// failed (none did).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Complete,
    Partial,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Complete => "complete",
            RunStatus::Partial => "partial",
            RunStatus::Failed => "failed",
        }
    }
}

/// Orchestration record for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: Uuid,
    pub cv_id: Uuid,
    pub company: String,
    pub status: RunStatus,
    pub steps: Vec<StepResult>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Everything a run produced. Each field is present only if its step
/// succeeded; the aggregate may be present even when earlier steps failed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineArtifacts {
    pub cv_skills: Option<SkillSet>,
    pub jd_skills: Option<SkillSet>,
    pub comparison: Option<ComparisonResult>,
    pub components: ComponentAnalysis,
    pub bonus: Option<RequirementBonus>,
    pub ats_score: Option<AtsScore>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub run: PipelineRun,
    pub artifacts: PipelineArtifacts,
}

/// Extraction results handed to the pipeline when a side was already
/// extracted (cache hit or the synchronous leg of a background trigger).
#[derive(Debug, Clone, Default)]
pub struct PrefetchedSkills {
    pub cv: Option<SkillSet>,
    pub jd: Option<SkillSet>,
}

/// The extraction stage on its own: runs synchronously before a background
/// trigger acknowledges, so the caller's "extraction complete" is honest.
pub struct ExtractionStage {
    pub steps: Vec<StepResult>,
    pub cv_skills: Option<SkillSet>,
    pub jd_skills: Option<SkillSet>,
}

pub async fn extract_stage(
    llm: &dyn LanguageModel,
    cv_text: &str,
    jd_text: &str,
    prefetched: PrefetchedSkills,
) -> ExtractionStage {
    let mut steps = Vec::new();

    let cv_skills = match prefetched.cv {
        Some(skills) => {
            steps.push(StepResult::succeeded("extract_cv"));
            Some(skills)
        }
        None => record(
            &mut steps,
            "extract_cv",
            extract_skills(llm, cv_text, SubjectType::Cv).await,
        ),
    };
    let jd_skills = match prefetched.jd {
        Some(skills) => {
            steps.push(StepResult::succeeded("extract_jd"));
            Some(skills)
        }
        None => record(
            &mut steps,
            "extract_jd",
            extract_skills(llm, jd_text, SubjectType::Jd).await,
        ),
    };

    ExtractionStage {
        steps,
        cv_skills,
        jd_skills,
    }
}

/// The stages after extraction: compare, analyze (5x concurrent), bonus,
/// aggregate. Consumes whatever extraction produced.
pub async fn analysis_stages(
    llm: &dyn LanguageModel,
    weights: &ScoringWeights,
    cv_text: &str,
    jd_text: &str,
    cv_skills: Option<&SkillSet>,
    jd_skills: Option<&SkillSet>,
) -> (Vec<StepResult>, PipelineArtifacts) {
    let mut steps = Vec::new();

    // Comparing requires both skill sets; its failure does not gate the
    // analyzers, which can work from raw text.
    let comparison = match (cv_skills, jd_skills) {
        (Some(cv), Some(jd)) => record(
            &mut steps,
            "compare",
            compare_skills(llm, cv, jd).await,
        ),
        _ => {
            steps.push(StepResult::failed(
                "compare",
                "skill extraction unavailable for one or both sides".to_string(),
            ));
            None
        }
    };

    // The single requirements extraction every downstream consumer shares.
    let requirements = extract_requirements(jd_text);

    let input = AnalyzerInput {
        cv_text,
        jd_text,
        cv_skills,
        jd_skills,
        requirements: &requirements,
    };
    let components = analyze_all(llm, &input, weights).await;
    for dimension in Dimension::ALL {
        let name = format!("analyze:{}", dimension.as_str());
        match components.score(dimension) {
            Some(_) => steps.push(StepResult::succeeded(&name)),
            None => {
                let message = components
                    .failures
                    .iter()
                    .find(|f| f.dimension == dimension)
                    .map(|f| f.message.clone())
                    .unwrap_or_else(|| "analyzer did not run".to_string());
                steps.push(StepResult::failed(&name, message));
            }
        }
    }

    let bonus = match &comparison {
        Some(comparison) => {
            let bonus = calculate_bonus(&requirements, comparison, &weights.bonus);
            steps.push(StepResult::succeeded("bonus"));
            Some(bonus)
        }
        None => {
            steps.push(StepResult::failed(
                "bonus",
                "comparison result unavailable".to_string(),
            ));
            None
        }
    };

    let ats_score = record(
        &mut steps,
        "aggregate",
        aggregate(
            comparison.as_ref(),
            &components.scores,
            bonus.as_ref(),
            weights,
        ),
    );

    (
        steps,
        PipelineArtifacts {
            cv_skills: cv_skills.cloned(),
            jd_skills: jd_skills.cloned(),
            comparison,
            components,
            bonus,
            ats_score,
        },
    )
}

/// Runs the whole pipeline and seals the run record.
pub async fn execute_pipeline(
    llm: &dyn LanguageModel,
    weights: &ScoringWeights,
    cv_id: Uuid,
    company: &str,
    cv_text: &str,
    jd_text: &str,
    prefetched: PrefetchedSkills,
) -> PipelineOutcome {
    let started_at = Utc::now();
    info!("Pipeline starting for cv {cv_id}, company '{company}'");

    let extraction = extract_stage(llm, cv_text, jd_text, prefetched).await;
    let (stage_steps, artifacts) = analysis_stages(
        llm,
        weights,
        cv_text,
        jd_text,
        extraction.cv_skills.as_ref(),
        extraction.jd_skills.as_ref(),
    )
    .await;

    let mut steps = extraction.steps;
    steps.extend(stage_steps);

    let outcome = seal_run(cv_id, company, started_at, steps, artifacts);
    info!(
        "Pipeline finished for cv {cv_id}, company '{company}': {}",
        outcome.run.status.as_str()
    );
    outcome
}

/// Builds the final run record from accumulated steps.
pub fn seal_run(
    cv_id: Uuid,
    company: &str,
    started_at: DateTime<Utc>,
    steps: Vec<StepResult>,
    artifacts: PipelineArtifacts,
) -> PipelineOutcome {
    let succeeded = steps
        .iter()
        .filter(|s| s.status == StepStatus::Succeeded)
        .count();
    let failed = steps
        .iter()
        .filter(|s| s.status == StepStatus::Failed)
        .count();
    let status = if failed == 0 {
        RunStatus::Complete
    } else if succeeded > 0 {
        RunStatus::Partial
    } else {
        RunStatus::Failed
    };

    PipelineOutcome {
        run: PipelineRun {
            id: Uuid::new_v4(),
            cv_id,
            company: company.to_string(),
            status,
            steps,
            started_at,
            finished_at: Some(Utc::now()),
        },
        artifacts,
    }
}

fn record<T>(steps: &mut Vec<StepResult>, name: &str, result: Result<T, AppError>) -> Option<T> {
    match result {
        Ok(value) => {
            steps.push(StepResult::succeeded(name));
            Some(value)
        }
        Err(e) => {
            warn!("Pipeline step '{name}' failed: {e}");
            steps.push(StepResult::failed(name, e.to_string()));
            None
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Run exclusion
// ────────────────────────────────────────────────────────────────────────────

/// At-most-one in-flight pipeline run per (cv, company) key. Result records
/// are append-only, so the only discipline needed is refusing a second
/// concurrent run for the same key; different keys run fully in parallel.
#[derive(Default)]
pub struct RunRegistry {
    in_flight: Mutex<HashSet<String>>,
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the key, or returns None if a run is already in flight.
    /// The claim is released when the returned guard drops.
    pub fn try_acquire(self: &Arc<Self>, cv_id: Uuid, company: &str) -> Option<RunGuard> {
        let key = format!("{cv_id}:{company}");
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if in_flight.insert(key.clone()) {
            Some(RunGuard {
                registry: Arc::clone(self),
                key,
            })
        } else {
            None
        }
    }
}

pub struct RunGuard {
    registry: Arc<RunRegistry>,
    key: String,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.registry
            .in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.key);
    }
}
