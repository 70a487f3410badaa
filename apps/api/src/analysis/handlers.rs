//! Axum route handlers for the analysis API.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::analysis::aggregator::AtsScore;
use crate::analysis::analyzers::{analyze_all, AnalyzerInput, ComponentAnalysis};
use crate::analysis::comparator::{compare_skills, ComparisonResult};
use crate::analysis::history;
use crate::analysis::pipeline::{
    analysis_stages, extract_stage, seal_run, PipelineRun, PrefetchedSkills,
};
use crate::analysis::requirements::extract_requirements;
use crate::analysis::skills::{content_hash, extract_skills, SkillSet, SubjectType};
use crate::errors::AppError;
use crate::models::history::PipelineRunRow;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ExtractSkillsRequest {
    pub cv_id: Uuid,
    pub subject_type: SubjectType,
    /// Required for JD documents; ignored for CV documents.
    pub company: Option<String>,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ExtractSkillsResponse {
    pub skill_set: SkillSet,
    pub content_hash: String,
    pub cached: bool,
    pub version: i32,
}

#[derive(Debug, Deserialize)]
pub struct PairRequest {
    pub cv_id: Uuid,
    pub company: String,
}

#[derive(Debug, Serialize)]
pub struct CompareResponse {
    pub comparison: ComparisonResult,
    pub version: i32,
}

#[derive(Debug, Deserialize)]
pub struct CvIdQuery {
    pub cv_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct PipelineRequest {
    pub cv_id: Uuid,
}

/// Immediate acknowledgment for the background pipeline variant: extraction
/// has run synchronously, the remaining steps continue in the background.
#[derive(Debug, Serialize)]
pub struct PipelineAck {
    pub run_id: Uuid,
    pub status: String,
    pub message: String,
    pub cv_skills_extracted: bool,
    pub jd_skills_extracted: bool,
}

/// Read-side aggregate: whatever subset of results exists for the pair.
/// Partial is valid — a half-finished pipeline is visible, not an error.
#[derive(Debug, Serialize)]
pub struct AnalysisResults {
    pub cv_skills: Option<SkillSet>,
    pub jd_skills: Option<SkillSet>,
    pub comparison: Option<ComparisonResult>,
    pub component_analysis: Option<ComponentAnalysis>,
    pub ats_score: Option<AtsScore>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/skills/extract
///
/// Stores the document text and returns its categorized skill set, reusing a
/// previously extracted set when the content hash matches.
pub async fn handle_extract_skills(
    State(state): State<AppState>,
    Json(request): Json<ExtractSkillsRequest>,
) -> Result<Json<ExtractSkillsResponse>, AppError> {
    if request.text.trim().is_empty() {
        return Err(AppError::EmptyInput("text cannot be empty".to_string()));
    }
    let company = match (request.subject_type, request.company.as_deref()) {
        (SubjectType::Jd, None) => {
            return Err(AppError::Validation(
                "company is required for jd documents".to_string(),
            ))
        }
        (SubjectType::Jd, Some(company)) => Some(company),
        (SubjectType::Cv, _) => None,
    };

    let hash = content_hash(&request.text);
    history::record_document(
        &state.db,
        request.cv_id,
        company,
        request.subject_type,
        &hash,
        &request.text,
    )
    .await
    .map_err(AppError::Internal)?;

    let (skill_set, cached) =
        match history::find_cached_skill_set(&state.db, request.subject_type, &hash)
            .await
            .map_err(AppError::Internal)?
        {
            Some(cached) => {
                info!(
                    "Skill extraction cache hit for {} hash {}",
                    request.subject_type.as_str(),
                    &hash[..12]
                );
                (cached, true)
            }
            None => (
                extract_skills(state.llm.as_ref(), &request.text, request.subject_type).await?,
                false,
            ),
        };

    let version = history::record_skill_set(
        &state.db,
        request.cv_id,
        company,
        request.subject_type,
        &hash,
        &skill_set,
    )
    .await
    .map_err(AppError::Internal)?;

    Ok(Json(ExtractSkillsResponse {
        skill_set,
        content_hash: hash,
        cached,
        version,
    }))
}

/// POST /api/v1/analysis/compare
///
/// Compares the latest stored skill sets for a (cv, company) pair.
pub async fn handle_compare(
    State(state): State<AppState>,
    Json(request): Json<PairRequest>,
) -> Result<Json<CompareResponse>, AppError> {
    let cv = history::latest_skill_set(&state.db, request.cv_id, None, SubjectType::Cv)
        .await
        .map_err(AppError::Internal)?
        .ok_or_else(|| {
            AppError::NotFound(format!("no CV skill set for cv {}", request.cv_id))
        })?;
    let jd = history::latest_skill_set(
        &state.db,
        request.cv_id,
        Some(&request.company),
        SubjectType::Jd,
    )
    .await
    .map_err(AppError::Internal)?
    .ok_or_else(|| {
        AppError::NotFound(format!("no JD skill set for company '{}'", request.company))
    })?;

    let comparison = compare_skills(state.llm.as_ref(), &cv, &jd).await?;
    let version =
        history::record_comparison(&state.db, request.cv_id, &request.company, &comparison)
            .await
            .map_err(AppError::Internal)?;

    Ok(Json(CompareResponse {
        comparison,
        version,
    }))
}

/// POST /api/v1/analysis/components
///
/// Runs the five component analyzers over the latest stored documents.
pub async fn handle_run_components(
    State(state): State<AppState>,
    Json(request): Json<PairRequest>,
) -> Result<Json<ComponentAnalysis>, AppError> {
    let (cv_text, jd_text) = load_documents(&state, request.cv_id, &request.company).await?;

    let cv_skills = history::latest_skill_set(&state.db, request.cv_id, None, SubjectType::Cv)
        .await
        .map_err(AppError::Internal)?;
    let jd_skills = history::latest_skill_set(
        &state.db,
        request.cv_id,
        Some(&request.company),
        SubjectType::Jd,
    )
    .await
    .map_err(AppError::Internal)?;

    let requirements = extract_requirements(&jd_text);
    let input = AnalyzerInput {
        cv_text: &cv_text,
        jd_text: &jd_text,
        cv_skills: cv_skills.as_ref(),
        jd_skills: jd_skills.as_ref(),
        requirements: &requirements,
    };
    let analysis = analyze_all(state.llm.as_ref(), &input, &state.weights).await;

    history::record_component_analysis(&state.db, request.cv_id, &request.company, &analysis)
        .await
        .map_err(AppError::Internal)?;

    Ok(Json(analysis))
}

/// GET /api/v1/analysis/:company/results?cv_id=...
///
/// Returns whatever subset of results exists — never errors just because the
/// pipeline has not finished.
pub async fn handle_get_results(
    State(state): State<AppState>,
    Path(company): Path<String>,
    Query(params): Query<CvIdQuery>,
) -> Result<Json<AnalysisResults>, AppError> {
    let cv_id = params.cv_id;
    let cv_skills = history::latest_skill_set(&state.db, cv_id, None, SubjectType::Cv)
        .await
        .map_err(AppError::Internal)?;
    let jd_skills = history::latest_skill_set(&state.db, cv_id, Some(&company), SubjectType::Jd)
        .await
        .map_err(AppError::Internal)?;
    let comparison = history::latest_comparison(&state.db, cv_id, &company)
        .await
        .map_err(AppError::Internal)?;
    let component_analysis = history::latest_component_analysis(&state.db, cv_id, &company)
        .await
        .map_err(AppError::Internal)?;
    let ats_score = history::latest_ats_score(&state.db, cv_id, &company)
        .await
        .map_err(AppError::Internal)?;

    Ok(Json(AnalysisResults {
        cv_skills,
        jd_skills,
        comparison,
        component_analysis,
        ats_score,
    }))
}

/// GET /api/v1/analysis/:company/runs?cv_id=...
pub async fn handle_list_runs(
    State(state): State<AppState>,
    Path(company): Path<String>,
    Query(params): Query<CvIdQuery>,
) -> Result<Json<Vec<PipelineRunRow>>, AppError> {
    let runs = history::list_pipeline_runs(&state.db, params.cv_id, &company)
        .await
        .map_err(AppError::Internal)?;
    Ok(Json(runs))
}

/// POST /api/v1/analysis/:company/pipeline
///
/// Background variant: extraction runs synchronously so the caller's
/// acknowledgment is honest; the remaining stages continue in a spawned
/// task whose every step lands in the run record.
pub async fn handle_trigger_pipeline(
    State(state): State<AppState>,
    Path(company): Path<String>,
    Json(request): Json<PipelineRequest>,
) -> Result<Json<PipelineAck>, AppError> {
    let cv_id = request.cv_id;
    let (cv_text, jd_text) = load_documents(&state, cv_id, &company).await?;

    let guard = state.runs.try_acquire(cv_id, &company).ok_or_else(|| {
        AppError::RunInProgress(format!("cv {cv_id} / company '{company}'"))
    })?;

    let started_at = chrono::Utc::now();
    let prefetched = prefetch_skills(&state, &cv_text, &jd_text).await;
    let extraction = extract_stage(state.llm.as_ref(), &cv_text, &jd_text, prefetched).await;

    let run_id = Uuid::new_v4();
    let ack = PipelineAck {
        run_id,
        status: "analysis_running".to_string(),
        message: "extraction complete, analysis running".to_string(),
        cv_skills_extracted: extraction.cv_skills.is_some(),
        jd_skills_extracted: extraction.jd_skills.is_some(),
    };

    let cv_hash = content_hash(&cv_text);
    let jd_hash = content_hash(&jd_text);
    tokio::spawn(async move {
        // The guard travels into the task: the key stays claimed until the
        // run record is persisted.
        let _guard = guard;
        let (stage_steps, artifacts) = analysis_stages(
            state.llm.as_ref(),
            &state.weights,
            &cv_text,
            &jd_text,
            extraction.cv_skills.as_ref(),
            extraction.jd_skills.as_ref(),
        )
        .await;

        let mut steps = extraction.steps;
        steps.extend(stage_steps);
        let mut outcome = seal_run(cv_id, &company, started_at, steps, artifacts);
        outcome.run.id = run_id;

        if let Err(e) = history::persist_outcome(&state.db, &outcome, &cv_hash, &jd_hash).await {
            error!("Failed to persist pipeline run {run_id}: {e}");
        }
    });

    Ok(Json(ack))
}

/// POST /api/v1/analysis/:company/pipeline/sync
///
/// Blocking variant for operational/debugging use: runs all stages in order,
/// persists, and returns the full run record.
pub async fn handle_trigger_pipeline_sync(
    State(state): State<AppState>,
    Path(company): Path<String>,
    Json(request): Json<PipelineRequest>,
) -> Result<Json<PipelineRun>, AppError> {
    let cv_id = request.cv_id;
    let (cv_text, jd_text) = load_documents(&state, cv_id, &company).await?;

    let _guard = state.runs.try_acquire(cv_id, &company).ok_or_else(|| {
        AppError::RunInProgress(format!("cv {cv_id} / company '{company}'"))
    })?;

    let started_at = chrono::Utc::now();
    let prefetched = prefetch_skills(&state, &cv_text, &jd_text).await;
    let extraction = extract_stage(state.llm.as_ref(), &cv_text, &jd_text, prefetched).await;
    let (stage_steps, artifacts) = analysis_stages(
        state.llm.as_ref(),
        &state.weights,
        &cv_text,
        &jd_text,
        extraction.cv_skills.as_ref(),
        extraction.jd_skills.as_ref(),
    )
    .await;

    let mut steps = extraction.steps;
    steps.extend(stage_steps);
    let outcome = seal_run(cv_id, &company, started_at, steps, artifacts);

    history::persist_outcome(
        &state.db,
        &outcome,
        &content_hash(&cv_text),
        &content_hash(&jd_text),
    )
    .await
    .map_err(AppError::Internal)?;

    Ok(Json(outcome.run))
}

// ────────────────────────────────────────────────────────────────────────────
// Shared helpers
// ────────────────────────────────────────────────────────────────────────────

async fn load_documents(
    state: &AppState,
    cv_id: Uuid,
    company: &str,
) -> Result<(String, String), AppError> {
    let cv = history::latest_document(&state.db, cv_id, None, SubjectType::Cv)
        .await
        .map_err(AppError::Internal)?
        .ok_or_else(|| AppError::NotFound(format!("no CV document for cv {cv_id}")))?;
    let jd = history::latest_document(&state.db, cv_id, Some(company), SubjectType::Jd)
        .await
        .map_err(AppError::Internal)?
        .ok_or_else(|| AppError::NotFound(format!("no JD document for company '{company}'")))?;
    Ok((cv.body, jd.body))
}

/// Content-hash cache lookups so a pipeline run skips gateway extraction for
/// unchanged documents. A cache miss (or lookup failure) just means the
/// pipeline extracts fresh.
async fn prefetch_skills(state: &AppState, cv_text: &str, jd_text: &str) -> PrefetchedSkills {
    let cv = history::find_cached_skill_set(&state.db, SubjectType::Cv, &content_hash(cv_text))
        .await
        .unwrap_or_default();
    let jd = history::find_cached_skill_set(&state.db, SubjectType::Jd, &content_hash(jd_text))
        .await
        .unwrap_or_default();
    PrefetchedSkills { cv, jd }
}
