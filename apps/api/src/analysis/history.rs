//! Append-only persistence for analysis results.
//!
//! CRITICAL: every write is a versioned INSERT (`MAX(version) + 1` for its
//! key). Nothing is ever UPDATEd in place, so repeated runs accumulate an
//! inspectable history and concurrent readers never observe torn state.

use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::analysis::aggregator::AtsScore;
use crate::analysis::analyzers::ComponentAnalysis;
use crate::analysis::comparator::ComparisonResult;
use crate::analysis::pipeline::{PipelineOutcome, PipelineRun};
use crate::analysis::skills::{SkillSet, SubjectType};
use crate::models::history::{AnalysisEntryRow, DocumentRow, PipelineRunRow, SkillSetRow};

/// Records a raw document (CV or JD text) as a new version.
pub async fn record_document(
    pool: &PgPool,
    cv_id: Uuid,
    company: Option<&str>,
    subject: SubjectType,
    content_hash: &str,
    body: &str,
) -> Result<i32> {
    let version: Option<i32> = sqlx::query_scalar(
        r#"
        SELECT MAX(version) FROM document_entries
        WHERE cv_id = $1 AND company IS NOT DISTINCT FROM $2 AND subject_type = $3
        "#,
    )
    .bind(cv_id)
    .bind(company)
    .bind(subject.as_str())
    .fetch_one(pool)
    .await?;
    let version = version.unwrap_or(0) + 1;

    sqlx::query(
        r#"
        INSERT INTO document_entries (id, cv_id, company, subject_type, content_hash, body, version)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(cv_id)
    .bind(company)
    .bind(subject.as_str())
    .bind(content_hash)
    .bind(body)
    .bind(version)
    .execute(pool)
    .await?;

    info!(
        "Recorded {} document v{version} for cv {cv_id} (company {company:?})",
        subject.as_str()
    );
    Ok(version)
}

/// Latest document text for a key, if any.
pub async fn latest_document(
    pool: &PgPool,
    cv_id: Uuid,
    company: Option<&str>,
    subject: SubjectType,
) -> Result<Option<DocumentRow>> {
    Ok(sqlx::query_as::<_, DocumentRow>(
        r#"
        SELECT * FROM document_entries
        WHERE cv_id = $1 AND company IS NOT DISTINCT FROM $2 AND subject_type = $3
        ORDER BY version DESC
        LIMIT 1
        "#,
    )
    .bind(cv_id)
    .bind(company)
    .bind(subject.as_str())
    .fetch_optional(pool)
    .await?)
}

/// Appends an extracted skill set for a key.
pub async fn record_skill_set(
    pool: &PgPool,
    cv_id: Uuid,
    company: Option<&str>,
    subject: SubjectType,
    content_hash: &str,
    skills: &SkillSet,
) -> Result<i32> {
    let version: Option<i32> = sqlx::query_scalar(
        r#"
        SELECT MAX(version) FROM skill_set_entries
        WHERE cv_id = $1 AND company IS NOT DISTINCT FROM $2 AND subject_type = $3
        "#,
    )
    .bind(cv_id)
    .bind(company)
    .bind(subject.as_str())
    .fetch_one(pool)
    .await?;
    let version = version.unwrap_or(0) + 1;

    sqlx::query(
        r#"
        INSERT INTO skill_set_entries (id, cv_id, company, subject_type, content_hash, payload, version)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(cv_id)
    .bind(company)
    .bind(subject.as_str())
    .bind(content_hash)
    .bind(serde_json::to_value(skills)?)
    .bind(version)
    .execute(pool)
    .await?;

    Ok(version)
}

/// Cache lookup: any previously extracted skill set for the same subject
/// type and content hash, regardless of which CV/company produced it.
pub async fn find_cached_skill_set(
    pool: &PgPool,
    subject: SubjectType,
    content_hash: &str,
) -> Result<Option<SkillSet>> {
    let row: Option<SkillSetRow> = sqlx::query_as(
        r#"
        SELECT * FROM skill_set_entries
        WHERE subject_type = $1 AND content_hash = $2
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .bind(subject.as_str())
    .bind(content_hash)
    .fetch_optional(pool)
    .await?;

    Ok(row.and_then(|r| serde_json::from_value(r.payload).ok()))
}

/// Latest skill set for a key, if any.
pub async fn latest_skill_set(
    pool: &PgPool,
    cv_id: Uuid,
    company: Option<&str>,
    subject: SubjectType,
) -> Result<Option<SkillSet>> {
    let row: Option<SkillSetRow> = sqlx::query_as(
        r#"
        SELECT * FROM skill_set_entries
        WHERE cv_id = $1 AND company IS NOT DISTINCT FROM $2 AND subject_type = $3
        ORDER BY version DESC
        LIMIT 1
        "#,
    )
    .bind(cv_id)
    .bind(company)
    .bind(subject.as_str())
    .fetch_optional(pool)
    .await?;

    deserialize_payload(row.map(|r| r.payload))
}

pub async fn record_comparison(
    pool: &PgPool,
    cv_id: Uuid,
    company: &str,
    comparison: &ComparisonResult,
) -> Result<i32> {
    append_payload(pool, "comparison_entries", cv_id, company, comparison).await
}

pub async fn latest_comparison(
    pool: &PgPool,
    cv_id: Uuid,
    company: &str,
) -> Result<Option<ComparisonResult>> {
    latest_payload(pool, "comparison_entries", cv_id, company).await
}

pub async fn record_component_analysis(
    pool: &PgPool,
    cv_id: Uuid,
    company: &str,
    analysis: &ComponentAnalysis,
) -> Result<i32> {
    append_payload(pool, "component_analysis_entries", cv_id, company, analysis).await
}

pub async fn latest_component_analysis(
    pool: &PgPool,
    cv_id: Uuid,
    company: &str,
) -> Result<Option<ComponentAnalysis>> {
    latest_payload(pool, "component_analysis_entries", cv_id, company).await
}

pub async fn record_ats_score(
    pool: &PgPool,
    cv_id: Uuid,
    company: &str,
    score: &AtsScore,
) -> Result<i32> {
    append_payload(pool, "ats_score_entries", cv_id, company, score).await
}

pub async fn latest_ats_score(
    pool: &PgPool,
    cv_id: Uuid,
    company: &str,
) -> Result<Option<AtsScore>> {
    latest_payload(pool, "ats_score_entries", cv_id, company).await
}

/// Records a sealed pipeline run.
pub async fn record_pipeline_run(pool: &PgPool, run: &PipelineRun) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO pipeline_runs (id, cv_id, company, status, steps, started_at, finished_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(run.id)
    .bind(run.cv_id)
    .bind(&run.company)
    .bind(run.status.as_str())
    .bind(serde_json::to_value(&run.steps)?)
    .bind(run.started_at)
    .bind(run.finished_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn list_pipeline_runs(
    pool: &PgPool,
    cv_id: Uuid,
    company: &str,
) -> Result<Vec<PipelineRunRow>> {
    Ok(sqlx::query_as::<_, PipelineRunRow>(
        r#"
        SELECT * FROM pipeline_runs
        WHERE cv_id = $1 AND company = $2
        ORDER BY started_at DESC
        "#,
    )
    .bind(cv_id)
    .bind(company)
    .fetch_all(pool)
    .await?)
}

/// Persists every artifact a run produced, then the run record itself.
/// Persistence of one artifact failing is logged and does not drop the rest.
pub async fn persist_outcome(
    pool: &PgPool,
    outcome: &PipelineOutcome,
    cv_hash: &str,
    jd_hash: &str,
) -> Result<()> {
    let cv_id = outcome.run.cv_id;
    let company = outcome.run.company.as_str();

    if let Some(skills) = &outcome.artifacts.cv_skills {
        log_persist_failure(
            "cv skill set",
            record_skill_set(pool, cv_id, None, SubjectType::Cv, cv_hash, skills).await,
        );
    }
    if let Some(skills) = &outcome.artifacts.jd_skills {
        log_persist_failure(
            "jd skill set",
            record_skill_set(pool, cv_id, Some(company), SubjectType::Jd, jd_hash, skills).await,
        );
    }
    if let Some(comparison) = &outcome.artifacts.comparison {
        log_persist_failure(
            "comparison",
            record_comparison(pool, cv_id, company, comparison).await,
        );
    }
    if !outcome.artifacts.components.scores.is_empty()
        || !outcome.artifacts.components.failures.is_empty()
    {
        log_persist_failure(
            "component analysis",
            record_component_analysis(pool, cv_id, company, &outcome.artifacts.components).await,
        );
    }
    if let Some(score) = &outcome.artifacts.ats_score {
        log_persist_failure(
            "ats score",
            record_ats_score(pool, cv_id, company, score).await,
        );
    }

    record_pipeline_run(pool, &outcome.run).await
}

fn log_persist_failure(what: &str, result: Result<i32>) {
    if let Err(e) = result {
        warn!("Failed to persist {what}: {e}");
    }
}

async fn append_payload<T: Serialize>(
    pool: &PgPool,
    table: &str,
    cv_id: Uuid,
    company: &str,
    payload: &T,
) -> Result<i32> {
    let version: Option<i32> = sqlx::query_scalar(&format!(
        "SELECT MAX(version) FROM {table} WHERE cv_id = $1 AND company = $2"
    ))
    .bind(cv_id)
    .bind(company)
    .fetch_one(pool)
    .await?;
    let version = version.unwrap_or(0) + 1;

    sqlx::query(&format!(
        "INSERT INTO {table} (id, cv_id, company, payload, version) VALUES ($1, $2, $3, $4, $5)"
    ))
    .bind(Uuid::new_v4())
    .bind(cv_id)
    .bind(company)
    .bind(serde_json::to_value(payload)?)
    .bind(version)
    .execute(pool)
    .await?;

    Ok(version)
}

async fn latest_payload<T: DeserializeOwned>(
    pool: &PgPool,
    table: &str,
    cv_id: Uuid,
    company: &str,
) -> Result<Option<T>> {
    let row: Option<AnalysisEntryRow> = sqlx::query_as(&format!(
        "SELECT * FROM {table} WHERE cv_id = $1 AND company = $2 \
         ORDER BY version DESC LIMIT 1"
    ))
    .bind(cv_id)
    .bind(company)
    .fetch_optional(pool)
    .await?;

    deserialize_payload(row.map(|r| r.payload))
}

fn deserialize_payload<T: DeserializeOwned>(payload: Option<serde_json::Value>) -> Result<Option<T>> {
    match payload {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}
