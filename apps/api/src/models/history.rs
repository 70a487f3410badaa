//! Row types for the append-only analysis history tables.
//!
//! Every table is versioned-INSERT only: new results append with
//! `version = MAX(version) + 1` for their key, nothing is updated in place,
//! so the evolution of scores across repeated runs stays inspectable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Raw CV or JD text as handed over by the upload/ingestion collaborators.
/// `company` is NULL for CV documents and set for JD documents.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DocumentRow {
    pub id: Uuid,
    pub cv_id: Uuid,
    pub company: Option<String>,
    pub subject_type: String,
    pub content_hash: String,
    pub body: String,
    pub version: i32,
    pub created_at: DateTime<Utc>,
}

/// One extracted `SkillSet`, stored as its JSON payload and keyed by
/// content hash for extraction caching.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SkillSetRow {
    pub id: Uuid,
    pub cv_id: Uuid,
    pub company: Option<String>,
    pub subject_type: String,
    pub content_hash: String,
    pub payload: Value,
    pub version: i32,
    pub created_at: DateTime<Utc>,
}

/// Shared row shape of the comparison, component-analysis, and ATS-score
/// tables: a versioned JSON payload per (cv, company) key.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AnalysisEntryRow {
    pub id: Uuid,
    pub cv_id: Uuid,
    pub company: String,
    pub payload: Value,
    pub version: i32,
    pub created_at: DateTime<Utc>,
}

/// Orchestration record: one row per pipeline run, steps stored as JSON.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PipelineRunRow {
    pub id: Uuid,
    pub cv_id: Uuid,
    pub company: String,
    pub status: String,
    pub steps: Value,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}
