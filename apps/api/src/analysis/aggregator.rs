//! ATS score aggregation — a deterministic weighted roll-up of the
//! comparison match rates, the component analysis, and the requirement
//! bonus into one final 0-100 score.
//!
//! Partial input degrades the result and labels it partial; it never errors
//! unless neither a comparison nor any component score exists.

use serde::{Deserialize, Serialize};

use crate::analysis::analyzers::{ComponentScore, Dimension};
use crate::analysis::bonus::RequirementBonus;
use crate::analysis::comparator::ComparisonResult;
use crate::analysis::weights::{ComponentWeights, DirectMatchWeights, ScoringWeights};
use crate::errors::AppError;

/// Score band with its label and recommendation text. Thresholds are fixed:
/// ≥90 exceptional, 80-89 strong, 70-79 good, 50-69 moderate, <50 poor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryStatus {
    Exceptional,
    Strong,
    Good,
    Moderate,
    Poor,
}

impl CategoryStatus {
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            CategoryStatus::Exceptional
        } else if score >= 80.0 {
            CategoryStatus::Strong
        } else if score >= 70.0 {
            CategoryStatus::Good
        } else if score >= 50.0 {
            CategoryStatus::Moderate
        } else {
            CategoryStatus::Poor
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CategoryStatus::Exceptional => "Exceptional match",
            CategoryStatus::Strong => "Strong match",
            CategoryStatus::Good => "Good match",
            CategoryStatus::Moderate => "Moderate match",
            CategoryStatus::Poor => "Poor match",
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            CategoryStatus::Exceptional => {
                "Outstanding alignment. Apply as-is; this CV should clear automated screening comfortably."
            }
            CategoryStatus::Strong => {
                "Strong alignment. Minor tailoring of wording to the JD's own vocabulary would close the remaining gap."
            }
            CategoryStatus::Good => {
                "Good alignment. Address the highest-weighted missing skills before applying."
            }
            CategoryStatus::Moderate => {
                "Moderate alignment. Significant tailoring is needed; consider strengthening the CV's coverage of the stated requirements."
            }
            CategoryStatus::Poor => {
                "Weak alignment. This role likely expects a substantially different profile; a rewrite alone is unlikely to close the gap."
            }
        }
    }
}

/// Category 1: direct-match points derived from comparison match rates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectMatchBreakdown {
    pub technical_points: f64,
    pub domain_points: f64,
    pub soft_points: f64,
    pub subtotal: f64,
    pub max_points: f64,
    pub present: bool,
}

/// Category 2: component-analysis points plus the presentation sub-buckets.
/// Bucket values are 0-100 means of their available dimensions, `None` when
/// no contributing dimension succeeded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComponentBreakdown {
    pub core_competency: Option<f64>,
    pub experience_seniority: Option<f64>,
    pub potential_ability: Option<f64>,
    pub company_fit: Option<f64>,
    pub subtotal: f64,
    pub max_points: f64,
    pub dimensions_present: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub direct_match: DirectMatchBreakdown,
    pub component_analysis: ComponentBreakdown,
    pub bonus_points: f64,
}

/// The final aggregate. Immutable once produced; appended to the
/// per-(cv, company) history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtsScore {
    pub final_score: f64,
    pub category_status: CategoryStatus,
    pub label: String,
    pub recommendation: String,
    /// True whenever the score was computed from less than the full input
    /// set — a consumer must never mistake a degraded score for a full one.
    pub partial: bool,
    pub breakdown: ScoreBreakdown,
}

/// Combines whatever inputs exist into the final score.
///
/// Deterministic: identical inputs always produce the identical score.
pub fn aggregate(
    comparison: Option<&ComparisonResult>,
    components: &[ComponentScore],
    bonus: Option<&RequirementBonus>,
    weights: &ScoringWeights,
) -> Result<AtsScore, AppError> {
    if comparison.is_none() && components.is_empty() {
        return Err(AppError::InsufficientData(
            "neither a comparison result nor any component score is available".to_string(),
        ));
    }

    let direct_match = match comparison {
        Some(c) => direct_match_breakdown(c, &weights.direct_match),
        None => DirectMatchBreakdown {
            max_points: weights.direct_match.total_points,
            present: false,
            ..DirectMatchBreakdown::default()
        },
    };

    let component_analysis = component_breakdown(components, &weights.component);
    let bonus_points = bonus.map(|b| b.bonus_points).unwrap_or(0.0);

    let final_score = (direct_match.subtotal + component_analysis.subtotal + bonus_points)
        .clamp(0.0, 100.0);
    let partial = comparison.is_none() || components.len() < Dimension::ALL.len();

    let category_status = CategoryStatus::from_score(final_score);
    let recommendation = if partial {
        format!(
            "{} (computed from partial data)",
            category_status.recommendation()
        )
    } else {
        category_status.recommendation().to_string()
    };

    Ok(AtsScore {
        final_score,
        category_status,
        label: category_status.label().to_string(),
        recommendation,
        partial,
        breakdown: ScoreBreakdown {
            direct_match,
            component_analysis,
            bonus_points,
        },
    })
}

fn direct_match_breakdown(
    comparison: &ComparisonResult,
    weights: &DirectMatchWeights,
) -> DirectMatchBreakdown {
    let points = |rate: f64, weight: f64| rate / 100.0 * weight * weights.total_points;

    let technical_points = points(comparison.technical.match_rate, weights.technical);
    let domain_points = points(comparison.domain.match_rate, weights.domain);
    let soft_points = points(comparison.soft.match_rate, weights.soft);

    DirectMatchBreakdown {
        technical_points,
        domain_points,
        soft_points,
        subtotal: technical_points + domain_points + soft_points,
        max_points: weights.total_points,
        present: true,
    }
}

fn component_breakdown(
    components: &[ComponentScore],
    weights: &ComponentWeights,
) -> ComponentBreakdown {
    let score_of = |dimension: Dimension| {
        components
            .iter()
            .find(|c| c.dimension == dimension)
            .map(|c| c.score)
    };
    let sub_metric_of = |dimension: Dimension, key: &str| {
        components
            .iter()
            .find(|c| c.dimension == dimension)
            .and_then(|c| c.sub_metrics.get(key).copied())
    };

    let subtotal = if components.is_empty() {
        0.0
    } else {
        let mean: f64 =
            components.iter().map(|c| c.score).sum::<f64>() / components.len() as f64;
        mean / 100.0 * weights.total_points
    };

    ComponentBreakdown {
        core_competency: mean_of(&[
            score_of(Dimension::Skills),
            score_of(Dimension::Technical),
        ]),
        experience_seniority: mean_of(&[
            score_of(Dimension::Experience),
            score_of(Dimension::Seniority),
        ]),
        potential_ability: mean_of(&[
            sub_metric_of(Dimension::Seniority, "growth_trajectory"),
            sub_metric_of(Dimension::Technical, "learning_agility"),
        ]),
        company_fit: score_of(Dimension::Industry),
        subtotal,
        max_points: weights.total_points,
        dimensions_present: components.len(),
    }
}

/// Mean over the present values; `None` when none are present.
fn mean_of(values: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        None
    } else {
        Some(present.iter().sum::<f64>() / present.len() as f64)
    }
}
