//! Requirement bonus — a signed score adjustment based on how many of the
//! JD's explicitly required/preferred keywords the CV covers.
//!
//! Coverage is counted against the comparator's matched-item terms; a
//! requirement with zero stated items contributes exactly 0 to the bonus.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::analysis::comparator::ComparisonResult;
use crate::analysis::requirements::JdRequirements;
use crate::analysis::weights::BonusWeights;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequirementBonus {
    pub required_total: u32,
    pub required_matched: u32,
    pub preferred_total: u32,
    pub preferred_matched: u32,
    pub bonus_points: f64,
}

/// Counts requirement coverage and computes the clamped bonus.
pub fn calculate_bonus(
    requirements: &JdRequirements,
    comparison: &ComparisonResult,
    weights: &BonusWeights,
) -> RequirementBonus {
    let matched_terms = comparison.matched_terms();

    let required_total = requirements.required.len() as u32;
    let required_matched = count_covered(&requirements.required, &matched_terms);
    let preferred_total = requirements.preferred.len() as u32;
    let preferred_matched = count_covered(&requirements.preferred, &matched_terms);

    let required_term = coverage_term(
        required_matched,
        required_total,
        weights.required_bonus,
        weights.required_penalty,
    );
    let preferred_term = coverage_term(
        preferred_matched,
        preferred_total,
        weights.preferred_bonus,
        weights.preferred_penalty,
    );

    RequirementBonus {
        required_total,
        required_matched,
        preferred_total,
        preferred_matched,
        bonus_points: (required_term + preferred_term).clamp(weights.floor, weights.ceiling),
    }
}

/// `ratio * bonus - (1 - ratio) * penalty`, or exactly 0 when nothing was
/// stated — never a division by zero.
fn coverage_term(matched: u32, total: u32, bonus: f64, penalty: f64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let ratio = f64::from(matched) / f64::from(total);
    ratio * bonus - (1.0 - ratio) * penalty
}

/// A keyword is covered when any matched term contains it or it contains a
/// matched term, case-insensitively.
fn count_covered(keywords: &[String], matched_terms: &HashSet<String>) -> u32 {
    keywords
        .iter()
        .filter(|keyword| {
            let keyword = keyword.to_lowercase();
            matched_terms
                .iter()
                .any(|term| term.contains(&keyword) || keyword.contains(term.as_str()))
        })
        .count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::comparator::MatchedItem;

    fn comparison_with_matches(terms: &[(&str, &str)]) -> ComparisonResult {
        let mut comparison = ComparisonResult::default();
        comparison.technical.matched_items = terms
            .iter()
            .map(|(jd, cv)| MatchedItem {
                jd_item: jd.to_string(),
                cv_item: cv.to_string(),
                rationale: String::new(),
            })
            .collect();
        comparison
    }

    fn requirements(required: &[&str], preferred: &[&str]) -> JdRequirements {
        JdRequirements {
            required: required.iter().map(|s| s.to_string()).collect(),
            preferred: preferred.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_zero_required_total_contributes_zero() {
        // No required keywords stated: the required term must be exactly zero.
        let comparison = comparison_with_matches(&[("Kafka", "Kafka")]);
        let reqs = requirements(&[], &["Kafka"]);
        let bonus = calculate_bonus(&reqs, &comparison, &BonusWeights::default());
        assert_eq!(bonus.required_total, 0);
        // Only the preferred term remains: full coverage → +4.0.
        assert!((bonus.bonus_points - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_full_coverage_hits_the_ceiling() {
        let comparison = comparison_with_matches(&[("SQL", "SQL"), ("Kafka", "Kafka")]);
        let reqs = requirements(&["SQL"], &["Kafka"]);
        let weights = BonusWeights::default();
        let bonus = calculate_bonus(&reqs, &comparison, &weights);
        assert!((bonus.bonus_points - weights.ceiling).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zero_coverage_hits_the_floor() {
        let comparison = ComparisonResult::default();
        let reqs = requirements(&["SQL"], &["Kafka"]);
        let weights = BonusWeights::default();
        let bonus = calculate_bonus(&reqs, &comparison, &weights);
        assert!((bonus.bonus_points - weights.floor).abs() < f64::EPSILON);
        assert_eq!(bonus.required_matched, 0);
    }

    #[test]
    fn test_matched_never_exceeds_total() {
        let comparison =
            comparison_with_matches(&[("SQL", "SQL"), ("SQL databases", "PostgreSQL")]);
        let reqs = requirements(&["SQL"], &[]);
        let bonus = calculate_bonus(&reqs, &comparison, &BonusWeights::default());
        assert!(bonus.required_matched <= bonus.required_total);
        assert_eq!(bonus.required_matched, 1);
    }

    #[test]
    fn test_containment_matching_both_directions() {
        // Requirement "Power BI dashboards" covered by matched term "power bi";
        // requirement "SQL" covered by matched term "sql server".
        let comparison = comparison_with_matches(&[("Power BI", "power bi"), ("db", "SQL Server")]);
        let reqs = requirements(&["Power BI dashboards", "SQL"], &[]);
        let bonus = calculate_bonus(&reqs, &comparison, &BonusWeights::default());
        assert_eq!(bonus.required_matched, 2);
    }

    #[test]
    fn test_partial_coverage_is_signed_mix() {
        // 1 of 2 required covered: 0.5*6 - 0.5*3.5 = 1.25; no preferred.
        let comparison = comparison_with_matches(&[("SQL", "SQL")]);
        let reqs = requirements(&["SQL", "VBA"], &[]);
        let bonus = calculate_bonus(&reqs, &comparison, &BonusWeights::default());
        assert!((bonus.bonus_points - 1.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_requirements_yield_zero_bonus() {
        let comparison = comparison_with_matches(&[("SQL", "SQL")]);
        let reqs = requirements(&[], &[]);
        let bonus = calculate_bonus(&reqs, &comparison, &BonusWeights::default());
        assert_eq!(bonus.bonus_points, 0.0);
    }
}
