//! Semantic comparison — aligns JD skill demands against CV skills per
//! category, then repairs the gateway's habitually inconsistent bookkeeping.
//!
//! The item lists are ground truth; the model's self-reported summary counts
//! are not. Repair recomputes every count from the lists against the
//! authoritative JD skill list, so `matched + missing == jd_total` holds by
//! construction. Summary counts are only accepted when no lists came back at
//! all and the counts are arithmetically consistent.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::analysis::prompts::{COMPARE_PROMPT_TEMPLATE, COMPARE_SYSTEM};
use crate::analysis::skills::{SkillCategory, SkillSet};
use crate::errors::AppError;
use crate::llm_client::{complete_json, LanguageModel};

/// One JD requirement resolved against one CV skill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedItem {
    pub jd_item: String,
    pub cv_item: String,
    #[serde(default)]
    pub rationale: String,
}

/// Per-category comparison after repair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryComparison {
    pub cv_total: u32,
    pub jd_total: u32,
    pub matched: u32,
    pub missing: u32,
    pub match_rate: f64,
    pub matched_items: Vec<MatchedItem>,
    pub missing_items: Vec<String>,
}

/// Full repaired comparison between a CV and a JD skill set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub technical: CategoryComparison,
    pub soft: CategoryComparison,
    pub domain: CategoryComparison,
    pub experience: CategoryComparison,
    pub education: CategoryComparison,
}

impl ComparisonResult {
    pub fn category(&self, category: SkillCategory) -> &CategoryComparison {
        match category {
            SkillCategory::Technical => &self.technical,
            SkillCategory::Soft => &self.soft,
            SkillCategory::Domain => &self.domain,
            SkillCategory::Experience => &self.experience,
            SkillCategory::Education => &self.education,
        }
    }

    /// All matched terms (JD side and CV side), lowercased — the coverage
    /// set the requirement bonus counts against.
    pub fn matched_terms(&self) -> HashSet<String> {
        let mut terms = HashSet::new();
        for category in SkillCategory::ALL {
            for item in &self.category(category).matched_items {
                terms.insert(item.jd_item.to_lowercase());
                terms.insert(item.cv_item.to_lowercase());
            }
        }
        terms
    }
}

/// Defensive schema for the raw gateway payload: everything optional so the
/// repair step can distinguish "absent" from "empty" from "inconsistent".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCategory {
    pub matched: Option<u32>,
    pub missing: Option<u32>,
    pub matched_items: Option<Vec<MatchedItem>>,
    pub missing_items: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct RawComparison {
    technical: Option<RawCategory>,
    soft: Option<RawCategory>,
    domain: Option<RawCategory>,
    experience: Option<RawCategory>,
    education: Option<RawCategory>,
}

impl RawComparison {
    fn take(&mut self, category: SkillCategory) -> Option<RawCategory> {
        match category {
            SkillCategory::Technical => self.technical.take(),
            SkillCategory::Soft => self.soft.take(),
            SkillCategory::Domain => self.domain.take(),
            SkillCategory::Experience => self.experience.take(),
            SkillCategory::Education => self.education.take(),
        }
    }
}

/// Compares CV skills against JD skills via the gateway and repairs the
/// result category by category.
pub async fn compare_skills(
    llm: &dyn LanguageModel,
    cv: &SkillSet,
    jd: &SkillSet,
) -> Result<ComparisonResult, AppError> {
    let prompt = COMPARE_PROMPT_TEMPLATE
        .replace("{cv_skills}", &serde_json::to_string_pretty(cv)?)
        .replace("{jd_skills}", &serde_json::to_string_pretty(jd)?);

    let mut raw: RawComparison = complete_json(llm, &prompt, COMPARE_SYSTEM)
        .await
        .map_err(AppError::from_gateway)?;

    let mut result = ComparisonResult::default();
    for category in SkillCategory::ALL {
        let repaired = repair_category(
            raw.take(category),
            jd.category(category),
            cv.category(category).len() as u32,
        )
        .map_err(|e| match e {
            AppError::InconsistentComparison(msg) => AppError::InconsistentComparison(format!(
                "category '{}': {msg}",
                category.as_str()
            )),
            other => other,
        })?;
        *result_category_mut(&mut result, category) = repaired;
    }

    info!(
        "Comparison repaired: technical {}/{} matched",
        result.technical.matched, result.technical.jd_total
    );

    Ok(result)
}

fn result_category_mut(
    result: &mut ComparisonResult,
    category: SkillCategory,
) -> &mut CategoryComparison {
    match category {
        SkillCategory::Technical => &mut result.technical,
        SkillCategory::Soft => &mut result.soft,
        SkillCategory::Domain => &mut result.domain,
        SkillCategory::Experience => &mut result.experience,
        SkillCategory::Education => &mut result.education,
    }
}

/// Repairs one category of raw gateway output against the authoritative JD
/// item list.
///
/// - Item lists present: dedupe so each JD item is matched at most once,
///   drop matches for JD items the JD does not actually contain, then
///   recompute `matched`, `missing_items`, `missing`, `match_rate`.
/// - Lists absent, summary counts present and `matched + missing == jd_total`:
///   accept the counts.
/// - Neither: `InconsistentComparison` — a result is never fabricated.
///
/// Idempotent: feeding an already-consistent category back through leaves it
/// unchanged.
pub fn repair_category(
    raw: Option<RawCategory>,
    jd_items: &[String],
    cv_total: u32,
) -> Result<CategoryComparison, AppError> {
    let jd_total = jd_items.len() as u32;

    // Nothing demanded, nothing to account for.
    if jd_total == 0 {
        return Ok(CategoryComparison {
            cv_total,
            ..CategoryComparison::default()
        });
    }

    let raw = raw.ok_or_else(|| {
        AppError::InconsistentComparison("category absent from gateway payload".to_string())
    })?;

    if raw.matched_items.is_some() || raw.missing_items.is_some() {
        let jd_keys: HashSet<String> = jd_items.iter().map(|i| i.to_lowercase()).collect();

        // Each JD item resolves to at most one reported match; matches
        // against JD items that do not exist are dropped.
        let mut claimed = HashSet::new();
        let matched_items: Vec<MatchedItem> = raw
            .matched_items
            .unwrap_or_default()
            .into_iter()
            .filter(|m| jd_keys.contains(&m.jd_item.to_lowercase()))
            .filter(|m| claimed.insert(m.jd_item.to_lowercase()))
            .collect();

        let matched = matched_items.len() as u32;
        if raw.matched.is_some_and(|m| m != matched) {
            warn!(
                "Comparison summary claimed matched={:?} but item list yields {matched}; \
                 trusting the list",
                raw.matched
            );
        }

        let missing_items: Vec<String> = jd_items
            .iter()
            .filter(|i| !claimed.contains(&i.to_lowercase()))
            .cloned()
            .collect();
        let missing = missing_items.len() as u32;

        return Ok(CategoryComparison {
            cv_total,
            jd_total,
            matched,
            missing,
            match_rate: match_rate(matched, jd_total),
            matched_items,
            missing_items,
        });
    }

    // No lists at all: fall back to the summary counts, but only when they
    // account for every JD item exactly once.
    match (raw.matched, raw.missing) {
        (Some(matched), Some(missing)) if matched + missing == jd_total => {
            Ok(CategoryComparison {
                cv_total,
                jd_total,
                matched,
                missing,
                match_rate: match_rate(matched, jd_total),
                matched_items: Vec::new(),
                missing_items: Vec::new(),
            })
        }
        (matched, missing) => Err(AppError::InconsistentComparison(format!(
            "no item lists, and summary counts matched={matched:?} missing={missing:?} \
             do not account for jd_total={jd_total}"
        ))),
    }
}

fn match_rate(matched: u32, jd_total: u32) -> f64 {
    if jd_total == 0 {
        0.0
    } else {
        100.0 * f64::from(matched) / f64::from(jd_total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::StaticGateway;

    fn jd_technical() -> Vec<String> {
        vec![
            "SQL".to_string(),
            "Power BI".to_string(),
            "Excel".to_string(),
            "VBA".to_string(),
        ]
    }

    fn item(jd: &str, cv: &str) -> MatchedItem {
        MatchedItem {
            jd_item: jd.to_string(),
            cv_item: cv.to_string(),
            rationale: String::new(),
        }
    }

    #[test]
    fn test_consistent_lists_pass_through() {
        // CV covers 3 of 4 JD requirements.
        let raw = RawCategory {
            matched: Some(3),
            missing: Some(1),
            matched_items: Some(vec![
                item("SQL", "SQL"),
                item("Power BI", "Power BI"),
                item("Excel", "Excel"),
            ]),
            missing_items: Some(vec!["VBA".to_string()]),
        };
        let repaired = repair_category(Some(raw), &jd_technical(), 3).unwrap();
        assert_eq!(repaired.matched, 3);
        assert_eq!(repaired.missing, 1);
        assert!((repaired.match_rate - 75.0).abs() < f64::EPSILON);
        assert_eq!(repaired.missing_items, vec!["VBA"]);
    }

    #[test]
    fn test_summary_overridden_by_item_list() {
        // The model claims matched=3 but only lists 2 items.
        let raw = RawCategory {
            matched: Some(3),
            missing: Some(1),
            matched_items: Some(vec![item("SQL", "SQL"), item("Excel", "Excel")]),
            missing_items: Some(vec!["VBA".to_string()]),
        };
        let repaired = repair_category(Some(raw), &jd_technical(), 3).unwrap();
        assert_eq!(repaired.matched, 2);
        assert_eq!(repaired.missing, 2);
        assert!((repaired.match_rate - 50.0).abs() < f64::EPSILON);
        assert!(repaired.missing_items.contains(&"Power BI".to_string()));
        assert!(repaired.missing_items.contains(&"VBA".to_string()));
    }

    #[test]
    fn test_conservation_holds_after_repair() {
        // matched + missing == jd_total, whatever the model claimed.
        let raws = vec![
            RawCategory {
                matched: Some(99),
                missing: Some(0),
                matched_items: Some(vec![item("SQL", "PostgreSQL")]),
                missing_items: Some(vec![]),
            },
            RawCategory {
                matched: None,
                missing: None,
                matched_items: None,
                missing_items: Some(vec!["VBA".to_string()]),
            },
        ];
        for raw in raws {
            let repaired = repair_category(Some(raw), &jd_technical(), 5).unwrap();
            assert_eq!(repaired.matched + repaired.missing, repaired.jd_total);
        }
    }

    #[test]
    fn test_repair_is_idempotent() {
        // Feeding a repaired category back through changes nothing.
        let raw = RawCategory {
            matched: Some(3),
            missing: Some(1),
            matched_items: Some(vec![item("SQL", "SQL"), item("Excel", "Excel")]),
            missing_items: Some(vec!["VBA".to_string()]),
        };
        let first = repair_category(Some(raw), &jd_technical(), 3).unwrap();
        let again = RawCategory {
            matched: Some(first.matched),
            missing: Some(first.missing),
            matched_items: Some(first.matched_items.clone()),
            missing_items: Some(first.missing_items.clone()),
        };
        let second = repair_category(Some(again), &jd_technical(), 3).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_jd_item_matched_at_most_once() {
        // Two claimed matches for the same JD item must not double-count.
        let raw = RawCategory {
            matched: None,
            missing: None,
            matched_items: Some(vec![item("SQL", "PostgreSQL"), item("sql", "MySQL")]),
            missing_items: Some(vec![]),
        };
        let repaired = repair_category(Some(raw), &jd_technical(), 4).unwrap();
        assert_eq!(repaired.matched, 1);
        assert_eq!(repaired.matched_items[0].cv_item, "PostgreSQL");
    }

    #[test]
    fn test_fabricated_jd_items_dropped() {
        let raw = RawCategory {
            matched: None,
            missing: None,
            matched_items: Some(vec![item("Kubernetes", "Docker"), item("SQL", "SQL")]),
            missing_items: Some(vec![]),
        };
        let repaired = repair_category(Some(raw), &jd_technical(), 4).unwrap();
        assert_eq!(repaired.matched, 1);
        assert_eq!(repaired.matched_items[0].jd_item, "SQL");
    }

    #[test]
    fn test_summary_fallback_when_lists_absent() {
        let raw = RawCategory {
            matched: Some(3),
            missing: Some(1),
            matched_items: None,
            missing_items: None,
        };
        let repaired = repair_category(Some(raw), &jd_technical(), 5).unwrap();
        assert_eq!(repaired.matched, 3);
        assert!((repaired.match_rate - 75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_irreconcilable_payload_is_an_error() {
        // No lists, and the counts do not account for the JD items.
        let raw = RawCategory {
            matched: Some(9),
            missing: Some(9),
            matched_items: None,
            missing_items: None,
        };
        let result = repair_category(Some(raw), &jd_technical(), 5);
        assert!(matches!(result, Err(AppError::InconsistentComparison(_))));
    }

    #[test]
    fn test_absent_category_is_an_error_when_jd_demands_exist() {
        let result = repair_category(None, &jd_technical(), 5);
        assert!(matches!(result, Err(AppError::InconsistentComparison(_))));
    }

    #[test]
    fn test_empty_jd_category_yields_zero_rate_without_error() {
        let repaired = repair_category(None, &[], 7).unwrap();
        assert_eq!(repaired.jd_total, 0);
        assert_eq!(repaired.match_rate, 0.0);
        assert_eq!(repaired.cv_total, 7);
    }

    #[tokio::test]
    async fn test_compare_skills_end_to_end() {
        let cv = SkillSet {
            technical: vec!["SQL".to_string(), "Power BI".to_string(), "Excel".to_string()],
            ..SkillSet::default()
        };
        let jd = SkillSet {
            technical: jd_technical(),
            ..SkillSet::default()
        };
        let gateway = StaticGateway(
            r#"{
                "technical": {
                    "matched": 3,
                    "missing": 1,
                    "matched_items": [
                        {"jd_item": "SQL", "cv_item": "SQL", "rationale": "exact"},
                        {"jd_item": "Power BI", "cv_item": "Power BI", "rationale": "exact"},
                        {"jd_item": "Excel", "cv_item": "Excel", "rationale": "exact"}
                    ],
                    "missing_items": ["VBA"]
                },
                "soft": {"matched": 0, "missing": 0, "matched_items": [], "missing_items": []},
                "domain": {"matched": 0, "missing": 0, "matched_items": [], "missing_items": []},
                "experience": {"matched": 0, "missing": 0, "matched_items": [], "missing_items": []},
                "education": {"matched": 0, "missing": 0, "matched_items": [], "missing_items": []}
            }"#
            .to_string(),
        );

        let result = compare_skills(&gateway, &cv, &jd).await.unwrap();
        assert_eq!(result.technical.matched, 3);
        assert_eq!(result.technical.missing_items, vec!["VBA"]);
        assert!((result.technical.match_rate - 75.0).abs() < f64::EPSILON);
        assert_eq!(result.technical.cv_total, 3);
        // Empty JD categories repaired to zeros, not errors.
        assert_eq!(result.soft.jd_total, 0);
    }

    #[test]
    fn test_matched_terms_collects_both_sides_lowercased() {
        let mut result = ComparisonResult::default();
        result.technical.matched_items = vec![item("Power BI", "PowerBI Desktop")];
        let terms = result.matched_terms();
        assert!(terms.contains("power bi"));
        assert!(terms.contains("powerbi desktop"));
    }
}
