//! Tunable scoring constants.
//!
//! Every weight the pipeline uses lives here, carried in `AppState` and
//! threaded into the call sites — nothing is hardcoded per call. The
//! `Default` impls are the shipped tuning.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub skills: SkillsRelevanceWeights,
    pub industry: IndustryWeights,
    pub technical: TechnicalDepthWeights,
    pub direct_match: DirectMatchWeights,
    pub component: ComponentWeights,
    pub bonus: BonusWeights,
}

/// Skills Relevance: overall score weighted toward technical skills.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillsRelevanceWeights {
    pub technical: f64,
    pub soft: f64,
}

impl Default for SkillsRelevanceWeights {
    fn default() -> Self {
        Self {
            technical: 0.7,
            soft: 0.3,
        }
    }
}

/// Industry Fit sub-metric weights plus the conservative cap: when domain
/// overlap falls below `cap_overlap_threshold`, the overall score is clamped
/// to `conservative_cap` no matter what the other sub-metrics say.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndustryWeights {
    pub domain_overlap: f64,
    pub data_tooling: f64,
    pub stakeholder_fit: f64,
    pub business_cycle: f64,
    pub cap_overlap_threshold: f64,
    pub conservative_cap: f64,
}

impl Default for IndustryWeights {
    fn default() -> Self {
        Self {
            domain_overlap: 0.4,
            data_tooling: 0.25,
            stakeholder_fit: 0.2,
            business_cycle: 0.15,
            cap_overlap_threshold: 30.0,
            conservative_cap: 55.0,
        }
    }
}

/// Technical Depth sub-metric weights (the 0-10 problem-complexity rating is
/// recorded but does not enter the weighted score).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechnicalDepthWeights {
    pub core_skills: f64,
    pub stack_fit: f64,
    pub complexity_readiness: f64,
    pub learning_agility: f64,
}

impl Default for TechnicalDepthWeights {
    fn default() -> Self {
        Self {
            core_skills: 0.4,
            stack_fit: 0.3,
            complexity_readiness: 0.2,
            learning_agility: 0.1,
        }
    }
}

/// Category 1 of the final score: direct match rates from the comparison,
/// technical weighted highest. Category weights must sum to 1.0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectMatchWeights {
    pub technical: f64,
    pub domain: f64,
    pub soft: f64,
    pub total_points: f64,
}

impl Default for DirectMatchWeights {
    fn default() -> Self {
        Self {
            technical: 0.5,
            domain: 0.3,
            soft: 0.2,
            total_points: 40.0,
        }
    }
}

/// Category 2 of the final score: the component-analysis average scaled to
/// `total_points`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentWeights {
    pub total_points: f64,
}

impl Default for ComponentWeights {
    fn default() -> Self {
        Self { total_points: 60.0 }
    }
}

/// Requirement-coverage bonus weights. The defaults are chosen so the
/// formula's natural range is exactly [floor, ceiling]:
/// full coverage yields `required_bonus + preferred_bonus`, zero coverage
/// yields `-(required_penalty + preferred_penalty)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BonusWeights {
    pub required_bonus: f64,
    pub required_penalty: f64,
    pub preferred_bonus: f64,
    pub preferred_penalty: f64,
    pub floor: f64,
    pub ceiling: f64,
}

impl Default for BonusWeights {
    fn default() -> Self {
        Self {
            required_bonus: 6.0,
            required_penalty: 3.5,
            preferred_bonus: 4.0,
            preferred_penalty: 1.5,
            floor: -5.0,
            ceiling: 10.0,
        }
    }
}
