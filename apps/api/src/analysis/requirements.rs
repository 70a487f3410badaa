//! Requirements extraction — deterministic classification of JD-stated items
//! into required vs preferred by linguistic markers. No gateway call.
//!
//! Runs exactly once per pipeline run; the result is the single source of
//! truth for every component that needs required/preferred counts.

use serde::{Deserialize, Serialize};

use crate::analysis::skills::dedup_case_insensitive;

const REQUIRED_MARKERS: &[&str] = &[
    "required",
    "requirement",
    "must have",
    "must-have",
    "minimum",
    "you will need",
    "essential",
];

const PREFERRED_MARKERS: &[&str] = &[
    "preferred",
    "nice to have",
    "nice-to-have",
    "bonus",
    "a plus",
    "desirable",
];

/// JD-stated requirements, split by obligation strength.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JdRequirements {
    pub required: Vec<String>,
    pub preferred: Vec<String>,
}

impl JdRequirements {
    pub fn is_empty(&self) -> bool {
        self.required.is_empty() && self.preferred.is_empty()
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Mode {
    None,
    Required,
    Preferred,
}

/// Extracts required and preferred items from raw JD text.
///
/// Handles two JD shapes:
/// - inline lists: `"Required: Java, Spring Boot, SQL."`
/// - sectioned lists: a marker header line followed by bullet lines.
/// A line that states a marker without a list (`"5+ years Rust required"`)
/// is kept whole as one item. Items appearing in both lists stay required.
pub fn extract_requirements(jd_text: &str) -> JdRequirements {
    let mut required = Vec::new();
    let mut preferred = Vec::new();
    let mut mode = Mode::None;

    for line in jd_text.lines() {
        let line = line.trim();
        if line.is_empty() {
            mode = Mode::None;
            continue;
        }

        if let Some((new_mode, items)) = classify_marker_line(line) {
            match new_mode {
                Mode::Required => required.extend(items),
                Mode::Preferred => preferred.extend(items),
                Mode::None => {}
            }
            mode = new_mode;
            continue;
        }

        if let Some(item) = strip_bullet(line) {
            match mode {
                Mode::Required => required.push(item.to_string()),
                Mode::Preferred => preferred.push(item.to_string()),
                Mode::None => {}
            }
            continue;
        }

        // A plain sentence ends any open section.
        mode = Mode::None;
    }

    let required = dedup_case_insensitive(required);
    let required_keys: Vec<String> = required.iter().map(|r| r.to_lowercase()).collect();
    let preferred = dedup_case_insensitive(preferred)
        .into_iter()
        .filter(|p| !required_keys.contains(&p.to_lowercase()))
        .collect();

    JdRequirements {
        required,
        preferred,
    }
}

/// Detects a marker on the line and returns the mode it opens plus any
/// inline items after a colon. A marker line with no colon (or nothing after
/// it) contributes the whole line as a single item when it reads like a
/// statement, or just opens a section when it reads like a header.
fn classify_marker_line(line: &str) -> Option<(Mode, Vec<String>)> {
    // ASCII lowering keeps byte offsets valid for slicing `line` below.
    let lower = line.to_ascii_lowercase();

    for (markers, mode) in [
        (REQUIRED_MARKERS, Mode::Required),
        (PREFERRED_MARKERS, Mode::Preferred),
    ] {
        let Some(pos) = markers.iter().filter_map(|m| lower.find(m)).min() else {
            continue;
        };

        if let Some(colon) = line[pos..].find(':').map(|i| i + pos) {
            let items = split_list(&line[colon + 1..]);
            return Some((mode, items));
        }

        // "5+ years Rust required" — the line itself is the item.
        let item = strip_bullet(line).unwrap_or(line).to_string();
        return Some((mode, split_list(&item)));
    }

    None
}

/// Splits an inline list on commas and semicolons, trimming trailing periods.
fn split_list(text: &str) -> Vec<String> {
    text.split([',', ';'])
        .map(|s| s.trim().trim_end_matches('.').trim())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn strip_bullet(line: &str) -> Option<&str> {
    for bullet in ["- ", "* ", "• "] {
        if let Some(rest) = line.strip_prefix(bullet) {
            return Some(rest.trim());
        }
    }
    None
}
