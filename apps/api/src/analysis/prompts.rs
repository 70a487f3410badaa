// All gateway prompt constants for the analysis pipeline.
// Each template carries a distinctive first line so logs (and tests) can
// tell the calls apart.

/// System prompt for skill extraction — enforces JSON-only output.
pub const SKILL_EXTRACT_SYSTEM: &str =
    "You are an expert recruiter and skills taxonomist. \
    Extract categorized skills from the supplied document. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Skill extraction prompt. Replace `{subject_kind}` and `{text}` before sending.
pub const SKILL_EXTRACT_PROMPT_TEMPLATE: &str = r#"SKILL EXTRACTION from a {subject_kind}.

Read the document below and extract every skill it states or clearly implies,
sorted into five categories. Return a JSON object with this EXACT schema:
{
  "technical": ["SQL", "Power BI"],
  "soft": ["stakeholder communication"],
  "domain": ["supply chain analytics"],
  "experience": ["5 years as data analyst"],
  "education": ["BSc Computer Science"]
}

Rules:
- "technical": languages, tools, frameworks, platforms, methodologies.
- "soft": interpersonal and organizational skills.
- "domain": industry/sector knowledge areas.
- "experience": role and tenure statements.
- "education": degrees, certifications, formal training.
- Keep each item short (a phrase, not a sentence). Do not invent skills the
  document does not support. Empty categories are allowed as empty arrays.

DOCUMENT:
{text}"#;

/// System prompt for the semantic comparison call.
pub const COMPARE_SYSTEM: &str =
    "You are an expert at matching candidate skills against job requirements. \
    Judge semantic equivalence, not string equality. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Semantic comparison prompt. Replace `{cv_skills}` and `{jd_skills}`.
pub const COMPARE_PROMPT_TEMPLATE: &str = r#"SEMANTIC SKILL COMPARISON between a candidate CV and a job description.

For EACH of the five categories (technical, soft, domain, experience,
education), align the JD items against the CV items. A match may be exact, a
synonym, or hierarchical (a specific tool satisfies a general requirement for
its category). Each JD item matches AT MOST ONE CV item.

Return a JSON object with this EXACT schema (one entry per category):
{
  "technical": {
    "matched": 2,
    "missing": 1,
    "matched_items": [
      {"jd_item": "SQL", "cv_item": "PostgreSQL", "rationale": "PostgreSQL is a SQL database"}
    ],
    "missing_items": ["VBA"]
  },
  "soft": { ... },
  "domain": { ... },
  "experience": { ... },
  "education": { ... }
}

Rules:
- Every JD item must appear exactly once: either in matched_items (as jd_item)
  or in missing_items.
- Never match one JD item against multiple CV items.
- rationale: one short clause explaining non-obvious matches.

CV SKILLS:
{cv_skills}

JD SKILLS:
{jd_skills}"#;

/// Shared system prompt for the five component analyzers.
pub const ANALYZER_SYSTEM: &str =
    "You are an expert talent assessor scoring one dimension of CV-to-job fit. \
    Be realistic and evidence-based; do not inflate scores. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Skills Relevance analyzer prompt. Replace `{cv}` and `{jd}`.
pub const SKILLS_RELEVANCE_PROMPT_TEMPLATE: &str = r#"SKILLS RELEVANCE ANALYSIS.

Estimate how well the candidate's skills cover the job's skill demands,
separately for technical and soft skills. Return JSON:
{
  "technical_match_pct": 72.5,
  "soft_match_pct": 60.0,
  "rationale": "one or two sentences"
}
Percentages are 0-100 and reflect coverage of the JD's demands, not the
candidate's breadth.

CANDIDATE:
{cv}

JOB:
{jd}"#;

/// Experience Alignment analyzer prompt. Replace `{cv}` and `{jd}`.
/// The JD's required-years figure is detected separately in code; the model
/// only reports the candidate side.
pub const EXPERIENCE_ALIGNMENT_PROMPT_TEMPLATE: &str = r#"EXPERIENCE ALIGNMENT ANALYSIS.

Estimate the candidate's total years of relevant professional experience from
the CV material below. Return JSON:
{
  "cv_years": 4.5,
  "rationale": "one or two sentences citing the roles counted"
}
Count only professional experience the CV actually states. If the CV shows no
professional experience, return 0.

CANDIDATE:
{cv}

JOB:
{jd}"#;

/// Industry Fit analyzer prompt. Replace `{cv}` and `{jd}`.
pub const INDUSTRY_FIT_PROMPT_TEMPLATE: &str = r#"INDUSTRY FIT ANALYSIS.

Score how well the candidate's industry background fits the job's sector.
Return JSON (all values 0-100):
{
  "domain_overlap_pct": 40.0,
  "data_tooling_pct": 70.0,
  "stakeholder_fit_pct": 55.0,
  "business_cycle_pct": 50.0,
  "rationale": "one or two sentences"
}
- domain_overlap_pct: overlap between the candidate's sectors and the job's sector.
- data_tooling_pct: familiarity with the data/tooling landscape of the sector.
- stakeholder_fit_pct: experience with the stakeholder types this role faces.
- business_cycle_pct: familiarity with the sector's business rhythm.
Score domain_overlap_pct strictly: a candidate from an unrelated sector gets a
low overlap even when individual skills transfer.

CANDIDATE:
{cv}

JOB:
{jd}"#;

/// Role Seniority analyzer prompt. Replace `{cv}` and `{jd}`.
pub const ROLE_SENIORITY_PROMPT_TEMPLATE: &str = r#"ROLE SENIORITY ANALYSIS.

Compare the candidate's demonstrated seniority against the level the job
asks for. Return JSON (all values 0-100):
{
  "experience_match_pct": 65.0,
  "responsibility_fit_pct": 60.0,
  "leadership_readiness": 50.0,
  "growth_trajectory": 70.0,
  "rationale": "one or two sentences"
}

CANDIDATE:
{cv}

JOB:
{jd}"#;

/// Technical Depth analyzer prompt. Replace `{cv}` and `{jd}`.
pub const TECHNICAL_DEPTH_PROMPT_TEMPLATE: &str = r#"TECHNICAL DEPTH ANALYSIS.

Evaluate the depth and complexity of the candidate's technical work against
the complexity the job implies. Return JSON:
{
  "core_skills_match_pct": 70.0,
  "stack_fit_pct": 60.0,
  "complexity_readiness": 55.0,
  "learning_agility": 75.0,
  "jd_problem_complexity": 6.0,
  "rationale": "one or two sentences"
}
The first four values are 0-100. jd_problem_complexity is 0-10 and rates how
hard the job's technical problems are, independent of the candidate.

CANDIDATE:
{cv}

JOB:
{jd}"#;
