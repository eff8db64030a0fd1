use once_cell::sync::Lazy;
use regex::Regex;

use pagelens_core::sanitize::MAX_TEXT_LENGTH;
use pagelens_core::{Criterion, CriterionKind, MatchMethod};
use pagelens_dom::{DomHost, NodeId};
use pagelens_providers::{CacheKey, ModelGuard, ModelOutcome};

/// Relevance assigned to every keyword-only match.
const BASIC_RELEVANCE: u8 = 75;

static PRICE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$[\d,]+(?:\.\d{2})?").unwrap());
static SALARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$[\d,]+[kK]?").unwrap());
static SCORE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:score|relevance)[:\s]*(\d+)\s*(?:/100|%)").unwrap());

#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub relevance: u8,
    pub method: MatchMethod,
    pub explanation: Option<String>,
}

/// Deterministic keyword matching. All required keywords must appear
/// (case-insensitive substring), no excluded keyword may appear, and the
/// kind-specific numeric constraint applies only when a money pattern is
/// actually present: an unpriced listing is not disqualified.
pub fn basic_match(text: &str, criterion: &Criterion) -> Option<MatchResult> {
    let haystack = text.to_lowercase();

    if !criterion
        .keywords
        .iter()
        .all(|keyword| haystack.contains(&keyword.to_lowercase()))
    {
        return None;
    }
    if criterion
        .exclude_keywords
        .iter()
        .any(|keyword| haystack.contains(&keyword.to_lowercase()))
    {
        return None;
    }

    if criterion.kind == CriterionKind::Product {
        if let Some(max) = criterion.price_max {
            if let Some(found) = PRICE.find(&haystack) {
                if parse_amount(found.as_str()) > max {
                    return None;
                }
            }
        }
    }

    if criterion.kind == CriterionKind::Job {
        if let Some(min) = criterion.salary_min {
            if let Some(found) = SALARY.find(&haystack) {
                let mut salary = parse_amount(found.as_str());
                if found.as_str().contains('k') {
                    salary *= 1000.0;
                }
                if salary < min {
                    return None;
                }
            }
        }
    }

    Some(MatchResult {
        relevance: BASIC_RELEVANCE,
        method: MatchMethod::Basic,
        explanation: None,
    })
}

fn parse_amount(token: &str) -> f64 {
    token
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect::<String>()
        .parse()
        .unwrap_or(0.0)
}

/// Model-assisted scoring. The reply is kept verbatim as the
/// explanation; an unparseable score reads as 0, which the caller's
/// threshold then rejects.
pub async fn ai_match(
    host: &dyn DomHost,
    id: NodeId,
    criterion: &Criterion,
    guard: &ModelGuard,
) -> Option<MatchResult> {
    let text: String = host.text(id).chars().take(MAX_TEXT_LENGTH).collect();

    let kind = match criterion.kind {
        CriterionKind::Job => "job",
        CriterionKind::Product => "product",
        CriterionKind::Content => "content",
    };
    let mut lines = vec![
        format!("Analyze this {kind} content for relevance:"),
        "User Criteria:".to_string(),
        format!("- Required keywords: {}", criterion.keywords.join(", ")),
    ];
    if !criterion.exclude_keywords.is_empty() {
        lines.push(format!(
            "- Exclude keywords: {}",
            criterion.exclude_keywords.join(", ")
        ));
    }
    if let Some(location) = &criterion.location {
        lines.push(format!("- Location: {location}"));
    }
    if let Some(min) = criterion.salary_min {
        lines.push(format!("- Minimum salary: ${min}"));
    }
    if let Some(max) = criterion.price_max {
        lines.push(format!("- Maximum price: ${max}"));
    }
    lines.push("Content:".to_string());
    if !text.is_empty() {
        lines.push(text);
    }
    lines.push("Provide a relevance score (0-100) and brief explanation (1-2 sentences).".to_string());
    lines.push("Format: \"Score: X/100. Explanation.\"".to_string());
    let prompt = lines.join("\n");

    let tag = host.tag(id).unwrap_or_default();
    // Keyed per criterion: the same element can score differently
    // against different watch entries.
    let key = CacheKey::new(&format!("lookOut:{}", criterion.id), &tag, &host.text(id));

    match guard.analyze(&key, &prompt).await {
        ModelOutcome::Answered(reply) => {
            let relevance = SCORE
                .captures(&reply)
                .and_then(|caps| caps[1].parse::<u32>().ok())
                .map(|score| score.min(100) as u8)
                .unwrap_or(0);
            Some(MatchResult {
                relevance,
                method: MatchMethod::Ai,
                explanation: Some(reply),
            })
        }
        _ => None,
    }
}

/// AI-first scoring with the deterministic fallback: an AI verdict is
/// accepted only at or above the threshold, anything less falls through
/// to keyword matching.
pub async fn analyze(
    host: &dyn DomHost,
    id: NodeId,
    criterion: &Criterion,
    guard: &ModelGuard,
    threshold: u8,
) -> Option<MatchResult> {
    if guard.has_model() {
        if let Some(result) = ai_match(host, id, criterion, guard).await {
            if result.relevance >= threshold {
                return Some(result);
            }
        }
    }
    basic_match(&host.text(id), criterion)
}
