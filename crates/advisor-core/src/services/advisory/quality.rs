/// quality.rs - generated response validation, scoring and fallback selection
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::config::QualityConfig;
use crate::utils::error::QualityIssue;

/// Lengths with full length-fit credit
const TARGET_MIN_CHARS: usize = 200;
const TARGET_MAX_CHARS: usize = 1200;

const LENGTH_WEIGHT: f64 = 0.4;
const KEYWORD_BONUS: f64 = 0.08;
const KEYWORD_BONUS_CAP: f64 = 0.4;
const SPECIFICS_BONUS: f64 = 0.2;

const DOMAIN_KEYWORDS: &[&str] = &[
    "cloud", "aws", "azure", "gcp", "kubernetes", "migration", "security",
    "compliance", "cost", "pricing", "roi", "tco", "architecture", "devops",
    "automation", "scalability", "availability", "disaster recovery", "sla",
    "modernization", "infrastructure", "timeline", "roadmap", "governance",
];

static QUANTITATIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)
        [$€£]\s?\d
        | \b\d+(?:[.,]\d+)?\s?(?:usd|eur|k|m)\b
        | \d+(?:\.\d+)?\s?%
        | \b\d+(?:\.\d+)?\s?(?:gb|tb|pb|vcpus?|cores?|ms|rps|nodes?|servers?|instances?)\b
        | \b\d+\s?(?:hours?|days?|weeks?|months?|years?|sprints?)\b",
    )
    .unwrap()
});

/// Canned answers, first keyword match wins
const FALLBACKS: &[(&[&str], &str)] = &[
    (
        &["cost", "price", "pricing", "budget", "expensive", "roi", "tco"],
        "Costs depend on workload size, service tier and commitment term. A typical \
         approach is to start with a short discovery to baseline current infrastructure \
         spend, then model pay-as-you-go against reserved capacity. Most clients see \
         20-30% savings within 6 months once rightsizing and autoscaling are in place. \
         We can prepare a detailed estimate after reviewing the current environment.",
    ),
    (
        &["migrat", "move to cloud", "lift and shift", "replatform"],
        "A phased migration keeps risk low: assess and group workloads, migrate a \
         low-risk pilot, then move remaining waves with rollback plans in place. Typical \
         programs run 3-6 months depending on the number of applications and data \
         volumes. We recommend starting with a two-week assessment to build the \
         migration roadmap.",
    ),
    (
        &["secur", "complian", "gdpr", "hipaa", "soc 2", "iso 27001", "audit"],
        "Security is addressed in layers: identity and access management, network \
         segmentation, encryption at rest and in transit, and continuous monitoring. \
         For regulated workloads we map controls to the relevant compliance framework \
         and automate evidence collection. A security baseline review is usually the \
         first step.",
    ),
    (
        &["timeline", "how long", "schedule", "deadline", "when can"],
        "Timelines depend on scope. A discovery phase usually takes 1-2 weeks, a proof \
         of concept 2-4 weeks, and a production rollout 2-3 months. We can tighten the \
         estimate once the solution scope and dependencies are confirmed.",
    ),
    (
        &["architect", "design", "scalab", "availability", "kubernetes", "container"],
        "We recommend an architecture built on managed services with autoscaling, \
         multi-zone deployment for high availability, and infrastructure as code for \
         repeatable environments. The exact design follows from your workload \
         profile, which we can capture in a short architecture workshop.",
    ),
];

/// Stateless validator + deterministic fallback selector
pub struct QualityFilter {
    min_length: usize,
    max_length: usize,
    banned_phrases: Vec<String>,
    required_patterns: Vec<Regex>,
}

impl QualityFilter {
    pub fn new(cfg: &QualityConfig) -> Self {
        let required_patterns = cfg
            .required_patterns
            .iter()
            .filter_map(|pattern| match Regex::new(&format!("(?i){}", pattern)) {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!("Ignoring invalid quality pattern '{}': {}", pattern, e);
                    None
                }
            })
            .collect();

        Self {
            min_length: cfg.min_length,
            max_length: cfg.max_length,
            banned_phrases: cfg.banned_phrases.iter().map(|p| p.to_lowercase()).collect(),
            required_patterns,
        }
    }

    /// Check length bounds, banned content and domain relevance, in that order
    pub fn validate(&self, response: &str) -> Result<(), QualityIssue> {
        let trimmed = response.trim();
        let length = trimmed.chars().count();

        if length < self.min_length {
            return Err(QualityIssue::TooShort { length, min: self.min_length });
        }
        if length > self.max_length {
            return Err(QualityIssue::TooLong { length, max: self.max_length });
        }

        let lower = trimmed.to_lowercase();
        if let Some(phrase) = self.banned_phrases.iter().find(|p| lower.contains(p.as_str())) {
            return Err(QualityIssue::BannedContent(phrase.clone()));
        }

        if !self.required_patterns.is_empty()
            && !self.required_patterns.iter().any(|re| re.is_match(trimmed))
        {
            return Err(QualityIssue::MissingDomainRelevance);
        }

        debug!("Response passed quality validation ({} chars)", length);
        Ok(())
    }

    /// Keyword-selected canned answer for the user's query
    pub fn fallback_for(&self, query: &str) -> Option<&'static str> {
        let lower = query.to_lowercase();
        let fallback = FALLBACKS
            .iter()
            .find(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
            .map(|(_, text)| *text);

        match fallback {
            Some(_) => info!("Selected fallback response for query"),
            None => warn!("No fallback matches query"),
        }
        fallback
    }

    /// Heuristic in [0, 1]: length fit, distinct domain keywords, quantitative specifics
    pub fn quality_score(&self, response: &str) -> f64 {
        let trimmed = response.trim();
        let length = trimmed.chars().count();

        let length_fit = if length == 0 {
            0.0
        } else if length < TARGET_MIN_CHARS {
            length as f64 / TARGET_MIN_CHARS as f64
        } else if length <= TARGET_MAX_CHARS {
            1.0
        } else {
            let span = self.max_length.saturating_sub(TARGET_MAX_CHARS).max(1) as f64;
            (1.0 - (length - TARGET_MAX_CHARS) as f64 / span).max(0.0)
        };

        let lower = trimmed.to_lowercase();
        let distinct: HashSet<&str> = DOMAIN_KEYWORDS
            .iter()
            .copied()
            .filter(|k| lower.contains(k))
            .collect();
        let keyword_score = (distinct.len() as f64 * KEYWORD_BONUS).min(KEYWORD_BONUS_CAP);

        let specifics = if QUANTITATIVE.is_match(trimmed) { SPECIFICS_BONUS } else { 0.0 };

        (length_fit * LENGTH_WEIGHT + keyword_score + specifics).min(1.0)
    }
}

impl Default for QualityFilter {
    fn default() -> Self {
        Self::new(&QualityConfig::default())
    }
}
