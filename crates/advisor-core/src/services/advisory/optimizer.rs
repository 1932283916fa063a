//! Prompt compression ahead of generation calls

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::utils::token_estimator::estimate_tokens;

/// Long-form domain terms and their standard abbreviations
const TERM_TABLE: &[(&str, &str)] = &[
    ("amazon web services", "AWS"),
    ("google cloud platform", "GCP"),
    ("microsoft azure", "Azure"),
    ("kubernetes", "K8s"),
    ("infrastructure as code", "IaC"),
    ("continuous integration and continuous delivery", "CI/CD"),
    ("continuous integration/continuous deployment", "CI/CD"),
    ("return on investment", "ROI"),
    ("total cost of ownership", "TCO"),
    ("service level agreement", "SLA"),
    ("statement of work", "SOW"),
    ("request for proposal", "RFP"),
    ("proof of concept", "POC"),
    ("minimum viable product", "MVP"),
    ("disaster recovery", "DR"),
    ("high availability", "HA"),
    ("recovery time objective", "RTO"),
    ("recovery point objective", "RPO"),
    ("key performance indicator", "KPI"),
    ("application programming interface", "API"),
    ("artificial intelligence", "AI"),
    ("machine learning", "ML"),
    ("software as a service", "SaaS"),
    ("platform as a service", "PaaS"),
    ("infrastructure as a service", "IaaS"),
];

/// Lead-in phrases that carry no meaning for the model
const FILLER_PHRASES: &[&str] = &[
    "please note that",
    "it is important to note that",
    "it should be noted that",
    "as you may know,",
    "as you may know",
    "i was wondering if",
    "could you please",
    "can you please",
    "i would like to know",
    "basically,",
    "to be honest,",
];

static TERM_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    TERM_TABLE
        .iter()
        .filter_map(|(term, abbrev)| {
            Regex::new(&format!(r"(?i)\b{}\b", regex::escape(term)))
                .ok()
                .map(|re| (re, *abbrev))
        })
        .collect()
});

static FILLER_PATTERN: Lazy<Option<Regex>> = Lazy::new(|| {
    let alternatives = FILLER_PHRASES
        .iter()
        .map(|p| regex::escape(p))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{})[ \t]*", alternatives)).ok()
});

static HORIZONTAL_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\S\n]+").unwrap());
static SPACE_AROUND_NEWLINE: Lazy<Regex> = Lazy::new(|| Regex::new(r" ?\n ?").unwrap());
static EXCESS_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Characters before the cutoff searched for a sentence end
const SENTENCE_WINDOW: usize = 100;

/// Stateless text compressor. Lengths are counted in characters.
#[derive(Debug, Clone)]
pub struct PromptOptimizer {
    max_length: usize,
}

impl PromptOptimizer {
    pub fn new(max_length: usize) -> Self {
        Self { max_length: max_length.max(1) }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn optimize(&self, prompt: &str) -> String {
        let text = Self::abbreviate(prompt);
        let text = Self::strip_fillers(&text);
        let text = Self::collapse_whitespace(&text);
        let optimized = self.truncate(text);

        debug!(
            "Optimized prompt {} -> {} chars",
            prompt.chars().count(),
            optimized.chars().count()
        );
        optimized
    }

    fn abbreviate(text: &str) -> String {
        TERM_PATTERNS
            .iter()
            .fold(text.to_string(), |acc, (re, abbrev)| {
                re.replace_all(&acc, *abbrev).into_owned()
            })
    }

    fn strip_fillers(text: &str) -> String {
        match FILLER_PATTERN.as_ref() {
            Some(re) => re.replace_all(text, "").into_owned(),
            None => text.to_string(),
        }
    }

    fn collapse_whitespace(text: &str) -> String {
        let text = text.replace("\r\n", "\n");
        let text = HORIZONTAL_WS.replace_all(&text, " ");
        let text = SPACE_AROUND_NEWLINE.replace_all(&text, "\n");
        let text = EXCESS_NEWLINES.replace_all(&text, "\n\n");
        text.trim().to_string()
    }

    /// Cut at the last sentence end within the window before the limit,
    /// else hard-cut at the limit
    fn truncate(&self, text: String) -> String {
        let char_count = text.chars().count();
        if char_count <= self.max_length {
            return text;
        }

        let chars: Vec<char> = text.chars().collect();
        let window_start = self.max_length.saturating_sub(SENTENCE_WINDOW);
        let sentence_end = (window_start..self.max_length)
            .rev()
            .find(|&i| matches!(chars[i], '.' | '!' | '?'));

        let cut = match sentence_end {
            Some(i) => i + 1,
            None => self.max_length,
        };
        debug!(
            "Truncating prompt from {} to {} chars (sentence boundary: {})",
            char_count,
            cut,
            sentence_end.is_some()
        );
        chars[..cut].iter().collect::<String>().trim_end().to_string()
    }

    pub fn compression_stats(original: &str, optimized: &str) -> CompressionStats {
        let original_length = original.chars().count();
        let optimized_length = optimized.chars().count();
        let compression_ratio = if original_length == 0 {
            1.0
        } else {
            optimized_length as f64 / original_length as f64
        };

        CompressionStats {
            original_length,
            optimized_length,
            compression_ratio,
            characters_saved: original_length.saturating_sub(optimized_length),
            estimated_tokens_saved: estimate_tokens(original)
                .saturating_sub(estimate_tokens(optimized)),
        }
    }
}

impl Default for PromptOptimizer {
    fn default() -> Self {
        Self::new(4000)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompressionStats {
    pub original_length: usize,
    pub optimized_length: usize,
    /// optimized / original; below 1.0 means the prompt shrank
    pub compression_ratio: f64,
    pub characters_saved: usize,
    pub estimated_tokens_saved: usize,
}
