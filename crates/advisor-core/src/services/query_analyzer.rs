/// Query Analyzer
/// Extracts search keywords from advisory questions and infers the client's
/// industry from session fields, for knowledge-base lookups
use std::collections::HashSet;

use tracing::debug;
use unicode_segmentation::UnicodeSegmentation;

use crate::models::chat::SessionContext;

/// Words too common to help rank knowledge entries
const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "with", "that", "this", "what", "which", "who", "how",
    "when", "where", "why", "are", "was", "were", "will", "would", "could",
    "should", "can", "does", "did", "have", "has", "had", "our", "your", "their",
    "they", "them", "you", "about", "from", "into", "over", "than", "then",
    "there", "these", "those", "some", "any", "all", "also", "just", "need",
    "want", "like", "get", "give", "tell", "please", "best", "way", "much",
];

/// Industry label and the terms that signal it
const INDUSTRY_SIGNALS: &[(&str, &[&str])] = &[
    ("healthcare", &["hospital", "clinic", "patient", "health", "medical", "pharma", "ehr", "hipaa"]),
    ("finance", &["bank", "banking", "fintech", "insurance", "payment", "trading", "finance", "financial", "credit"]),
    ("retail", &["retail", "ecommerce", "e-commerce", "store", "shop", "merchant", "pos"]),
    ("manufacturing", &["factory", "manufacturing", "plant", "supply chain", "assembly", "industrial"]),
    ("telecommunications", &["telco", "telecom", "carrier", "5g", "network operator"]),
    ("education", &["university", "school", "campus", "student", "education", "learning platform"]),
    ("public sector", &["government", "ministry", "municipal", "public sector", "agency"]),
    ("logistics", &["logistics", "shipping", "freight", "warehouse", "fleet"]),
];

const MIN_KEYWORD_CHARS: usize = 3;
const MAX_KEYWORDS: usize = 12;

pub struct QueryAnalyzer;

impl QueryAnalyzer {
    /// Lowercased content words in first-seen order, stop words removed
    pub fn extract_keywords(query: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let keywords: Vec<String> = query
            .unicode_words()
            .map(|w| w.to_lowercase())
            .filter(|w| w.chars().count() >= MIN_KEYWORD_CHARS)
            .filter(|w| !STOP_WORDS.contains(&w.as_str()))
            .filter(|w| seen.insert(w.clone()))
            .take(MAX_KEYWORDS)
            .collect();

        debug!("Extracted {} keywords from query", keywords.len());
        keywords
    }

    /// Declared industry wins; otherwise the first industry whose signal
    /// terms appear in the client name or meeting context
    pub fn infer_industry(session: &SessionContext) -> Option<String> {
        if let Some(industry) = session
            .industry
            .as_deref()
            .map(str::trim)
            .filter(|i| !i.is_empty())
        {
            return Some(industry.to_lowercase());
        }

        let haystack = format!("{} {}", session.client_name, session.meeting_context).to_lowercase();
        let words: HashSet<&str> = haystack.unicode_words().collect();

        let inferred = INDUSTRY_SIGNALS
            .iter()
            .find(|(_, signals)| {
                signals.iter().any(|s| {
                    if s.contains(' ') {
                        haystack.contains(s)
                    } else {
                        words.contains(s)
                    }
                })
            })
            .map(|(industry, _)| industry.to_string());

        if let Some(industry) = &inferred {
            debug!("Inferred industry '{}' from session context", industry);
        }
        inferred
    }
}
