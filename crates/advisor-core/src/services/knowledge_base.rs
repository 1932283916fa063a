use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::models::knowledge::{KnowledgeEntry, PastSolution, ServiceOffering};
use crate::utils::error::Result;

/// Source of curated service and solution facts.
///
/// Implementations filter by service type and industry only; relevance
/// ranking and result caps are applied by the caller.
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    async fn service_offerings(
        &self,
        service_types: &[String],
        industry: Option<&str>,
    ) -> Result<Vec<ServiceOffering>>;

    async fn past_solutions(
        &self,
        service_types: &[String],
        industry: Option<&str>,
    ) -> Result<Vec<PastSolution>>;
}

/// Static, in-process knowledge base
#[derive(Debug, Clone, Default)]
pub struct InMemoryKnowledgeBase {
    offerings: Vec<ServiceOffering>,
    solutions: Vec<PastSolution>,
}

#[derive(Deserialize)]
struct KnowledgeFile {
    #[serde(default)]
    offerings: Vec<ServiceOffering>,
    #[serde(default)]
    solutions: Vec<PastSolution>,
}

impl InMemoryKnowledgeBase {
    pub fn new(offerings: Vec<ServiceOffering>, solutions: Vec<PastSolution>) -> Self {
        Self { offerings, solutions }
    }

    /// Parse `{"offerings": [...], "solutions": [...]}`
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let file: KnowledgeFile = serde_json::from_str(json)?;
        Ok(Self::new(file.offerings, file.solutions))
    }

    pub fn len(&self) -> usize {
        self.offerings.len() + self.solutions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn matches_service_type(entry_type: &str, service_types: &[String]) -> bool {
    service_types.is_empty()
        || service_types
            .iter()
            .any(|s| s.eq_ignore_ascii_case(entry_type))
}

#[async_trait]
impl KnowledgeBase for InMemoryKnowledgeBase {
    async fn service_offerings(
        &self,
        service_types: &[String],
        industry: Option<&str>,
    ) -> Result<Vec<ServiceOffering>> {
        Ok(self
            .offerings
            .iter()
            .filter(|o| matches_service_type(&o.service_type, service_types))
            .filter(|o| match industry {
                Some(industry) if !o.industries.is_empty() => o
                    .industries
                    .iter()
                    .any(|i| i.eq_ignore_ascii_case(industry)),
                _ => true,
            })
            .cloned()
            .collect())
    }

    async fn past_solutions(
        &self,
        service_types: &[String],
        industry: Option<&str>,
    ) -> Result<Vec<PastSolution>> {
        Ok(self
            .solutions
            .iter()
            .filter(|s| matches_service_type(&s.service_type, service_types))
            .filter(|s| industry.map_or(true, |i| s.industry.eq_ignore_ascii_case(i)))
            .cloned()
            .collect())
    }
}

/// Rank entries by how many query keywords they mention and keep the top
/// `cap`. Entries mentioning none are dropped unless no keywords were given.
pub fn select_relevant<T: KnowledgeEntry>(entries: Vec<T>, keywords: &[String], cap: usize) -> Vec<T> {
    let mut scored: Vec<(usize, usize, T)> = entries
        .into_iter()
        .enumerate()
        .map(|(idx, entry)| {
            let text = entry.searchable_text();
            let score = keywords.iter().filter(|k| text.contains(k.as_str())).count();
            (score, idx, entry)
        })
        .filter(|(score, _, _)| keywords.is_empty() || *score > 0)
        .collect();

    // stable: higher score first, then original order
    scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    scored.truncate(cap);
    debug!("Selected {} relevant knowledge entries", scored.len());
    scored.into_iter().map(|(_, _, entry)| entry).collect()
}
