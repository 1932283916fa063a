use serde::{Deserialize, Serialize};

/// Curated service offering from the knowledge base
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceOffering {
    pub name: String,
    pub service_type: String,
    pub description: String,
    #[serde(default)]
    pub industries: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Previously delivered engagement used as a reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PastSolution {
    pub title: String,
    pub service_type: String,
    pub industry: String,
    pub summary: String,
    #[serde(default)]
    pub outcome: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Anything that can be matched against query keywords
pub trait KnowledgeEntry {
    fn searchable_text(&self) -> String;
}

impl KnowledgeEntry for ServiceOffering {
    fn searchable_text(&self) -> String {
        format!(
            "{} {} {} {}",
            self.name,
            self.service_type,
            self.description,
            self.keywords.join(" ")
        )
        .to_lowercase()
    }
}

impl KnowledgeEntry for PastSolution {
    fn searchable_text(&self) -> String {
        format!(
            "{} {} {} {} {}",
            self.title,
            self.service_type,
            self.summary,
            self.outcome.as_deref().unwrap_or_default(),
            self.keywords.join(" ")
        )
        .to_lowercase()
    }
}
