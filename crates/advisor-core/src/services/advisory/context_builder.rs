use crate::models::chat::{ChatMessage, ChatRequest, SessionContext};
use crate::models::knowledge::{PastSolution, ServiceOffering};

const MAX_HISTORY_MESSAGES: usize = 4;

/// Knowledge-base excerpt selected for one request
#[derive(Debug, Clone, Default)]
pub struct KnowledgeContext {
    pub offerings: Vec<ServiceOffering>,
    pub solutions: Vec<PastSolution>,
}

impl KnowledgeContext {
    pub fn is_empty(&self) -> bool {
        self.offerings.is_empty() && self.solutions.is_empty()
    }

    fn render(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }

        let mut lines = Vec::new();
        if !self.offerings.is_empty() {
            lines.push("Relevant service offerings:".to_string());
            for o in &self.offerings {
                lines.push(format!("- {} ({}): {}", o.name, o.service_type, o.description));
            }
        }
        if !self.solutions.is_empty() {
            lines.push("Relevant past solutions:".to_string());
            for s in &self.solutions {
                let mut line = format!("- {} [{}]: {}", s.title, s.industry, s.summary);
                if let Some(outcome) = &s.outcome {
                    line.push_str(&format!(" Outcome: {}", outcome));
                }
                lines.push(line);
            }
        }
        Some(lines.join("\n"))
    }
}

/// Assembles the generation prompt from fixed instruction, session fields,
/// knowledge excerpt, recent history and the question
pub struct ContextBuilder {
    base_instruction: String,
}

impl ContextBuilder {
    pub fn new(base_instruction: String) -> Self {
        Self { base_instruction }
    }

    pub fn base_instruction(&self) -> &str {
        &self.base_instruction
    }

    pub fn default_base_instruction() -> String {
        r#"You are a presales solutions advisor supporting a consultant during a live client meeting.

Guidelines:
- Answer the consultant's question directly and concisely
- Ground recommendations in the client context and the offerings listed below
- Prefer concrete figures, timelines and next steps over generic advice
- Say clearly when more discovery is needed before committing to an answer"#
            .to_string()
    }

    pub fn build_prompt(&self, request: &ChatRequest, knowledge: &KnowledgeContext) -> String {
        let mut parts = vec![self.base_instruction.clone()];

        if let Some(session) = Self::session_section(&request.session) {
            parts.push(String::new());
            parts.push(session);
        }

        if let Some(kb) = knowledge.render() {
            parts.push(String::new());
            parts.push(kb);
        }

        if let Some(history) = Self::history_section(&request.history) {
            parts.push(String::new());
            parts.push(history);
        }

        parts.push(String::new());
        parts.push(format!("Question: {}", request.content.trim()));

        parts.join("\n")
    }

    fn session_section(session: &SessionContext) -> Option<String> {
        let mut lines = Vec::new();
        if !session.client_name.trim().is_empty() {
            lines.push(format!("Client: {}", session.client_name.trim()));
        }
        if let Some(industry) = session.industry.as_deref().filter(|i| !i.is_empty()) {
            lines.push(format!("Industry: {}", industry));
        }
        if !session.meeting_context.trim().is_empty() {
            lines.push(format!("Meeting context: {}", session.meeting_context.trim()));
        }
        if !session.service_types.is_empty() {
            lines.push(format!("Services of interest: {}", session.service_types.join(", ")));
        }
        if !session.cloud_providers.is_empty() {
            lines.push(format!("Cloud providers: {}", session.cloud_providers.join(", ")));
        }

        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }

    fn history_section(history: &[ChatMessage]) -> Option<String> {
        if history.is_empty() {
            return None;
        }
        let start = history.len().saturating_sub(MAX_HISTORY_MESSAGES);
        let lines: Vec<String> = history[start..]
            .iter()
            .map(|m| format!("{}: {}", m.role, m.content))
            .collect();
        Some(format!("Recent conversation:\n{}", lines.join("\n")))
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new(Self::default_base_instruction())
    }
}
