use crate::models::chat::SessionContext;

/// Canned answer paths that skip generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickAction {
    KeyQuestions,
    NextSteps,
    ObjectionHandling,
    DiscoverySummary,
}

/// Discovery questions per service type
const SERVICE_QUESTIONS: &[(&str, &[&str])] = &[
    ("migration", &[
        "Which applications are in scope for the first wave, and which have hard dependencies?",
        "What downtime window is acceptable for cutover?",
    ]),
    ("security", &[
        "Which compliance frameworks must the target environment satisfy?",
        "How are identities and privileged access managed today?",
    ]),
    ("modernization", &[
        "Which legacy components block faster releases today?",
        "Is the team ready to operate containers or serverless workloads?",
    ]),
    ("devops", &[
        "How long does a change take to go from commit to production?",
        "Which parts of the release process are still manual?",
    ]),
    ("data", &[
        "Where does critical data live today and who owns it?",
        "What reporting or analytics outcomes matter most this year?",
    ]),
    ("managed services", &[
        "Which operational tasks does the team want to hand over?",
        "What response times does the business expect for incidents?",
    ]),
];

const GENERAL_QUESTIONS: &[&str] = &[
    "What business outcome would make this project a success in twelve months?",
    "Who signs off on budget, and what is the decision timeline?",
    "What has been tried before, and why did it stall?",
];

impl QuickAction {
    pub const ALL: [QuickAction; 4] = [
        Self::KeyQuestions,
        Self::NextSteps,
        Self::ObjectionHandling,
        Self::DiscoverySummary,
    ];

    /// Accepts `next_steps`, `next-steps` and `Next Steps`
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "key_questions" => Some(Self::KeyQuestions),
            "next_steps" => Some(Self::NextSteps),
            "objection_handling" => Some(Self::ObjectionHandling),
            "discovery_summary" => Some(Self::DiscoverySummary),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KeyQuestions => "key_questions",
            Self::NextSteps => "next_steps",
            Self::ObjectionHandling => "objection_handling",
            Self::DiscoverySummary => "discovery_summary",
        }
    }

    pub fn render(&self, session: &SessionContext) -> String {
        let client = client_label(session);
        match self {
            Self::KeyQuestions => key_questions(&client, session),
            Self::NextSteps => next_steps(&client, session),
            Self::ObjectionHandling => objection_handling(&client, session),
            Self::DiscoverySummary => discovery_summary(&client, session),
        }
    }
}

fn client_label(session: &SessionContext) -> String {
    let name = session.client_name.trim();
    if name.is_empty() {
        "the client".to_string()
    } else {
        name.to_string()
    }
}

fn numbered(lines: &[String]) -> String {
    lines
        .iter()
        .enumerate()
        .map(|(i, l)| format!("{}. {}", i + 1, l))
        .collect::<Vec<_>>()
        .join("\n")
}

fn or_none(items: &[String]) -> String {
    if items.is_empty() {
        "not yet identified".to_string()
    } else {
        items.join(", ")
    }
}

fn key_questions(client: &str, session: &SessionContext) -> String {
    let mut questions: Vec<String> = session
        .service_types
        .iter()
        .filter_map(|st| {
            SERVICE_QUESTIONS
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(st.trim()))
        })
        .flat_map(|(_, qs)| qs.iter().map(|q| q.to_string()))
        .collect();
    questions.dedup();
    questions.extend(GENERAL_QUESTIONS.iter().map(|q| q.to_string()));

    if !session.cloud_providers.is_empty() {
        questions.push(format!(
            "Are there existing commitments or credits with {}?",
            session.cloud_providers.join(" or ")
        ));
    }

    format!("Key questions to ask {}:\n{}", client, numbered(&questions))
}

fn next_steps(client: &str, session: &SessionContext) -> String {
    let focus = or_none(&session.service_types);
    let steps = vec![
        format!("Send {} a recap of today's discussion covering: {}.", client, focus),
        "Schedule a technical discovery workshop with the client's architects.".to_string(),
        "Collect an inventory of in-scope workloads and current costs.".to_string(),
        "Prepare a high-level solution outline and indicative estimate.".to_string(),
        "Agree on decision makers and a date for the proposal review.".to_string(),
    ];
    format!("Recommended next steps with {}:\n{}", client, numbered(&steps))
}

fn objection_handling(client: &str, session: &SessionContext) -> String {
    let mut lines = vec![
        "\"It's too expensive\": anchor on total cost of ownership, show a phased plan and \
         offer a fixed-price assessment to de-risk the first step."
            .to_string(),
        "\"We can do it ourselves\": position the engagement as acceleration and knowledge \
         transfer, with the client's team owning the result."
            .to_string(),
        "\"Now is not the right time\": quantify the cost of waiting and propose a small \
         pilot that fits the current budget cycle."
            .to_string(),
    ];
    if session
        .service_types
        .iter()
        .any(|s| s.eq_ignore_ascii_case("security"))
    {
        lines.push(
            "\"Cloud is less secure\": walk through shared responsibility and the controls \
             we would put in place from day one."
                .to_string(),
        );
    }
    format!("Handling common objections from {}:\n{}", client, numbered(&lines))
}

fn discovery_summary(client: &str, session: &SessionContext) -> String {
    let meeting = session.meeting_context.trim();
    let lines = [
        format!("Client: {}", client),
        format!(
            "Industry: {}",
            session.industry.as_deref().unwrap_or("not yet identified")
        ),
        format!(
            "Meeting context: {}",
            if meeting.is_empty() { "not captured" } else { meeting }
        ),
        format!("Services discussed: {}", or_none(&session.service_types)),
        format!("Cloud providers: {}", or_none(&session.cloud_providers)),
    ];
    format!("Discovery summary\n{}", lines.join("\n"))
}
