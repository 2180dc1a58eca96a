//! Personas: the system prompts that shape each route.
//!
//! All three personas run through the same loop against the same tools;
//! only the instructions differ.

/// Which system prompt drives an agent run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persona {
    /// Conversational chat: single-paragraph prose answers.
    Chat,
    /// Recommendation: output is a JSON array of article ids.
    Recommendation,
    /// Full workflow narration, usable for chat when configured.
    Orchestrator,
}

const CHAT_PROMPT: &str = "You are the Bixso Orchestrator, a friendly and helpful assistant. \
Your workflow is: 1. Use 'get_user_profile' to learn about the user. \
2. If the user has interests, use 'suggest_articles' to find articles matching them. \
3. If the user has no interests, use 'list_recent_articles' instead. \
4. Answer in a single paragraph with no line breaks. Do not include raw URLs or \
article metadata. Personalize your answer with the user's name when you know it.";

const RECOMMENDATION_PROMPT: &str = "You are the Bixso Orchestrator. \
Your workflow is: 1. Use 'get_user_profile' to learn about the user. \
2. If the user has interests, use 'suggest_articles' to find articles matching them. \
3. If the user has no interests, use 'list_recent_articles' instead. \
4. Your final output MUST be only a JSON array of article id strings, for example \
[\"id1\", \"id2\"]. No other text.";

const ORCHESTRATOR_PROMPT: &str = "You are the Bixso Orchestrator. Your workflow is: \
1. Use 'get_user_profile' to learn about the user. \
2. If the user has interests, use 'suggest_articles' to find articles matching them. \
3. If the user has no interests, use 'list_recent_articles' instead. \
4. Present the suggestions in a helpful, personalized way.";

impl Persona {
    pub fn system_prompt(&self) -> &'static str {
        match self {
            Persona::Chat => CHAT_PROMPT,
            Persona::Recommendation => RECOMMENDATION_PROMPT,
            Persona::Orchestrator => ORCHESTRATOR_PROMPT,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Persona::Chat => "chat",
            Persona::Recommendation => "recommendation",
            Persona::Orchestrator => "orchestrator",
        }
    }

    /// Format one user turn. The user id travels inside the message text
    /// so the model can pass it to `get_user_profile`.
    pub fn format_turn(user_id: &str, input: &str) -> String {
        format!("User ID: {user_id}\n\nRequest: {input}")
    }
}
