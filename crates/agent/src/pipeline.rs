//! A pipeline pairs the agent loop with a persona.
//!
//! The chat and recommendation routes are the same machinery configured
//! differently: persona prompt in, output shaping out.

use bixso_core::{Error, HistoryTurn};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::output::{self, RecommendationOutput};
use crate::persona::Persona;
use crate::runner::AgentRunner;
use crate::stream_event::AgentStreamEvent;

pub struct Pipeline {
    runner: AgentRunner,
    persona: Persona,
}

/// A shaped final answer.
///
/// Serializes untagged: prose becomes a JSON string, ids become a JSON
/// array, so the HTTP response field carries whichever the run produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AgentAnswer {
    Text(String),
    ArticleIds(Vec<String>),
}

impl Pipeline {
    pub fn new(runner: AgentRunner, persona: Persona) -> Self {
        Self { runner, persona }
    }

    pub fn persona(&self) -> Persona {
        self.persona
    }

    /// Run one turn to completion and shape the answer per the persona.
    pub async fn invoke(
        &self,
        user_id: &str,
        message: &str,
        history: &[HistoryTurn],
    ) -> Result<AgentAnswer, Error> {
        let turn = Persona::format_turn(user_id, message);
        let result = self
            .runner
            .run(self.persona.system_prompt(), history, &turn)
            .await?;

        Ok(match self.persona {
            Persona::Recommendation => match output::parse_article_ids(&result.answer) {
                RecommendationOutput::ArticleIds(ids) => AgentAnswer::ArticleIds(ids),
                RecommendationOutput::Raw(text) => AgentAnswer::Text(text),
            },
            Persona::Chat | Persona::Orchestrator => {
                AgentAnswer::Text(output::normalize_whitespace(&result.answer))
            }
        })
    }

    /// Run one turn as a stream of events.
    ///
    /// Text chunks are flattened to single-line form on the way out.
    /// Only newline characters are rewritten per chunk; trimming or
    /// collapsing would fuse words across chunk boundaries.
    pub async fn invoke_stream(
        &self,
        user_id: &str,
        message: &str,
        history: &[HistoryTurn],
    ) -> mpsc::Receiver<AgentStreamEvent> {
        let turn = Persona::format_turn(user_id, message);
        let mut inner = self
            .runner
            .run_stream(self.persona.system_prompt(), history, &turn)
            .await;

        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(async move {
            while let Some(event) = inner.recv().await {
                let event = match event {
                    AgentStreamEvent::Chunk { content } => AgentStreamEvent::Chunk {
                        content: output::flatten_chunk(&content),
                    },
                    other => other,
                };
                if tx.send(event).await.is_err() {
                    return;
                }
            }
        });
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use bixso_core::EventBus;
    use bixso_store::InMemoryStore;
    use std::sync::Arc;

    fn pipeline(persona: Persona, provider: SequentialMockProvider) -> Pipeline {
        let tools = Arc::new(bixso_tools::registry(Arc::new(InMemoryStore::new())));
        let runner = AgentRunner::new(
            Arc::new(provider),
            "mock-model",
            0.0,
            tools,
            Arc::new(EventBus::default()),
        )
        .with_persona(persona.name());
        Pipeline::new(runner, persona)
    }

    #[tokio::test]
    async fn chat_answer_is_normalized() {
        let p = pipeline(
            Persona::Chat,
            SequentialMockProvider::single_text("Hi Ada!\nEnjoy   these."),
        );
        let answer = p.invoke("u1", "hello", &[]).await.unwrap();
        assert_eq!(answer, AgentAnswer::Text("Hi Ada! Enjoy these.".into()));
    }

    #[tokio::test]
    async fn recommendation_array_is_parsed() {
        let p = pipeline(
            Persona::Recommendation,
            SequentialMockProvider::single_text(r#"["a1", "a2"]"#),
        );
        let answer = p.invoke("u1", "recommend", &[]).await.unwrap();
        assert_eq!(
            answer,
            AgentAnswer::ArticleIds(vec!["a1".into(), "a2".into()])
        );
    }

    #[tokio::test]
    async fn recommendation_prose_passes_through_raw() {
        let p = pipeline(
            Persona::Recommendation,
            SequentialMockProvider::single_text("Sorry, no articles today."),
        );
        let answer = p.invoke("u1", "recommend", &[]).await.unwrap();
        assert_eq!(answer, AgentAnswer::Text("Sorry, no articles today.".into()));
    }

    #[tokio::test]
    async fn streamed_chunks_are_flattened() {
        let p = pipeline(
            Persona::Chat,
            SequentialMockProvider::single_text("Hi Ada!\nEnjoy these."),
        );
        let mut rx = p.invoke_stream("u1", "hello", &[]).await;

        let mut text = String::new();
        while let Some(event) = rx.recv().await {
            match event {
                AgentStreamEvent::Chunk { content } => text.push_str(&content),
                AgentStreamEvent::Done { .. } => break,
                other => panic!("unexpected event: {other:?}"),
            }
        }
        assert_eq!(text, "Hi Ada! Enjoy these.");
    }

    #[test]
    fn answer_serializes_untagged() {
        let text = serde_json::to_value(AgentAnswer::Text("hello".into())).unwrap();
        assert_eq!(text, serde_json::json!("hello"));

        let ids = serde_json::to_value(AgentAnswer::ArticleIds(vec!["a1".into()])).unwrap();
        assert_eq!(ids, serde_json::json!(["a1"]));
    }
}
