//! The tool-calling agent loop.
//!
//! One iteration: send the conversation to the provider, execute any
//! tool calls it requests, append the results, repeat. The loop ends
//! when the model answers without tool calls or the iteration cap is
//! hit. Tool failures are not fatal — the error text goes back to the
//! model as a tool result so it can recover or explain.

use bixso_core::{
    DomainEvent, Error, EventBus, HistoryTurn, Message, MessageToolCall, Provider,
    ProviderRequest, ToolCall, ToolRegistry, Usage,
};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::stream_event::AgentStreamEvent;

const DEFAULT_MAX_ITERATIONS: u32 = 8;

pub struct AgentRunner {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    tools: Arc<ToolRegistry>,
    event_bus: Arc<EventBus>,
    max_iterations: u32,
    persona: String,
}

/// The outcome of a completed (non-streaming) run.
#[derive(Debug)]
pub struct RunResult {
    pub answer: String,
    pub iterations: usize,
    pub tool_calls_made: usize,
    pub usage: Option<Usage>,
}

impl AgentRunner {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        temperature: f32,
        tools: Arc<ToolRegistry>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
            max_tokens: None,
            tools,
            event_bus,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            persona: String::new(),
        }
    }

    /// Label published with `ResponseGenerated` events.
    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = persona.into();
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    /// Build the initial conversation: system prompt, caller-supplied
    /// history in order, then the current turn.
    fn seed_messages(
        system_prompt: &str,
        history: &[HistoryTurn],
        user_message: &str,
    ) -> Vec<Message> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(system_prompt));
        messages.extend(history.iter().map(HistoryTurn::to_message));
        messages.push(Message::user(user_message));
        messages
    }

    async fn execute_tool(&self, tc: &MessageToolCall) -> (String, bool) {
        let call = ToolCall {
            id: tc.id.clone(),
            name: tc.name.clone(),
            arguments: serde_json::from_str(&tc.arguments).unwrap_or_default(),
        };

        let start = std::time::Instant::now();
        let result = self.tools.execute(&call).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let (output, success) = match result {
            Ok(r) => (r.output, r.success),
            Err(e) => (format!("Error: {e}"), false),
        };

        self.event_bus.publish(DomainEvent::ToolExecuted {
            tool_name: tc.name.clone(),
            success,
            duration_ms,
            timestamp: Utc::now(),
        });

        (output, success)
    }

    /// Run the loop to completion and return the final answer.
    pub async fn run(
        &self,
        system_prompt: &str,
        history: &[HistoryTurn],
        user_message: &str,
    ) -> Result<RunResult, Error> {
        let mut messages = Self::seed_messages(system_prompt, history, user_message);
        let tool_defs = self.tools.definitions();
        let mut tool_calls_made = 0usize;
        let mut last_usage = None;

        info!(model = %self.model, max_iter = self.max_iterations, "Agent loop starting");

        for iteration in 1..=self.max_iterations {
            debug!(iteration, "Agent iteration");

            let request = ProviderRequest {
                model: self.model.clone(),
                messages: messages.clone(),
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                tools: tool_defs.clone(),
                stream: false,
            };

            let response = match self.provider.complete(request).await {
                Ok(response) => response,
                Err(e) => {
                    self.event_bus.publish(DomainEvent::ErrorOccurred {
                        context: "provider".into(),
                        error_message: e.to_string(),
                        timestamp: Utc::now(),
                    });
                    return Err(e.into());
                }
            };

            if let Some(usage) = &response.usage {
                last_usage = Some(usage.clone());
            }

            if response.message.tool_calls.is_empty() {
                info!(
                    iterations = iteration,
                    tool_calls = tool_calls_made,
                    "Agent loop completed"
                );
                if let Some(usage) = &last_usage {
                    self.event_bus.publish(DomainEvent::ResponseGenerated {
                        persona: self.persona.clone(),
                        model: self.model.clone(),
                        tokens_used: usage.total_tokens,
                        timestamp: Utc::now(),
                    });
                }
                return Ok(RunResult {
                    answer: response.message.content,
                    iterations: iteration as usize,
                    tool_calls_made,
                    usage: last_usage,
                });
            }

            let tool_calls = response.message.tool_calls.clone();
            messages.push(response.message);

            for tc in &tool_calls {
                tool_calls_made += 1;
                let (output, _) = self.execute_tool(tc).await;
                messages.push(Message::tool_result(&tc.id, &output));
            }
        }

        warn!(max_iter = self.max_iterations, "Agent loop hit iteration cap");
        self.event_bus.publish(DomainEvent::ErrorOccurred {
            context: "agent_loop".into(),
            error_message: format!("iteration cap of {} reached", self.max_iterations),
            timestamp: Utc::now(),
        });
        Err(Error::Internal(format!(
            "Agent did not produce an answer within {} iterations",
            self.max_iterations
        )))
    }

    /// Streaming variant of [`run`].
    ///
    /// Returns a receiver of [`AgentStreamEvent`]s populated by a
    /// background task. On failure the last event is `Error`, then the
    /// channel closes.
    pub async fn run_stream(
        &self,
        system_prompt: &str,
        history: &[HistoryTurn],
        user_message: &str,
    ) -> mpsc::Receiver<AgentStreamEvent> {
        let (tx, rx) = mpsc::channel::<AgentStreamEvent>(128);

        let provider = self.provider.clone();
        let model = self.model.clone();
        let temperature = self.temperature;
        let max_tokens = self.max_tokens;
        let tools = self.tools.clone();
        let event_bus = self.event_bus.clone();
        let max_iterations = self.max_iterations;
        let persona = self.persona.clone();
        let mut messages = Self::seed_messages(system_prompt, history, user_message);

        tokio::spawn(async move {
            let tool_defs = tools.definitions();
            let mut tool_calls_made = 0usize;
            let mut last_usage = None;

            for iteration in 1..=max_iterations {
                let request = ProviderRequest {
                    model: model.clone(),
                    messages: messages.clone(),
                    temperature,
                    max_tokens,
                    tools: tool_defs.clone(),
                    stream: true,
                };

                let mut stream_rx = match provider.stream(request).await {
                    Ok(rx) => rx,
                    Err(e) => {
                        event_bus.publish(DomainEvent::ErrorOccurred {
                            context: "provider".into(),
                            error_message: e.to_string(),
                            timestamp: Utc::now(),
                        });
                        let _ = tx
                            .send(AgentStreamEvent::Error {
                                message: format!("Provider error: {e}"),
                            })
                            .await;
                        return;
                    }
                };

                let mut full_content = String::new();
                let mut accumulated: Vec<MessageToolCall> = Vec::new();

                while let Some(chunk_result) = stream_rx.recv().await {
                    match chunk_result {
                        Ok(chunk) => {
                            if let Some(text) = &chunk.content
                                && !text.is_empty()
                            {
                                full_content.push_str(text);
                                if tx
                                    .send(AgentStreamEvent::Chunk {
                                        content: text.clone(),
                                    })
                                    .await
                                    .is_err()
                                {
                                    // client went away
                                    return;
                                }
                            }

                            for tc in &chunk.tool_calls {
                                if let Some(existing) =
                                    accumulated.iter_mut().find(|t| t.id == tc.id)
                                {
                                    existing.arguments.push_str(&tc.arguments);
                                } else {
                                    accumulated.push(tc.clone());
                                }
                            }

                            if let Some(usage) = chunk.usage {
                                last_usage = Some(usage);
                            }
                        }
                        Err(e) => {
                            event_bus.publish(DomainEvent::ErrorOccurred {
                                context: "stream".into(),
                                error_message: e.to_string(),
                                timestamp: Utc::now(),
                            });
                            let _ = tx
                                .send(AgentStreamEvent::Error {
                                    message: format!("Stream error: {e}"),
                                })
                                .await;
                            return;
                        }
                    }
                }

                if accumulated.is_empty() {
                    if let Some(usage) = &last_usage {
                        event_bus.publish(DomainEvent::ResponseGenerated {
                            persona: persona.clone(),
                            model: model.clone(),
                            tokens_used: usage.total_tokens,
                            timestamp: Utc::now(),
                        });
                    }
                    let _ = tx
                        .send(AgentStreamEvent::Done {
                            usage: last_usage,
                            iterations: iteration as usize,
                            tool_calls_made,
                        })
                        .await;
                    return;
                }

                let mut assistant_msg = Message::assistant(&full_content);
                assistant_msg.tool_calls = accumulated.clone();
                messages.push(assistant_msg);

                for tc in &accumulated {
                    tool_calls_made += 1;

                    let _ = tx
                        .send(AgentStreamEvent::ToolCall {
                            id: tc.id.clone(),
                            name: tc.name.clone(),
                            input: serde_json::from_str(&tc.arguments).unwrap_or_default(),
                        })
                        .await;

                    let call = ToolCall {
                        id: tc.id.clone(),
                        name: tc.name.clone(),
                        arguments: serde_json::from_str(&tc.arguments).unwrap_or_default(),
                    };

                    let start = std::time::Instant::now();
                    let result = tools.execute(&call).await;
                    let duration_ms = start.elapsed().as_millis() as u64;

                    let (output, success) = match result {
                        Ok(r) => (r.output, r.success),
                        Err(e) => (format!("Error: {e}"), false),
                    };

                    event_bus.publish(DomainEvent::ToolExecuted {
                        tool_name: tc.name.clone(),
                        success,
                        duration_ms,
                        timestamp: Utc::now(),
                    });

                    let _ = tx
                        .send(AgentStreamEvent::ToolResult {
                            id: tc.id.clone(),
                            name: tc.name.clone(),
                            output: output.clone(),
                            success,
                        })
                        .await;

                    messages.push(Message::tool_result(&tc.id, &output));
                }
            }

            event_bus.publish(DomainEvent::ErrorOccurred {
                context: "agent_loop".into(),
                error_message: format!("iteration cap of {max_iterations} reached"),
                timestamp: Utc::now(),
            });
            let _ = tx
                .send(AgentStreamEvent::Error {
                    message: format!(
                        "Agent did not produce an answer within {max_iterations} iterations"
                    ),
                })
                .await;
        });

        rx
    }
}
