//! The Bixso agent: personas, the tool-calling loop, and output shaping.
//!
//! One loop serves every route. A [`Pipeline`] pairs the loop with a
//! [`Persona`] — the persona chooses the system prompt and how the final
//! model output is shaped (normalized prose for chat, parsed article ids
//! for recommendations).

pub mod output;
pub mod persona;
pub mod pipeline;
pub mod runner;
pub mod stream_event;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use persona::Persona;
pub use pipeline::{AgentAnswer, Pipeline};
pub use runner::AgentRunner;
pub use stream_event::AgentStreamEvent;
