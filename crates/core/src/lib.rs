//! # Bixso Core
//!
//! Domain types, traits, and error definitions for the Bixso Orchestrator.
//! This crate has **zero framework dependencies** — it defines the domain
//! model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is defined as a trait here: the LLM backend
//! (`Provider`), the document database (`DocumentStore`), and the agent's
//! capabilities (`Tool`). Implementations live in their respective crates.
//! This enables:
//! - Swapping implementations via configuration
//! - Deterministic testing with scripted mock implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod store;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result, StoreError, ToolError};
pub use event::{DomainEvent, EventBus};
pub use message::{HistoryTurn, Message, MessageToolCall, Role};
pub use provider::{
    Provider, ProviderRequest, ProviderResponse, StreamChunk, ToolDefinition, Usage,
};
pub use store::{Article, DocumentStore, UserProfile};
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult};
