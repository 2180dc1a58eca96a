//! Interest-driven article search.
//!
//! Runs one store query per interest, merges the results in query order,
//! deduplicates by article id keeping the first occurrence, and caps the
//! merged list at five articles.

use async_trait::async_trait;
use bixso_core::{Article, DocumentStore, Tool, ToolError, ToolResult};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

const MAX_SUGGESTIONS: usize = 5;

pub struct SuggestArticlesTool {
    store: Arc<dyn DocumentStore>,
}

impl SuggestArticlesTool {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for SuggestArticlesTool {
    fn name(&self) -> &str {
        "suggest_articles"
    }

    fn description(&self) -> &str {
        "Search for articles matching a list of user interests. Returns up \
         to five articles, deduplicated across interests."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "interests": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Interest tags to match against article tags"
                }
            },
            "required": ["interests"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        // Validated before any store access: must be a non-empty array of
        // strings. A single wrong-typed element rejects the whole call.
        let interests = arguments
            .get("interests")
            .and_then(serde_json::Value::as_array)
            .ok_or_else(|| {
                ToolError::InvalidArguments("interests must be an array of strings".into())
            })?;
        if interests.is_empty() {
            return Err(ToolError::InvalidArguments(
                "interests must not be empty".into(),
            ));
        }
        let interests: Vec<&str> = interests
            .iter()
            .map(|v| {
                v.as_str().ok_or_else(|| {
                    ToolError::InvalidArguments("interests must contain only strings".into())
                })
            })
            .collect::<Result<_, _>>()?;

        let mut seen: HashSet<String> = HashSet::new();
        let mut suggestions: Vec<Article> = Vec::new();

        for interest in &interests {
            let articles = self
                .store
                .search_articles_by_interest(interest)
                .await
                .map_err(|e| ToolError::ExecutionFailed {
                    tool_name: "suggest_articles".into(),
                    reason: e.to_string(),
                })?;

            for article in articles {
                if seen.insert(article.id.clone()) {
                    suggestions.push(article);
                }
            }
        }

        suggestions.truncate(MAX_SUGGESTIONS);

        debug!(
            interests = interests.len(),
            suggestions = suggestions.len(),
            "Article suggestions assembled"
        );

        let output =
            serde_json::to_string(&suggestions).map_err(|e| ToolError::ExecutionFailed {
                tool_name: "suggest_articles".into(),
                reason: e.to_string(),
            })?;

        Ok(ToolResult {
            call_id: String::new(),
            success: true,
            output,
        })
    }
}
