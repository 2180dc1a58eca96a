//! Most-recent articles, the fallback when a user has no interests.

use async_trait::async_trait;
use bixso_core::{DocumentStore, Tool, ToolError, ToolResult};
use std::sync::Arc;

const RECENT_LIMIT: usize = 10;

pub struct ListRecentArticlesTool {
    store: Arc<dyn DocumentStore>,
}

impl ListRecentArticlesTool {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ListRecentArticlesTool {
    fn name(&self) -> &str {
        "list_recent_articles"
    }

    fn description(&self) -> &str {
        "List the ten most recently published articles. Use when the user \
         has no recorded interests."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let articles = self
            .store
            .get_articles(RECENT_LIMIT)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "list_recent_articles".into(),
                reason: e.to_string(),
            })?;

        let output = serde_json::to_string(&articles).map_err(|e| ToolError::ExecutionFailed {
            tool_name: "list_recent_articles".into(),
            reason: e.to_string(),
        })?;

        Ok(ToolResult {
            call_id: String::new(),
            success: true,
            output,
        })
    }
}
