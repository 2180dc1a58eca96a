//! Fetch a user's profile from the document store.

use async_trait::async_trait;
use bixso_core::{DocumentStore, Tool, ToolError, ToolResult};
use serde::Deserialize;
use std::sync::Arc;

pub struct GetUserProfileTool {
    store: Arc<dyn DocumentStore>,
}

impl GetUserProfileTool {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[derive(Deserialize)]
struct Args {
    user_id: String,
}

#[async_trait]
impl Tool for GetUserProfileTool {
    fn name(&self) -> &str {
        "get_user_profile"
    }

    fn description(&self) -> &str {
        "Fetch the profile for a user by their id. Returns the profile fields \
         (name, interests, preferences) or null if the user does not exist."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "user_id": {
                    "type": "string",
                    "description": "The id of the user to look up"
                }
            },
            "required": ["user_id"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let args: Args = serde_json::from_value(arguments)
            .map_err(|e| ToolError::InvalidArguments(format!("user_id: {e}")))?;

        if args.user_id.trim().is_empty() {
            return Err(ToolError::InvalidArguments(
                "user_id must be a non-empty string".into(),
            ));
        }

        let profile = self
            .store
            .get_user(&args.user_id)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "get_user_profile".into(),
                reason: e.to_string(),
            })?;

        // An absent user serializes as the JSON literal `null` so the model
        // can tell "no profile" apart from a failure
        let output = match &profile {
            Some(p) => serde_json::to_string(p).map_err(|e| ToolError::ExecutionFailed {
                tool_name: "get_user_profile".into(),
                reason: e.to_string(),
            })?,
            None => "null".to_string(),
        };

        Ok(ToolResult {
            call_id: String::new(),
            success: true,
            output,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bixso_core::UserProfile;
    use bixso_store::InMemoryStore;
    use serde_json::json;

    fn tool_with_user() -> GetUserProfileTool {
        let mut fields = serde_json::Map::new();
        fields.insert("name".into(), json!("Ada"));
        fields.insert("interests".into(), json!(["rust", "ai"]));
        let store = InMemoryStore::new().with_user(UserProfile {
            user_id: "u1".into(),
            fields,
        });
        GetUserProfileTool::new(Arc::new(store))
    }

    #[tokio::test]
    async fn existing_user_serialized() {
        let result = tool_with_user()
            .execute(json!({"user_id": "u1"}))
            .await
            .unwrap();
        assert!(result.success);
        let value: serde_json::Value = serde_json::from_str(&result.output).unwrap();
        assert_eq!(value["name"], "Ada");
        assert_eq!(value["interests"][1], "ai");
    }

    #[tokio::test]
    async fn absent_user_is_json_null() {
        let result = tool_with_user()
            .execute(json!({"user_id": "ghost"}))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.output, "null");
    }

    #[tokio::test]
    async fn missing_user_id_rejected() {
        let err = tool_with_user().execute(json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn empty_user_id_rejected() {
        let err = tool_with_user()
            .execute(json!({"user_id": "  "}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
