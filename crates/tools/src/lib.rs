//! Agent tools for the Bixso Orchestrator.
//!
//! Three tools over the document store:
//! - `get_user_profile` — fetch a user's profile by id
//! - `suggest_articles` — interest-driven article search with dedup
//! - `list_recent_articles` — most recent articles, interest-free fallback
//!
//! Every tool serializes its output to JSON text; that string is what the
//! model sees as the tool result.

pub mod get_user_profile;
pub mod list_recent_articles;
pub mod suggest_articles;

pub use get_user_profile::GetUserProfileTool;
pub use list_recent_articles::ListRecentArticlesTool;
pub use suggest_articles::SuggestArticlesTool;

use bixso_core::{DocumentStore, ToolRegistry};
use std::sync::Arc;

/// Build the standard registry with all three store-backed tools.
pub fn registry(store: Arc<dyn DocumentStore>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(GetUserProfileTool::new(store.clone())));
    registry.register(Box::new(SuggestArticlesTool::new(store.clone())));
    registry.register(Box::new(ListRecentArticlesTool::new(store)));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use bixso_store::InMemoryStore;

    #[test]
    fn registry_contains_all_tools() {
        let store = Arc::new(InMemoryStore::new());
        let registry = registry(store);
        let mut names = registry.names();
        names.sort();
        assert_eq!(
            names,
            vec!["get_user_profile", "list_recent_articles", "suggest_articles"]
        );
    }
}
