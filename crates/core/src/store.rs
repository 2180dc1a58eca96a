//! DocumentStore trait — the abstraction over the document database.
//!
//! The store owns two read-only collections: `users` keyed by id, and
//! `articles` with a `tags` array field supporting membership queries.
//! This system holds no authoritative copy of either — no caching, no
//! writes, no retries. A failed call propagates directly to its caller.

use crate::error::StoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A user profile document.
///
/// Attributes are provider-defined (name, interests, preferences) and
/// treated as an opaque mapping — the system imposes no schema beyond
/// "a record or absent".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    /// The document id (primary key in the `users` collection).
    pub user_id: String,

    /// Opaque profile fields.
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

/// An article document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    /// The document id.
    pub id: String,

    /// Tag set used for interest matching (exact membership, no stemming).
    #[serde(default)]
    pub tags: Vec<String>,

    /// Opaque article metadata.
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

/// The document database boundary.
///
/// Implementations: Firestore REST client, in-memory store for tests.
#[async_trait]
pub trait DocumentStore: Send + Sync + std::fmt::Debug {
    /// Fetch a user by id. An absent record is `Ok(None)`, not an error;
    /// connectivity failures surface as `StoreError`.
    async fn get_user(&self, user_id: &str)
    -> std::result::Result<Option<UserProfile>, StoreError>;

    /// List articles, most-recent-first, truncated to `limit`.
    async fn get_articles(&self, limit: usize) -> std::result::Result<Vec<Article>, StoreError>;

    /// Articles whose tag set contains `interest` exactly, capped at 5.
    async fn search_articles_by_interest(
        &self,
        interest: &str,
    ) -> std::result::Result<Vec<Article>, StoreError>;

    /// Health check — can we reach the store?
    async fn health_check(&self) -> std::result::Result<bool, StoreError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_profile_flattens_fields() {
        let json = r#"{"user_id":"u1","name":"Ada","interests":["rust","go"]}"#;
        let profile: UserProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.user_id, "u1");
        assert_eq!(profile.fields["name"], "Ada");
        assert_eq!(profile.fields["interests"][1], "go");

        let back = serde_json::to_value(&profile).unwrap();
        assert_eq!(back["name"], "Ada");
    }

    #[test]
    fn article_defaults_empty_tags() {
        let json = r#"{"id":"a1","title":"Hello"}"#;
        let article: Article = serde_json::from_str(json).unwrap();
        assert_eq!(article.id, "a1");
        assert!(article.tags.is_empty());
        assert_eq!(article.fields["title"], "Hello");
    }
}
