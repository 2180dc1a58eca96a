//! In-memory document store for tests and local development.

use async_trait::async_trait;
use bixso_core::{Article, DocumentStore, StoreError, UserProfile};
use std::collections::HashMap;
use std::sync::Mutex;

/// An in-process store holding users keyed by id and articles in
/// newest-first order.
#[derive(Debug)]
pub struct InMemoryStore {
    users: Mutex<HashMap<String, UserProfile>>,
    /// Newest first, mirroring the descending created_at ordering of the
    /// Firestore backend.
    articles: Mutex<Vec<Article>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
            articles: Mutex::new(Vec::new()),
        }
    }

    /// Seed a user (builder style, for tests).
    pub fn with_user(self, profile: UserProfile) -> Self {
        self.users
            .lock()
            .unwrap()
            .insert(profile.user_id.clone(), profile);
        self
    }

    /// Seed an article at the "most recent" position.
    pub fn with_article(self, article: Article) -> Self {
        self.articles.lock().unwrap().insert(0, article);
        self
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn get_user(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.users.lock().unwrap().get(user_id).cloned())
    }

    async fn get_articles(&self, limit: usize) -> Result<Vec<Article>, StoreError> {
        Ok(self
            .articles
            .lock()
            .unwrap()
            .iter()
            .take(limit)
            .cloned()
            .collect())
    }

    async fn search_articles_by_interest(&self, interest: &str) -> Result<Vec<Article>, StoreError> {
        Ok(self
            .articles
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.tags.iter().any(|t| t == interest))
            .take(5)
            .cloned()
            .collect())
    }
}
