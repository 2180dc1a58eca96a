//! Firestore REST API client.
//!
//! Talks to the Firestore v1 REST surface directly with `reqwest` rather
//! than pulling in a full GCP SDK. Authentication is a pre-fetched OAuth
//! bearer token (or none at all against the emulator).
//!
//! Only the read operations the orchestrator needs are implemented:
//! document lookup by id and `runQuery` with a structured query. No
//! writes, no transactions, no retries.

use async_trait::async_trait;
use bixso_core::{Article, DocumentStore, StoreError, UserProfile};
use serde::Deserialize;
use serde_json::{Map, Value, json};

const DEFAULT_BASE_URL: &str = "https://firestore.googleapis.com/v1";

/// Firestore-backed document store.
#[derive(Debug)]
pub struct FirestoreStore {
    client: reqwest::Client,
    project_id: String,
    base_url: String,
    access_token: Option<String>,
}

impl FirestoreStore {
    pub fn new(project_id: String, base_url: Option<String>, access_token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            project_id,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            access_token,
        }
    }

    /// `projects/{pid}/databases/(default)/documents`
    fn documents_root(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents",
            self.base_url, self.project_id
        )
    }

    fn with_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.access_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn run_query(&self, query: Value) -> Result<Vec<FirestoreDocument>, StoreError> {
        let url = format!("{}:runQuery", self.documents_root());
        let response = self
            .with_auth(self.client.post(&url))
            .json(&json!({ "structuredQuery": query }))
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::QueryFailed {
                status_code: status.as_u16(),
                message: body,
            });
        }

        // runQuery returns a JSON array; entries without a `document` key
        // carry only a readTime and are skipped.
        let results: Vec<QueryResult> = response
            .json()
            .await
            .map_err(|e| StoreError::MalformedDocument(e.to_string()))?;

        Ok(results.into_iter().filter_map(|r| r.document).collect())
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn get_user(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        let url = format!("{}/users/{user_id}", self.documents_root());
        let response = self
            .with_auth(self.client.get(&url))
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            // Absent user is a normal outcome, not an error
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::QueryFailed {
                status_code: status.as_u16(),
                message: body,
            });
        }

        let doc: FirestoreDocument = response
            .json()
            .await
            .map_err(|e| StoreError::MalformedDocument(e.to_string()))?;

        Ok(Some(UserProfile {
            user_id: doc.doc_id().to_string(),
            fields: doc.decode_fields(),
        }))
    }

    async fn get_articles(&self, limit: usize) -> Result<Vec<Article>, StoreError> {
        let docs = self
            .run_query(json!({
                "from": [{ "collectionId": "articles" }],
                "orderBy": [{
                    "field": { "fieldPath": "created_at" },
                    "direction": "DESCENDING"
                }],
                "limit": limit
            }))
            .await?;

        Ok(docs.into_iter().map(FirestoreDocument::into_article).collect())
    }

    async fn search_articles_by_interest(&self, interest: &str) -> Result<Vec<Article>, StoreError> {
        let docs = self
            .run_query(json!({
                "from": [{ "collectionId": "articles" }],
                "where": {
                    "fieldFilter": {
                        "field": { "fieldPath": "tags" },
                        "op": "ARRAY_CONTAINS",
                        "value": { "stringValue": interest }
                    }
                },
                "limit": 5
            }))
            .await?;

        Ok(docs.into_iter().map(FirestoreDocument::into_article).collect())
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        // One cheap query; any well-formed response means the store is up
        match self.get_articles(1).await {
            Ok(_) => Ok(true),
            Err(StoreError::Network(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

// --- Firestore wire format ---

#[derive(Debug, Deserialize)]
struct QueryResult {
    #[serde(default)]
    document: Option<FirestoreDocument>,
}

#[derive(Debug, Deserialize)]
struct FirestoreDocument {
    /// Full resource name: `projects/.../documents/users/u1`
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

impl FirestoreDocument {
    /// The last path segment of the resource name is the document id.
    fn doc_id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    /// Decode all typed fields into plain JSON.
    fn decode_fields(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .map(|(k, v)| (k.clone(), decode_value(v)))
            .collect()
    }

    fn into_article(self) -> Article {
        let id = self.doc_id().to_string();
        let mut fields = self.decode_fields();
        let tags = match fields.remove("tags") {
            Some(Value::Array(values)) => values
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        };
        Article { id, tags, fields }
    }
}

/// Decode a Firestore typed value (`{"stringValue": "x"}` etc.) into
/// plain JSON.
fn decode_value(value: &Value) -> Value {
    let Some(obj) = value.as_object() else {
        return Value::Null;
    };

    if let Some(s) = obj.get("stringValue").and_then(Value::as_str) {
        return Value::String(s.to_string());
    }
    if let Some(i) = obj.get("integerValue") {
        // Firestore encodes int64 as a JSON string
        if let Some(n) = i.as_str().and_then(|s| s.parse::<i64>().ok()) {
            return json!(n);
        }
        if let Some(n) = i.as_i64() {
            return json!(n);
        }
    }
    if let Some(d) = obj.get("doubleValue").and_then(Value::as_f64) {
        return json!(d);
    }
    if let Some(b) = obj.get("booleanValue").and_then(Value::as_bool) {
        return Value::Bool(b);
    }
    if obj.contains_key("nullValue") {
        return Value::Null;
    }
    if let Some(ts) = obj.get("timestampValue").and_then(Value::as_str) {
        return Value::String(ts.to_string());
    }
    if let Some(arr) = obj.get("arrayValue") {
        let values = arr
            .get("values")
            .and_then(Value::as_array)
            .map(|vs| vs.iter().map(decode_value).collect())
            .unwrap_or_default();
        return Value::Array(values);
    }
    if let Some(map) = obj.get("mapValue") {
        let fields = map
            .get("fields")
            .and_then(Value::as_object)
            .map(|fs| {
                fs.iter()
                    .map(|(k, v)| (k.clone(), decode_value(v)))
                    .collect()
            })
            .unwrap_or_default();
        return Value::Object(fields);
    }

    Value::Null
}
