//! HTTP front door for the Bixso Orchestrator.
//!
//! Three routes:
//! - `GET /` — liveness message
//! - `POST /chat` — conversational turn, JSON or SSE when `stream: true`
//! - `POST /recommendation` — article ids (or prose fallback)
//!
//! Agent construction happens once, asynchronously, after the listener
//! is up. Until it completes every agent route answers 503 without
//! touching the store.

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc};
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use bixso_agent::{AgentAnswer, AgentRunner, AgentStreamEvent, Persona, Pipeline};
use bixso_config::AppConfig;
use bixso_core::HistoryTurn;

/// The per-route pipelines, built once at startup.
pub struct AgentSet {
    pub chat: Pipeline,
    pub recommendation: Pipeline,
}

/// Shared gateway state. `agents` is `None` until initialization
/// finishes.
pub struct GatewayState {
    pub agents: RwLock<Option<Arc<AgentSet>>>,
}

impl GatewayState {
    pub fn uninitialized() -> Self {
        Self {
            agents: RwLock::new(None),
        }
    }

    pub fn with_agents(agents: AgentSet) -> Self {
        Self {
            agents: RwLock::new(Some(Arc::new(agents))),
        }
    }
}

type SharedState = Arc<GatewayState>;

/// Build the router with all routes and layers.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/chat", post(chat_handler))
        .route("/recommendation", post(recommendation_handler))
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
///
/// The listener binds immediately; pipelines are built in a background
/// task so a slow store or provider never blocks the bind. Requests
/// arriving before that task finishes get 503.
pub async fn serve(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let state = Arc::new(GatewayState::uninitialized());

    let init_state = state.clone();
    tokio::spawn(async move {
        match build_agents(&config) {
            Ok(agents) => {
                *init_state.agents.write().await = Some(Arc::new(agents));
                info!("Agent pipelines initialized");
            }
            Err(e) => {
                // Stays uninitialized; routes keep answering 503
                error!(error = %e, "Agent initialization failed");
            }
        }
    });

    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the store, provider, tools, and both pipelines from config.
pub fn build_agents(config: &AppConfig) -> Result<AgentSet, bixso_core::Error> {
    let store = bixso_store::build_from_config(&config.store)?;
    let provider = bixso_providers::build_from_config(config)?;
    let tools = Arc::new(bixso_tools::registry(store));
    let event_bus = Arc::new(bixso_core::EventBus::default());

    let chat_persona = match config.chat_persona.as_str() {
        "orchestrator" => Persona::Orchestrator,
        _ => Persona::Chat,
    };

    let runner_for = |persona: Persona| {
        AgentRunner::new(
            provider.clone(),
            &config.default_model,
            config.default_temperature,
            tools.clone(),
            event_bus.clone(),
        )
        .with_max_tokens(config.default_max_tokens)
        .with_persona(persona.name())
    };

    Ok(AgentSet {
        chat: Pipeline::new(runner_for(chat_persona), chat_persona),
        recommendation: Pipeline::new(
            runner_for(Persona::Recommendation),
            Persona::Recommendation,
        ),
    })
}

// --- Request / response bodies ---

#[derive(Debug, Deserialize)]
struct ChatRequest {
    user_id: String,
    message: String,
    #[serde(default)]
    chat_history: Vec<HistoryTurn>,
    #[serde(default)]
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct RecommendationRequest {
    user_id: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    chat_history: Vec<HistoryTurn>,
}

#[derive(Serialize)]
struct AnswerResponse {
    response: AgentAnswer,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

const INITIALIZING: &str = "Agents are still initializing, please retry shortly";

async fn agents_or_503(state: &GatewayState) -> Result<Arc<AgentSet>, Response> {
    state
        .agents
        .read()
        .await
        .clone()
        .ok_or_else(|| error_response(StatusCode::SERVICE_UNAVAILABLE, INITIALIZING))
}

// --- Handlers ---

async fn root_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "Bixso Orchestrator is running" }))
}

async fn chat_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> Response {
    let agents = match agents_or_503(&state).await {
        Ok(a) => a,
        Err(resp) => return resp,
    };

    if payload.stream {
        return chat_stream(agents, payload).await;
    }

    match agents
        .chat
        .invoke(&payload.user_id, &payload.message, &payload.chat_history)
        .await
    {
        Ok(answer) => Json(AnswerResponse { response: answer }).into_response(),
        Err(e) => {
            error!(error = %e, "Chat request failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// SSE chat: only plain-text chunks reach the client. Tool activity is
/// invisible on the wire; failures become one `{"error": ...}` event.
/// Every stream, success or failure, ends with `data: [DONE]`.
async fn chat_stream(agents: Arc<AgentSet>, payload: ChatRequest) -> Response {
    let mut agent_rx = agents
        .chat
        .invoke_stream(&payload.user_id, &payload.message, &payload.chat_history)
        .await;

    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(64);

    tokio::spawn(async move {
        while let Some(event) = agent_rx.recv().await {
            match event {
                AgentStreamEvent::Chunk { content } => {
                    let data = serde_json::json!({ "text": content }).to_string();
                    if tx.send(Ok(Event::default().data(data))).await.is_err() {
                        return;
                    }
                }
                AgentStreamEvent::Error { message } => {
                    let data = serde_json::json!({ "error": message }).to_string();
                    let _ = tx.send(Ok(Event::default().data(data))).await;
                    break;
                }
                AgentStreamEvent::Done { .. } => break,
                AgentStreamEvent::ToolCall { .. } | AgentStreamEvent::ToolResult { .. } => {}
            }
        }
        let _ = tx.send(Ok(Event::default().data("[DONE]"))).await;
    });

    Sse::new(ReceiverStream::new(rx))
        .keep_alive(KeepAlive::default())
        .into_response()
}

async fn recommendation_handler(
    State(state): State<SharedState>,
    Json(payload): Json<RecommendationRequest>,
) -> Response {
    let agents = match agents_or_503(&state).await {
        Ok(a) => a,
        Err(resp) => return resp,
    };

    let message = payload
        .message
        .as_deref()
        .unwrap_or("Recommend some articles for me");

    match agents
        .recommendation
        .invoke(&payload.user_id, message, &payload.chat_history)
        .await
    {
        Ok(answer) => Json(AnswerResponse { response: answer }).into_response(),
        Err(e) => {
            error!(error = %e, "Recommendation request failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use bixso_agent::test_support::SequentialMockProvider;
    use bixso_core::{Article, EventBus, Provider, UserProfile};
    use bixso_store::InMemoryStore;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn seeded_store() -> Arc<InMemoryStore> {
        let mut fields = serde_json::Map::new();
        fields.insert("name".into(), serde_json::json!("Ada"));
        fields.insert("interests".into(), serde_json::json!(["rust"]));
        Arc::new(
            InMemoryStore::new()
                .with_user(UserProfile {
                    user_id: "u1".into(),
                    fields,
                })
                .with_article(Article {
                    id: "a1".into(),
                    tags: vec!["rust".into()],
                    fields: serde_json::Map::new(),
                }),
        )
    }

    fn app_with(chat: SequentialMockProvider, recommendation: SequentialMockProvider) -> Router {
        let tools = Arc::new(bixso_tools::registry(seeded_store()));
        let event_bus = Arc::new(EventBus::default());

        let runner_for = |provider: Arc<dyn Provider>| {
            AgentRunner::new(provider, "mock-model", 0.0, tools.clone(), event_bus.clone())
        };

        let agents = AgentSet {
            chat: Pipeline::new(runner_for(Arc::new(chat)), Persona::Chat),
            recommendation: Pipeline::new(
                runner_for(Arc::new(recommendation)),
                Persona::Recommendation,
            ),
        };

        build_router(Arc::new(GatewayState::with_agents(agents)))
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn root_route_liveness_message() {
        let app = app_with(
            SequentialMockProvider::new(vec![]),
            SequentialMockProvider::new(vec![]),
        );
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["message"], "Bixso Orchestrator is running");
    }

    #[tokio::test]
    async fn requests_before_init_get_503() {
        let app = build_router(Arc::new(GatewayState::uninitialized()));

        let response = app
            .clone()
            .oneshot(post_json(
                "/chat",
                serde_json::json!({"user_id": "u1", "message": "hi"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("initializing"));

        // Recommendation route degrades the same way
        let response = app
            .oneshot(post_json(
                "/recommendation",
                serde_json::json!({"user_id": "u1"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn chat_returns_normalized_text() {
        let app = app_with(
            SequentialMockProvider::single_text("Hi Ada!\nHere are   some reads."),
            SequentialMockProvider::new(vec![]),
        );

        let response = app
            .oneshot(post_json(
                "/chat",
                serde_json::json!({"user_id": "u1", "message": "hello"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["response"], "Hi Ada! Here are some reads.");
    }

    #[tokio::test]
    async fn chat_history_accepted() {
        let app = app_with(
            SequentialMockProvider::single_text("Continuing our talk."),
            SequentialMockProvider::new(vec![]),
        );

        let response = app
            .oneshot(post_json(
                "/chat",
                serde_json::json!({
                    "user_id": "u1",
                    "message": "and then?",
                    "chat_history": [
                        {"role": "user", "content": "hi"},
                        {"role": "assistant", "content": "hello"}
                    ]
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn recommendation_parses_id_array() {
        let app = app_with(
            SequentialMockProvider::new(vec![]),
            SequentialMockProvider::single_text(r#"["a1", "a2"]"#),
        );

        let response = app
            .oneshot(post_json(
                "/recommendation",
                serde_json::json!({"user_id": "u1"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["response"], serde_json::json!(["a1", "a2"]));
    }

    #[tokio::test]
    async fn recommendation_prose_passes_through() {
        let app = app_with(
            SequentialMockProvider::new(vec![]),
            SequentialMockProvider::single_text("No articles today, sorry."),
        );

        let response = app
            .oneshot(post_json(
                "/recommendation",
                serde_json::json!({"user_id": "u1", "message": "anything new?"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["response"], "No articles today, sorry.");
    }

    #[tokio::test]
    async fn chat_stream_emits_text_then_done() {
        let app = app_with(
            SequentialMockProvider::single_text("streamed hello"),
            SequentialMockProvider::new(vec![]),
        );

        let response = app
            .oneshot(post_json(
                "/chat",
                serde_json::json!({"user_id": "u1", "message": "hi", "stream": true}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            response
                .headers()
                .get("content-type")
                .unwrap()
                .to_str()
                .unwrap()
                .starts_with("text/event-stream")
        );

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(body.contains(r#"data: {"text":"streamed hello"}"#));
        assert!(body.ends_with("data: [DONE]\n\n"));
    }

    #[tokio::test]
    async fn chat_stream_hides_tool_activity() {
        let provider = SequentialMockProvider::tool_then_answer(
            vec![bixso_agent::test_support::make_tool_call(
                "get_user_profile",
                serde_json::json!({"user_id": "u1"}),
            )],
            "",
            "Hi Ada!",
        );
        let app = app_with(provider, SequentialMockProvider::new(vec![]));

        let response = app
            .oneshot(post_json(
                "/chat",
                serde_json::json!({"user_id": "u1", "message": "hi", "stream": true}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = String::from_utf8(bytes.to_vec()).unwrap();

        // Only the final text and the terminator reach the wire
        assert!(body.contains(r#"data: {"text":"Hi Ada!"}"#));
        assert!(body.ends_with("data: [DONE]\n\n"));
        assert!(!body.contains("tool_call"));
        assert!(!body.contains("tool_result"));
        assert!(!body.contains("get_user_profile"));
    }

    #[tokio::test]
    async fn chat_stream_failure_emits_error_before_done() {
        let tools = Arc::new(bixso_tools::registry(seeded_store()));
        let event_bus = Arc::new(EventBus::default());
        let failing = Arc::new(bixso_agent::test_support::FailingProvider);

        let agents = AgentSet {
            chat: Pipeline::new(
                AgentRunner::new(failing.clone(), "mock-model", 0.0, tools.clone(), event_bus.clone()),
                Persona::Chat,
            ),
            recommendation: Pipeline::new(
                AgentRunner::new(failing, "mock-model", 0.0, tools, event_bus),
                Persona::Recommendation,
            ),
        };
        let app = build_router(Arc::new(GatewayState::with_agents(agents)));

        let response = app
            .oneshot(post_json(
                "/chat",
                serde_json::json!({"user_id": "u1", "message": "hi", "stream": true}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        let error_pos = body.find(r#"{"error""#).expect("missing error event");
        let done_pos = body.find("[DONE]").expect("missing DONE terminator");
        assert!(error_pos < done_pos);
    }

    #[tokio::test]
    async fn agent_failure_is_500_with_error_body() {
        let tools = Arc::new(bixso_tools::registry(seeded_store()));
        let event_bus = Arc::new(EventBus::default());
        let failing = Arc::new(bixso_agent::test_support::FailingProvider);

        let agents = AgentSet {
            chat: Pipeline::new(
                AgentRunner::new(failing.clone(), "mock-model", 0.0, tools.clone(), event_bus.clone()),
                Persona::Chat,
            ),
            recommendation: Pipeline::new(
                AgentRunner::new(failing, "mock-model", 0.0, tools, event_bus),
                Persona::Recommendation,
            ),
        };
        let app = build_router(Arc::new(GatewayState::with_agents(agents)));

        let response = app
            .oneshot(post_json(
                "/chat",
                serde_json::json!({"user_id": "u1", "message": "hi"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert!(json["error"].as_str().is_some());
    }
}
