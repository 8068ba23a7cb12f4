//! HTTP 前端
//!
//! POST /chat：{ email, messages } -> { response }，每个请求独立跑一次主循环，服务端不保留会话。
//! GET /：存活检查。跨域按配置的来源放行。

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};

use crate::agent::{process_chat, AgentComponents, ChatReply};
use crate::memory::Message;

/// 聊天请求体
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub email: String,
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// 创建路由，供调用方绑定端口
pub fn create_router(state: Arc<AgentComponents>, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/chat", post(chat))
        .layer(cors_layer(allowed_origins))
        .with_state(state)
}

/// 允许携带凭据时不能用通配方法 / 头，改为回显预检请求
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// GET / - 存活检查
async fn root() -> Json<Value> {
    Json(json!({ "message": "Chatbot API is running" }))
}

/// POST /chat - 跑一次主循环并返回最终回复
async fn chat(
    State(state): State<Arc<AgentComponents>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatReply>, (StatusCode, Json<Value>)> {
    let email = req.email.trim();
    if email.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "detail": "email must not be empty" })),
        ));
    }
    tracing::info!(email = %email, history = req.messages.len(), "chat request");
    Ok(Json(process_chat(&state, email, req.messages).await))
}
