//! OpenAI 兼容 API 客户端
//!
//! 通过 async_openai 调用任意 OpenAI 兼容端点（可配置 base_url）。请求体与响应体使用自带类型
//! （create_byot），以便完整表达 tools / tool_calls 与旧式 function_call 两种形态。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_openai::config::OpenAIConfig;
use async_openai::Client;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::llm::{FunctionCallRequest, LlmClient, LlmError, ModelReply};
use crate::memory::{Message, Role};
use crate::tools::OperationDescriptor;

/// Token 使用统计（累计值）
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: Arc<AtomicU64>,
    pub completion_tokens: Arc<AtomicU64>,
    pub total_tokens: Arc<AtomicU64>,
}

impl TokenUsage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, prompt: u64, completion: u64) {
        self.prompt_tokens.fetch_add(prompt, Ordering::Relaxed);
        self.completion_tokens.fetch_add(completion, Ordering::Relaxed);
        self.total_tokens.fetch_add(prompt + completion, Ordering::Relaxed);
    }

    pub fn get(&self) -> (u64, u64, u64) {
        (
            self.prompt_tokens.load(Ordering::Relaxed),
            self.completion_tokens.load(Ordering::Relaxed),
            self.total_tokens.load(Ordering::Relaxed),
        )
    }
}

/// OpenAI 兼容客户端：持有 Client 与 model 名
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
    /// 累计 token 使用统计
    pub usage: TokenUsage,
}

impl OpenAiClient {
    pub fn new(base_url: Option<&str>, model: &str, api_key: &str) -> Self {
        let config = if let Some(url) = base_url {
            OpenAIConfig::new().with_api_base(url).with_api_key(api_key)
        } else {
            OpenAIConfig::new().with_api_key(api_key)
        };

        Self {
            client: Client::with_config(config),
            model: model.to_string(),
            usage: TokenUsage::new(),
        }
    }

    fn build_request(&self, messages: &[Message], operations: &[OperationDescriptor]) -> Value {
        let mut request = json!({
            "model": self.model,
            "messages": to_openai_messages(messages),
        });
        if !operations.is_empty() {
            request["tools"] = Value::Array(operations.iter().map(to_openai_tool).collect());
            request["tool_choice"] = json!("auto");
        }
        request
    }
}

fn to_openai_tool(d: &OperationDescriptor) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": d.name,
            "description": d.description,
            "parameters": d.parameters_schema(),
        }
    })
}

/// 转为 API 消息：带 id 的调用走 tool_calls / tool，不带 id（调用方传入的历史）走旧式 function_call / function
fn to_openai_messages(messages: &[Message]) -> Vec<Value> {
    let mut pending_call_id: Option<String> = None;
    messages
        .iter()
        .map(|m| match (&m.role, &m.call) {
            (Role::System, _) => json!({ "role": "system", "content": m.content }),
            (Role::User, _) => json!({ "role": "user", "content": m.content }),
            (Role::Assistant, Some(call)) => {
                let function = json!({
                    "name": call.name,
                    "arguments": call.arguments.to_string(),
                });
                pending_call_id = call.id.clone();
                match &call.id {
                    Some(id) => json!({
                        "role": "assistant",
                        "content": Value::Null,
                        "tool_calls": [{ "id": id, "type": "function", "function": function }],
                    }),
                    None => json!({
                        "role": "assistant",
                        "content": Value::Null,
                        "function_call": function,
                    }),
                }
            }
            (Role::Assistant, None) => json!({ "role": "assistant", "content": m.content }),
            (Role::Function, _) => match pending_call_id.take() {
                Some(id) => json!({ "role": "tool", "tool_call_id": id, "content": m.content }),
                None => json!({
                    "role": "function",
                    "name": m.name.clone().unwrap_or_default(),
                    "content": m.content,
                }),
            },
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ChatToolCall>>,
    function_call: Option<ChatFunction>,
}

#[derive(Debug, Deserialize)]
struct ChatToolCall {
    id: String,
    function: ChatFunction,
}

#[derive(Debug, Deserialize)]
struct ChatFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

/// 取首个 choice：有 tool_calls 用第一个（每轮至多一次调用），其次旧式 function_call，否则文本
fn to_model_reply(response: ChatResponse) -> Result<ModelReply, LlmError> {
    let message = response
        .choices
        .into_iter()
        .next()
        .map(|c| c.message)
        .ok_or_else(|| LlmError::InvalidResponse("no choices in completion".to_string()))?;

    if let Some(tc) = message.tool_calls.and_then(|calls| calls.into_iter().next()) {
        return Ok(ModelReply::Call(FunctionCallRequest {
            id: Some(tc.id),
            name: tc.function.name,
            arguments: tc.function.arguments,
        }));
    }
    if let Some(f) = message.function_call {
        return Ok(ModelReply::Call(FunctionCallRequest {
            id: None,
            name: f.name,
            arguments: f.arguments,
        }));
    }
    Ok(ModelReply::Text(message.content.unwrap_or_default()))
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn token_usage(&self) -> (u64, u64, u64) {
        self.usage.get()
    }

    async fn complete(
        &self,
        messages: &[Message],
        operations: &[OperationDescriptor],
    ) -> Result<ModelReply, LlmError> {
        let request = self.build_request(messages, operations);

        let response: ChatResponse = self
            .client
            .chat()
            .create_byot(request)
            .await
            .map_err(|e| LlmError::Api(e.to_string()))?;

        if let Some(usage) = &response.usage {
            self.usage.add(usage.prompt_tokens, usage.completion_tokens);
        }

        to_model_reply(response)
    }
}
