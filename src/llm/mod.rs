//! LLM 层：客户端抽象与实现（OpenAI 兼容 / Mock）

pub mod mock;
pub mod openai;
pub mod traits;

use std::sync::Arc;

pub use mock::{RecordedRequest, ScriptedLlmClient};
pub use openai::{OpenAiClient, TokenUsage};
pub use traits::{FunctionCallRequest, LlmClient, LlmError, ModelReply};

use crate::config::AppConfig;

/// 根据配置与环境变量选择 LLM 后端：有 Key 用 OpenAI 兼容端点，否则回退 Mock
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    match cfg.llm.resolved_api_key() {
        Some(key) => {
            tracing::info!("Using OpenAI LLM ({})", cfg.llm.model);
            Arc::new(OpenAiClient::new(
                cfg.llm.base_url.as_deref(),
                &cfg.llm.model,
                &key,
            ))
        }
        None => {
            tracing::warn!("No API key set, using Mock LLM");
            Arc::new(ScriptedLlmClient::default())
        }
    }
}
