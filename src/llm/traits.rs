//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / Mock）实现 LlmClient：提交完整对话与 operation 目录，
//! 得到一段文本回复，或一次（至多一次）operation 调用请求。

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::memory::Message;
use crate::tools::OperationDescriptor;

/// 模型请求的 operation 调用；arguments 为模型原样给出的 JSON 字符串，由 Planner 解析
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCallRequest {
    pub id: Option<String>,
    pub name: String,
    pub arguments: String,
}

/// 一次模型调用的结果：文本（结束）或 operation 调用（继续）
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    Text(String),
    Call(FunctionCallRequest),
}

impl ModelReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }

    /// 以 JSON 值构造调用请求（测试与 Mock 使用）
    pub fn call(name: impl Into<String>, arguments: Value) -> Self {
        Self::Call(FunctionCallRequest {
            id: None,
            name: name.into(),
            arguments: arguments.to_string(),
        })
    }
}

/// 模型调用失败（传输、鉴权、限流、响应格式）
#[derive(Error, Debug, Clone)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// LLM 客户端 trait
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 非流式完成；operations 为空时不向后端声明任何工具
    async fn complete(
        &self,
        messages: &[Message],
        operations: &[OperationDescriptor],
    ) -> Result<ModelReply, LlmError>;

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    /// 默认返回 (0, 0, 0)，具体实现可覆盖
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}
