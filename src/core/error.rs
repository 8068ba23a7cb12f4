//! Agent 错误类型
//!
//! 编排循环在边界处把 AgentError 转为一句可读的最终回复；
//! 日历侧的传输失败不会进入这里（operation 以错误数据的形式返回给模型）。

use thiserror::Error;

use crate::llm::LlmError;

/// 编排循环可能出现的错误（模型调用、指令解析、步数上限、配置）
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("LLM error: {0}")]
    LlmError(#[from] LlmError),

    #[error("LLM request timed out after {0}s")]
    LlmTimeout(u64),

    /// 模型请求了未注册的 operation
    #[error("Hallucinated tool: {0}")]
    HallucinatedTool(String),

    /// 模型给出的参数字符串不是合法 JSON
    #[error("JSON parse error: {0}")]
    JsonParseError(String),

    #[error("Exceeded maximum of {0} operation calls without a final answer")]
    MaxStepsExceeded(usize),

    #[error("Config error: {0}")]
    ConfigError(String),
}
