//! Planner：调用 LLM 决定下一步，并把模型的调用请求解析为 OperationCall
//!
//! 每次都提交完整对话与完整目录；单次模型调用受超时约束。

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde_json::Value;

use crate::core::AgentError;
use crate::llm::{FunctionCallRequest, LlmClient, ModelReply};
use crate::memory::Message;
use crate::tools::{OperationCall, OperationDescriptor};

/// Planner 输出
#[derive(Debug, Clone, PartialEq)]
pub enum PlannerOutput {
    /// 直接回复用户（终止）
    Response(String),
    /// 需要执行 operation
    Call(OperationCall),
}

/// 注入为首条消息的 system 指令，标明本次请求的用户身份
pub fn system_instruction(identity: &str, today: NaiveDate) -> String {
    format!(
        "You are a chatbot assisting {} with Cal.com events. Today is {}. \
         Use the provided functions to check availability, book, list, cancel or reschedule \
         events; call at most one function per turn, or answer the user directly.",
        identity,
        today.format("%Y-%m-%d (%A)")
    )
}

/// 解析模型给出的参数字符串；空串视为无参数，非 JSON 视为指令格式错误
pub fn parse_call(req: FunctionCallRequest) -> Result<OperationCall, AgentError> {
    let raw = req.arguments.trim();
    let arguments = if raw.is_empty() {
        Value::Object(Default::default())
    } else {
        serde_json::from_str(raw)
            .map_err(|e| AgentError::JsonParseError(format!("{}: {}", e, raw)))?
    };
    let call = OperationCall::new(req.name, arguments);
    Ok(match req.id {
        Some(id) => call.with_id(id),
        None => call,
    })
}

/// Planner：持有 LLM 与单次调用超时
pub struct Planner {
    llm: Arc<dyn LlmClient>,
    timeout: Duration,
}

impl Planner {
    pub fn new(llm: Arc<dyn LlmClient>, timeout_secs: u64) -> Self {
        Self {
            llm,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// 获取 LLM 累计 token 使用统计
    pub fn token_usage(&self) -> (u64, u64, u64) {
        self.llm.token_usage()
    }

    pub async fn plan(
        &self,
        messages: &[Message],
        catalog: &[OperationDescriptor],
    ) -> Result<PlannerOutput, AgentError> {
        let reply = tokio::time::timeout(self.timeout, self.llm.complete(messages, catalog))
            .await
            .map_err(|_| AgentError::LlmTimeout(self.timeout.as_secs()))??;
        match reply {
            ModelReply::Text(text) => Ok(PlannerOutput::Response(text)),
            ModelReply::Call(req) => parse_call(req).map(PlannerOutput::Call),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmError, ScriptedLlmClient};
    use serde_json::json;

    #[test]
    fn test_system_instruction_names_identity() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 7).unwrap();
        let s = system_instruction("a@b.com", today);
        assert!(s.starts_with("You are a chatbot assisting a@b.com with Cal.com events."));
        assert!(s.contains("2024-06-07 (Friday)"));
    }

    #[test]
    fn test_parse_call_variants() {
        let ok = parse_call(FunctionCallRequest {
            id: Some("call_1".into()),
            name: "get_available_slots".into(),
            arguments: r#"{"date":"2024-06-10"}"#.into(),
        })
        .unwrap();
        assert_eq!(ok.id.as_deref(), Some("call_1"));
        assert_eq!(ok.arguments, json!({"date": "2024-06-10"}));

        let empty = parse_call(FunctionCallRequest {
            id: None,
            name: "list_events".into(),
            arguments: "  ".into(),
        })
        .unwrap();
        assert_eq!(empty.arguments, json!({}));

        let bad = parse_call(FunctionCallRequest {
            id: None,
            name: "book_event".into(),
            arguments: "{email: a@b.com".into(),
        });
        assert!(matches!(bad, Err(AgentError::JsonParseError(_))));
    }

    #[tokio::test]
    async fn test_plan_maps_llm_error() {
        let llm = Arc::new(
            ScriptedLlmClient::new(Vec::<ModelReply>::new()).then_fail(LlmError::Api("503".into())),
        );
        let planner = Planner::new(llm, 5);
        let err = planner.plan(&[Message::user("hi")], &[]).await.unwrap_err();
        assert!(matches!(err, AgentError::LlmError(LlmError::Api(_))));
    }
}
