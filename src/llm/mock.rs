//! Mock LLM 客户端（用于测试与未配置 API Key 时，无需网络）
//!
//! 按顺序回放预设的回复并记录每次收到的对话；预设用完后回显最后一条 User 消息。
//! `default()` 不记录请求，供长期运行的服务使用。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError, ModelReply};
use crate::memory::{Message, Role};
use crate::tools::OperationDescriptor;

/// 一次调用时的快照：对话与目录中的 operation 名
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: Vec<Message>,
    pub operation_names: Vec<String>,
}

#[derive(Debug, Default)]
pub struct ScriptedLlmClient {
    script: Mutex<VecDeque<Result<ModelReply, LlmError>>>,
    requests: Mutex<Vec<RecordedRequest>>,
    record: bool,
}

impl ScriptedLlmClient {
    pub fn new(replies: impl IntoIterator<Item = ModelReply>) -> Self {
        Self {
            script: Mutex::new(replies.into_iter().map(Ok).collect()),
            requests: Mutex::new(Vec::new()),
            record: true,
        }
    }

    /// 追加一次失败
    pub fn then_fail(self, err: LlmError) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Err(err));
        }
        self
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(
        &self,
        messages: &[Message],
        operations: &[OperationDescriptor],
    ) -> Result<ModelReply, LlmError> {
        if self.record {
            if let Ok(mut reqs) = self.requests.lock() {
                reqs.push(RecordedRequest {
                    messages: messages.to_vec(),
                    operation_names: operations.iter().map(|d| d.name.clone()).collect(),
                });
            }
        }

        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        match next {
            Some(reply) => reply,
            None => {
                let last_user = messages
                    .iter()
                    .rev()
                    .find(|m| m.role == Role::User)
                    .map(|m| m.content.as_str())
                    .unwrap_or("(no input)");
                Ok(ModelReply::text(format!("Echo from Mock: {}", last_user)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_replays_script_then_echoes() {
        let client = ScriptedLlmClient::new(vec![
            ModelReply::call("list_events", json!({"email": "a@b.com"})),
            ModelReply::text("done"),
        ])
        .then_fail(LlmError::Api("boom".into()));
        let msgs = vec![Message::user("hello")];

        assert!(matches!(client.complete(&msgs, &[]).await, Ok(ModelReply::Call(_))));
        assert_eq!(client.complete(&msgs, &[]).await.unwrap(), ModelReply::text("done"));
        assert!(client.complete(&msgs, &[]).await.is_err());
        assert_eq!(
            client.complete(&msgs, &[]).await.unwrap(),
            ModelReply::text("Echo from Mock: hello")
        );
        assert_eq!(client.call_count(), 4);
        assert_eq!(client.requests()[0].messages.len(), 1);
    }
}
