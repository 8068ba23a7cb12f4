//! 单次请求内的对话状态
//!
//! 首条消息固定为注入的 system 指令（含请求者身份），其后是调用方传入的历史，
//! 再之后只追加：模型发起的 operation 调用与其结果。请求结束即丢弃，不做持久化。

use serde::{Deserialize, Serialize};

use crate::tools::OperationCall;

/// 消息角色（与 LLM API 一致；function 为 operation 结果）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Function,
}

/// 单条消息
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: String,
    /// function 消息对应的 operation 名
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// assistant 消息携带的 operation 调用（模型本轮选择调用而非回复）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call: Option<OperationCall>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
            call: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// 模型发起的 operation 调用
    pub fn assistant_call(call: OperationCall) -> Self {
        Self {
            call: Some(call),
            ..Self::new(Role::Assistant, "")
        }
    }

    /// operation 结果（已序列化为 JSON 字符串）
    pub fn function_result(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::new(Role::Function, content)
        }
    }

    pub fn is_function_result(&self) -> bool {
        self.role == Role::Function
    }
}

/// 对话状态：只追加，首条为 system 指令
#[derive(Clone, Debug)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new(system_instruction: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(system_instruction)],
        }
    }

    /// system 指令 + 调用方历史
    pub fn with_history(
        system_instruction: impl Into<String>,
        history: impl IntoIterator<Item = Message>,
    ) -> Self {
        let mut conv = Self::new(system_instruction);
        conv.messages.extend(history);
        conv
    }

    pub fn push(&mut self, msg: Message) {
        self.messages.push(msg);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
