//! 记忆层：单次请求内的对话状态（不跨请求、不持久化）

pub mod conversation;

pub use conversation::{Conversation, Message, Role};
