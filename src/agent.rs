//! Headless Agent 运行时
//!
//! 供 HTTP 等前端调用：create_agent_components 从配置构建 Planner / OperationExecutor，
//! process_chat 对一次请求（身份 + 历史）跑主循环并返回最终回复。
//! process_chat 不会失败：任何错误都转成一句可读的回复文本。

use std::sync::Arc;

use serde::Serialize;

use crate::calendar::{BookingStore, CalendarBackends, InMemoryBookingStore};
use crate::config::AppConfig;
use crate::core::AgentError;
use crate::llm::{create_llm_from_config, LlmClient};
use crate::memory::{Conversation, Message};
use crate::react::{react_loop, system_instruction, Planner, ReactResult, ReactSession};
use crate::tools::{scheduling_registry, OperationExecutor};

/// 预构建的 Agent 组件，可被并发请求共享（只读；可变状态仅在回退存储内部）
pub struct AgentComponents {
    pub planner: Planner,
    pub executor: OperationExecutor,
    pub max_steps: usize,
}

/// 对调用方的回复（HTTP 返回体）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatReply {
    pub response: String,
}

/// 从配置创建组件：LLM 按 Key 选择，回退存储为进程内新建的内存存储
pub fn create_agent_components(cfg: &AppConfig) -> Result<AgentComponents, AgentError> {
    let store: Arc<dyn BookingStore> = Arc::new(InMemoryBookingStore::new());
    create_agent_components_with(cfg, create_llm_from_config(cfg), store)
}

/// 显式注入 LLM 与回退存储（测试、嵌入式使用）
pub fn create_agent_components_with(
    cfg: &AppConfig,
    llm: Arc<dyn LlmClient>,
    store: Arc<dyn BookingStore>,
) -> Result<AgentComponents, AgentError> {
    let calendar = Arc::new(CalendarBackends::from_config(&cfg.calendar, store)?);
    let registry = scheduling_registry(calendar);
    Ok(AgentComponents {
        planner: Planner::new(llm, cfg.llm.request_timeout_secs),
        executor: OperationExecutor::new(registry, cfg.calendar.tool_timeout_secs),
        max_steps: cfg.agent.max_steps,
    })
}

/// 跑一次主循环，保留完整结果（计数、对话），错误原样返回
pub async fn run_chat(
    components: &AgentComponents,
    identity: &str,
    history: Vec<Message>,
) -> Result<ReactResult, AgentError> {
    let today = chrono::Local::now().date_naive();
    let conversation = Conversation::with_history(system_instruction(identity, today), history);
    let session = ReactSession::new(&components.planner, &components.executor)
        .with_max_steps(components.max_steps);
    react_loop(&session, conversation).await
}

/// 处理一次聊天请求：总是返回一条回复，失败时为错误说明
pub async fn process_chat(
    components: &AgentComponents,
    identity: &str,
    history: Vec<Message>,
) -> ChatReply {
    match run_chat(components, identity, history).await {
        Ok(result) => ChatReply {
            response: result.response,
        },
        Err(e) => {
            tracing::error!(error = %e, identity = %identity, "chat failed");
            ChatReply {
                response: format!("An error occurred: {}", e),
            }
        }
    }
}
