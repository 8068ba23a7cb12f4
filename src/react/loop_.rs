//! Function-calling 主循环
//!
//! AwaitingModel -> (文本: 结束 | 调用: Dispatching) -> 执行 operation、结果写回对话 -> AwaitingModel。
//! 每轮提交完整对话与完整目录；派发次数受 max_steps 约束，超出即失败。
//! 未知 operation 与无法解析的参数直接失败；operation 自身的失败以错误数据写回对话，循环继续。

use crate::core::AgentError;
use crate::memory::{Conversation, Message};
use crate::react::{Planner, PlannerOutput};
use crate::tools::{OperationCall, OperationExecutor};

/// 单次对话内默认最多派发次数，防止模型反复调用不收敛
pub const DEFAULT_MAX_STEPS: usize = 10;

/// 循环执行结果：最终回复、计数与完整对话
#[derive(Debug)]
pub struct ReactResult {
    pub response: String,
    pub model_calls: usize,
    pub dispatches: usize,
    pub messages: Vec<Message>,
}

/// 循环所需组件
pub struct ReactSession<'a> {
    pub planner: &'a Planner,
    pub executor: &'a OperationExecutor,
    pub max_steps: usize,
}

impl<'a> ReactSession<'a> {
    pub fn new(planner: &'a Planner, executor: &'a OperationExecutor) -> Self {
        Self {
            planner,
            executor,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }
}

enum LoopState {
    AwaitingModel,
    Dispatching(OperationCall),
}

/// 驱动对话直到模型给出文本回复
pub async fn react_loop(
    session: &ReactSession<'_>,
    mut conversation: Conversation,
) -> Result<ReactResult, AgentError> {
    let catalog = session.executor.catalog();
    let mut model_calls = 0;
    let mut dispatches = 0;
    let mut state = LoopState::AwaitingModel;

    loop {
        state = match state {
            LoopState::AwaitingModel => {
                model_calls += 1;
                tracing::debug!(
                    step = model_calls,
                    messages = conversation.len(),
                    "requesting next step from model"
                );
                match session.planner.plan(conversation.messages(), catalog).await? {
                    PlannerOutput::Response(response) => {
                        let (_, _, total_tokens) = session.planner.token_usage();
                        tracing::info!(model_calls, dispatches, total_tokens, "chat finished");
                        return Ok(ReactResult {
                            response,
                            model_calls,
                            dispatches,
                            messages: conversation.into_messages(),
                        });
                    }
                    PlannerOutput::Call(call) => LoopState::Dispatching(call),
                }
            }
            LoopState::Dispatching(call) => {
                if dispatches >= session.max_steps {
                    tracing::warn!(max_steps = session.max_steps, "operation call limit reached");
                    return Err(AgentError::MaxStepsExceeded(session.max_steps));
                }
                conversation.push(Message::assistant_call(call.clone()));
                let result = session.executor.execute(&call).await?;
                dispatches += 1;
                conversation.push(Message::function_result(call.name, result.to_string()));
                LoopState::AwaitingModel
            }
        };
    }
}
