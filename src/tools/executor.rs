//! Operation 执行器
//!
//! 持有 OperationRegistry 与单次调用超时。execute(call) 依次：查找（未知名称返回 HallucinatedTool）、
//! 按 descriptor 校验参数（不合法则不执行，返回错误数据）、超时内执行（超时同样返回错误数据）；
//! 每次调用输出结构化审计日志（JSON）。

use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::time::timeout;

use crate::calendar::types::{error_value, is_error};
use crate::core::AgentError;
use crate::tools::{OperationCall, OperationDescriptor, OperationRegistry};

/// 执行器：未知 operation 是唯一的硬错误，其余失败都作为结果数据返回
pub struct OperationExecutor {
    registry: OperationRegistry,
    timeout: Duration,
}

impl OperationExecutor {
    pub fn new(registry: OperationRegistry, timeout_secs: u64) -> Self {
        tracing::info!(operations = ?registry.names(), timeout_secs, "operation catalog ready");
        Self {
            registry,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub async fn execute(&self, call: &OperationCall) -> Result<Value, AgentError> {
        let (descriptor, op) = self
            .registry
            .get(&call.name)
            .ok_or_else(|| AgentError::HallucinatedTool(call.name.clone()))?;

        let start = Instant::now();
        let (result, outcome) = match descriptor.validate(&call.arguments) {
            Err(reason) => (
                error_value(format!("Invalid arguments for {}: {}", call.name, reason)),
                "invalid_args",
            ),
            Ok(()) => match timeout(self.timeout, op.execute(&call.arguments)).await {
                Ok(v) if is_error(&v) => (v, "error"),
                Ok(v) => (v, "ok"),
                Err(_) => (
                    error_value(format!(
                        "Operation {} timed out after {}s",
                        call.name,
                        self.timeout.as_secs()
                    )),
                    "timeout",
                ),
            },
        };

        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": call.name,
            "ok": outcome == "ok",
            "outcome": outcome,
            "duration_ms": start.elapsed().as_millis() as u64,
            "args_preview": args_preview(&call.arguments),
        });
        tracing::info!(audit = %audit.to_string(), "operation");

        Ok(result)
    }

    /// 交给模型的完整目录
    pub fn catalog(&self) -> &[OperationDescriptor] {
        self.registry.descriptors()
    }
}

fn args_preview(args: &Value) -> String {
    let s = args.to_string();
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}
