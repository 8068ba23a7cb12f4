//! calchat - Rust 日程助手
//!
//! 模块划分：
//! - **agent**: 无头 Agent 运行时（供 HTTP 调用）
//! - **calendar**: Cal.com 客户端、内存回退日历与后端选择
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型
//! - **integrations**: HTTP 前端（POST /chat）
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock）
//! - **memory**: 单次请求内的对话状态
//! - **observability**: 日志初始化
//! - **react**: Planner 与 function-calling 主循环
//! - **tools**: 日历 operation、注册表与执行器

pub mod agent;
pub mod calendar;
pub mod config;
pub mod core;
pub mod integrations;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod react;
pub mod tools;
