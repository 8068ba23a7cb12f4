//! 认知层：Planner 与 function-calling 主循环

pub mod loop_;
pub mod planner;

pub use loop_::{react_loop, ReactResult, ReactSession, DEFAULT_MAX_STEPS};
pub use planner::{parse_call, system_instruction, Planner, PlannerOutput};
