//! 工具层：五个日历 operation、注册表、参数 schema 与执行器

pub mod book;
pub mod cancel;
pub mod executor;
pub mod list;
pub mod registry;
pub mod reschedule;
pub mod schema;
pub mod slots;

use std::sync::Arc;

use serde_json::Value;

pub use book::BookEventOperation;
pub use cancel::CancelEventOperation;
pub use executor::OperationExecutor;
pub use list::ListEventsOperation;
pub use registry::{Operation, OperationRegistry};
pub use reschedule::RescheduleEventOperation;
pub use schema::{OperationCall, OperationDescriptor, ParamSpec};
pub use slots::AvailableSlotsOperation;

use crate::calendar::CalendarBackends;

/// 注册全部日历 operation（顺序即交给模型的目录顺序）
pub fn scheduling_registry(calendar: Arc<CalendarBackends>) -> OperationRegistry {
    let mut registry = OperationRegistry::new();
    registry.register(AvailableSlotsOperation::new(calendar.clone()));
    registry.register(BookEventOperation::new(calendar.clone()));
    registry.register(ListEventsOperation::new(calendar.clone()));
    registry.register(CancelEventOperation::new(calendar.clone()));
    registry.register(RescheduleEventOperation::new(calendar));
    registry
}

/// 取字符串参数；缺失时为空串（参数已按 descriptor 校验过）
pub(crate) fn str_arg<'a>(args: &'a Value, key: &str) -> &'a str {
    args.get(key).and_then(Value::as_str).unwrap_or_default()
}
