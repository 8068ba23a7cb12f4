//! cancel_event：取消预约；回退存储分配的 id 始终在本地处理

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::calendar::CalendarBackends;
use crate::tools::{str_arg, Operation, OperationDescriptor, ParamSpec};

pub struct CancelEventOperation {
    calendar: Arc<CalendarBackends>,
}

impl CancelEventOperation {
    pub fn new(calendar: Arc<CalendarBackends>) -> Self {
        Self { calendar }
    }
}

#[async_trait]
impl Operation for CancelEventOperation {
    fn descriptor(&self) -> OperationDescriptor {
        OperationDescriptor::new(
            "cancel_event",
            "Cancel an event",
            vec![ParamSpec::required_string("event_id", "Event ID")],
        )
    }

    async fn execute(&self, args: &Value) -> Value {
        let event_id = str_arg(args, "event_id").trim();
        match self.calendar.live_for(Some(event_id)) {
            Some(live) => live.cancel(event_id).await,
            None => self.calendar.fallback().cancel(event_id).await,
        }
    }
}
