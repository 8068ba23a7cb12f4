//! reschedule_event：改期；回退存储分配的 id 始终在本地处理

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::calendar::CalendarBackends;
use crate::tools::{str_arg, Operation, OperationDescriptor, ParamSpec};

pub struct RescheduleEventOperation {
    calendar: Arc<CalendarBackends>,
}

impl RescheduleEventOperation {
    pub fn new(calendar: Arc<CalendarBackends>) -> Self {
        Self { calendar }
    }
}

#[async_trait]
impl Operation for RescheduleEventOperation {
    fn descriptor(&self) -> OperationDescriptor {
        OperationDescriptor::new(
            "reschedule_event",
            "Reschedule an event",
            vec![
                ParamSpec::required_string("event_id", "Event ID"),
                ParamSpec::required_string("new_date", "New date in YYYY-MM-DD"),
                ParamSpec::required_string("new_time", "New time in HH:MM"),
            ],
        )
    }

    async fn execute(&self, args: &Value) -> Value {
        let event_id = str_arg(args, "event_id").trim();
        let (new_date, new_time) = (str_arg(args, "new_date"), str_arg(args, "new_time"));
        match self.calendar.live_for(Some(event_id)) {
            Some(live) => live.reschedule(event_id, new_date, new_time).await,
            None => {
                self.calendar
                    .fallback()
                    .reschedule(event_id, new_date, new_time)
                    .await
            }
        }
    }
}
