//! get_available_slots：查询某天的可预约时段

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::calendar::CalendarBackends;
use crate::tools::{str_arg, Operation, OperationDescriptor, ParamSpec};

pub struct AvailableSlotsOperation {
    calendar: Arc<CalendarBackends>,
}

impl AvailableSlotsOperation {
    pub fn new(calendar: Arc<CalendarBackends>) -> Self {
        Self { calendar }
    }
}

#[async_trait]
impl Operation for AvailableSlotsOperation {
    fn descriptor(&self) -> OperationDescriptor {
        OperationDescriptor::new(
            "get_available_slots",
            "Get available time slots for a date",
            vec![ParamSpec::required_string("date", "Date in YYYY-MM-DD")],
        )
    }

    async fn execute(&self, args: &Value) -> Value {
        let date = str_arg(args, "date");
        match self.calendar.live_for(None) {
            Some(live) => live.available_slots(date).await,
            None => self.calendar.fallback().available_slots(date).await,
        }
    }
}
