//! book_event：为用户预约一个时段

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::calendar::CalendarBackends;
use crate::tools::{str_arg, Operation, OperationDescriptor, ParamSpec};

pub struct BookEventOperation {
    calendar: Arc<CalendarBackends>,
}

impl BookEventOperation {
    pub fn new(calendar: Arc<CalendarBackends>) -> Self {
        Self { calendar }
    }
}

#[async_trait]
impl Operation for BookEventOperation {
    fn descriptor(&self) -> OperationDescriptor {
        OperationDescriptor::new(
            "book_event",
            "Book a new event",
            vec![
                ParamSpec::required_string("email", "User's email"),
                ParamSpec::required_string("date", "Date in YYYY-MM-DD"),
                ParamSpec::required_string("time", "Time in HH:MM"),
                ParamSpec::required_string("reason", "Reason for the event"),
            ],
        )
    }

    async fn execute(&self, args: &Value) -> Value {
        let (email, date, time, reason) = (
            str_arg(args, "email"),
            str_arg(args, "date"),
            str_arg(args, "time"),
            str_arg(args, "reason"),
        );
        match self.calendar.live_for(None) {
            Some(live) => live.book(email, date, time, reason).await,
            None => self.calendar.fallback().book(email, date, time, reason).await,
        }
    }
}
