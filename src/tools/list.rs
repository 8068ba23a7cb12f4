//! list_events：列出某用户的预约

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::calendar::CalendarBackends;
use crate::tools::{str_arg, Operation, OperationDescriptor, ParamSpec};

pub struct ListEventsOperation {
    calendar: Arc<CalendarBackends>,
}

impl ListEventsOperation {
    pub fn new(calendar: Arc<CalendarBackends>) -> Self {
        Self { calendar }
    }
}

#[async_trait]
impl Operation for ListEventsOperation {
    fn descriptor(&self) -> OperationDescriptor {
        OperationDescriptor::new(
            "list_events",
            "List user's scheduled events",
            vec![ParamSpec::required_string("email", "User's email")],
        )
    }

    async fn execute(&self, args: &Value) -> Value {
        let email = str_arg(args, "email");
        match self.calendar.live_for(None) {
            Some(live) => live.list(email).await,
            None => self.calendar.fallback().list(email).await,
        }
    }
}
