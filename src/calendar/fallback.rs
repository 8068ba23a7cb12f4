//! 本地回退日历：在 BookingStore 之上实现五个日历动作
//!
//! 工作时间内按固定时长切分时段；与已确认预约相交的时段标记为不可用。
//! 所有失败都返回 `{"error": ...}`，不向上抛错。

use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveTime};
use serde_json::{json, Value};

use crate::calendar::store::{BookingStore, RescheduleError};
use crate::calendar::types::{
    error_value, not_found, parse_date, parse_date_time, parse_time, success, Booking, Slot,
    STATUS_CONFIRMED,
};
use crate::config::CalendarSection;
use crate::core::AgentError;

/// 回退存储分配的 id 前缀；据此区分「本地预约」与 Cal.com 预约
pub const FALLBACK_ID_PREFIX: &str = "mock-";

pub struct FallbackCalendar {
    store: Arc<dyn BookingStore>,
    workday_start: NaiveTime,
    workday_end: NaiveTime,
    slot_len: Duration,
}

impl FallbackCalendar {
    pub fn new(
        store: Arc<dyn BookingStore>,
        workday_start: NaiveTime,
        workday_end: NaiveTime,
        slot_minutes: u32,
    ) -> Self {
        Self {
            store,
            workday_start,
            workday_end,
            slot_len: Duration::minutes(i64::from(slot_minutes.max(1))),
        }
    }

    /// 从 [calendar] 段构建；工作时间格式错误或起止颠倒视为配置错误
    pub fn from_config(
        cfg: &CalendarSection,
        store: Arc<dyn BookingStore>,
    ) -> Result<Self, AgentError> {
        let start = parse_time(&cfg.workday_start).map_err(AgentError::ConfigError)?;
        let end = parse_time(&cfg.workday_end).map_err(AgentError::ConfigError)?;
        if start >= end {
            return Err(AgentError::ConfigError(format!(
                "workday_start ({}) must be before workday_end ({})",
                cfg.workday_start, cfg.workday_end
            )));
        }
        if cfg.slot_minutes == 0 {
            return Err(AgentError::ConfigError("slot_minutes must be > 0".into()));
        }
        Ok(Self::new(store, start, end, cfg.slot_minutes))
    }

    async fn slots_for(&self, date: NaiveDate) -> Vec<Slot> {
        let taken: Vec<Booking> = self
            .store
            .list_on_date(date)
            .await
            .into_iter()
            .filter(Booking::is_confirmed)
            .collect();
        let day_end = date.and_time(self.workday_end);
        let mut slots = Vec::new();
        let mut cursor = date.and_time(self.workday_start);
        while cursor + self.slot_len <= day_end {
            let end = cursor + self.slot_len;
            let available = !taken.iter().any(|b| b.overlaps(cursor, end));
            slots.push(Slot {
                start: cursor,
                end,
                available,
            });
            cursor = end;
        }
        slots
    }

    fn within_workday(&self, start: NaiveTime, end: NaiveTime) -> bool {
        start >= self.workday_start && end <= self.workday_end && start < end
    }

    fn outside_hours(&self) -> Value {
        error_value(format!(
            "Requested time is outside working hours ({}-{})",
            self.workday_start.format("%H:%M"),
            self.workday_end.format("%H:%M")
        ))
    }

    /// 指定日期的全部时段（含是否可用）；无副作用
    pub async fn available_slots(&self, date: &str) -> Value {
        let date = match parse_date(date) {
            Ok(d) => d,
            Err(e) => return error_value(e),
        };
        json!(self.slots_for(date).await)
    }

    pub async fn book(&self, email: &str, date: &str, time: &str, reason: &str) -> Value {
        let start = match parse_date_time(date, time) {
            Ok(s) => s,
            Err(e) => return error_value(e),
        };
        let end = start + self.slot_len;
        if end.date() != start.date() || !self.within_workday(start.time(), end.time()) {
            return self.outside_hours();
        }
        let booking = Booking {
            id: format!("{}{}", FALLBACK_ID_PREFIX, uuid::Uuid::new_v4()),
            email: email.trim().to_string(),
            title: reason.trim().to_string(),
            start,
            end,
            status: STATUS_CONFIRMED.to_string(),
        };
        match self.store.reserve(booking.clone()).await {
            Ok(()) => {
                tracing::info!(id = %booking.id, start = %booking.start, "fallback booking created");
                json!(booking)
            }
            Err(conflict) => json!({
                "error": "Slot already booked",
                "conflicting_start": conflict.start,
            }),
        }
    }

    pub async fn list(&self, email: &str) -> Value {
        json!(self.store.list_by_email(email.trim()).await)
    }

    pub async fn cancel(&self, event_id: &str) -> Value {
        match self.store.delete(event_id).await {
            Some(_) => success(),
            None => not_found(event_id),
        }
    }

    /// 保持原时长改期；存在性检查与写入由存储在同一把锁内完成，并发取消后不会复活
    pub async fn reschedule(&self, event_id: &str, new_date: &str, new_time: &str) -> Value {
        let start = match parse_date_time(new_date, new_time) {
            Ok(s) => s,
            Err(e) => return error_value(e),
        };
        let Some(existing) = self.store.get(event_id).await else {
            return not_found(event_id);
        };
        let end = start + (existing.end - existing.start);
        if end.date() != start.date() || !self.within_workday(start.time(), end.time()) {
            return self.outside_hours();
        }
        match self.store.reschedule(event_id, start, end).await {
            Ok(moved) => json!({ "success": true, "booking": moved }),
            Err(RescheduleError::NotFound) => not_found(event_id),
            Err(RescheduleError::Conflict(conflict)) => json!({
                "error": "Slot already booked",
                "conflicting_start": conflict.start,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::store::InMemoryBookingStore;
    use crate::calendar::types::is_error;

    fn calendar() -> FallbackCalendar {
        FallbackCalendar::from_config(
            &CalendarSection::default(),
            Arc::new(InMemoryBookingStore::new()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_default_day_has_sixteen_half_hour_slots() {
        let cal = calendar();
        let slots = cal.available_slots("2024-06-10").await;
        let slots = slots.as_array().unwrap();
        assert_eq!(slots.len(), 16);
        assert_eq!(slots[0]["start"], "2024-06-10T09:00:00");
        assert_eq!(slots[0]["end"], "2024-06-10T09:30:00");
        assert_eq!(slots[15]["end"], "2024-06-10T17:00:00");
        assert!(slots.iter().all(|s| s["available"] == true));
    }

    #[tokio::test]
    async fn test_booked_slot_becomes_unavailable() {
        let cal = calendar();
        let booked = cal.book("a@b.com", "2024-06-10", "10:00", "Intro").await;
        assert!(!is_error(&booked));
        let slots = cal.available_slots("2024-06-10").await;
        let unavailable: Vec<_> = slots
            .as_array()
            .unwrap()
            .iter()
            .filter(|s| s["available"] == false)
            .map(|s| s["start"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(unavailable, vec!["2024-06-10T10:00:00"]);
    }

    #[tokio::test]
    async fn test_book_rejects_double_booking_and_outside_hours() {
        let cal = calendar();
        assert!(!is_error(&cal.book("a@b.com", "2024-06-10", "10:00", "Intro").await));
        let clash = cal.book("c@d.com", "2024-06-10", "10:00", "Other").await;
        assert_eq!(clash["error"], "Slot already booked");

        let late = cal.book("a@b.com", "2024-06-10", "16:45", "Late").await;
        assert!(late["error"].as_str().unwrap().contains("working hours"));
        let early = cal.book("a@b.com", "2024-06-10", "07:00", "Early").await;
        assert!(is_error(&early));
    }

    #[tokio::test]
    async fn test_invalid_date_is_error_data() {
        let cal = calendar();
        let v = cal.available_slots("June 10th").await;
        assert!(v["error"].as_str().unwrap().contains("YYYY-MM-DD"));
    }

    #[tokio::test]
    async fn test_reschedule_moves_booking() {
        let cal = calendar();
        let booked = cal.book("a@b.com", "2024-06-10", "10:00", "Intro").await;
        let id = booked["id"].as_str().unwrap().to_string();

        let moved = cal.reschedule(&id, "2024-06-11", "13:30").await;
        assert_eq!(moved["success"], true);
        assert_eq!(moved["booking"]["start"], "2024-06-11T13:30:00");
        assert_eq!(moved["booking"]["end"], "2024-06-11T14:00:00");

        let missing = cal.reschedule("mock-nope", "2024-06-11", "13:30").await;
        assert_eq!(missing["not_found"], true);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_cancel_wins_over_concurrent_reschedule() {
        let store = Arc::new(InMemoryBookingStore::new());
        let cal = Arc::new(
            FallbackCalendar::from_config(&CalendarSection::default(), store.clone()).unwrap(),
        );
        for _ in 0..200 {
            let booked = cal.book("a@b.com", "2024-06-10", "10:00", "Intro").await;
            let id = booked["id"].as_str().unwrap().to_string();

            let mover = {
                let (cal, id) = (cal.clone(), id.clone());
                tokio::spawn(async move { cal.reschedule(&id, "2024-06-10", "11:00").await })
            };
            let canceller = {
                let (cal, id) = (cal.clone(), id.clone());
                tokio::spawn(async move { cal.cancel(&id).await })
            };
            let moved = mover.await.unwrap();
            let cancelled = canceller.await.unwrap();

            assert_eq!(cancelled["success"], true);
            assert!(moved["success"] == true || moved["not_found"] == true);
            assert!(store.is_empty().await, "cancelled booking {} came back", id);
        }
    }

    #[test]
    fn test_from_config_rejects_inverted_hours() {
        let cfg = CalendarSection {
            workday_start: "18:00".into(),
            workday_end: "09:00".into(),
            ..CalendarSection::default()
        };
        let err = FallbackCalendar::from_config(&cfg, Arc::new(InMemoryBookingStore::new()));
        assert!(matches!(err, Err(AgentError::ConfigError(_))));
    }
}
