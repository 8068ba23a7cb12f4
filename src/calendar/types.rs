//! 日历数据类型与「错误即数据」的结果构造

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const STATUS_CONFIRMED: &str = "confirmed";

/// 预约记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub email: String,
    pub title: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub status: String,
}

impl Booking {
    pub fn is_confirmed(&self) -> bool {
        self.status == STATUS_CONFIRMED
    }

    /// 半开区间 [start, end) 是否相交
    pub fn overlaps(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        self.start < end && start < self.end
    }
}

/// 可预约时间段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub available: bool,
}

/// `{"error": msg}`
pub fn error_value(msg: impl Into<String>) -> Value {
    json!({ "error": msg.into() })
}

/// 未找到预约；与传输失败区分开，带 not_found 标记
pub fn not_found(event_id: &str) -> Value {
    json!({
        "error": "Booking not found",
        "not_found": true,
        "event_id": event_id,
    })
}

pub fn success() -> Value {
    json!({ "success": true })
}

/// 结果是否为错误数据
pub fn is_error(value: &Value) -> bool {
    value.get("error").is_some()
}

pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| format!("Invalid date '{}', expected YYYY-MM-DD", s))
}

/// 接受 HH:MM，也容忍模型给出的 HH:MM:SS
pub fn parse_time(s: &str) -> Result<NaiveTime, String> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|_| format!("Invalid time '{}', expected HH:MM", s))
}

pub fn parse_date_time(date: &str, time: &str) -> Result<NaiveDateTime, String> {
    Ok(parse_date(date)?.and_time(parse_time(time)?))
}
