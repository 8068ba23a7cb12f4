//! 回退存储：真实日历不可用时的内存替身
//!
//! 以 trait 注入（进程持有一份 Arc），内部用 RwLock 保护，避免并发预约/取消时丢失更新。

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use tokio::sync::RwLock;

use crate::calendar::types::Booking;

/// 改期失败原因
#[derive(Debug, Clone, PartialEq)]
pub enum RescheduleError {
    NotFound,
    Conflict(Booking),
}

/// 回退存储 trait：get / delete / reserve / reschedule 及按邮箱、日期查询
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn get(&self, id: &str) -> Option<Booking>;

    /// 删除并返回被删记录；不存在时返回 None
    async fn delete(&self, id: &str) -> Option<Booking>;

    async fn list_by_email(&self, email: &str) -> Vec<Booking>;

    /// 起始日期为 date 的预约
    async fn list_on_date(&self, date: NaiveDate) -> Vec<Booking>;

    /// 冲突检查与写入在同一把锁内完成：若与其它已确认预约（不同 id）时间相交，
    /// 返回冲突记录且不写入
    async fn reserve(&self, booking: Booking) -> Result<(), Booking>;

    /// 在同一把锁内确认预约仍存在、检查冲突并移动时间；已被取消的预约不会被写回
    async fn reschedule(
        &self,
        id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Booking, RescheduleError>;
}

/// 内存实现：HashMap + RwLock
#[derive(Default)]
pub struct InMemoryBookingStore {
    bookings: RwLock<HashMap<String, Booking>>,
}

impl InMemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.bookings.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.bookings.read().await.is_empty()
    }
}

fn find_conflict<'a>(
    bookings: &'a HashMap<String, Booking>,
    id: &str,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Option<&'a Booking> {
    bookings
        .values()
        .find(|b| b.id != id && b.is_confirmed() && b.overlaps(start, end))
}

/// 按开始时间排序，保证列表输出稳定
fn sorted(mut v: Vec<Booking>) -> Vec<Booking> {
    v.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));
    v
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn get(&self, id: &str) -> Option<Booking> {
        self.bookings.read().await.get(id).cloned()
    }

    async fn delete(&self, id: &str) -> Option<Booking> {
        self.bookings.write().await.remove(id)
    }

    async fn list_by_email(&self, email: &str) -> Vec<Booking> {
        let guard = self.bookings.read().await;
        sorted(
            guard
                .values()
                .filter(|b| b.email.eq_ignore_ascii_case(email))
                .cloned()
                .collect(),
        )
    }

    async fn list_on_date(&self, date: NaiveDate) -> Vec<Booking> {
        let guard = self.bookings.read().await;
        sorted(
            guard
                .values()
                .filter(|b| b.start.date() == date)
                .cloned()
                .collect(),
        )
    }

    async fn reserve(&self, booking: Booking) -> Result<(), Booking> {
        let mut guard = self.bookings.write().await;
        if let Some(conflict) = find_conflict(&guard, &booking.id, booking.start, booking.end) {
            return Err(conflict.clone());
        }
        guard.insert(booking.id.clone(), booking);
        Ok(())
    }

    async fn reschedule(
        &self,
        id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Booking, RescheduleError> {
        let mut guard = self.bookings.write().await;
        if !guard.contains_key(id) {
            return Err(RescheduleError::NotFound);
        }
        if let Some(conflict) = find_conflict(&guard, id, start, end) {
            return Err(RescheduleError::Conflict(conflict.clone()));
        }
        let booking = guard.get_mut(id).ok_or(RescheduleError::NotFound)?;
        booking.start = start;
        booking.end = end;
        Ok(booking.clone())
    }
}
