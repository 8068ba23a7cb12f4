//! 日历层：Cal.com 客户端、内存回退日历与二者的选择
//!
//! 每个 operation 自行决定走真实后端还是回退存储：配置的 Key 看起来是生产 Key，
//! 且所涉 id 不是回退存储分配的 id，才走 Cal.com。编排循环对此无感知。

pub mod fallback;
pub mod live;
pub mod store;
pub mod types;

use std::sync::Arc;

pub use fallback::{FallbackCalendar, FALLBACK_ID_PREFIX};
pub use live::CalComClient;
pub use store::{BookingStore, InMemoryBookingStore, RescheduleError};
pub use types::{Booking, Slot};

use crate::config::CalendarSection;
use crate::core::AgentError;

/// 后端选择规则（纯判断，便于测试）
#[derive(Debug, Clone)]
pub struct BackendMode {
    api_key: Option<String>,
    live_key_prefix: String,
}

impl BackendMode {
    pub fn new(api_key: Option<String>, live_key_prefix: impl Into<String>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            live_key_prefix: live_key_prefix.into(),
        }
    }

    /// Key 非空且带生产前缀
    pub fn has_live_credentials(&self) -> bool {
        match &self.api_key {
            Some(k) => self.live_key_prefix.is_empty() || k.starts_with(&self.live_key_prefix),
            None => false,
        }
    }

    pub fn is_fallback_id(id: &str) -> bool {
        id.starts_with(FALLBACK_ID_PREFIX)
    }

    /// id 为 None 表示该 operation 不涉及已有预约
    pub fn use_live(&self, id: Option<&str>) -> bool {
        self.has_live_credentials() && !id.is_some_and(Self::is_fallback_id)
    }
}

/// 供五个 operation 共享的日历后端集合
pub struct CalendarBackends {
    mode: BackendMode,
    live: Option<CalComClient>,
    fallback: FallbackCalendar,
}

impl CalendarBackends {
    pub fn new(mode: BackendMode, live: Option<CalComClient>, fallback: FallbackCalendar) -> Self {
        Self {
            mode,
            live,
            fallback,
        }
    }

    /// 按 [calendar] 段构建；store 由进程注入
    pub fn from_config(
        cfg: &CalendarSection,
        store: Arc<dyn BookingStore>,
    ) -> Result<Self, AgentError> {
        let api_key = cfg.resolved_api_key();
        let mode = BackendMode::new(api_key.clone(), cfg.live_key_prefix.clone());
        let live = match api_key {
            Some(key) if mode.has_live_credentials() => {
                tracing::info!(base_url = %cfg.base_url, "Using Cal.com live backend");
                Some(CalComClient::new(&cfg.base_url, &key, cfg.request_timeout_secs)?)
            }
            _ => {
                tracing::warn!("No production Cal.com key configured, using in-memory fallback calendar");
                None
            }
        };
        let fallback = FallbackCalendar::from_config(cfg, store)?;
        Ok(Self::new(mode, live, fallback))
    }

    /// 该次调用应使用的真实客户端；None 表示走回退存储
    pub fn live_for(&self, id: Option<&str>) -> Option<&CalComClient> {
        let live = self.live.as_ref().filter(|_| self.mode.use_live(id));
        tracing::debug!(id = ?id, live = live.is_some(), "calendar backend selected");
        live
    }

    pub fn fallback(&self) -> &FallbackCalendar {
        &self.fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_requires_production_like_key() {
        assert!(!BackendMode::new(None, "cal_live_").has_live_credentials());
        assert!(!BackendMode::new(Some("".into()), "cal_live_").has_live_credentials());
        assert!(!BackendMode::new(Some("cal_test_123".into()), "cal_live_").has_live_credentials());
        assert!(BackendMode::new(Some("cal_live_123".into()), "cal_live_").has_live_credentials());
    }

    #[test]
    fn test_mode_routes_fallback_ids_locally() {
        let mode = BackendMode::new(Some("cal_live_123".into()), "cal_live_");
        assert!(mode.use_live(None));
        assert!(mode.use_live(Some("98231")));
        assert!(!mode.use_live(Some("mock-4f1c")));

        let offline = BackendMode::new(None, "cal_live_");
        assert!(!offline.use_live(None));
        assert!(!offline.use_live(Some("98231")));
    }

    #[test]
    fn test_from_config_without_key_has_no_live_client() {
        let cfg = CalendarSection {
            api_key: Some("cal_test_abc".into()),
            ..CalendarSection::default()
        };
        let backends =
            CalendarBackends::from_config(&cfg, Arc::new(InMemoryBookingStore::new())).unwrap();
        assert!(backends.live_for(None).is_none());
        assert!(backends.live_for(Some("123")).is_none());
    }

    #[test]
    fn test_from_config_with_live_key() {
        let cfg = CalendarSection {
            api_key: Some("cal_live_abc".into()),
            ..CalendarSection::default()
        };
        let backends =
            CalendarBackends::from_config(&cfg, Arc::new(InMemoryBookingStore::new())).unwrap();
        assert!(backends.live_for(None).is_some());
        assert!(backends.live_for(Some("mock-1")).is_none());
    }

    #[test]
    fn test_from_config_rejects_bad_base_url_for_live_key() {
        let cfg = CalendarSection {
            api_key: Some("cal_live_abc".into()),
            base_url: "api.cal.com without scheme".into(),
            ..CalendarSection::default()
        };
        let result = CalendarBackends::from_config(&cfg, Arc::new(InMemoryBookingStore::new()));
        assert!(matches!(result, Err(AgentError::ConfigError(_))));
    }
}
