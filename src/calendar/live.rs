//! Cal.com v1 客户端
//!
//! 请求带超时；非预期状态码、网络错误、响应体无法解析都转为 `{"error": ...}`（附 status / detail），
//! 不向上抛错。输入格式在发请求前先校验。

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde_json::{json, Value};

use crate::calendar::types::{error_value, parse_date, parse_date_time, success};
use crate::core::AgentError;

pub struct CalComClient {
    client: Client,
    base_url: Url,
    api_key: String,
}

/// 失败结果：保留固定的 error 文案，附上状态码与细节
fn failure(msg: &str, status: Option<StatusCode>, detail: impl Into<String>) -> Value {
    let mut v = error_value(msg);
    if let Some(s) = status {
        v["status"] = json!(s.as_u16());
    }
    let detail = detail.into();
    if !detail.is_empty() {
        v["detail"] = json!(detail);
    }
    v
}

/// id 作为单个路径段发送；空值与 `.` / `..` 不是合法 id
fn check_event_id(event_id: &str) -> Result<(), Value> {
    match event_id {
        "" | "." | ".." => Err(error_value(format!("Invalid event id: {:?}", event_id))),
        _ => Ok(()),
    }
}

impl CalComClient {
    /// base_url 无法解析或 HTTP 客户端无法构建时视为配置错误
    pub fn new(base_url: &str, api_key: &str, timeout_secs: u64) -> Result<Self, AgentError> {
        let base_url = Url::parse(base_url).map_err(|e| {
            AgentError::ConfigError(format!("invalid calendar base_url {base_url}: {e}"))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(AgentError::ConfigError(format!(
                "calendar base_url {base_url} cannot carry a path"
            )));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AgentError::ConfigError(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url,
            api_key: api_key.to_string(),
        })
    }

    /// 在 base_url 之后逐段追加路径；每段单独转义，`/`、`?` 等不会改变目标端点
    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// 发送请求；状态码等于 expected 时把响应体交给 on_ok，否则返回失败结果
    async fn send(
        &self,
        req: RequestBuilder,
        expected: StatusCode,
        failure_msg: &str,
        on_ok: impl FnOnce(String) -> Value,
    ) -> Value {
        let resp = match req.send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "cal.com request failed");
                return failure(failure_msg, None, e.to_string());
            }
        };
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if status != expected {
            tracing::warn!(status = %status, "cal.com returned unexpected status");
            return failure(failure_msg, Some(status), body);
        }
        on_ok(body)
    }

    /// 把响应体解析为 JSON；解析失败按错误数据返回
    fn json_body(failure_msg: &'static str) -> impl FnOnce(String) -> Value {
        move |body| {
            serde_json::from_str(&body)
                .unwrap_or_else(|e| failure(failure_msg, None, format!("invalid JSON: {}", e)))
        }
    }

    pub async fn available_slots(&self, date: &str) -> Value {
        const MSG: &str = "Failed to fetch slots";
        if let Err(e) = parse_date(date) {
            return error_value(e);
        }
        let req = self
            .client
            .get(self.endpoint(["slots"]))
            .query(&[("date", date), ("apiKey", self.api_key.as_str())]);
        self.send(req, StatusCode::OK, MSG, Self::json_body(MSG)).await
    }

    pub async fn book(&self, email: &str, date: &str, time: &str, reason: &str) -> Value {
        const MSG: &str = "Booking failed";
        if let Err(e) = parse_date_time(date, time) {
            return error_value(e);
        }
        let req = self
            .client
            .post(self.endpoint(["bookings"]))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "email": email,
                "start": format!("{}T{}", date.trim(), time.trim()),
                "title": reason,
            }));
        self.send(req, StatusCode::CREATED, MSG, Self::json_body(MSG)).await
    }

    pub async fn list(&self, email: &str) -> Value {
        const MSG: &str = "Failed to list events";
        let req = self
            .client
            .get(self.endpoint(["bookings"]))
            .bearer_auth(&self.api_key)
            .query(&[("email", email)]);
        self.send(req, StatusCode::OK, MSG, Self::json_body(MSG)).await
    }

    pub async fn cancel(&self, event_id: &str) -> Value {
        if let Err(e) = check_event_id(event_id) {
            return e;
        }
        let req = self
            .client
            .delete(self.endpoint(["bookings", event_id]))
            .bearer_auth(&self.api_key);
        self.send(req, StatusCode::NO_CONTENT, "Cancellation failed", |_| success())
            .await
    }

    pub async fn reschedule(&self, event_id: &str, new_date: &str, new_time: &str) -> Value {
        if let Err(e) = check_event_id(event_id) {
            return e;
        }
        if let Err(e) = parse_date_time(new_date, new_time) {
            return error_value(e);
        }
        let req = self
            .client
            .patch(self.endpoint(["bookings", event_id]))
            .bearer_auth(&self.api_key)
            .json(&json!({ "start": format!("{}T{}", new_date.trim(), new_time.trim()) }));
        self.send(req, StatusCode::OK, "Reschedule failed", |_| success())
            .await
    }
}
