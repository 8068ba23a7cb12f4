//! 外部集成：HTTP 前端（需 server feature）

#[cfg(feature = "server")]
pub mod http;
