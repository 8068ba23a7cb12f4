//! calchat - 日程助手 HTTP 服务
//!
//! 入口：加载 .env 与配置、初始化日志、构建 Agent 组件并启动 HTTP 服务。
//!
//! 环境变量:
//! - OPENAI_API_KEY: LLM API Key（未设置时使用 Mock LLM）
//! - CALCOM_API_KEY: Cal.com API Key（非生产 Key 时使用内存回退日历）
//! - CALCHAT_CONFIG: 额外配置文件路径（可选）
//! - CALCHAT__*: 覆盖任意配置键

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use calchat::agent::create_agent_components;
use calchat::config::load_config;
use calchat::integrations::http::create_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    calchat::observability::init();

    let config_path = std::env::var("CALCHAT_CONFIG").ok().map(PathBuf::from);
    let cfg = load_config(config_path).context("Failed to load config")?;

    let components = create_agent_components(&cfg).context("Failed to create agent")?;
    let app = create_router(Arc::new(components), &cfg.server.allowed_origins);

    let listener = tokio::net::TcpListener::bind(&cfg.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", cfg.server.bind))?;
    tracing::info!("calchat listening on http://{}", cfg.server.bind);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
