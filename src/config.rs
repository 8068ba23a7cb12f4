//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `CALCHAT__*` 覆盖（双下划线表示嵌套，如 `CALCHAT__AGENT__MAX_STEPS=5`）。
//! API Key 未写入配置时回退到 `OPENAI_API_KEY` / `CALCOM_API_KEY`（可由 .env 提供）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub agent: AgentSection,
    #[serde(default)]
    pub calendar: CalendarSection,
}

/// [server] 段：监听地址与 CORS 白名单
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// 允许跨域的前端来源（默认 Vite 开发端口）
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:5173".into()]
}

/// [llm] 段：模型、端点与单次请求超时
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    #[serde(default = "default_llm_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: None,
            api_key: None,
            request_timeout_secs: default_llm_timeout(),
        }
    }
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_llm_timeout() -> u64 {
    60
}

impl LlmSection {
    /// 配置中的 Key 优先，其次环境变量 OPENAI_API_KEY
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
    }
}

/// [agent] 段：编排循环的步数上限
#[derive(Debug, Clone, Deserialize)]
pub struct AgentSection {
    /// 单次对话内最多执行的 operation 次数，超过即失败
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
        }
    }
}

fn default_max_steps() -> usize {
    10
}

/// [calendar] 段：Cal.com 端点、Key、超时与本地回退日历的工作时间
#[derive(Debug, Clone, Deserialize)]
pub struct CalendarSection {
    #[serde(default = "default_calendar_base_url")]
    pub base_url: String,
    pub api_key: Option<String>,
    /// Key 以此前缀开头才视为生产 Key，否则使用内存回退存储
    #[serde(default = "default_live_key_prefix")]
    pub live_key_prefix: String,
    /// 单次 HTTP 请求超时（秒）
    #[serde(default = "default_calendar_timeout")]
    pub request_timeout_secs: u64,
    /// 单次 operation 调用超时（秒），超时按错误数据返回给模型
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
    #[serde(default = "default_workday_start")]
    pub workday_start: String,
    #[serde(default = "default_workday_end")]
    pub workday_end: String,
    #[serde(default = "default_slot_minutes")]
    pub slot_minutes: u32,
}

impl Default for CalendarSection {
    fn default() -> Self {
        Self {
            base_url: default_calendar_base_url(),
            api_key: None,
            live_key_prefix: default_live_key_prefix(),
            request_timeout_secs: default_calendar_timeout(),
            tool_timeout_secs: default_tool_timeout_secs(),
            workday_start: default_workday_start(),
            workday_end: default_workday_end(),
            slot_minutes: default_slot_minutes(),
        }
    }
}

fn default_calendar_base_url() -> String {
    "https://api.cal.com/v1".to_string()
}

fn default_live_key_prefix() -> String {
    "cal_live_".to_string()
}

fn default_calendar_timeout() -> u64 {
    15
}

fn default_tool_timeout_secs() -> u64 {
    30
}

fn default_workday_start() -> String {
    "09:00".to_string()
}

fn default_workday_end() -> String {
    "17:00".to_string()
}

fn default_slot_minutes() -> u32 {
    30
}

impl CalendarSection {
    /// 配置中的 Key 优先，其次环境变量 CALCOM_API_KEY
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var("CALCOM_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
    }
}

/// 从 config 目录加载配置，环境变量 CALCHAT__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 CALCHAT__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(env_source());

    let c = builder.build()?;
    c.try_deserialize()
}

/// 环境变量源；列表键按逗号拆分（如 `CALCHAT__SERVER__ALLOWED_ORIGINS=http://a,http://b`）
fn env_source() -> config::Environment {
    config::Environment::with_prefix("CALCHAT")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("server.allowed_origins")
}
