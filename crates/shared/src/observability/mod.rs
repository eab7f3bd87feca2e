//! 可观测性模块
//!
//! 提供日志与追踪的统一初始化。
//! 命令行和嵌入方都通过单一入口点配置，日志统一写入标准错误，不干扰标准输出上的结果。

pub mod tracing;

use ::tracing::debug;
use anyhow::Result;
use serde::Deserialize;

/// 日志输出格式
pub const LOG_FORMAT_PRETTY: &str = "pretty";
pub const LOG_FORMAT_JSON: &str = "json";

/// 可观测性配置
#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    /// 日志级别（如 "info", "debug"），`RUST_LOG` 优先
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// 日志格式："pretty" 或 "json"
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    LOG_FORMAT_PRETTY.to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

impl ObservabilityConfig {
    pub fn is_json(&self) -> bool {
        self.log_format.eq_ignore_ascii_case(LOG_FORMAT_JSON)
    }
}

/// 统一初始化可观测性
///
/// 全局 subscriber 只能安装一次，重复调用返回错误。
///
/// ```ignore
/// use logic_shared::observability::{init, ObservabilityConfig};
///
/// init(&ObservabilityConfig::default())?;
/// ```
pub fn init(config: &ObservabilityConfig) -> Result<()> {
    tracing::init(config)?;

    debug!(
        log_level = %config.log_level,
        log_format = %config.log_format,
        "Observability initialized"
    );

    Ok(())
}
