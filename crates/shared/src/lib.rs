//! 共享库
//!
//! 包含规则引擎命令行与嵌入方共用的配置加载和可观测性初始化。

pub mod config;
pub mod observability;
