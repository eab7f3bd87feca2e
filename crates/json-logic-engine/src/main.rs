//! JSON 逻辑规则命令行工具
//!
//! 从文件或标准输入读取请求，输出 JSON 响应：
//! - `json-logic eval [FILE]`：请求体为 `{"rule": ..., "data": ...}`
//! - `json-logic validate [FILE]`：请求体为 `{"rule": ...}`

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use json_logic::{
    EngineConfig, FunctionRegistry, JsonLogic, ProcessRuleRequest, RuleService,
    ValidateRuleRequest,
};
use logic_shared::config::AppConfig;
use logic_shared::observability;
use serde::Serialize;
use std::path::PathBuf;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

const SERVICE_NAME: &str = "json-logic";

#[derive(Parser)]
#[command(name = "json-logic")]
#[command(about = "对 JSON 数据求值 JSON 逻辑规则")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 美化输出
    #[arg(short, long, global = true)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// 对数据求值规则
    Eval {
        /// 请求文件（省略时读取标准输入）
        file: Option<PathBuf>,
    },

    /// 校验规则
    Validate {
        /// 请求文件（省略时读取标准输入）
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(SERVICE_NAME).unwrap_or_else(|e| {
        eprintln!("Failed to load config, using defaults: {}", e);
        AppConfig::default()
    });
    observability::init(&config.observability)?;

    let engine = JsonLogic::new(EngineConfig {
        max_depth: config.engine.max_depth,
    });
    let service = RuleService::new(engine, FunctionRegistry::new());
    debug!(environment = %config.environment, "rule service ready");

    let succeeded = match cli.command {
        Commands::Eval { file } => {
            let request: ProcessRuleRequest = serde_json::from_str(&read_input(file).await?)
                .context("请求不是合法的 JSON")?;
            let response = service.process_async(request).await;
            print_json(&response, cli.pretty)?;
            response.is_success()
        }
        Commands::Validate { file } => {
            let request: ValidateRuleRequest = serde_json::from_str(&read_input(file).await?)
                .context("请求不是合法的 JSON")?;
            let response = service.validate(request).await;
            print_json(&response, cli.pretty)?;
            response.valid
        }
    };

    info!(succeeded, "done");

    if !succeeded {
        std::process::exit(1);
    }
    Ok(())
}

async fn read_input(file: Option<PathBuf>) -> Result<String> {
    match file {
        Some(path) => tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("无法读取文件 {}", path.display())),
        None => {
            let mut buffer = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buffer)
                .await
                .context("无法读取标准输入")?;
            Ok(buffer)
        }
    }
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", json);
    Ok(())
}
