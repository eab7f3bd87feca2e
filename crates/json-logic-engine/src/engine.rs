//! 求值入口与模式选择
//!
//! - [`JsonLogic::evaluate`]：同步求值，从不挂起
//! - [`JsonLogic::evaluate_async`]：异步求值，在异步函数调用处挂起
//! - [`JsonLogic::evaluate_auto`]：根据注册表中是否存在异步函数自动选择，
//!   返回 [`Evaluation::Ready`] 或 [`Evaluation::Pending`]

use crate::compiler::{RuleCompiler, DEFAULT_MAX_DEPTH};
use crate::error::{Result, RuleError};
use crate::executor::RuleExecutor;
use crate::functions::{BlockingInvoker, FunctionRegistry, SuspendingInvoker};
use crate::models::CompiledRule;
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use std::fmt;
use tracing::{instrument, Instrument};

/// 引擎配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// 规则最大嵌套深度
    pub max_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// 自动模式的求值结果：已就绪的值或待完成的计算
pub enum Evaluation<'a> {
    Ready(Result<Value>),
    Pending(BoxFuture<'a, Result<Value>>),
}

impl<'a> Evaluation<'a> {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    /// 已就绪时取出结果，待完成时返回 `None`
    pub fn into_ready(self) -> Option<Result<Value>> {
        match self {
            Self::Ready(result) => Some(result),
            Self::Pending(_) => None,
        }
    }

    /// 获取最终结果，待完成时等待其完成
    pub async fn resolve(self) -> Result<Value> {
        match self {
            Self::Ready(result) => result,
            Self::Pending(pending) => pending.await,
        }
    }
}

impl fmt::Debug for Evaluation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(result) => f.debug_tuple("Ready").field(result).finish(),
            Self::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

/// JSON 逻辑规则引擎
///
/// 引擎本身无状态，可在多个任务间共享；每次调用都重新解析规则。
#[derive(Debug, Clone, Default)]
pub struct JsonLogic {
    config: EngineConfig,
}

impl JsonLogic {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 解析规则（不求值）
    pub fn compile(&self, rule: &Value) -> Result<CompiledRule> {
        RuleCompiler::new(self.config.max_depth).compile(rule)
    }

    /// 同步求值
    ///
    /// 规则中调用异步函数时返回 [`RuleError::AsyncFunctionInSyncContext`]。
    #[instrument(name = "json_logic.evaluate", skip_all, fields(mode = "sync"))]
    pub fn evaluate(
        &self,
        rule: &Value,
        data: &Value,
        functions: &FunctionRegistry,
    ) -> Result<Value> {
        let compiled = self.compile(rule)?;
        Self::run_blocking(&compiled, data, functions)
    }

    /// 异步求值
    pub async fn evaluate_async(
        &self,
        rule: &Value,
        data: &Value,
        functions: &FunctionRegistry,
    ) -> Result<Value> {
        let span = tracing::debug_span!("json_logic.evaluate", mode = "async");

        async {
            let compiled = self.compile(rule)?;
            Self::run_suspending(&compiled, data, functions).await
        }
        .instrument(span)
        .await
    }

    /// 自动选择同步或异步求值
    ///
    /// 注册表中存在任一异步函数时返回 [`Evaluation::Pending`]，否则立即求值并返回
    /// [`Evaluation::Ready`]。
    pub fn evaluate_auto<'a>(
        &self,
        rule: &'a Value,
        data: &'a Value,
        functions: &'a FunctionRegistry,
    ) -> Evaluation<'a> {
        if functions.has_async() {
            let engine = self.clone();
            Evaluation::Pending(
                async move { engine.evaluate_async(rule, data, functions).await }.boxed(),
            )
        } else {
            Evaluation::Ready(self.evaluate(rule, data, functions))
        }
    }

    /// 对已解析的规则自动选择同步或异步求值，不再重复解析
    pub fn execute<'a>(
        &self,
        compiled: &'a CompiledRule,
        data: &'a Value,
        functions: &'a FunctionRegistry,
    ) -> Evaluation<'a> {
        if functions.has_async() {
            Evaluation::Pending(Self::run_suspending(compiled, data, functions).boxed())
        } else {
            Evaluation::Ready(Self::run_blocking(compiled, data, functions))
        }
    }

    fn run_blocking(
        compiled: &CompiledRule,
        data: &Value,
        functions: &FunctionRegistry,
    ) -> Result<Value> {
        let executor = RuleExecutor::new(BlockingInvoker::new(functions));

        executor
            .evaluate_node(compiled.root(), data)
            .now_or_never()
            .unwrap_or_else(|| Err(RuleError::ExecutionError("同步求值不应挂起".to_string())))
    }

    async fn run_suspending(
        compiled: &CompiledRule,
        data: &Value,
        functions: &FunctionRegistry,
    ) -> Result<Value> {
        let executor = RuleExecutor::new(SuspendingInvoker::new(functions));
        executor.evaluate_node(compiled.root(), data).await
    }
}
