//! 宿主函数注册表与调用桥
//!
//! 调用方通过 [`FunctionRegistry`] 注册同步或异步函数，规则中使用
//! `{"apply": ["name", arg1, arg2, ...]}` 调用。函数是同步还是异步由注册方式决定，
//! 不需要额外声明。
//!
//! 求值器通过 [`Invoker`] 调用函数：
//! - [`BlockingInvoker`]：同步求值使用，立即返回结果，拒绝异步函数
//! - [`SuspendingInvoker`]：异步求值使用，等待异步函数完成，同步函数直接调用

use crate::error::{Result, RuleError};
use futures::future::{self, BoxFuture, FutureExt};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// 同步宿主函数
pub type SyncFunction = dyn Fn(&[Value]) -> anyhow::Result<Value> + Send + Sync;

/// 异步宿主函数
pub type AsyncFunction =
    dyn Fn(Vec<Value>) -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync;

/// 已注册的宿主函数
#[derive(Clone)]
pub enum HostFunction {
    Sync(Arc<SyncFunction>),
    Async(Arc<AsyncFunction>),
}

impl HostFunction {
    pub fn is_async(&self) -> bool {
        matches!(self, Self::Async(_))
    }
}

impl fmt::Debug for HostFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync(_) => write!(f, "HostFunction::Sync"),
            Self::Async(_) => write!(f, "HostFunction::Async"),
        }
    }
}

/// 函数注册表
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, HostFunction>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册同步函数
    pub fn register<F>(&mut self, name: impl Into<String>, function: F) -> &mut Self
    where
        F: Fn(&[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.functions
            .insert(name.into(), HostFunction::Sync(Arc::new(function)));
        self
    }

    /// 注册异步函数
    pub fn register_async<F, Fut>(&mut self, name: impl Into<String>, function: F) -> &mut Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        let wrapped = move |args: Vec<Value>| function(args).boxed();
        self.functions
            .insert(name.into(), HostFunction::Async(Arc::new(wrapped)));
        self
    }

    /// 构建器形式的 [`register`](Self::register)
    pub fn with<F>(mut self, name: impl Into<String>, function: F) -> Self
    where
        F: Fn(&[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.register(name, function);
        self
    }

    /// 构建器形式的 [`register_async`](Self::register_async)
    pub fn with_async<F, Fut>(mut self, name: impl Into<String>, function: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        self.register_async(name, function);
        self
    }

    pub fn get(&self, name: &str) -> Option<&HostFunction> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// 获取所有函数名（已排序）
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// 是否包含任一异步函数
    pub fn has_async(&self) -> bool {
        self.functions.values().any(HostFunction::is_async)
    }
}

/// 函数调用策略
pub trait Invoker: Send + Sync {
    /// 按名称调用函数
    fn invoke<'a>(&'a self, name: &'a str, args: Vec<Value>) -> BoxFuture<'a, Result<Value>>;
}

/// 同步调用策略：返回的 future 总是已就绪
pub struct BlockingInvoker<'r> {
    registry: &'r FunctionRegistry,
}

impl<'r> BlockingInvoker<'r> {
    pub fn new(registry: &'r FunctionRegistry) -> Self {
        Self { registry }
    }
}

impl Invoker for BlockingInvoker<'_> {
    fn invoke<'a>(&'a self, name: &'a str, args: Vec<Value>) -> BoxFuture<'a, Result<Value>> {
        let result = match self.registry.get(name) {
            Some(HostFunction::Sync(function)) => function(&args).map_err(RuleError::Host),
            Some(HostFunction::Async(_)) => {
                Err(RuleError::AsyncFunctionInSyncContext(name.to_string()))
            }
            None => Err(RuleError::FunctionNotRegistered(name.to_string())),
        };

        future::ready(result).boxed()
    }
}

/// 异步调用策略：异步函数在此处挂起
pub struct SuspendingInvoker<'r> {
    registry: &'r FunctionRegistry,
}

impl<'r> SuspendingInvoker<'r> {
    pub fn new(registry: &'r FunctionRegistry) -> Self {
        Self { registry }
    }
}

impl Invoker for SuspendingInvoker<'_> {
    fn invoke<'a>(&'a self, name: &'a str, args: Vec<Value>) -> BoxFuture<'a, Result<Value>> {
        match self.registry.get(name) {
            Some(HostFunction::Sync(function)) => {
                future::ready(function(&args).map_err(RuleError::Host)).boxed()
            }
            Some(HostFunction::Async(function)) => {
                let pending = function(args);
                async move { pending.await.map_err(RuleError::Host) }.boxed()
            }
            None => future::ready(Err(RuleError::FunctionNotRegistered(name.to_string()))).boxed(),
        }
    }
}

/// `apply` 操作：第一个操作数为函数名，其余按位置传给函数
pub async fn apply<I>(invoker: &I, operands: Vec<Value>) -> Result<Value>
where
    I: Invoker + ?Sized,
{
    let mut iter = operands.into_iter();
    let Some(name) = iter.next() else {
        return Err(RuleError::MissingFunctionName);
    };

    let name = match name {
        Value::String(name) => name,
        other => return Err(RuleError::FunctionNotRegistered(other.to_string())),
    };

    invoker.invoke(&name, iter.collect()).await
}
