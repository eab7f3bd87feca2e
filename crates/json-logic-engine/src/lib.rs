//! JSON 逻辑规则引擎
//!
//! 对 JSON 编码的规则表达式求值，支持：
//! - 比较、逻辑、算术、集合与字符串操作符
//! - 点号路径变量解析（`{"var": "usuario.enderecos.1"}`）
//! - 通过 `apply` 调用调用方注册的同步/异步宿主函数
//! - 同步、异步两种求值模式，以及按注册表自动选择模式
//!
//! ```
//! use json_logic::{evaluate, FunctionRegistry};
//! use serde_json::json;
//!
//! let functions = FunctionRegistry::new().with("get_area", |args| {
//!     let l = args[0].as_f64().unwrap_or_default();
//!     let a = args[1].as_f64().unwrap_or_default();
//!     Ok(json!(l * a))
//! });
//!
//! let data = json!({"retangulo": {"l": 10, "a": 5}});
//! let rule = json!({">": [
//!     {"apply": ["get_area", {"var": "retangulo.l"}, {"var": "retangulo.a"}]},
//!     40
//! ]});
//!
//! assert_eq!(evaluate(&rule, &data, &functions).unwrap(), json!(true));
//! ```

pub mod compiler;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod functions;
pub mod models;
pub mod operators;
pub mod service;

pub use compiler::RuleCompiler;
pub use engine::{EngineConfig, Evaluation, JsonLogic};
pub use error::{Result, RuleError};
pub use executor::RuleExecutor;
pub use functions::{
    BlockingInvoker, FunctionRegistry, HostFunction, Invoker, SuspendingInvoker,
};
pub use models::{CompiledRule, EvaluationContext, RuleNode};
pub use operators::Operator;
pub use service::{
    HealthResponse, ProcessRuleRequest, ProcessRuleResponse, RuleService, ValidateRuleRequest,
    ValidationResponse,
};

use serde_json::Value;

/// 使用默认配置同步求值
pub fn evaluate(rule: &Value, data: &Value, functions: &FunctionRegistry) -> Result<Value> {
    JsonLogic::default().evaluate(rule, data, functions)
}

/// 使用默认配置异步求值
pub async fn evaluate_async(
    rule: &Value,
    data: &Value,
    functions: &FunctionRegistry,
) -> Result<Value> {
    JsonLogic::default()
        .evaluate_async(rule, data, functions)
        .await
}

/// 使用默认配置自动选择求值模式
pub fn evaluate_auto<'a>(
    rule: &'a Value,
    data: &'a Value,
    functions: &'a FunctionRegistry,
) -> Evaluation<'a> {
    JsonLogic::default().evaluate_auto(rule, data, functions)
}
