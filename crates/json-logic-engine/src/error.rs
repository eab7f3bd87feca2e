//! 规则引擎错误类型

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("无法识别的操作符: {0}")]
    UnknownOperator(String),

    #[error("函数未注册或不允许调用: '{0}'")]
    FunctionNotRegistered(String),

    #[error("apply 操作至少需要一个参数（函数名）")]
    MissingFunctionName,

    /// 宿主函数返回的错误，原样透传
    #[error(transparent)]
    Host(anyhow::Error),

    #[error("类型不匹配: 期望 {expected}, 实际 {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("除数不能为零")]
    DivisionByZero,

    #[error("操作符 {operator} 参数无效: {reason}")]
    InvalidArguments { operator: String, reason: String },

    #[error("同步求值中不能调用异步函数: '{0}'")]
    AsyncFunctionInSyncContext(String),

    #[error("规则执行失败: {0}")]
    ExecutionError(String),

    #[error("规则嵌套深度超过上限 {0}")]
    DepthLimitExceeded(usize),

    #[error("JSON 序列化错误: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl RuleError {
    pub(crate) fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub(crate) fn invalid_arguments(operator: impl ToString, reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            operator: operator.to_string(),
            reason: reason.into(),
        }
    }

    /// 稳定的错误代码，供调用方做分支判断或对外暴露
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownOperator(_) => "unknown_operator",
            Self::FunctionNotRegistered(_) => "function_not_registered",
            Self::MissingFunctionName => "missing_function_name",
            Self::Host(_) => "host_function_error",
            Self::TypeMismatch { .. } => "type_mismatch",
            Self::DivisionByZero => "division_by_zero",
            Self::InvalidArguments { .. } => "invalid_arguments",
            Self::AsyncFunctionInSyncContext(_) => "async_function_in_sync_context",
            Self::ExecutionError(_) => "execution_error",
            Self::DepthLimitExceeded(_) => "depth_limit_exceeded",
            Self::JsonError(_) => "json_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, RuleError>;
