//! 规则处理服务
//!
//! 与传输层无关的请求/响应契约，HTTP、gRPC 或命令行都可以直接复用：
//! - `process` / `process_async`：对给定数据求值规则
//! - `validate`：以空上下文求值规则，只报告规则是否有效
//! - `health`：健康检查

use crate::engine::JsonLogic;
use crate::error::{Result, RuleError};
use crate::evaluator::truthy;
use crate::functions::FunctionRegistry;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

const RULE_NOT_PROVIDED: &str = "未提供规则";

fn empty_object() -> Value {
    json!({})
}

/// 规则处理请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessRuleRequest {
    #[serde(default)]
    pub rule: Value,
    #[serde(default = "empty_object")]
    pub data: Value,
}

impl ProcessRuleRequest {
    pub fn new(rule: Value, data: Value) -> Self {
        Self { rule, data }
    }
}

/// 规则处理响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProcessRuleResponse {
    Success {
        success: bool,
        result: Value,
        rule: Value,
        data: Value,
    },
    Failure {
        success: bool,
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        kind: Option<String>,
    },
}

impl ProcessRuleResponse {
    pub fn success(result: Value, rule: Value, data: Value) -> Self {
        Self::Success {
            success: true,
            result,
            rule,
            data,
        }
    }

    pub fn failure(error: impl Into<String>, kind: Option<&str>) -> Self {
        Self::Failure {
            success: false,
            error: error.into(),
            kind: kind.map(str::to_string),
        }
    }

    pub fn from_error(err: &RuleError) -> Self {
        Self::failure(err.to_string(), Some(err.kind()))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// 成功时的求值结果
    pub fn result(&self) -> Option<&Value> {
        match self {
            Self::Success { result, .. } => Some(result),
            Self::Failure { .. } => None,
        }
    }
}

/// 规则校验请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateRuleRequest {
    #[serde(default)]
    pub rule: Value,
}

/// 规则校验响应
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResponse {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// 规则引用的变量路径
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<String>,
    /// 规则通过 apply 引用的函数
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub functions: Vec<String>,
}

impl ValidationResponse {
    fn invalid(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// 健康检查响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

/// 规则处理服务
#[derive(Debug, Clone, Default)]
pub struct RuleService {
    engine: JsonLogic,
    functions: FunctionRegistry,
}

impl RuleService {
    pub fn new(engine: JsonLogic, functions: FunctionRegistry) -> Self {
        Self { engine, functions }
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    /// 对请求中的数据同步求值规则
    ///
    /// 规则调用异步函数时返回失败响应。
    #[instrument(skip_all)]
    pub fn process(&self, request: ProcessRuleRequest) -> ProcessRuleResponse {
        if !truthy(&request.rule) {
            return ProcessRuleResponse::failure(RULE_NOT_PROVIDED, None);
        }

        let outcome = self
            .engine
            .evaluate(&request.rule, &request.data, &self.functions);
        Self::respond(outcome, request)
    }

    /// 对请求中的数据求值规则，注册表含异步函数时等待其完成
    #[instrument(skip_all)]
    pub async fn process_async(&self, request: ProcessRuleRequest) -> ProcessRuleResponse {
        if !truthy(&request.rule) {
            return ProcessRuleResponse::failure(RULE_NOT_PROVIDED, None);
        }

        let outcome = self
            .engine
            .evaluate_auto(&request.rule, &request.data, &self.functions)
            .resolve()
            .await;
        Self::respond(outcome, request)
    }

    fn respond(outcome: Result<Value>, request: ProcessRuleRequest) -> ProcessRuleResponse {
        match outcome {
            Ok(result) => ProcessRuleResponse::success(result, request.rule, request.data),
            Err(e) => {
                warn!(error = %e, kind = e.kind(), "规则求值失败");
                ProcessRuleResponse::from_error(&e)
            }
        }
    }

    /// 校验规则：以空上下文求值，只报告是否有效，不返回结果
    #[instrument(skip_all)]
    pub async fn validate(&self, request: ValidateRuleRequest) -> ValidationResponse {
        if !truthy(&request.rule) {
            return ValidationResponse::invalid(RULE_NOT_PROVIDED);
        }

        let compiled = match self.engine.compile(&request.rule) {
            Ok(compiled) => compiled,
            Err(e) => {
                info!(error = %e, "规则解析失败");
                return ValidationResponse::invalid(e.to_string());
            }
        };

        let empty = empty_object();
        let outcome = self
            .engine
            .execute(&compiled, &empty, &self.functions)
            .resolve()
            .await;

        let mut response = match outcome {
            Ok(_) => ValidationResponse {
                valid: true,
                message: Some("规则有效".to_string()),
                ..Default::default()
            },
            Err(e) => {
                info!(error = %e, "规则校验未通过");
                ValidationResponse::invalid(e.to_string())
            }
        };

        response.variables = compiled.required_fields.into_iter().collect();
        response.functions = compiled.functions.into_iter().collect();
        response
    }

    pub fn health(&self) -> HealthResponse {
        HealthResponse {
            status: "healthy".to_string(),
            message: "JSON Logic 规则服务运行正常".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_wire_format() {
        let ok = ProcessRuleResponse::success(json!(30), json!({"+": ["10", "20"]}), json!({}));
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({"success": true, "result": 30, "rule": {"+": ["10", "20"]}, "data": {}})
        );

        let failed = ProcessRuleResponse::failure("boom", None);
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            json!({"success": false, "error": "boom"})
        );
    }

    #[test]
    fn test_null_result_is_kept() {
        let ok = ProcessRuleResponse::success(Value::Null, json!({"var": "x"}), json!({}));
        let wire = serde_json::to_value(&ok).unwrap();
        assert_eq!(wire["result"], Value::Null);
        assert!(wire.as_object().unwrap().contains_key("result"));
    }

    #[test]
    fn test_request_defaults() {
        let request: ProcessRuleRequest = serde_json::from_str(r#"{"rule": {"var": "a"}}"#).unwrap();
        assert_eq!(request.data, json!({}));

        let request: ProcessRuleRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request.rule, Value::Null);
    }

    #[test]
    fn test_process_missing_rule() {
        let service = RuleService::default();
        let response = service.process(ProcessRuleRequest::new(Value::Null, json!({})));
        assert_eq!(
            response,
            ProcessRuleResponse::failure(RULE_NOT_PROVIDED, None)
        );
    }

    #[test]
    fn test_process_reports_error_kind() {
        let service = RuleService::default();
        let response = service.process(ProcessRuleRequest::new(json!({"/": [1, 0]}), json!({})));
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"success": false, "error": "除数不能为零", "kind": "division_by_zero"})
        );
    }

    #[tokio::test]
    async fn test_process_async_awaits_async_functions() {
        let functions = FunctionRegistry::new()
            .with_async("score", |_| async { Ok::<_, anyhow::Error>(json!(800)) });
        let service = RuleService::new(JsonLogic::default(), functions);
        let request = ProcessRuleRequest::new(
            json!({">": [{"apply": ["score"]}, {"var": "limite"}]}),
            json!({"limite": 750}),
        );

        let response = service.process_async(request.clone()).await;
        assert_eq!(response.result(), Some(&json!(true)));

        // 同步处理拒绝异步函数
        let response = service.process(request);
        assert!(!response.is_success());
    }

    #[tokio::test]
    async fn test_validate_reports_references() {
        let service = RuleService::default();
        let response = service
            .validate(ValidateRuleRequest {
                rule: json!({"==": [{"var": "pontuacao_credito"}, null]}),
            })
            .await;

        assert!(response.valid);
        assert_eq!(response.variables, vec!["pontuacao_credito".to_string()]);
    }

    #[tokio::test]
    async fn test_validate_with_async_function() {
        let functions = FunctionRegistry::new()
            .with_async("buscar_score", |_| async { Ok::<_, anyhow::Error>(json!(800)) });
        let service = RuleService::new(JsonLogic::default(), functions);

        let response = service
            .validate(ValidateRuleRequest {
                rule: json!({">=": [{"apply": ["buscar_score", {"var": "cpf"}]}, 750]}),
            })
            .await;

        assert!(response.valid);
        assert_eq!(response.variables, vec!["cpf".to_string()]);
        assert_eq!(response.functions, vec!["buscar_score".to_string()]);

        let response = service
            .validate(ValidateRuleRequest {
                rule: json!({"/": [{"apply": ["buscar_score"]}, 0]}),
            })
            .await;
        assert!(!response.valid);
        assert_eq!(response.error.as_deref(), Some("除数不能为零"));
        assert_eq!(response.functions, vec!["buscar_score".to_string()]);
    }

    #[test]
    fn test_health() {
        assert_eq!(RuleService::default().health().status, "healthy");
    }
}
