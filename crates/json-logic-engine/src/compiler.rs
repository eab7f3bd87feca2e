//! 规则解析器
//!
//! 将 JSON 规则解析成带标签的执行树，并收集规则引用的变量与函数。
//! 每次调用都重新解析，不缓存结果。

use crate::error::{Result, RuleError};
use crate::models::{CompiledRule, RuleNode};
use crate::operators::Operator;
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::debug;

/// 默认的最大嵌套深度
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// 规则解析器
pub struct RuleCompiler {
    max_depth: usize,
}

#[derive(Default)]
struct References {
    fields: BTreeSet<String>,
    functions: BTreeSet<String>,
}

impl RuleCompiler {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// 从 JSON 字符串解析规则
    pub fn compile_from_json(&self, json: &str) -> Result<CompiledRule> {
        let rule: Value = serde_json::from_str(json)?;
        self.compile(&rule)
    }

    /// 解析规则
    pub fn compile(&self, rule: &Value) -> Result<CompiledRule> {
        let mut refs = References::default();
        let root = self.compile_node(rule, 0, false, &mut refs)?;

        Ok(CompiledRule {
            root,
            required_fields: refs.fields,
            functions: refs.functions,
        })
    }

    /// 递归解析节点
    ///
    /// `scoped` 为真表示处于集合子规则内，此时 var 路径相对于元素，不计入引用字段。
    fn compile_node(
        &self,
        value: &Value,
        depth: usize,
        scoped: bool,
        refs: &mut References,
    ) -> Result<RuleNode> {
        if depth > self.max_depth {
            return Err(RuleError::DepthLimitExceeded(self.max_depth));
        }

        let map = match value {
            Value::Object(map) => map,
            other => return Ok(RuleNode::Literal(other.clone())),
        };

        let Some((name, raw_args)) = map.iter().next() else {
            return Ok(RuleNode::Empty);
        };

        if map.len() > 1 {
            debug!(
                operator = %name,
                ignored = map.len() - 1,
                "节点包含多个键，仅使用第一个"
            );
        }

        let operator =
            Operator::from_name(name).ok_or_else(|| RuleError::UnknownOperator(name.clone()))?;

        let raw: Vec<&Value> = match raw_args {
            Value::Array(items) => items.iter().collect(),
            other => vec![other],
        };

        if !operator.arity().accepts(raw.len()) {
            return Err(RuleError::invalid_arguments(
                operator,
                format!("需要 {} 个参数，实际 {} 个", operator.arity(), raw.len()),
            ));
        }

        if operator.is_iteration() {
            let source = self.compile_node(raw[0], depth + 1, scoped, refs)?;
            let predicate = self.compile_node(raw[1], depth + 1, true, refs)?;
            let initial = raw
                .get(2)
                .map(|v| self.compile_node(v, depth + 1, scoped, refs))
                .transpose()?;

            return Ok(RuleNode::Iteration {
                operator,
                source: Box::new(source),
                predicate: Box::new(predicate),
                initial: initial.map(Box::new),
            });
        }

        let args = raw
            .into_iter()
            .map(|v| self.compile_node(v, depth + 1, scoped, refs))
            .collect::<Result<Vec<_>>>()?;

        self.collect_reference(operator, &args, scoped, refs);

        Ok(RuleNode::Operation { operator, args })
    }

    /// 记录字面量形式的变量路径和函数名
    fn collect_reference(
        &self,
        operator: Operator,
        args: &[RuleNode],
        scoped: bool,
        refs: &mut References,
    ) {
        let Some(RuleNode::Literal(Value::String(name))) = args.first() else {
            return;
        };

        match operator {
            Operator::Var if !scoped && !name.is_empty() => {
                refs.fields.insert(name.clone());
            }
            Operator::Apply => {
                refs.functions.insert(name.clone());
            }
            _ => {}
        }
    }
}

impl Default for RuleCompiler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}
