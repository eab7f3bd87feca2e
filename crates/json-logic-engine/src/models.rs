//! 规则引擎领域模型

use crate::operators::Operator;
use serde_json::Value;
use std::collections::BTreeSet;

/// 解析后的规则节点
///
/// 每次求值都会从 JSON 重新解析，不做跨调用缓存。
#[derive(Debug, Clone, PartialEq)]
pub enum RuleNode {
    /// 非对象值（包括数组），求值结果即自身
    Literal(Value),
    /// 空对象，求值为 null
    Empty,
    /// 普通操作：先从左到右求值全部参数，再分派给操作符
    Operation {
        operator: Operator,
        args: Vec<RuleNode>,
    },
    /// 集合操作：`predicate` 作为子规则逐元素求值
    Iteration {
        operator: Operator,
        source: Box<RuleNode>,
        predicate: Box<RuleNode>,
        initial: Option<Box<RuleNode>>,
    },
}

impl RuleNode {
    pub fn operator(&self) -> Option<Operator> {
        match self {
            Self::Operation { operator, .. } | Self::Iteration { operator, .. } => Some(*operator),
            Self::Literal(_) | Self::Empty => None,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Literal(_))
    }
}

/// 解析后的规则
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub root: RuleNode,
    /// 规则中引用的变量路径（仅统计字面量路径，不含集合子规则内的相对路径）
    pub required_fields: BTreeSet<String>,
    /// 规则中通过 apply 引用的函数名
    pub functions: BTreeSet<String>,
}

impl CompiledRule {
    /// 获取根节点
    pub fn root(&self) -> &RuleNode {
        &self.root
    }
}

/// 评估上下文 - 提供给规则引擎的只读数据
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    data: &'a Value,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(data: &'a Value) -> Self {
        Self { data }
    }

    /// 获取字段值（支持点号分隔的路径，如 "usuario.nome" 或 "usuario.enderecos.1"）
    ///
    /// 空路径返回整个上下文。任何一段无法继续下钻时立即返回 `None`。
    pub fn get_field(&self, path: &str) -> Option<&'a Value> {
        if path.is_empty() {
            return Some(self.data);
        }

        let mut current = self.data;

        for part in path.split('.') {
            current = match current {
                Value::Object(map) => map.get(part)?,
                Value::Array(arr) => {
                    // 只接受全数字的下标
                    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                        return None;
                    }
                    let index: usize = part.parse().ok()?;
                    arr.get(index)?
                }
                _ => return None,
            };
        }

        Some(current)
    }

    /// 解析变量，路径不存在时返回 `not_found`
    pub fn resolve(&self, path: &str, not_found: Value) -> Value {
        self.get_field(path).cloned().unwrap_or(not_found)
    }

    /// 获取底层数据
    pub fn data(&self) -> &'a Value {
        self.data
    }
}
