//! 规则执行器
//!
//! 递归求值解析后的规则树。同步与异步求值共用同一套算法，区别只在于
//! 函数调用策略（[`Invoker`]）：
//!
//! 1. 字面量直接返回，空对象返回 null
//! 2. 从左到右依次求值全部参数，任何操作符都不能阻止兄弟参数的求值
//! 3. 把求值结果交给操作符
//!
//! 因为参数总是先于操作符求值，`?:`/`if` 的两个分支都会被求值，
//! 两边的副作用都会发生。

use crate::error::{Result, RuleError};
use crate::evaluator::{truthy, OperatorEvaluator};
use crate::functions::{self, Invoker};
use crate::models::{EvaluationContext, RuleNode};
use crate::operators::Operator;
use futures::future::BoxFuture;
use serde_json::{Map, Value};
use tracing::trace;

/// 规则执行器
pub struct RuleExecutor<I> {
    invoker: I,
}

impl<I: Invoker> RuleExecutor<I> {
    pub fn new(invoker: I) -> Self {
        Self { invoker }
    }

    /// 递归评估规则节点
    ///
    /// 挂起点只有两处：递归进入包含异步函数调用的子节点，以及调用异步宿主函数。
    pub fn evaluate_node<'a>(
        &'a self,
        node: &'a RuleNode,
        data: &'a Value,
    ) -> BoxFuture<'a, Result<Value>> {
        Box::pin(async move {
            match node {
                RuleNode::Literal(value) => Ok(value.clone()),
                RuleNode::Empty => Ok(Value::Null),
                RuleNode::Operation { operator, args } => {
                    let mut operands = Vec::with_capacity(args.len());
                    for arg in args {
                        operands.push(self.evaluate_node(arg, data).await?);
                    }

                    trace!(operator = %operator, operands = operands.len(), "dispatch");

                    match operator {
                        Operator::Apply => functions::apply(&self.invoker, operands).await,
                        op => OperatorEvaluator::evaluate(
                            *op,
                            operands,
                            &EvaluationContext::new(data),
                        ),
                    }
                }
                RuleNode::Iteration {
                    operator,
                    source,
                    predicate,
                    initial,
                } => {
                    let source = self.evaluate_node(source, data).await?;
                    let initial = match initial {
                        Some(node) => Some(self.evaluate_node(node, data).await?),
                        None => None,
                    };

                    self.evaluate_iteration(*operator, source, predicate, initial)
                        .await
                }
            }
        })
    }

    /// 评估集合操作，子规则以元素为上下文逐个求值
    async fn evaluate_iteration(
        &self,
        operator: Operator,
        source: Value,
        predicate: &RuleNode,
        initial: Option<Value>,
    ) -> Result<Value> {
        let items = match source {
            Value::Array(items) => items,
            _ => Vec::new(),
        };

        match operator {
            Operator::SomeOf => {
                for item in &items {
                    if truthy(&self.evaluate_node(predicate, item).await?) {
                        return Ok(Value::Bool(true));
                    }
                }
                Ok(Value::Bool(false))
            }
            Operator::Every => {
                for item in &items {
                    if !truthy(&self.evaluate_node(predicate, item).await?) {
                        return Ok(Value::Bool(false));
                    }
                }
                Ok(Value::Bool(true))
            }
            Operator::NoneOf => {
                for item in &items {
                    if truthy(&self.evaluate_node(predicate, item).await?) {
                        return Ok(Value::Bool(false));
                    }
                }
                Ok(Value::Bool(true))
            }
            Operator::Map => {
                let mut mapped = Vec::with_capacity(items.len());
                for item in &items {
                    mapped.push(self.evaluate_node(predicate, item).await?);
                }
                Ok(Value::Array(mapped))
            }
            Operator::Filter => {
                let mut kept = Vec::new();
                for item in items {
                    if truthy(&self.evaluate_node(predicate, &item).await?) {
                        kept.push(item);
                    }
                }
                Ok(Value::Array(kept))
            }
            Operator::Reduce => {
                let mut accumulator = initial.unwrap_or_else(|| Value::from(0));
                for item in items {
                    let mut scope = Map::new();
                    scope.insert("current".to_string(), item);
                    scope.insert("accumulator".to_string(), accumulator);
                    let scope = Value::Object(scope);
                    accumulator = self.evaluate_node(predicate, &scope).await?;
                }
                Ok(accumulator)
            }
            // 解析器只为集合操作符构造 Iteration 节点
            other => Err(RuleError::invalid_arguments(other, "不是集合操作符")),
        }
    }
}
