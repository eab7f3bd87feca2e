//! 操作符评估器
//!
//! 实现操作符表中纯函数部分的语义：比较、逻辑、算术、数据与字符串操作。
//! 所有函数都作用于已经求值完毕的操作数。

use crate::error::{Result, RuleError};
use crate::models::EvaluationContext;
use crate::operators::Operator;
use serde_json::Value;
use std::cmp::Ordering;
use tracing::info;

/// 操作符评估器
pub struct OperatorEvaluator;

impl OperatorEvaluator {
    /// 对已求值的操作数执行操作符
    ///
    /// `apply` 与集合操作符由执行器处理，不经过这里。
    pub fn evaluate(
        operator: Operator,
        operands: Vec<Value>,
        context: &EvaluationContext<'_>,
    ) -> Result<Value> {
        if !operator.arity().accepts(operands.len()) {
            return Err(RuleError::invalid_arguments(
                operator,
                format!("需要 {} 个参数，实际 {} 个", operator.arity(), operands.len()),
            ));
        }

        match operator {
            Operator::Eq => Ok(Value::Bool(loose_eq(&operands[0], &operands[1]))),
            Operator::Neq => Ok(Value::Bool(!loose_eq(&operands[0], &operands[1]))),
            Operator::StrictEq => Ok(Value::Bool(operands[0] == operands[1])),
            Operator::StrictNeq => Ok(Value::Bool(operands[0] != operands[1])),
            Operator::Gt => Self::compare(&operands[0], &operands[1], Ordering::is_gt),
            Operator::Gte => Self::compare(&operands[0], &operands[1], Ordering::is_ge),
            Operator::Lt => Ok(Value::Bool(Self::chained(&operands, Ordering::is_lt))),
            Operator::Lte => Ok(Value::Bool(Self::chained(&operands, Ordering::is_le))),

            Operator::Not => Ok(Value::Bool(!truthy(&operands[0]))),
            Operator::And => Ok(Value::Bool(operands.iter().all(truthy))),
            Operator::Or => Ok(Value::Bool(operands.iter().any(truthy))),
            Operator::Ternary => Ok(Self::ternary(operands)),

            Operator::Add => Self::add(&operands),
            Operator::Mul => Self::mul(&operands),
            Operator::Sub => Self::sub(&operands),
            Operator::Div => Self::div(operands),
            Operator::Mod => Self::modulo(&operands[0], &operands[1]),
            Operator::Min => Self::extremum(operands, Ordering::is_lt),
            Operator::Max => Self::extremum(operands, Ordering::is_gt),

            Operator::Var => Self::var(operands, context),
            Operator::In => Self::contains(&operands[0], &operands[1]),
            Operator::Count => Ok(Value::from(operands.iter().filter(|v| truthy(v)).count())),
            Operator::Merge => Ok(Self::merge(operands)),

            Operator::Cat => Ok(Value::String(
                operands.iter().map(display_string).collect::<String>(),
            )),
            Operator::Log => Ok(Self::log(operands)),

            // 解析器把这些操作符交给执行器，正常求值不会走到这里
            Operator::Apply
            | Operator::SomeOf
            | Operator::Every
            | Operator::NoneOf
            | Operator::Map
            | Operator::Filter
            | Operator::Reduce => Err(RuleError::ExecutionError(format!(
                "操作符 {} 需要由执行器处理",
                operator
            ))),
        }
    }

    /// 直接比较，类型不可比较时报错
    fn compare(a: &Value, b: &Value, accept: fn(Ordering) -> bool) -> Result<Value> {
        Ok(Value::Bool(accept(compare_values(a, b)?)))
    }

    /// 链式比较：所有相邻对都满足关系才为真；少于两个操作数或类型不可比较时为假
    fn chained(operands: &[Value], accept: fn(Ordering) -> bool) -> bool {
        operands.len() >= 2
            && operands.windows(2).all(|pair| {
                compare_values(&pair[0], &pair[1])
                    .map(accept)
                    .unwrap_or(false)
            })
    }

    fn ternary(operands: Vec<Value>) -> Value {
        let mut iter = operands.into_iter();
        match (iter.next(), iter.next(), iter.next()) {
            (Some(cond), Some(then), Some(otherwise)) => {
                if truthy(&cond) {
                    then
                } else {
                    otherwise
                }
            }
            _ => Value::Null,
        }
    }

    fn add(operands: &[Value]) -> Result<Value> {
        let mut total = 0.0;
        for value in operands {
            total += coerce_number(value)?;
        }
        number_value(total)
    }

    fn mul(operands: &[Value]) -> Result<Value> {
        let mut product = 1.0;
        for value in operands {
            product *= coerce_number(value)?;
        }
        number_value(product)
    }

    fn sub(operands: &[Value]) -> Result<Value> {
        match operands {
            [a] => number_value(-numeric_operand(a)?),
            [a, b] => number_value(numeric_operand(a)? - numeric_operand(b)?),
            _ => Err(RuleError::invalid_arguments(Operator::Sub, "需要 1 或 2 个参数")),
        }
    }

    fn div(mut operands: Vec<Value>) -> Result<Value> {
        if operands.len() == 1 {
            return Ok(operands.remove(0));
        }

        let dividend = coerce_number(&operands[0])?;
        let divisor = coerce_number(&operands[1])?;
        if divisor == 0.0 {
            return Err(RuleError::DivisionByZero);
        }

        number_value(dividend / divisor)
    }

    /// 取模，结果符号与除数一致
    fn modulo(a: &Value, b: &Value) -> Result<Value> {
        if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
            if y == 0 {
                return Err(RuleError::DivisionByZero);
            }
            let mut r = x.wrapping_rem(y);
            if r != 0 && (r < 0) != (y < 0) {
                r += y;
            }
            return Ok(Value::from(r));
        }

        let x = numeric_operand(a)?;
        let y = numeric_operand(b)?;
        if y == 0.0 {
            return Err(RuleError::DivisionByZero);
        }

        let mut r = x % y;
        if r != 0.0 && (r < 0.0) != (y < 0.0) {
            r += y;
        }
        number_value(r)
    }

    /// 最小/最大值，相等时保留先出现的操作数
    fn extremum(operands: Vec<Value>, replace: fn(Ordering) -> bool) -> Result<Value> {
        let mut iter = operands.into_iter();
        let mut best = iter.next().unwrap_or(Value::Null);

        for candidate in iter {
            if replace(compare_values(&candidate, &best)?) {
                best = candidate;
            }
        }

        Ok(best)
    }

    fn var(operands: Vec<Value>, context: &EvaluationContext<'_>) -> Result<Value> {
        let mut iter = operands.into_iter();
        let path = iter.next().unwrap_or(Value::Null);
        let not_found = iter.next().unwrap_or(Value::Null);

        let path = match path {
            Value::Null => String::new(),
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            other => {
                return Err(RuleError::type_mismatch(
                    "string path",
                    type_name(&other),
                ));
            }
        };

        Ok(context.resolve(&path, not_found))
    }

    /// 成员检查，只支持数组、对象和字符串容器
    fn contains(needle: &Value, container: &Value) -> Result<Value> {
        let found = match container {
            Value::Array(items) => items.iter().any(|item| loose_eq(needle, item)),
            Value::Object(map) => needle.as_str().is_some_and(|key| map.contains_key(key)),
            Value::String(haystack) => {
                let needle = needle
                    .as_str()
                    .ok_or_else(|| RuleError::type_mismatch("string", type_name(needle)))?;
                haystack.contains(needle)
            }
            _ => false,
        };

        Ok(Value::Bool(found))
    }

    /// 展开数组参数，忽略非数组参数
    fn merge(operands: Vec<Value>) -> Value {
        let merged = operands
            .into_iter()
            .filter_map(|v| match v {
                Value::Array(items) => Some(items),
                _ => None,
            })
            .flatten()
            .collect();
        Value::Array(merged)
    }

    fn log(mut operands: Vec<Value>) -> Value {
        let value = operands.remove(0);
        info!(target: "json_logic::log", value = %value, "log");
        value
    }
}

/// 真值判断：null、false、0、""、[]、{} 为假
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(arr) => !arr.is_empty(),
        Value::Object(obj) => !obj.is_empty(),
    }
}

/// 宽松相等：数值与布尔按数值比较，容器逐元素比较
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| loose_eq(l, r))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).is_some_and(|w| loose_eq(v, w)))
        }
        _ => match (as_numeric(a), as_numeric(b)) {
            (Some(x), Some(y)) => x == y,
            _ => a == b,
        },
    }
}

/// 比较两个值的大小
pub fn compare_values(a: &Value, b: &Value) -> Result<Ordering> {
    match (a, b) {
        (Value::String(x), Value::String(y)) => Ok(x.cmp(y)),
        (Value::Array(x), Value::Array(y)) => {
            for (l, r) in x.iter().zip(y) {
                let ordering = compare_values(l, r)?;
                if ordering != Ordering::Equal {
                    return Ok(ordering);
                }
            }
            Ok(x.len().cmp(&y.len()))
        }
        _ => match (as_numeric(a), as_numeric(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y).ok_or_else(|| incomparable(a, b)),
            _ => Err(incomparable(a, b)),
        },
    }
}

fn incomparable(a: &Value, b: &Value) -> RuleError {
    RuleError::type_mismatch(
        "comparable values",
        format!("{} and {}", type_name(a), type_name(b)),
    )
}

/// 数值或布尔转为 f64，不做字符串转换
fn as_numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn numeric_operand(value: &Value) -> Result<f64> {
    as_numeric(value).ok_or_else(|| RuleError::type_mismatch("number", type_name(value)))
}

/// 数值强制转换：数值原样，字符串按十进制解析，布尔为 1/0
pub fn coerce_number(value: &Value) -> Result<f64> {
    match value {
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| RuleError::type_mismatch("number", format!("string '{}'", s))),
        other => numeric_operand(other),
    }
}

/// 整数值结果输出为 JSON 整数，其他输出为浮点数
pub fn number_value(f: f64) -> Result<Value> {
    if !f.is_finite() {
        return Err(RuleError::type_mismatch("finite number", f.to_string()));
    }

    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        return Ok(Value::from(f as i64));
    }

    serde_json::Number::from_f64(f)
        .map(Value::Number)
        .ok_or_else(|| RuleError::type_mismatch("finite number", f.to_string()))
}

/// 转换为字符串：字符串原样，其他值使用紧凑 JSON 形式
pub fn display_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// 获取值的类型名称
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
