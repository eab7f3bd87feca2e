//! 规则操作符定义
//!
//! 操作符表在进程内只构建一次，之后只读。

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// 操作符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    // 比较
    Eq,
    StrictEq,
    Neq,
    StrictNeq,
    Gt,
    Gte,
    Lt,
    Lte,

    // 逻辑
    Not,
    And,
    Or,
    Ternary,

    // 算术
    Add,
    Mul,
    Sub,
    Div,
    Mod,
    Min,
    Max,

    // 数据与集合
    Var,
    In,
    Count,
    Merge,
    SomeOf,
    Every,
    NoneOf,
    Map,
    Filter,
    Reduce,

    // 字符串
    Cat,

    // 系统
    Log,
    Apply,
}

/// 操作数个数约束
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    Range(usize, usize),
    AtLeast(usize),
    Any,
}

impl Arity {
    pub fn accepts(self, n: usize) -> bool {
        match self {
            Self::Exactly(k) => n == k,
            Self::Range(lo, hi) => (lo..=hi).contains(&n),
            Self::AtLeast(k) => n >= k,
            Self::Any => true,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exactly(k) => write!(f, "{}", k),
            Self::Range(lo, hi) => write!(f, "{}..={}", lo, hi),
            Self::AtLeast(k) => write!(f, ">= {}", k),
            Self::Any => write!(f, "任意"),
        }
    }
}

static OPERATOR_TABLE: LazyLock<HashMap<&'static str, Operator>> = LazyLock::new(|| {
    use Operator::*;

    let entries = [
        ("==", Eq),
        ("===", StrictEq),
        ("!=", Neq),
        ("!==", StrictNeq),
        (">", Gt),
        (">=", Gte),
        ("<", Lt),
        ("<=", Lte),
        ("!", Not),
        ("and", And),
        ("or", Or),
        ("?:", Ternary),
        // "if" 是 "?:" 的别名
        ("if", Ternary),
        ("+", Add),
        ("*", Mul),
        ("-", Sub),
        ("/", Div),
        ("%", Mod),
        ("min", Min),
        ("max", Max),
        ("var", Var),
        ("in", In),
        ("count", Count),
        ("merge", Merge),
        ("some", SomeOf),
        ("every", Every),
        ("none", NoneOf),
        ("map", Map),
        ("filter", Filter),
        ("reduce", Reduce),
        ("cat", Cat),
        ("log", Log),
        ("apply", Apply),
    ];

    entries.into_iter().collect()
});

impl Operator {
    /// 按名称查找操作符（区分大小写）
    pub fn from_name(name: &str) -> Option<Self> {
        OPERATOR_TABLE.get(name).copied()
    }

    /// 规范名称，别名 `if` 归一为 `?:`
    pub fn name(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::StrictEq => "===",
            Self::Neq => "!=",
            Self::StrictNeq => "!==",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Not => "!",
            Self::And => "and",
            Self::Or => "or",
            Self::Ternary => "?:",
            Self::Add => "+",
            Self::Mul => "*",
            Self::Sub => "-",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Min => "min",
            Self::Max => "max",
            Self::Var => "var",
            Self::In => "in",
            Self::Count => "count",
            Self::Merge => "merge",
            Self::SomeOf => "some",
            Self::Every => "every",
            Self::NoneOf => "none",
            Self::Map => "map",
            Self::Filter => "filter",
            Self::Reduce => "reduce",
            Self::Cat => "cat",
            Self::Log => "log",
            Self::Apply => "apply",
        }
    }

    /// 求值后的操作数个数约束
    pub fn arity(self) -> Arity {
        match self {
            Self::Eq
            | Self::StrictEq
            | Self::Neq
            | Self::StrictNeq
            | Self::Gt
            | Self::Gte
            | Self::Mod
            | Self::In => Arity::Exactly(2),
            Self::Not | Self::Log => Arity::Exactly(1),
            Self::Ternary => Arity::Exactly(3),
            Self::Sub | Self::Div | Self::Var => Arity::Range(1, 2),
            Self::Min | Self::Max => Arity::AtLeast(1),
            Self::SomeOf | Self::Every | Self::NoneOf | Self::Map | Self::Filter => {
                Arity::Exactly(2)
            }
            Self::Reduce => Arity::Range(2, 3),
            // < 和 <= 少于两个操作数时返回 false；apply 的空参数有专门的错误
            Self::Lt
            | Self::Lte
            | Self::And
            | Self::Or
            | Self::Add
            | Self::Mul
            | Self::Count
            | Self::Merge
            | Self::Cat
            | Self::Apply => Arity::Any,
        }
    }

    /// 是否为逐元素应用子规则的集合操作符
    pub fn is_iteration(self) -> bool {
        matches!(
            self,
            Self::SomeOf | Self::Every | Self::NoneOf | Self::Map | Self::Filter | Self::Reduce
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
