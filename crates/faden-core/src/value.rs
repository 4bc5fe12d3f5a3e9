//! Dynamic values used by attributes, action params, and guards.
//!
//! All coercion and comparison semantics live here so that every evaluator
//! in the runtime (structured condition trees and legacy string expressions
//! alike) shares a single definition of equality and ordering.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A dynamically typed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// A boolean flag.
    Bool(bool),
    /// A number. All numerics are stored as `f64`.
    Number(f64),
    /// A text value.
    String(String),
    /// The absence of a value (missing attribute, unset flag).
    Null,
}

impl Value {
    /// Attempt a numeric cast: numbers pass through, booleans become 0/1,
    /// strings are parsed.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::String(s) => s.trim().parse().ok(),
            Value::Null => None,
        }
    }

    /// Truthiness: `false`, `0`, the empty string and `Null` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Null => false,
        }
    }

    /// Loose equality: if both sides cast to numbers the numbers are
    /// compared, otherwise the display forms are compared.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self.as_number(), other.as_number()) {
            (Some(a), Some(b)) => a == b,
            _ => self.to_string() == other.to_string(),
        }
    }

    /// Parse a literal token the way the legacy expression parser does:
    /// `true`/`false` become booleans, numerics become numbers, everything
    /// else stays a string.
    pub fn parse_literal(token: &str) -> Value {
        match token {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => token
                .parse::<f64>()
                .map(Value::Number)
                .unwrap_or_else(|_| Value::String(token.to_string())),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s}"),
            Value::Null => write!(f, "null"),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value as f64)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

/// Comparison operators shared by condition trees and legacy expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    /// Loose equality.
    Eq,
    /// Loose inequality.
    Ne,
    /// Numeric greater-than.
    Gt,
    /// Numeric greater-or-equal.
    Ge,
    /// Numeric less-than.
    Lt,
    /// Numeric less-or-equal.
    Le,
    /// Substring containment on the display forms.
    Contains,
}

impl CompareOp {
    /// Parse an operator token from a legacy expression.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "==" => Some(Self::Eq),
            "!=" => Some(Self::Ne),
            ">" => Some(Self::Gt),
            ">=" => Some(Self::Ge),
            "<" => Some(Self::Lt),
            "<=" => Some(Self::Le),
            "contains" => Some(Self::Contains),
            _ => None,
        }
    }

    /// Apply the operator. Ordering operators cast both sides to numbers
    /// and evaluate to `false` when either side is not numeric.
    pub fn apply(&self, left: &Value, right: &Value) -> bool {
        match self {
            Self::Eq => left.loose_eq(right),
            Self::Ne => !left.loose_eq(right),
            Self::Contains => left.to_string().contains(&right.to_string()),
            Self::Gt | Self::Ge | Self::Lt | Self::Le => {
                match (left.as_number(), right.as_number()) {
                    (Some(a), Some(b)) => match self {
                        Self::Gt => a > b,
                        Self::Ge => a >= b,
                        Self::Lt => a < b,
                        Self::Le => a <= b,
                        _ => unreachable!(),
                    },
                    _ => false,
                }
            }
        }
    }
}
