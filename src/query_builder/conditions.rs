//! Typed WHERE conditions for the persisted cache table.

use chrono::{DateTime, Utc};

/// Comparison operators supported by the persisted-tier queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlOperator {
    Eq,
    NotEq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
}

impl SqlOperator {
    /// SQL rendering of the operator.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Like => "LIKE",
        }
    }
}

/// A value destined for a `$n` placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Text(String),
    Json(serde_json::Value),
    Timestamp(DateTime<Utc>),
    BigInt(i64),
    TextArray(Vec<String>),
}

/// One `column <op> $n` condition.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryCondition {
    pub column: String,
    pub operator: SqlOperator,
    pub value: BindValue,
}

impl QueryCondition {
    pub fn new(column: impl Into<String>, operator: SqlOperator, value: BindValue) -> Self {
        Self {
            column: column.into(),
            operator,
            value,
        }
    }

    /// Render with a 1-indexed placeholder number.
    pub fn render(&self, placeholder: usize) -> String {
        format!("{} {} ${placeholder}", self.column, self.operator.as_sql())
    }
}
