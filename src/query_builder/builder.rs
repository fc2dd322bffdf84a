//! Statement construction and SQL rendering.

use super::{BindValue, Pagination, QueryCondition, SqlOperator};

/// Statement kind the builder renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Select,
    Delete,
}

/// Builder for SELECT/DELETE statements against a single table.
///
/// Conditions are ANDed in insertion order; their bind values are returned
/// in the same order, so placeholder `$n` always pairs with the n-th value.
#[derive(Debug, Clone)]
pub struct CacheQuery {
    kind: QueryKind,
    table: String,
    select_fields: Vec<String>,
    conditions: Vec<QueryCondition>,
    order_by: Vec<String>,
    pagination: Option<Pagination>,
}

impl CacheQuery {
    /// Start a SELECT against the given table.
    pub fn select(table: &str) -> Self {
        Self {
            kind: QueryKind::Select,
            table: table.to_string(),
            select_fields: vec!["*".to_string()],
            conditions: Vec::new(),
            order_by: Vec::new(),
            pagination: None,
        }
    }

    /// Start a DELETE against the given table.
    pub fn delete(table: &str) -> Self {
        Self {
            kind: QueryKind::Delete,
            table: table.to_string(),
            select_fields: Vec::new(),
            conditions: Vec::new(),
            order_by: Vec::new(),
            pagination: None,
        }
    }

    /// Set specific fields to select.
    pub fn fields(mut self, fields: &[&str]) -> Self {
        self.select_fields = fields.iter().map(|f| (*f).to_string()).collect();
        self
    }

    /// Add a typed condition.
    pub fn filter(mut self, condition: QueryCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Add an equality condition.
    pub fn where_eq(self, column: &str, value: BindValue) -> Self {
        self.filter(QueryCondition::new(column, SqlOperator::Eq, value))
    }

    /// Add a `column <= $n` condition.
    pub fn where_lte(self, column: &str, value: BindValue) -> Self {
        self.filter(QueryCondition::new(column, SqlOperator::Lte, value))
    }

    /// Add a `column > $n` condition.
    pub fn where_gt(self, column: &str, value: BindValue) -> Self {
        self.filter(QueryCondition::new(column, SqlOperator::Gt, value))
    }

    /// Add ORDER BY ASC.
    pub fn order_asc(mut self, column: &str) -> Self {
        self.order_by.push(format!("{column} ASC"));
        self
    }

    /// Add ORDER BY DESC.
    pub fn order_desc(mut self, column: &str) -> Self {
        self.order_by.push(format!("{column} DESC"));
        self
    }

    /// Apply pagination.
    pub fn paginate(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }

    /// Bind values in placeholder order.
    pub fn bind_values(&self) -> Vec<BindValue> {
        self.conditions.iter().map(|c| c.value.clone()).collect()
    }

    /// Render the statement with `$n` placeholders.
    pub fn to_sql(&self) -> String {
        let mut sql = match self.kind {
            QueryKind::Select => {
                format!("SELECT {} FROM {}", self.select_fields.join(", "), self.table)
            }
            QueryKind::Delete => format!("DELETE FROM {}", self.table),
        };

        if !self.conditions.is_empty() {
            let rendered: Vec<String> = self
                .conditions
                .iter()
                .enumerate()
                .map(|(i, c)| c.render(i + 1))
                .collect();
            sql.push_str(" WHERE ");
            sql.push_str(&rendered.join(" AND "));
        }

        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_by.join(", "));
        }

        if let Some(pagination) = &self.pagination {
            sql.push_str(&pagination.to_sql());
        }

        sql
    }
}
