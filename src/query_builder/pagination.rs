//! Pagination parameters shared by SQL rendering and in-process listings.

/// LIMIT/OFFSET pair. Also used by the inspector to window key listings
/// before any per-entry data resolution happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl Pagination {
    /// Pagination with only a limit.
    pub fn limit_only(limit: u32) -> Self {
        Self {
            limit: Some(limit),
            offset: None,
        }
    }

    /// Pagination with only an offset.
    pub fn offset_only(offset: u32) -> Self {
        Self {
            limit: None,
            offset: Some(offset),
        }
    }

    /// Pagination with both limit and offset.
    pub fn limit_offset(limit: u32, offset: u32) -> Self {
        Self {
            limit: Some(limit),
            offset: Some(offset),
        }
    }

    /// Convert to a SQL suffix.
    pub fn to_sql(&self) -> String {
        let mut sql = String::new();

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }

        sql
    }

    /// Apply this window to an in-memory sequence, offset first.
    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        let offset = self.offset.unwrap_or(0) as usize;
        let mut windowed: Vec<T> = items.into_iter().skip(offset).collect();
        if let Some(limit) = self.limit {
            windowed.truncate(limit as usize);
        }
        windowed
    }
}
