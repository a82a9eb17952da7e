//! # Listing queries
//!
//! Typed pagination, sort and search parameters shared by every listing
//! operation. Filters are plain structs so a plugin never has to assemble
//! them from optional fragments.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub number: u32,
    pub size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { number: 1, size: DEFAULT_PAGE_SIZE }
    }
}

impl PageRequest {
    /// Page `0` is read as the first page; the size is clamped to `1..=MAX_PAGE_SIZE`.
    pub fn new(number: u32, size: u32) -> Self {
        Self {
            number: number.max(1),
            size: size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn skip(&self) -> i64 {
        i64::from(self.number.max(1) - 1) * i64::from(self.limit())
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.size.clamp(1, MAX_PAGE_SIZE))
    }
}

/// One page of results plus whether another page follows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub is_next: bool,
}

impl<T> Page<T> {
    /// `total` is the number of matching records ignoring pagination.
    pub fn from_total(items: Vec<T>, total: i64, request: &PageRequest) -> Self {
        let is_next = total > request.skip() + items.len() as i64;
        Self { items, is_next }
    }

    pub fn empty() -> Self {
        Self { items: Vec::new(), is_next: false }
    }
}

/// Sort direction on creation time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Case-insensitive substring search. A blank term matches everything and is
/// therefore never constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchTerm(String);

impl SearchTerm {
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_lowercase()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `LIKE` pattern with `\` as the escape character.
    pub fn like_pattern(&self) -> String {
        let mut pattern = String::with_capacity(self.0.len() + 2);
        pattern.push('%');
        for c in self.0.chars() {
            if matches!(c, '%' | '_' | '\\') {
                pattern.push('\\');
            }
            pattern.push(c);
        }
        pattern.push('%');
        pattern
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommunityQuery {
    pub search: Option<SearchTerm>,
    pub page: PageRequest,
    pub sort: SortOrder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserQuery {
    /// External id of the caller, left out of the results
    pub exclude_user_id: String,
    pub search: Option<SearchTerm>,
    pub page: PageRequest,
    pub sort: SortOrder,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_request_normalizes_bounds() {
        let req = PageRequest::new(0, 500);
        assert_eq!(req.number, 1);
        assert_eq!(req.size, MAX_PAGE_SIZE);
        assert_eq!(req.skip(), 0);

        let req = PageRequest::new(3, 20);
        assert_eq!(req.skip(), 40);
        assert_eq!(req.limit(), 20);
    }

    #[test]
    fn is_next_compares_total_with_consumed() {
        let req = PageRequest::new(1, 2);
        assert!(Page::from_total(vec![1, 2], 3, &req).is_next);
        assert!(!Page::from_total(vec![1, 2], 2, &req).is_next);

        let last = PageRequest::new(2, 2);
        assert!(!Page::from_total(vec![3], 3, &last).is_next);
        assert!(!Page::<i32>::from_total(vec![], 0, &PageRequest::default()).is_next);
    }

    #[test]
    fn blank_search_is_none() {
        assert_eq!(SearchTerm::parse("   "), None);
        assert_eq!(SearchTerm::parse(" Rust ").unwrap().as_str(), "rust");
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        let term = SearchTerm::parse("50%_off\\").unwrap();
        assert_eq!(term.like_pattern(), "%50\\%\\_off\\\\%");
    }

    #[test]
    fn sort_order_defaults_to_newest_first() {
        assert_eq!(SortOrder::default().as_sql(), "DESC");
        let parsed: SortOrder = serde_json::from_str("\"asc\"").unwrap();
        assert_eq!(parsed, SortOrder::Asc);
    }
}
