//! REST API shared utilities (response types, pagination)

pub mod activity;
pub mod health;
pub mod member;
pub mod metrics;
pub mod organization;
pub mod project;
pub mod task;

use serde::{Deserialize, Serialize};

/// Maximum allowed page size
pub(crate) const MAX_LIMIT: i64 = 100;

/// Pagination query parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaginationQuery {
    #[serde(default = "default_page", deserialize_with = "deserialize_page")]
    pub page: i64,
    #[serde(
        default = "default_limit",
        deserialize_with = "deserialize_limit",
        alias = "per_page"
    )]
    pub limit: i64,
}

impl Default for PaginationQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
        }
    }
}

pub(crate) fn default_page() -> i64 {
    1
}

pub(crate) fn default_limit() -> i64 {
    20
}

/// Reject page values less than 1
pub(crate) fn deserialize_page<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = i64::deserialize(deserializer)?;
    if value < 1 {
        return Err(serde::de::Error::custom(
            "page must be a positive integer (>= 1)",
        ));
    }
    Ok(value)
}

/// Reject limit values less than 1, clamp to MAX_LIMIT
pub(crate) fn deserialize_limit<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = i64::deserialize(deserializer)?;
    if value < 1 {
        return Err(serde::de::Error::custom(
            "limit must be a positive integer (>= 1)",
        ));
    }
    Ok(value.min(MAX_LIMIT))
}

/// Paginated response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl<T: Serialize> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, page: i64, limit: i64, total: i64) -> Self {
        let total_pages = (total as f64 / limit as f64).ceil() as i64;
        Self {
            data,
            pagination: PaginationMeta {
                page,
                limit,
                total,
                total_pages,
            },
        }
    }
}

/// Success response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessResponse<T> {
    pub data: T,
}

impl<T: Serialize> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Message response (for delete, etc.)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_query_defaults() {
        let query: PaginationQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, 20);
    }

    #[test]
    fn test_pagination_query_custom_values() {
        let query: PaginationQuery = serde_json::from_str(r#"{"page": 5, "limit": 50}"#).unwrap();
        assert_eq!(query.page, 5);
        assert_eq!(query.limit, 50);
    }

    #[test]
    fn test_pagination_query_accepts_per_page_alias() {
        let query: PaginationQuery = serde_json::from_str(r#"{"per_page": 30}"#).unwrap();
        assert_eq!(query.limit, 30);
    }

    #[test]
    fn test_pagination_query_limit_clamped_to_max() {
        let query: PaginationQuery =
            serde_json::from_str(r#"{"page": 1, "limit": 1000000}"#).unwrap();
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, MAX_LIMIT);
    }

    #[test]
    fn test_pagination_query_limit_zero_rejected() {
        let result = serde_json::from_str::<PaginationQuery>(r#"{"page": 1, "limit": 0}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_pagination_query_limit_negative_rejected() {
        let result = serde_json::from_str::<PaginationQuery>(r#"{"page": 1, "limit": -5}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_pagination_query_page_zero_rejected() {
        let result = serde_json::from_str::<PaginationQuery>(r#"{"page": 0, "limit": 20}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_pagination_query_page_negative_rejected() {
        let result = serde_json::from_str::<PaginationQuery>(r#"{"page": -1, "limit": 20}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_paginated_response_calculation() {
        let data = vec!["a", "b", "c"];
        let response = PaginatedResponse::new(data, 1, 10, 100);

        assert_eq!(response.pagination.page, 1);
        assert_eq!(response.pagination.limit, 10);
        assert_eq!(response.pagination.total, 100);
        assert_eq!(response.pagination.total_pages, 10);
        assert_eq!(response.data.len(), 3);
    }

    #[test]
    fn test_paginated_response_partial_last_page() {
        let data: Vec<String> = vec![];
        let response = PaginatedResponse::new(data, 3, 10, 25);

        assert_eq!(response.pagination.total_pages, 3); // ceil(25/10) = 3
    }

    #[test]
    fn test_success_response() {
        let data = "test data";
        let response = SuccessResponse::new(data);
        assert_eq!(response.data, "test data");
    }

    #[test]
    fn test_message_response() {
        let response = MessageResponse::new("Operation successful");
        assert_eq!(response.message, "Operation successful");
    }
}
