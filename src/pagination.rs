use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;

/// ListQuery
///
/// Raw `?page=&limit=` query parameters accepted by every paginated listing.
#[derive(Debug, Clone, Copy, Default, Deserialize, utoipa::IntoParams)]
pub struct ListQuery {
    /// 1-based page number. Defaults to 1.
    pub page: Option<i64>,
    /// Page size. Defaults to 10, capped by the configured maximum.
    pub limit: Option<i64>,
}

/// PageRequest
///
/// A validated page/limit pair. Both values are always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageRequest {
    /// from_query
    ///
    /// Applies defaults, rejects non-positive values and clamps `limit` to `max_limit`.
    /// A page whose offset does not fit in an `i64` is rejected.
    pub fn from_query(query: ListQuery, max_limit: i64) -> AppResult<Self> {
        let page = query.page.unwrap_or(DEFAULT_PAGE);
        let limit = query.limit.unwrap_or(DEFAULT_LIMIT);

        if page < 1 {
            return Err(AppError::Validation("page must be a positive integer".to_string()));
        }
        if limit < 1 {
            return Err(AppError::Validation("limit must be a positive integer".to_string()));
        }

        let limit = limit.min(max_limit.max(1));
        if (page - 1).checked_mul(limit).is_none() {
            return Err(AppError::Validation("page is out of range".to_string()));
        }

        Ok(Self { page, limit })
    }

    /// Saturates instead of overflowing for hand-built requests.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit).max(0)
    }
}

/// PageMeta
///
/// Totals reported next to every page slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

impl PageMeta {
    pub fn new(total: i64, request: &PageRequest) -> Self {
        Self {
            total,
            page: request.page,
            limit: request.limit,
            total_pages: total_pages(total, request.limit),
        }
    }
}

/// `ceil(total / limit)`; zero when there is nothing to list.
pub fn total_pages(total: i64, limit: i64) -> i64 {
    if total <= 0 || limit <= 0 {
        return 0;
    }
    (total + limit - 1) / limit
}
