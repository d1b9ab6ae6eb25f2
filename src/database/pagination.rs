use serde::Serialize;

use super::error::ApiError;
use crate::constants::MAX_PAGE_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub limit: i64,
}

impl Page {
    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Reads `page` and `limit` from the query string pairs.
    pub fn from_query(pairs: &[(String, String)], default_limit: i64) -> Result<Self, ApiError> {
        let mut page = 1;
        let mut limit = default_limit;

        for (key, value) in pairs {
            match key.as_str() {
                "page" => {
                    page = value
                        .parse()
                        .map_err(|_| ApiError::not_found("Invalid page"))?;
                }
                "limit" => {
                    limit = value
                        .parse()
                        .map_err(|_| ApiError::validation("Invalid limit"))?;
                }
                _ => {}
            }
        }

        if page < 1 {
            return Err(ApiError::not_found("Invalid page"));
        }

        let page = Self::new(page, limit);
        (page.page - 1)
            .checked_mul(page.limit)
            .and_then(|offset| offset.checked_add(page.limit))
            .ok_or_else(|| ApiError::not_found("Invalid page"))?;

        Ok(page)
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

#[derive(Serialize, Debug)]
pub struct Paginated<T> {
    pub count: i64,
    pub next: Option<i64>,
    pub previous: Option<i64>,
    pub results: Vec<T>,
}

impl<T> Paginated<T> {
    /// `total_rows` comes from the `COUNT(*) OVER()` column of the fetched rows.
    pub fn from_rows(rows: Vec<T>, total_rows: i64, page: Page) -> Result<Self, ApiError> {
        if rows.is_empty() && page.page > 1 {
            return Err(ApiError::not_found("Invalid page"));
        }

        let next = if page.offset().saturating_add(rows.len() as i64) < total_rows {
            Some(page.page + 1)
        } else {
            None
        };
        let previous = if page.page > 1 {
            Some(page.page - 1)
        } else {
            None
        };

        Ok(Self {
            count: total_rows,
            next,
            previous,
            results: rows,
        })
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}
