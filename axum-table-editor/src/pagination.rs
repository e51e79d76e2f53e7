//! Page bounds for interactive browsing and the export cap

use crate::database::traits::DatabaseError;
use crate::schema::{PageResult, RecordRow};

/// Rows per page when the client does not ask for a limit
pub const DEFAULT_PAGE_SIZE: u64 = 30;

/// Maximum allowed limit to prevent excessive memory usage
pub const MAX_PAGE_SIZE: u64 = 500;

/// A validated `LIMIT` / `OFFSET` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    limit: u64,
    offset: u64,
}

impl PageRequest {
    /// Validate raw bounds
    ///
    /// Limits above [`MAX_PAGE_SIZE`] are clamped.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` for a non-positive limit or a negative offset.
    pub fn new(limit: i64, offset: i64) -> Result<Self, DatabaseError> {
        if limit <= 0 {
            return Err(DatabaseError::InvalidRequest(format!(
                "limit must be positive, got {}",
                limit
            )));
        }
        if offset < 0 {
            return Err(DatabaseError::InvalidRequest(format!(
                "offset must not be negative, got {}",
                offset
            )));
        }

        Ok(Self {
            limit: (limit as u64).min(MAX_PAGE_SIZE),
            offset: offset as u64,
        })
    }

    /// Bounds from optional query parameters, defaulting to the first page
    ///
    /// The start is given either as a row `offset` or as a zero-based `page`
    /// index of `limit` rows, never both.
    pub fn from_query(
        limit: Option<i64>,
        offset: Option<i64>,
        page: Option<i64>,
    ) -> Result<Self, DatabaseError> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE as i64);
        match (page, offset) {
            (Some(_), Some(_)) => Err(DatabaseError::InvalidRequest(
                "use either page or offset, not both".to_string(),
            )),
            (Some(index), None) => {
                let index = u64::try_from(index).map_err(|_| {
                    DatabaseError::InvalidRequest(format!("page must not be negative, got {}", index))
                })?;
                let page_size = Self::new(limit, 0)?.limit();
                Self::from_page_index(index, page_size)
            }
            (None, offset) => Self::new(limit, offset.unwrap_or(0)),
        }
    }

    /// Bounds of the zero-based page `index`
    pub fn from_page_index(index: u64, page_size: u64) -> Result<Self, DatabaseError> {
        let out_of_range = || DatabaseError::InvalidRequest(format!("page {} is out of range", index));
        let offset = index
            .checked_mul(page_size)
            .and_then(|offset| i64::try_from(offset).ok())
            .ok_or_else(out_of_range)?;
        let page_size = i64::try_from(page_size).map_err(|_| out_of_range())?;
        Self::new(page_size, offset)
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Zero-based index of the page this request starts on
    pub fn page_index(&self) -> u64 {
        self.offset / self.limit
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

/// Number of pages needed to show `total` rows
pub fn total_pages(total: u64, page_size: u64) -> u64 {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size)
}

impl PageResult {
    /// Assemble a page from its rows and the filtered total
    ///
    /// An offset past the end yields an empty page with the real total.
    pub fn new(rows: Vec<RecordRow>, total: u64, page: &PageRequest) -> Self {
        let has_more = page.offset() + (rows.len() as u64) < total;
        Self {
            rows,
            total,
            limit: page.limit(),
            offset: page.offset(),
            page: page.page_index(),
            total_pages: total_pages(total, page.limit()),
            has_more,
        }
    }
}

/// Cap on the number of rows a single export may return
///
/// Exports beyond the cap fail instead of being truncated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportPolicy {
    max_rows: Option<u64>,
}

impl ExportPolicy {
    pub fn new(max_rows: Option<u64>) -> Self {
        Self { max_rows }
    }

    pub fn unlimited() -> Self {
        Self { max_rows: None }
    }

    pub fn max_rows(&self) -> Option<u64> {
        self.max_rows
    }

    /// Rows to fetch: one past the cap, so that overflow is detectable
    pub fn fetch_limit(&self) -> Option<u64> {
        self.max_rows.map(|max_rows| max_rows.saturating_add(1))
    }

    /// Fail if `fetched` rows exceed the cap
    pub fn check(&self, fetched: usize) -> Result<(), DatabaseError> {
        match self.max_rows {
            Some(max_rows) if fetched as u64 > max_rows => {
                Err(DatabaseError::ExportTooLarge(max_rows))
            }
            _ => Ok(()),
        }
    }
}
