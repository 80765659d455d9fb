//! Pagination Parameters
//!
//! Clients page results with the `perPage` and `page` query values. The
//! two travel together: both absent means no pagination, exactly one
//! present is an error, and both must be positive integers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::RequestResult;

/// Pagination failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaginationError {
    /// Exactly one of the two parameters was supplied
    #[error(
        "Both 'perPage' and 'page' are required for pagination; got perPage='{per_page}', page='{page}'"
    )]
    Incomplete { per_page: String, page: String },

    /// A parameter was not a positive integer
    #[error("Pagination parameter '{parameter}' must be a positive integer; got '{value}'")]
    NotPositive { parameter: String, value: String },

    /// The requested page starts past the end of the data
    #[error(
        "Requested page {page} with {per_page} rows per page, but there are only {num_results} rows"
    )]
    PageBeyondResults {
        page: u64,
        per_page: u64,
        num_results: usize,
    },
}

/// Requested page coordinates; both components are at least 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationParameters {
    per_page: u64,
    page: u64,
}

impl PaginationParameters {
    /// Build validated page coordinates
    pub fn new(per_page: u64, page: u64) -> Result<Self, PaginationError> {
        if per_page == 0 {
            return Err(PaginationError::NotPositive {
                parameter: "perPage".to_string(),
                value: per_page.to_string(),
            });
        }
        if page == 0 {
            return Err(PaginationError::NotPositive {
                parameter: "page".to_string(),
                value: page.to_string(),
            });
        }
        Ok(Self { per_page, page })
    }

    /// Build coordinates without validation, clamping zeroes up to 1
    ///
    /// For process-default paging, where a configured page size must not
    /// fail the request.
    pub fn clamped(per_page: u64, page: u64) -> Self {
        Self {
            per_page: per_page.max(1),
            page: page.max(1),
        }
    }

    /// Rows per page
    pub fn per_page(&self) -> u64 {
        self.per_page
    }

    /// One-based page number
    pub fn page(&self) -> u64 {
        self.page
    }
}

impl std::fmt::Display for PaginationParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "page {} ({} per page)", self.page, self.per_page)
    }
}

/// Parse the raw `perPage`/`page` pair
///
/// Both empty means the client did not ask for pagination.
pub fn generate_pagination_parameters(
    per_page: &str,
    page: &str,
) -> RequestResult<Option<PaginationParameters>> {
    let per_page = per_page.trim();
    let page = page.trim();

    match (per_page.is_empty(), page.is_empty()) {
        (true, true) => Ok(None),
        (false, false) => {
            let per_page = parse_positive(per_page, "perPage")?;
            let page = parse_positive(page, "page")?;
            Ok(Some(PaginationParameters::new(per_page, page)?))
        }
        _ => {
            tracing::debug!(
                "Incomplete pagination: perPage='{}', page='{}'",
                per_page,
                page
            );
            Err(PaginationError::Incomplete {
                per_page: per_page.to_string(),
                page: page.to_string(),
            }
            .into())
        }
    }
}

fn parse_positive(value: &str, parameter: &str) -> Result<u64, PaginationError> {
    value
        .parse::<u64>()
        .ok()
        .filter(|parsed| *parsed > 0)
        .ok_or_else(|| PaginationError::NotPositive {
            parameter: parameter.to_string(),
            value: value.to_string(),
        })
}

/// Page descriptor for a materialized result set
///
/// Carries everything a transport layer needs to build pagination links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    page: u64,
    per_page: u64,
    num_results: usize,
}

impl Pagination {
    pub fn new(parameters: &PaginationParameters, num_results: usize) -> Self {
        Self {
            page: parameters.page(),
            per_page: parameters.per_page(),
            num_results,
        }
    }

    /// One-based page number
    pub fn page(&self) -> u64 {
        self.page
    }

    /// Rows per page
    pub fn per_page(&self) -> u64 {
        self.per_page
    }

    /// Total rows across all pages
    pub fn num_results(&self) -> usize {
        self.num_results
    }

    /// Last page number; an empty result set still has one empty page
    pub fn last_page(&self) -> u64 {
        (self.num_results as u64).div_ceil(self.per_page).max(1)
    }

    /// The following page, if any
    pub fn next_page(&self) -> Option<u64> {
        (self.page < self.last_page()).then(|| self.page + 1)
    }

    /// The preceding page, if any
    pub fn previous_page(&self) -> Option<u64> {
        (self.page > 1).then(|| self.page - 1)
    }
}

/// In-memory paginator over a fully materialized collection
#[derive(Debug, Clone, PartialEq)]
pub struct AllPagesPagination<T> {
    page_of_data: Vec<T>,
    pagination: Pagination,
}

impl<T> AllPagesPagination<T> {
    /// Slice one page out of the collection
    ///
    /// A page past the end of the data is an error, except page 1 of an
    /// empty collection.
    pub fn new(data: Vec<T>, parameters: &PaginationParameters) -> Result<Self, PaginationError> {
        let num_results = data.len();
        let pagination = Pagination::new(parameters, num_results);
        if parameters.page() > pagination.last_page() {
            return Err(PaginationError::PageBeyondResults {
                page: parameters.page(),
                per_page: parameters.per_page(),
                num_results,
            });
        }

        let start = ((parameters.page() - 1) * parameters.per_page()) as usize;
        let page_of_data = data
            .into_iter()
            .skip(start)
            .take(parameters.per_page() as usize)
            .collect();

        Ok(Self {
            page_of_data,
            pagination,
        })
    }

    /// Rows on this page
    pub fn page_of_data(&self) -> &[T] {
        &self.page_of_data
    }

    /// Consume the paginator, keeping only this page's rows
    pub fn into_page(self) -> Vec<T> {
        self.page_of_data
    }

    /// The page descriptor
    pub fn pagination(&self) -> Pagination {
        self.pagination
    }
}
