//! Request Parsing and Compilation
//!
//! Turns the raw query values of an analytics API request into one typed,
//! validated, immutable `DataRequest`:
//!
//! - **types**: Response format and async-after policy values
//! - **pagination**: `perPage`/`page` coordinates and result paging
//! - **filter**: Row-filter expression grammar and binding
//! - **having**: Aggregate-constraint expression grammar and binding
//! - **sort**: Sort column parsing, including the leading `dateTime` sort
//! - **validate**: Batched dimension/metric resolution and table checks
//! - **compiler**: The fixed-order request assembler
//!
//! # Query Grammar
//!
//! ```text
//! metrics:   height,width
//! dateTime:  2020-01-01/2020-02-01 | P30D/current | current/next
//! filters:   age.id-in[2,3],gender-notin[u]
//! having:    height-gt[10],width-lte[5,9]
//! sort:      dateTime|asc,height|desc,width
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use portcullis::request::{RawDataRequest, RequestCompiler};
//!
//! let compiler = RequestCompiler::new(dimensions, metrics, config);
//! let raw = RawDataRequest::new("day")
//!     .with_dimensions(&["age"])
//!     .with_metrics("height")
//!     .with_date_time("P30D/current");
//! let request = compiler.compile(&raw, &table, Utc::now())?;
//! ```

mod compiler;
mod filter;
mod having;
mod pagination;
mod sort;
mod split;
mod types;
mod validate;

pub use compiler::{
    generate_time_zone, validate_time_alignment, DataRequest, RawDataRequest, RequestCompiler,
};
pub use filter::{generate_filters, ApiFilter, ApiFilterMap, FilterError, FilterOperation};
pub use having::{generate_havings, ApiHaving, ApiHavingMap, HavingError, HavingOperation};
pub use pagination::{
    generate_pagination_parameters, AllPagesPagination, Pagination, PaginationError,
    PaginationParameters,
};
pub use sort::{generate_sorts, OrderByColumn, SortDirection, DATE_TIME_COLUMN};
pub use types::{AsyncAfter, ResponseFormat};
pub use validate::{
    generate_dimension_fields, generate_dimensions, generate_logical_metrics,
    generate_positive_integer, validate_metrics, validate_request_dimensions,
};
