//! Tabular reporting helpers for the marketplace `gds` endpoints.
//!
//! Pure code, no I/O: [`QueryBuilder`] produces the SQL-like `tq` filter,
//! [`normalize`] flattens the returned column/row table into records.

pub mod fields;
pub mod query;
pub mod table;

pub use fields::{FINANCE_REPORT_FIELDS, TIME_REPORT_FIELDS, without};
pub use query::{QueryBuilder, QueryError};
pub use table::{Record, normalize, normalize_str};
