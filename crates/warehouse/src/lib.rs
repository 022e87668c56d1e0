//! Query templates and a REST client for the analytical warehouse holding the
//! PyPI download log.
//!
//! All aggregation happens warehouse-side. This crate only knows how to build
//! the fixed set of parameterized queries, submit them, page through the
//! results and hand back typed rows.

mod client;
mod error;
mod query;
mod row;

pub use client::{ExecuteQuery, WarehouseClient, WarehouseConfig};
pub use error::Error;
pub use query::{PackageName, QueryRequest, QueryWindow, BREAKDOWN_LIMIT, RANKING_LIMIT};
pub use row::Row;
