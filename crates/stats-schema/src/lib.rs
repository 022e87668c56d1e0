//! The GraphQL schema serving PyPI download statistics.
//!
//! Each field maps statically onto one query template: resolving the field
//! builds the query, runs it through the configured [`ExecuteQuery`]
//! implementation and shapes the rows into the response type. Sibling fields
//! never share a round trip; a field that is not requested issues no query.

mod mapper;
mod model;
mod resolver;

use std::sync::Arc;

use async_graphql::{EmptyMutation, EmptySubscription, Schema};
use stats_warehouse::ExecuteQuery;

pub use model::{Package, RegionCount, TopPackage, VersionCount};
pub use resolver::QueryRoot;

pub type StatsSchema = Schema<QueryRoot, EmptyMutation, EmptySubscription>;

pub fn build_schema(executor: Arc<dyn ExecuteQuery>) -> StatsSchema {
    Schema::build(QueryRoot, EmptyMutation, EmptySubscription)
        .data(executor)
        .finish()
}
