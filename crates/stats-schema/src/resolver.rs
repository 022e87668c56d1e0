use std::sync::Arc;

use async_graphql::{Context, ErrorExtensions, Object};
use stats_warehouse::{Error, ExecuteQuery, PackageName, QueryRequest, QueryWindow, Row};

use crate::{mapper, model::Package, model::TopPackage};

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Download statistics for one package. The name is validated here; the
    /// statistics fields resolve lazily against the warehouse.
    async fn package(&self, name: String) -> async_graphql::Result<Option<Package>> {
        let name: PackageName = name.parse().map_err(field_error)?;

        Ok(Some(Package { name }))
    }

    /// The most downloaded packages over the rolling 31-day window,
    /// descending, at most 250 entries.
    async fn recent_top_packages(&self, ctx: &Context<'_>) -> async_graphql::Result<Option<Vec<TopPackage>>> {
        let rows = execute(ctx, &QueryRequest::top_packages(QueryWindow::default())).await?;

        Ok(Some(mapper::top_packages(&rows).map_err(field_error)?))
    }
}

/// Runs one query through the executor held in the schema context. Each call
/// is one warehouse round trip; sibling fields do not share fetches.
pub(crate) async fn execute(ctx: &Context<'_>, request: &QueryRequest) -> async_graphql::Result<Vec<Row>> {
    let executor = ctx.data::<Arc<dyn ExecuteQuery>>()?;

    executor.execute(request).await.map_err(field_error)
}

/// Translates a warehouse error into a field-level GraphQL error carrying a
/// machine-readable `code` extension. The error stays scoped to the field;
/// sibling resolution continues.
pub(crate) fn field_error(error: Error) -> async_graphql::Error {
    let code = match &error {
        Error::InvalidPackageName(_) => "INVALID_PACKAGE_NAME",
        Error::Query { .. } => "WAREHOUSE_QUERY_FAILED",
        Error::Http(_) => "WAREHOUSE_UNAVAILABLE",
        Error::MalformedResponse(_) => "WAREHOUSE_RESPONSE_INVALID",
    };

    tracing::error!(code, error = %error, retryable = error.is_retryable(), "field resolution failed");

    async_graphql::Error::new(error.to_string()).extend_with(|_, extensions| extensions.set("code", code))
}
