use async_graphql::{Context, Object, SimpleObject};
use stats_warehouse::{PackageName, QueryRequest, QueryWindow};

use crate::{mapper, resolver};

/// Download statistics for one package. Every field other than `name` costs
/// one warehouse round trip, paid only when the field is requested.
///
/// Statistics fields are nullable so a warehouse failure stays scoped to the
/// field it hit: the error is reported against that field and its siblings
/// still resolve.
pub struct Package {
    pub(crate) name: PackageName,
}

#[Object]
impl Package {
    async fn name(&self) -> &str {
        self.name.as_str()
    }

    /// All-time download count.
    async fn total_downloads(&self, ctx: &Context<'_>) -> async_graphql::Result<Option<i64>> {
        let rows = resolver::execute(ctx, &QueryRequest::total_downloads(&self.name)).await?;

        Ok(Some(mapper::count_scalar(&rows).map_err(resolver::field_error)?))
    }

    /// Download count over the rolling 31-day window.
    async fn recent_downloads(&self, ctx: &Context<'_>) -> async_graphql::Result<Option<i64>> {
        let request = QueryRequest::recent_downloads(&self.name, QueryWindow::default());
        let rows = resolver::execute(ctx, &request).await?;

        Ok(Some(mapper::count_scalar(&rows).map_err(resolver::field_error)?))
    }

    /// Fraction of recent downloads made by a Python 3 installer, in [0, 1].
    async fn recent_python_three_share(&self, ctx: &Context<'_>) -> async_graphql::Result<Option<f64>> {
        let request = QueryRequest::python_three_share(&self.name, QueryWindow::default());
        let rows = resolver::execute(ctx, &request).await?;

        Ok(Some(mapper::fraction_scalar(&rows).map_err(resolver::field_error)?))
    }

    /// Recent downloads split by Python minor version, descending by volume.
    async fn recent_version_breakdown(&self, ctx: &Context<'_>) -> async_graphql::Result<Option<Vec<VersionCount>>> {
        let request = QueryRequest::version_breakdown(&self.name, QueryWindow::default());
        let rows = resolver::execute(ctx, &request).await?;

        Ok(Some(mapper::version_breakdown(&rows).map_err(resolver::field_error)?))
    }

    /// Recent downloads split by country, descending by volume.
    async fn recent_country_breakdown(&self, ctx: &Context<'_>) -> async_graphql::Result<Option<Vec<RegionCount>>> {
        let request = QueryRequest::country_breakdown(&self.name, QueryWindow::default());
        let rows = resolver::execute(ctx, &request).await?;

        Ok(Some(mapper::country_breakdown(&rows).map_err(resolver::field_error)?))
    }
}

/// One slice of a per-version breakdown. `share` is `downloads` over the sum
/// of the whole list.
#[derive(Debug, PartialEq, SimpleObject)]
pub struct VersionCount {
    pub version: String,
    pub downloads: i64,
    pub share: f64,
}

/// One slice of a per-country breakdown.
#[derive(Debug, PartialEq, SimpleObject)]
pub struct RegionCount {
    pub country_code: String,
    pub downloads: i64,
    pub share: f64,
}

/// One entry of the recent-downloads ranking.
#[derive(Debug, PartialEq, SimpleObject)]
pub struct TopPackage {
    pub name: String,
    pub recent_downloads: i64,
}
