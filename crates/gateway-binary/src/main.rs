use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use pypi_stats_gateway::{args::Args, server, telemetry};
use stats_warehouse::{WarehouseClient, WarehouseConfig};
use tokio::runtime;

const THREAD_NAME: &str = "pypi-stats-gateway";

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let runtime = runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name(THREAD_NAME)
        .build()?;

    runtime.block_on(async move {
        telemetry::init(&args);

        tracing::info!("PyPI stats gateway {}", clap::crate_version!());

        let mut config = WarehouseConfig::new(args.project.clone());
        config.access_token = args.access_token.clone();

        let client = WarehouseClient::new(config).context("building the warehouse client")?;

        if args.debug {
            client
                .check_connectivity()
                .await
                .context("warehouse connectivity probe")?;
            tracing::debug!("warehouse connectivity probe passed");
        }

        let schema = stats_schema::build_schema(Arc::new(client));

        server::serve(args.listen_address, schema, args.basic_auth.clone()).await
    })
}
