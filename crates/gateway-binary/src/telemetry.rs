use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter};

use crate::args::Args;

/// Installs the global tracing subscriber. An explicit `--log` filter wins;
/// `--debug` raises the gateway crates to debug; otherwise the environment
/// decides with an `info` default.
pub fn init(args: &Args) {
    let filter = {
        let builder = EnvFilter::builder();

        match args.log_filter.as_deref() {
            Some(directives) => builder.parse_lossy(directives),
            None if args.debug => {
                builder.parse_lossy("pypi_stats_gateway=debug,stats_schema=debug,stats_warehouse=debug,info")
            }
            None => builder
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        }
    };

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();
}
