use std::{net::SocketAddr, str};

use clap::Parser;

/// GraphQL gateway serving aggregate PyPI download statistics.
#[derive(Debug, Parser)]
#[command(name = "pypi-stats-gateway", version)]
pub struct Args {
    /// IP address and port on which the server listens for incoming
    /// connections.
    #[arg(short, long, env = "PYPI_STATS_LISTEN_ADDRESS", default_value = "127.0.0.1:8000")]
    pub listen_address: SocketAddr,
    /// Billing project for the analytical warehouse. The gateway refuses to
    /// start without one.
    #[arg(long, env = "GOOGLE_CLOUD_PROJECT")]
    pub project: String,
    /// Bearer token for the warehouse API, for deployments without ambient
    /// credentials.
    #[arg(long, env = "BIGQUERY_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,
    /// `user:password` pair protecting the GraphQL endpoint. Unset means the
    /// endpoint is open.
    #[arg(long, env = "PYPI_STATS_BASIC_AUTH", hide_env_values = true)]
    pub basic_auth: Option<BasicAuth>,
    /// Verbose logging plus a warehouse connectivity probe at startup.
    #[arg(long, env = "PYPI_STATS_DEBUG")]
    pub debug: bool,
    /// Log filter directives, e.g. `pypi_stats_gateway=debug`.
    #[arg(long = "log", env = "PYPI_STATS_LOG")]
    pub log_filter: Option<String>,
}

/// Inbound basic-auth credentials, always taken from configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BasicAuth {
    pub user: String,
    pub password: String,
}

impl str::FromStr for BasicAuth {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((user, password)) if !user.is_empty() => Ok(BasicAuth {
                user: user.to_owned(),
                password: password.to_owned(),
            }),
            _ => Err("expected credentials in `user:password` form"),
        }
    }
}
