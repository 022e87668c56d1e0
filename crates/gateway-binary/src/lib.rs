//! HTTP surface of the PyPI statistics gateway: argument parsing, logging
//! setup and the axum router serving the GraphQL schema.

pub mod args;
pub mod server;
pub mod telemetry;
