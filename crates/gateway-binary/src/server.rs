use std::{net::SocketAddr, sync::Arc};

use async_graphql::http::GraphiQLSource;
use async_graphql_axum::{GraphQLBatchRequest, GraphQLRequest, GraphQLResponse};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::Engine as _;
use stats_schema::StatsSchema;

use crate::args::BasicAuth;

/// Binds the listener and serves until ctrl-c.
pub async fn serve(listen_address: SocketAddr, schema: StatsSchema, auth: Option<BasicAuth>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(listen_address).await?;

    tracing::info!("GraphQL endpoint ready at http://{listen_address}/");

    axum::serve(listener, router(schema, auth))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// `/` serves GraphiQL on GET and a single GraphQL request on POST; `/batch`
/// accepts coalesced submissions. `/health` stays outside the auth guard so
/// orchestrators can probe an authenticated deployment.
pub fn router(schema: StatsSchema, auth: Option<BasicAuth>) -> Router {
    let mut graphql = Router::new()
        .route("/", get(graphiql).post(graphql_handler))
        .route("/batch", post(graphql_batch_handler))
        .with_state(schema);

    if let Some(credentials) = auth {
        let expected = Arc::new(authorization_header(&credentials));
        graphql = graphql.layer(middleware::from_fn_with_state(expected, require_basic_auth));
    }

    graphql.route("/health", get(health))
}

async fn graphql_handler(State(schema): State<StatsSchema>, request: GraphQLRequest) -> GraphQLResponse {
    schema.execute(request.into_inner()).await.into()
}

async fn graphql_batch_handler(
    State(schema): State<StatsSchema>,
    request: GraphQLBatchRequest,
) -> GraphQLResponse {
    schema.execute_batch(request.into_inner()).await.into()
}

async fn graphiql() -> Html<String> {
    Html(GraphiQLSource::build().endpoint("/").finish())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}

/// The full `Authorization` header value the client must present.
fn authorization_header(credentials: &BasicAuth) -> String {
    let token = base64::engine::general_purpose::STANDARD
        .encode(format!("{}:{}", credentials.user, credentials.password));

    format!("Basic {token}")
}

async fn require_basic_auth(State(expected): State<Arc<String>>, request: Request, next: Next) -> Response {
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == expected.as_str());

    if authorized {
        next.run(request).await
    } else {
        let mut response = StatusCode::UNAUTHORIZED.into_response();
        response.headers_mut().insert(
            header::WWW_AUTHENTICATE,
            HeaderValue::from_static(r#"Basic realm="pypi-stats""#),
        );
        response
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutting down"),
        Err(error) => tracing::error!(%error, "failed to install the shutdown signal handler"),
    }
}
