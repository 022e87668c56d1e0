use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    query::{ParameterValue, QueryParameter},
    Error, PackageName, QueryRequest, Row,
};

/// Rows fetched per page. The warehouse caps response sizes anyway; a fixed
/// page keeps memory bounded while the executor flattens all pages.
const PAGE_SIZE: usize = 100;
/// Smaller page used by the startup connectivity probe.
const DIAGNOSTIC_PAGE_SIZE: usize = 10;

/// How long the warehouse may hold a submission open before answering with an
/// incomplete job that we poll instead.
const JOB_WAIT_MS: u64 = 10_000;
/// Hard deadline on every individual HTTP round trip. Expiry surfaces as a
/// retryable [`Error::Http`].
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const DEFAULT_BASE_URL: &str = "https://bigquery.googleapis.com/bigquery/v2";

/// Submitting a query and collecting every row it produced.
///
/// The only non-test implementation is [`WarehouseClient`]; resolvers take the
/// trait so tests can substitute canned rows.
#[async_trait::async_trait]
pub trait ExecuteQuery: Send + Sync {
    async fn execute(&self, request: &QueryRequest) -> Result<Vec<Row>, Error>;
}

#[derive(Clone, Debug)]
pub struct WarehouseConfig {
    /// Billing project the queries run under. Required.
    pub project: String,
    /// Bearer token attached to every request, when the deployment does not
    /// rely on ambient credentials.
    pub access_token: Option<String>,
    pub base_url: Url,
}

impl WarehouseConfig {
    pub fn new(project: impl Into<String>) -> Self {
        WarehouseConfig {
            project: project.into(),
            access_token: None,
            // Statically known to parse.
            base_url: Url::parse(DEFAULT_BASE_URL).unwrap(),
        }
    }
}

/// REST client for the warehouse: submit, wait for the job, then follow page
/// tokens until the result set is exhausted.
pub struct WarehouseClient {
    http: reqwest::Client,
    config: WarehouseConfig,
}

impl WarehouseClient {
    pub fn new(config: WarehouseConfig) -> Result<Self, Error> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(WarehouseClient { http, config })
    }

    /// Startup probe: runs a trivial query with a small page size so a
    /// misconfigured project or credential fails fast instead of on the first
    /// real request.
    pub async fn check_connectivity(&self) -> Result<(), Error> {
        let package: PackageName = "pip".parse()?;
        let request = QueryRequest::total_downloads(&package);

        self.run(&request, DIAGNOSTIC_PAGE_SIZE).await.map(|_| ())
    }

    async fn run(&self, request: &QueryRequest, page_size: usize) -> Result<Vec<Row>, Error> {
        let mut response = self.submit(request, page_size).await?;
        let mut rows = Vec::new();

        loop {
            if !response.job_complete {
                let job_id = response.require_job_id()?.to_owned();
                tracing::debug!(%job_id, "query still running, polling");
                response = self.fetch_page(&job_id, page_size, None).await?;
                continue;
            }

            rows.extend(response.rows.drain(..).map(|row| Row::new(row.f.into_iter().map(|cell| cell.v).collect())));

            match response.page_token.take() {
                Some(token) => {
                    let job_id = response.require_job_id()?.to_owned();
                    response = self.fetch_page(&job_id, page_size, Some(token)).await?;
                }
                None => break,
            }
        }

        tracing::debug!(row_count = rows.len(), "query complete");

        Ok(rows)
    }

    async fn submit(&self, request: &QueryRequest, page_size: usize) -> Result<QueryResponseBody, Error> {
        let url = self.endpoint("queries")?;
        let body = SubmitBody {
            query: request.sql(),
            use_legacy_sql: false,
            parameter_mode: "NAMED",
            query_parameters: request.parameters().iter().map(WireParameter::from).collect(),
            max_results: page_size,
            timeout_ms: JOB_WAIT_MS,
        };

        tracing::debug!(project = %self.config.project, "submitting warehouse query");

        let response = self.authenticated(self.http.post(url)).json(&body).send().await?;

        deserialize_response(response).await
    }

    async fn fetch_page(
        &self,
        job_id: &str,
        page_size: usize,
        page_token: Option<String>,
    ) -> Result<QueryResponseBody, Error> {
        let url = self.endpoint(&format!("queries/{job_id}"))?;
        let mut builder = self
            .authenticated(self.http.get(url))
            .query(&[("maxResults", page_size.to_string()), ("timeoutMs", JOB_WAIT_MS.to_string())]);

        if let Some(token) = page_token {
            builder = builder.query(&[("pageToken", token)]);
        }

        deserialize_response(builder.send().await?).await
    }

    fn endpoint(&self, path: &str) -> Result<Url, Error> {
        let path = format!(
            "{}/projects/{}/{path}",
            self.config.base_url.path().trim_end_matches('/'),
            self.config.project
        );

        self.config
            .base_url
            .join(&path)
            .map_err(|err| Error::MalformedResponse(format!("invalid endpoint url: {err}")))
    }

    fn authenticated(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.access_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

#[async_trait::async_trait]
impl ExecuteQuery for WarehouseClient {
    async fn execute(&self, request: &QueryRequest) -> Result<Vec<Row>, Error> {
        self.run(request, PAGE_SIZE).await
    }
}

async fn deserialize_response(response: reqwest::Response) -> Result<QueryResponseBody, Error> {
    let status = response.status();

    if status.is_success() {
        return response
            .json::<QueryResponseBody>()
            .await
            .map_err(|err| Error::MalformedResponse(err.to_string()));
    }

    // The warehouse reports query problems as a structured error payload.
    match response.json::<ApiErrorBody>().await {
        Ok(body) => {
            let reason = body
                .error
                .errors
                .into_iter()
                .flatten()
                .next()
                .map(|detail| detail.reason)
                .unwrap_or_else(|| status.as_u16().to_string());

            Err(Error::Query {
                reason,
                message: body.error.message,
            })
        }
        Err(_) => Err(Error::Query {
            reason: status.as_u16().to_string(),
            message: format!("warehouse answered {status} without a readable error payload"),
        }),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitBody<'a> {
    query: &'a str,
    use_legacy_sql: bool,
    parameter_mode: &'static str,
    query_parameters: Vec<WireParameter>,
    max_results: usize,
    timeout_ms: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireParameter {
    name: &'static str,
    parameter_type: WireParameterType,
    parameter_value: WireParameterValue,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireParameterType {
    r#type: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireParameterValue {
    value: String,
}

impl From<&QueryParameter> for WireParameter {
    fn from(parameter: &QueryParameter) -> Self {
        let (ty, value) = match &parameter.value {
            ParameterValue::String(value) => ("STRING", value.clone()),
            ParameterValue::Int64(value) => ("INT64", value.to_string()),
        };

        WireParameter {
            name: parameter.name,
            parameter_type: WireParameterType { r#type: ty },
            parameter_value: WireParameterValue { value },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponseBody {
    #[serde(default)]
    job_complete: bool,
    job_reference: Option<JobReference>,
    #[serde(default)]
    rows: Vec<TableRow>,
    page_token: Option<String>,
}

impl QueryResponseBody {
    fn require_job_id(&self) -> Result<&str, Error> {
        self.job_reference
            .as_ref()
            .map(|reference| reference.job_id.as_str())
            .ok_or_else(|| Error::MalformedResponse("response carries more pages but no job reference".to_owned()))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    job_id: String,
}

#[derive(Debug, Deserialize)]
struct TableRow {
    #[serde(default)]
    f: Vec<TableCell>,
}

#[derive(Debug, Deserialize)]
struct TableCell {
    #[serde(default)]
    v: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
    errors: Option<Vec<ApiErrorDetail>>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    reason: String,
}
