use std::{fmt, str};

use crate::Error;

/// Rows per breakdown query (Python version, country).
pub const BREAKDOWN_LIMIT: usize = 100;
/// Rows in the top-packages ranking.
pub const RANKING_LIMIT: usize = 250;

const DOWNLOADS_TABLE: &str = "`bigquery-public-data.pypi.file_downloads`";

/// A validated PyPI package name.
///
/// Names follow the PyPA rules: ASCII letters and digits, with single `-`,
/// `_` or `.` separators, and never longer than 214 characters. The name is
/// always bound as a named query parameter, never spliced into SQL text, so
/// validation is a second line of defense rather than the only one.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct PackageName(String);

const MAX_PACKAGE_NAME_LEN: usize = 214;

impl PackageName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl str::FromStr for PackageName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let valid = !s.is_empty()
            && s.len() <= MAX_PACKAGE_NAME_LEN
            && s.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && s.starts_with(|c: char| c.is_ascii_alphanumeric())
            && s.ends_with(|c: char| c.is_ascii_alphanumeric());

        if valid {
            Ok(PackageName(s.to_owned()))
        } else {
            Err(Error::InvalidPackageName(s.to_owned()))
        }
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rolling time window expressed as day offsets from now, `start_days_ago`
/// back to `end_days_ago`. The last day is excluded because the warehouse
/// ingests the download log with up to a day of delay.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueryWindow {
    pub start_days_ago: u32,
    pub end_days_ago: u32,
}

impl Default for QueryWindow {
    fn default() -> Self {
        QueryWindow {
            start_days_ago: 31,
            end_days_ago: 1,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum ParameterValue {
    String(String),
    Int64(i64),
}

/// A named query parameter, bound server-side by the warehouse.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryParameter {
    pub(crate) name: &'static str,
    pub(crate) value: ParameterValue,
}

impl QueryParameter {
    fn string(name: &'static str, value: &str) -> Self {
        QueryParameter {
            name,
            value: ParameterValue::String(value.to_owned()),
        }
    }

    fn int64(name: &'static str, value: i64) -> Self {
        QueryParameter {
            name,
            value: ParameterValue::Int64(value),
        }
    }
}

/// A complete query ready for submission: SQL text plus named parameter
/// bindings. Construction is pure; the same template and parameters always
/// produce the same request.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryRequest {
    sql: String,
    parameters: Vec<QueryParameter>,
}

impl QueryRequest {
    /// All-time download count for one package. Single row, single column.
    pub fn total_downloads(package: &PackageName) -> Self {
        QueryRequest {
            sql: format!(
                "SELECT COUNT(*) AS downloads\n\
                 FROM {DOWNLOADS_TABLE}\n\
                 WHERE file.project = @package"
            ),
            parameters: vec![QueryParameter::string("package", package.as_str())],
        }
    }

    /// Download count for one package over the window. Single row, single column.
    pub fn recent_downloads(package: &PackageName, window: QueryWindow) -> Self {
        QueryRequest {
            sql: format!(
                "SELECT COUNT(*) AS downloads\n\
                 FROM {DOWNLOADS_TABLE}\n\
                 WHERE file.project = @package\n\
                 {}",
                window_clause()
            ),
            parameters: package_window_parameters(package, window),
        }
    }

    /// Fraction of downloads over the window made by a Python 3 installer.
    /// Single row, single column; NULL when the package saw no downloads.
    pub fn python_three_share(package: &PackageName, window: QueryWindow) -> Self {
        QueryRequest {
            sql: format!(
                "SELECT SAFE_DIVIDE(COUNTIF(REGEXP_CONTAINS(details.python, r\"^3\\.\")), COUNT(*)) AS python_three_share\n\
                 FROM {DOWNLOADS_TABLE}\n\
                 WHERE file.project = @package\n\
                 {}",
                window_clause()
            ),
            parameters: package_window_parameters(package, window),
        }
    }

    /// Downloads over the window grouped by Python minor version, descending,
    /// truncated to [`BREAKDOWN_LIMIT`]. Two columns: version label, count.
    pub fn version_breakdown(package: &PackageName, window: QueryWindow) -> Self {
        QueryRequest {
            sql: format!(
                "SELECT REGEXP_EXTRACT(details.python, r\"^[0-9]+\\.[0-9]+\") AS python_version, COUNT(*) AS downloads\n\
                 FROM {DOWNLOADS_TABLE}\n\
                 WHERE file.project = @package\n\
                 {}\n\
                 AND details.python IS NOT NULL\n\
                 GROUP BY python_version\n\
                 ORDER BY downloads DESC\n\
                 LIMIT {BREAKDOWN_LIMIT}",
                window_clause()
            ),
            parameters: package_window_parameters(package, window),
        }
    }

    /// Downloads over the window grouped by country code, descending,
    /// truncated to [`BREAKDOWN_LIMIT`]. Two columns: country code, count.
    pub fn country_breakdown(package: &PackageName, window: QueryWindow) -> Self {
        QueryRequest {
            sql: format!(
                "SELECT country_code, COUNT(*) AS downloads\n\
                 FROM {DOWNLOADS_TABLE}\n\
                 WHERE file.project = @package\n\
                 {}\n\
                 AND country_code IS NOT NULL\n\
                 GROUP BY country_code\n\
                 ORDER BY downloads DESC\n\
                 LIMIT {BREAKDOWN_LIMIT}",
                window_clause()
            ),
            parameters: package_window_parameters(package, window),
        }
    }

    /// The most downloaded packages over the window, descending, truncated to
    /// [`RANKING_LIMIT`]. Two columns: package name, count.
    pub fn top_packages(window: QueryWindow) -> Self {
        QueryRequest {
            sql: format!(
                "SELECT file.project AS project, COUNT(*) AS downloads\n\
                 FROM {DOWNLOADS_TABLE}\n\
                 WHERE {}\n\
                 GROUP BY project\n\
                 ORDER BY downloads DESC\n\
                 LIMIT {RANKING_LIMIT}",
                window_clause().trim_start_matches("AND ")
            ),
            parameters: window_parameters(window),
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub(crate) fn parameters(&self) -> &[QueryParameter] {
        &self.parameters
    }
}

fn window_clause() -> &'static str {
    "AND timestamp >= TIMESTAMP_SUB(CURRENT_TIMESTAMP(), INTERVAL @start_days DAY)\n\
     AND timestamp < TIMESTAMP_SUB(CURRENT_TIMESTAMP(), INTERVAL @end_days DAY)"
}

fn window_parameters(window: QueryWindow) -> Vec<QueryParameter> {
    vec![
        QueryParameter::int64("start_days", i64::from(window.start_days_ago)),
        QueryParameter::int64("end_days", i64::from(window.end_days_ago)),
    ]
}

fn package_window_parameters(package: &PackageName, window: QueryWindow) -> Vec<QueryParameter> {
    let mut parameters = vec![QueryParameter::string("package", package.as_str())];
    parameters.extend(window_parameters(window));
    parameters
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_name_ok() {
        let cases = ["requests", "Flask", "zope.interface", "ruff-lsp", "a", "typing_extensions"];

        for case in cases {
            assert_eq!(case, case.parse::<PackageName>().unwrap().as_str());
        }
    }

    #[test]
    fn package_name_rejected() {
        let cases = [
            "",
            "-requests",
            "requests-",
            ".hidden",
            "name with spaces",
            "it's",
            "x\" OR 1=1 --",
            "pkg;DROP TABLE downloads",
            &"a".repeat(215),
        ];

        for case in cases {
            let err = case.parse::<PackageName>().unwrap_err();
            assert!(matches!(err, Error::InvalidPackageName(_)), "accepted {case:?}");
        }
    }

    #[test]
    fn builder_is_deterministic() {
        let package: PackageName = "requests".parse().unwrap();
        let a = QueryRequest::recent_downloads(&package, QueryWindow::default());
        let b = QueryRequest::recent_downloads(&package, QueryWindow::default());

        assert_eq!(a, b);
    }

    #[test]
    fn default_window_is_31_days_back_to_1() {
        let window = QueryWindow::default();

        assert_eq!(window.start_days_ago, 31);
        assert_eq!(window.end_days_ago, 1);
    }

    #[test]
    fn package_name_never_appears_in_sql_text() {
        // The name only travels as a bound parameter. Even a maximally benign
        // name must not show up in the SQL string itself.
        let package: PackageName = "requests".parse().unwrap();

        for request in [
            QueryRequest::total_downloads(&package),
            QueryRequest::recent_downloads(&package, QueryWindow::default()),
            QueryRequest::python_three_share(&package, QueryWindow::default()),
            QueryRequest::version_breakdown(&package, QueryWindow::default()),
            QueryRequest::country_breakdown(&package, QueryWindow::default()),
        ] {
            assert!(!request.sql().contains("requests"), "raw name in: {}", request.sql());
            assert!(request.sql().contains("@package"));
            assert!(request
                .parameters()
                .iter()
                .any(|p| p.name == "package" && p.value == ParameterValue::String("requests".into())));
        }
    }

    #[test]
    fn breakdown_queries_are_truncated_and_ordered() {
        let package: PackageName = "requests".parse().unwrap();

        for request in [
            QueryRequest::version_breakdown(&package, QueryWindow::default()),
            QueryRequest::country_breakdown(&package, QueryWindow::default()),
        ] {
            assert!(request.sql().contains("ORDER BY downloads DESC"));
            assert!(request.sql().ends_with(&format!("LIMIT {BREAKDOWN_LIMIT}")));
        }
    }

    #[test]
    fn ranking_query_has_no_package_parameter() {
        let request = QueryRequest::top_packages(QueryWindow::default());

        assert!(request.sql().ends_with(&format!("LIMIT {RANKING_LIMIT}")));
        assert!(!request.sql().contains("@package"));
        assert_eq!(request.parameters().len(), 2);
    }
}
