use reqwest::blocking::Client;
use reqwest::StatusCode;
use std::time::Duration;
use url::Url;

use super::models::{
    PipelineRequest, PipelineResponse, Stmt, StmtResult, StreamRequest, StreamResponse,
    StreamResult, WireValue,
};
use super::remote_error::RemoteError;
use crate::config::Secret;
use crate::domain::Value;

const PIPELINE_PATH: &str = "v2/pipeline";

/// Rows and counters returned by one statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub affected_row_count: u64,
    pub last_insert_rowid: Option<i64>,
}

impl QueryResult {
    fn from_stmt_result(result: StmtResult) -> Result<Self, RemoteError> {
        let rows = result
            .rows
            .into_iter()
            .map(|row| row.into_iter().map(Value::try_from).collect())
            .collect::<Result<Vec<Vec<Value>>, RemoteError>>()?;

        let last_insert_rowid = result
            .last_insert_rowid
            .map(|id| {
                id.parse::<i64>()
                    .map_err(|e| RemoteError::Decode(format!("last_insert_rowid {id:?}: {e}")))
            })
            .transpose()?;

        Ok(QueryResult {
            columns: result
                .cols
                .into_iter()
                .map(|c| c.name.unwrap_or_default())
                .collect(),
            rows,
            affected_row_count: result.affected_row_count,
            last_insert_rowid,
        })
    }

    /// First column of the first row, as an integer.
    pub fn scalar_integer(&self) -> Option<i64> {
        self.rows.first()?.first()?.as_integer()
    }
}

/// Blocking client for a remote libSQL database, speaking the Hrana
/// pipeline protocol over HTTP. All statements share one server-side
/// stream, tied together by the baton.
pub struct RemoteDatabase {
    client: Client,
    /// Endpoint derived from the configured URL.
    origin_url: Url,
    /// Where the next request goes; the server may move us with `base_url`.
    pipeline_url: Url,
    auth_token: Secret,
    baton: Option<String>,
    closed: bool,
}

impl RemoteDatabase {
    /// Builds the client and runs a `SELECT 1` so bad credentials or an
    /// unreachable host show up before any real work.
    pub fn connect(url: &str, auth_token: Secret, timeout: Duration) -> Result<Self, RemoteError> {
        let pipeline_url = pipeline_url(url)?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        let mut db = Self {
            client,
            origin_url: pipeline_url.clone(),
            pipeline_url,
            auth_token,
            baton: None,
            closed: false,
        };

        db.execute("SELECT 1", &[])?;
        tracing::debug!(url = %db.pipeline_url, "Connected to remote database");
        Ok(db)
    }

    pub fn execute(&mut self, sql: &str, args: &[Value]) -> Result<QueryResult, RemoteError> {
        let request = StreamRequest::Execute {
            stmt: Stmt {
                sql: sql.to_string(),
                args: args.iter().map(WireValue::from).collect(),
                want_rows: true,
            },
        };

        let result = self
            .send(vec![request])?
            .into_iter()
            .next()
            .ok_or_else(|| RemoteError::UnexpectedShape("empty results".into()))?;

        match result {
            StreamResult::Ok {
                response: StreamResponse::Execute { result },
            } => QueryResult::from_stmt_result(result),
            StreamResult::Ok { response } => Err(RemoteError::UnexpectedShape(format!(
                "expected execute response, got {response:?}"
            ))),
            StreamResult::Error { error } => Err(RemoteError::Statement {
                message: error.message,
                code: error.code,
            }),
        }
    }

    /// Ends the server-side stream. Safe to call more than once.
    pub fn close(&mut self) -> Result<(), RemoteError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        // No baton means the server never kept a stream open for us.
        if self.baton.is_none() {
            return Ok(());
        }

        let results = self.send(vec![StreamRequest::Close])?;
        self.baton = None;

        match results.into_iter().next() {
            Some(StreamResult::Error { error }) => Err(RemoteError::Statement {
                message: error.message,
                code: error.code,
            }),
            _ => Ok(()),
        }
    }

    fn send(&mut self, requests: Vec<StreamRequest>) -> Result<Vec<StreamResult>, RemoteError> {
        let result = self.post(requests);
        if result.is_err() && self.baton.is_some() {
            // A stream whose request failed cannot be resumed. Start over on
            // the next statement.
            tracing::debug!("Dropping remote stream after a failed request");
            self.baton = None;
            self.pipeline_url = self.origin_url.clone();
        }
        result
    }

    fn post(&mut self, requests: Vec<StreamRequest>) -> Result<Vec<StreamResult>, RemoteError> {
        let body = PipelineRequest {
            baton: self.baton.as_deref(),
            requests,
        };

        let resp = self
            .client
            .post(self.pipeline_url.clone())
            .bearer_auth(self.auth_token.expose())
            .json(&body)
            .send()?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let text = resp.text().unwrap_or_else(|_| "(no body)".to_string());
            return Err(RemoteError::Unauthorized(format!("{status} - {text}")));
        }
        if !status.is_success() {
            let text = resp.text().unwrap_or_else(|_| "(no body)".to_string());
            return Err(RemoteError::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: PipelineResponse = resp.json()?;

        self.baton = parsed.baton;
        if let Some(base_url) = parsed.base_url {
            self.pipeline_url = pipeline_url(&base_url)?;
        }

        Ok(parsed.results)
    }
}

impl Drop for RemoteDatabase {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::debug!("Closing remote stream on drop failed: {e}");
        }
    }
}

/// Turns a database URL into the HTTP endpoint of its pipeline API.
/// `libsql://` means TLS, so it maps to `https://`.
pub fn pipeline_url(url: &str) -> Result<Url, RemoteError> {
    let parsed =
        Url::parse(url).map_err(|e| RemoteError::Network(format!("Invalid URL {url:?}: {e}")))?;

    let scheme = match parsed.scheme() {
        "libsql" | "https" | "wss" => "https",
        "http" | "ws" => "http",
        other => {
            return Err(RemoteError::Network(format!(
                "Unsupported URL scheme {other:?}"
            )))
        }
    };

    let host = parsed
        .host_str()
        .ok_or_else(|| RemoteError::Network(format!("URL has no host: {url:?}")))?;
    let port = parsed.port().map(|p| format!(":{p}")).unwrap_or_default();
    let path = parsed.path().trim_end_matches('/');
    let path = path.strip_suffix("/v2/pipeline").unwrap_or(path);

    let endpoint = format!("{scheme}://{host}{port}{path}/{PIPELINE_PATH}");
    Url::parse(&endpoint).map_err(|e| RemoteError::Network(format!("Invalid URL {url:?}: {e}")))
}
