//! HTTP-backed persistence speaking the PostgREST dialect.
//!
//! Each table is exposed at `{base_url}/rest/v1/{table}`. Requests carry the
//! project `apikey` header and a bearer token (the signed-in user's access
//! token, or the api key when no session has been attached).
//!
//! ## Request shape
//!
//! | Operation | Request |
//! |-----------|---------|
//! | `create` | `POST /rest/v1/{table}` with one JSON object |
//! | `create_many` | `POST /rest/v1/{table}` with a JSON array (one statement, all-or-nothing) |
//! | `read` | `GET /rest/v1/{table}?select=*&{col}=eq.{value}&order={col}.{dir}` |
//! | `update` | `PATCH /rest/v1/{table}?id=eq.{id}` |
//! | `delete` | `DELETE /rest/v1/{table}?id=eq.{id}` |
//!
//! Writes send `Prefer: return=representation` so the stored rows come back.
//!
//! ## Error Mapping
//!
//! | Condition | StoreError |
//! |-----------|------------|
//! | Connect failure, timeout | `Unavailable` |
//! | HTTP 5xx | `Unavailable` |
//! | HTTP 4xx | `Rejected` (body included) |
//! | `update`/`delete` matched no row | `NotFound` |
//! | Body is not a JSON array of objects | `Decode` |

use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde_json::Value;

use fieldquote_core::store::ID_COLUMN;
use fieldquote_core::{Persistence, Query, Row, StoreError, Table};

use crate::config::StoreConfig;

const PREFER: &str = "Prefer";
const RETURN_REPRESENTATION: &str = "return=representation";

/// [`Persistence`] over a hosted PostgREST endpoint.
#[derive(Clone)]
pub struct RestPersistence {
    client: Client,
    base_url: String,
    api_key: String,
    token: Option<String>,
}

impl RestPersistence {
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StoreError::Unavailable(format!("http client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            token: None,
        })
    }

    /// Act on behalf of a signed-in user.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn table_url(&self, table: Table) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn request(&self, method: Method, table: Table) -> RequestBuilder {
        let bearer = self.token.as_deref().unwrap_or(&self.api_key);
        self.client
            .request(method, self.table_url(table))
            .header("apikey", &self.api_key)
            .bearer_auth(bearer)
    }

    async fn rows(&self, request: RequestBuilder) -> Result<Vec<Row>, StoreError> {
        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }
        let body: Value = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        rows_from_body(body)
    }
}

impl core::fmt::Debug for RestPersistence {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RestPersistence")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.token.is_some())
            .finish()
    }
}

#[async_trait::async_trait]
impl Persistence for RestPersistence {
    #[tracing::instrument(skip(self, record), err)]
    async fn create(&self, table: Table, record: Row) -> Result<Row, StoreError> {
        let request = self
            .request(Method::POST, table)
            .header(PREFER, RETURN_REPRESENTATION)
            .json(&record);
        self.rows(request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Decode(format!("insert into {table} returned no row")))
    }

    #[tracing::instrument(skip(self, records), fields(count = records.len()), err)]
    async fn create_many(&self, table: Table, records: Vec<Row>) -> Result<Vec<Row>, StoreError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let request = self
            .request(Method::POST, table)
            .header(PREFER, RETURN_REPRESENTATION)
            .json(&records);
        self.rows(request).await
    }

    #[tracing::instrument(skip(self, query), err)]
    async fn read(&self, table: Table, query: Query) -> Result<Vec<Row>, StoreError> {
        let request = self
            .request(Method::GET, table)
            .query(&query_params(&query));
        self.rows(request).await
    }

    #[tracing::instrument(skip(self, patch), err)]
    async fn update(&self, table: Table, id: i64, patch: Row) -> Result<Row, StoreError> {
        let request = self
            .request(Method::PATCH, table)
            .query(&[id_filter(id)])
            .header(PREFER, RETURN_REPRESENTATION)
            .json(&patch);
        self.rows(request)
            .await?
            .into_iter()
            .next()
            .ok_or(StoreError::NotFound { table, id })
    }

    #[tracing::instrument(skip(self), err)]
    async fn delete(&self, table: Table, id: i64) -> Result<(), StoreError> {
        let request = self
            .request(Method::DELETE, table)
            .query(&[id_filter(id)])
            .header(PREFER, RETURN_REPRESENTATION);
        if self.rows(request).await?.is_empty() {
            return Err(StoreError::NotFound { table, id });
        }
        Ok(())
    }
}

/// PostgREST query-string pairs for `query`.
pub(crate) fn query_params(query: &Query) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];
    for filter in query.filters() {
        let condition = match &filter.value {
            Value::Null => "is.null".to_string(),
            Value::String(s) => format!("eq.{s}"),
            other => format!("eq.{other}"),
        };
        params.push((filter.column.clone(), condition));
    }
    if let Some(order) = query.order() {
        params.push((
            "order".to_string(),
            format!("{}.{}", order.column, order.direction.as_str()),
        ));
    }
    params
}

fn id_filter(id: i64) -> (&'static str, String) {
    (ID_COLUMN, format!("eq.{id}"))
}

fn rows_from_body(body: Value) -> Result<Vec<Row>, StoreError> {
    match body {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(row) => Ok(row),
                other => Err(StoreError::Decode(format!("expected a row object, got {other}"))),
            })
            .collect(),
        Value::Object(row) => Ok(vec![row]),
        other => Err(StoreError::Decode(format!("expected a JSON array, got {other}"))),
    }
}

fn status_error(status: StatusCode, body: &str) -> StoreError {
    let detail = if body.trim().is_empty() {
        status.to_string()
    } else {
        format!("{status}: {}", body.trim())
    };
    if status.is_server_error() {
        StoreError::Unavailable(detail)
    } else {
        StoreError::Rejected(detail)
    }
}

fn map_transport_error(err: reqwest::Error) -> StoreError {
    tracing::warn!(error = %err, "store request failed");
    if err.is_decode() {
        StoreError::Decode(err.to_string())
    } else {
        StoreError::Unavailable(err.to_string())
    }
}
