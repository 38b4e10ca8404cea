//! PostgREST-style HTTP implementation of the [`RemoteStore`] port.
//!
//! Tables live under `/rest/v1/<table>` and are filtered with `eq.` query
//! parameters; procedures are `POST /rest/v1/rpc/<name>`. Every request
//! carries the project `apikey` and, when a subject is signed in, its access
//! token as bearer.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::{AdminUser, NewRow, RemoteStore, StoreError, Table, UserStats};

// Shared HTTP client with reasonable defaults for timeouts
static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .user_agent(concat!("readalong/", env!("CARGO_PKG_VERSION")))
        .timeout(std::time::Duration::from_secs(10))
        .build()
        .unwrap_or_else(|_| Client::new())
});

/// Postgres `unique_violation` SQLSTATE.
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Deserialize, Default)]
struct PostgrestError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RestStore {
    base_url: String,
    api_key: String,
    access_token: Option<String>,
}

impl RestStore {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            access_token: None,
        }
    }

    pub fn with_access_token(mut self, token: Option<String>) -> Self {
        self.access_token = token.filter(|t| !t.is_empty());
        self
    }

    fn table_url(&self, table: Table, filters: &[(&str, &str)]) -> String {
        let mut url = format!("{}/rest/v1/{}", self.base_url, table.name());
        let params: Vec<String> = filters
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect();
        if !params.is_empty() {
            url.push('?');
            url.push_str(&params.join("&"));
        }
        url
    }

    /// Oldest view first, matching the local store's insertion order.
    fn view_categories_url(&self, user_id: &str) -> String {
        let user_filter = format!("eq.{user_id}");
        self.table_url(
            Table::ArticleViews,
            &[
                ("select", "category"),
                ("user_id", user_filter.as_str()),
                ("order", "id.asc"),
            ],
        )
    }

    fn rpc_url(&self, name: &str) -> String {
        format!("{}/rest/v1/rpc/{}", self.base_url, name)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.api_key);
        req.header("apikey", &self.api_key).bearer_auth(bearer)
    }

    async fn send(&self, what: &str, req: RequestBuilder) -> Result<Response, StoreError> {
        let resp = self
            .authorize(req)
            .send()
            .await
            .map_err(|e| StoreError::Remote(format!("{what}: {e}")))?;
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        Err(map_failure(what, status, &body))
    }

    async fn json(&self, what: &str, req: RequestBuilder) -> Result<Value, StoreError> {
        self.send(what, req)
            .await?
            .json::<Value>()
            .await
            .map_err(|e| StoreError::Serialization(format!("{what}: {e}")))
    }
}

/// Turn a non-success response into a structured error.
fn map_failure(what: &str, status: StatusCode, body: &str) -> StoreError {
    let parsed: PostgrestError = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
        .message
        .or_else(|| Some(body.trim().to_string()).filter(|b| !b.is_empty()))
        .unwrap_or_else(|| status.to_string());
    if status == StatusCode::CONFLICT || parsed.code.as_deref() == Some(UNIQUE_VIOLATION) {
        return StoreError::Conflict(format!("{what}: {message}"));
    }
    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        return StoreError::Unauthorized(format!("{what}: {message}"));
    }
    StoreError::Remote(format!("{what}: HTTP {}: {message}", status.as_u16()))
}

fn row_body(table: Table, row: NewRow) -> Value {
    let mut obj = Map::new();
    obj.insert("user_id".into(), Value::String(row.user_id));
    obj.insert(table.key_column().into(), Value::String(row.key));
    if let Some(category) = row.category {
        obj.insert("category".into(), Value::String(category));
    }
    Value::Object(obj)
}

fn string_column(rows: Value, column: &str) -> Result<Vec<String>, StoreError> {
    let Value::Array(rows) = rows else {
        return Err(StoreError::Serialization(format!(
            "expected an array of rows with `{column}`"
        )));
    };
    rows.iter()
        .map(|r| {
            r.get(column)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| StoreError::Serialization(format!("row without `{column}`")))
        })
        .collect()
}

/// Set-returning procedures answer with an array, scalar ones with an object.
fn parse_stats(value: Value) -> Result<UserStats, StoreError> {
    let row = match value {
        Value::Array(mut rows) if !rows.is_empty() => rows.swap_remove(0),
        Value::Array(_) => return Ok(UserStats::default()),
        other => other,
    };
    serde_json::from_value(row).map_err(|e| StoreError::Serialization(e.to_string()))
}

#[async_trait]
impl RemoteStore for RestStore {
    async fn select_keys(&self, table: Table, user_id: &str) -> Result<Vec<String>, StoreError> {
        let user_filter = format!("eq.{user_id}");
        let order = table.timestamp_column().map(|ts| format!("{ts}.asc"));
        let mut filters = vec![("select", table.key_column()), ("user_id", user_filter.as_str())];
        if let Some(order) = order.as_deref() {
            filters.push(("order", order));
        }
        let url = self.table_url(table, &filters);
        let rows = self.json(table.name(), HTTP_CLIENT.get(&url)).await?;
        string_column(rows, table.key_column())
    }

    async fn insert(&self, table: Table, row: NewRow) -> Result<(), StoreError> {
        let url = self.table_url(table, &[]);
        let req = HTTP_CLIENT
            .post(&url)
            .header("Prefer", "return=minimal")
            .json(&row_body(table, row));
        self.send(table.name(), req).await.map(|_| ())
    }

    async fn delete(&self, table: Table, user_id: &str, key: &str) -> Result<(), StoreError> {
        let user_filter = format!("eq.{user_id}");
        let key_filter = format!("eq.{key}");
        let url = self.table_url(
            table,
            &[("user_id", user_filter.as_str()), (table.key_column(), key_filter.as_str())],
        );
        self.send(table.name(), HTTP_CLIENT.delete(&url)).await.map(|_| ())
    }

    async fn select_view_categories(&self, user_id: &str) -> Result<Vec<String>, StoreError> {
        let url = self.view_categories_url(user_id);
        let rows = self.json("article_views", HTTP_CLIENT.get(&url)).await?;
        string_column(rows, "category")
    }

    async fn get_all_users_for_admin(&self) -> Result<Vec<AdminUser>, StoreError> {
        let url = self.rpc_url("get_all_users_for_admin");
        let value = self
            .json("get_all_users_for_admin", HTTP_CLIENT.post(&url).json(&json!({})))
            .await?;
        serde_json::from_value(value).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    async fn get_user_stats_for_admin(&self, user_id: &str) -> Result<UserStats, StoreError> {
        let url = self.rpc_url("get_user_stats_for_admin");
        let req = HTTP_CLIENT.post(&url).json(&json!({ "user_id": user_id }));
        let value = self.json("get_user_stats_for_admin", req).await?;
        parse_stats(value)
    }
}
