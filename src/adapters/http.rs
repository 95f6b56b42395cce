use crate::core::{BillQueryClient, ConfigProvider, QueryResult, Row};
use crate::domain::query::BillQuery;
use crate::utils::error::{QueryError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

const EXECUTE_BILL_QUERY: &str =
    "Kingdee.BOS.WebApi.ServicesStub.DynamicFormService.ExecuteBillQuery.common.kdsvc";

/// K3Cloud WebAPI 的 ExecuteBillQuery 用戶端
#[derive(Debug, Clone)]
pub struct K3CloudClient {
    client: Client,
    endpoint: Url,
    headers: Vec<(String, String)>,
}

impl K3CloudClient {
    /// 依設定建立用戶端；生命週期由呼叫端持有
    pub fn new<C: ConfigProvider>(config: &C) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds()))
            .build()?;

        Ok(Self {
            client,
            endpoint: service_url(config.server_url(), EXECUTE_BILL_QUERY)?,
            headers: config.headers(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

fn service_url(server_url: &str, service: &str) -> Result<Url> {
    let mut base = server_url.to_string();
    if !base.ends_with('/') {
        base.push('/');
    }

    Url::parse(&base)
        .and_then(|url| url.join(service))
        .map_err(|e| QueryError::InvalidConfigValueError {
            field: "connection.server_url".to_string(),
            value: server_url.to_string(),
            reason: format!("Invalid URL format: {}", e),
        })
}

#[async_trait]
impl BillQueryClient for K3CloudClient {
    async fn execute_bill_query(&self, query: &BillQuery) -> Result<QueryResult> {
        let mut request = self
            .client
            .post(self.endpoint.clone())
            .json(&json!({ "data": query.to_wire() }));

        for (key, value) in &self.headers {
            request = request.header(key, value);
        }

        tracing::debug!("POST {} (form {})", self.endpoint, query.form_id);
        let response = request.send().await?;
        let status = response.status();
        tracing::debug!("API response status: {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(QueryError::ApiStatusError {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response.json().await?;
        parse_rows(body)
    }
}

/// 解析回應：資料列陣列，或廠商的錯誤封包
pub fn parse_rows(body: Value) -> Result<QueryResult> {
    if let Some(message) = remote_error(&body) {
        return Err(QueryError::RemoteError { message });
    }

    let rows = match body {
        Value::Array(rows) => rows,
        other => {
            return Err(QueryError::MalformedResponse {
                message: format!("expected an array of rows, got {}", other),
            })
        }
    };

    rows.into_iter()
        .enumerate()
        .map(|(position, row)| match row {
            Value::Array(cells) => Row::from_json_cells(position, cells),
            other => Err(QueryError::MalformedResponse {
                message: format!("row {} is not an array: {}", position, other),
            }),
        })
        .collect()
}

/// 錯誤封包形如 `[[{"Result":{"ResponseStatus":{"IsSuccess":false,...}}}]]`
fn remote_error(body: &Value) -> Option<String> {
    let envelope = match body {
        Value::Object(_) => body,
        Value::Array(rows) => rows.first()?.as_array()?.first()?,
        _ => return None,
    };

    let status = envelope.get("Result")?.get("ResponseStatus")?;
    if status.get("IsSuccess").and_then(Value::as_bool) != Some(false) {
        return None;
    }

    let messages: Vec<String> = status
        .get("Errors")
        .and_then(Value::as_array)
        .map(|errors| {
            errors
                .iter()
                .filter_map(|e| e.get("Message").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    if messages.is_empty() {
        Some(format!(
            "request rejected (ErrorCode {})",
            status.get("ErrorCode").unwrap_or(&Value::Null)
        ))
    } else {
        Some(messages.join("; "))
    }
}
