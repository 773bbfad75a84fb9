// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, Response};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use text2sql_app::{GENERIC_SERVER_ERROR, QueryOutcome, TABLE_LIST_ERROR, TableData};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// Either the request never produced a usable response, or the backend
/// answered and said no.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("{message}")]
    Failed { message: String },
    #[error("{}", .message.as_deref().unwrap_or(GENERIC_SERVER_ERROR))]
    Rejected { status: u16, message: Option<String> },
}

impl ApiError {
    fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Failed { .. } => None,
            Self::Rejected { status, .. } => Some(*status),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Client {
    base_url: Url,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let trimmed = base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            bail!("server.base_url must not be empty");
        }
        let base_url = parse_base_url(trimmed)?;

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn list_tables(&self) -> Result<Vec<String>, ApiError> {
        let url = self.endpoint(&["tables"])?;
        debug!(%url, "listing tables");
        let response = self
            .http
            .get(url)
            .send()
            .map_err(|error| self.connection_error(error))?;
        let (status, body) = read_body(response)?;

        // This endpoint is judged by its payload, not its status.
        let tables = body
            .as_ref()
            .and_then(|body| body.get("tables"))
            .filter(|tables| !is_falsy(tables));
        let Some(tables) = tables else {
            let message = body
                .as_ref()
                .and_then(error_field)
                .unwrap_or_else(|| TABLE_LIST_ERROR.to_owned());
            warn!(status = status.as_u16(), %message, "table list rejected");
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                message: Some(message),
            });
        };

        serde_json::from_value(tables.clone())
            .map_err(|error| ApiError::failed(format!("decode table list: {error}")))
    }

    pub fn table_data(&self, table: &str) -> Result<TableData, ApiError> {
        let url = self.endpoint(&["tables", table])?;
        debug!(%url, table, "loading table");
        let response = self
            .http
            .get(url)
            .send()
            .map_err(|error| self.connection_error(error))?;
        let body = expect_success(response)?;

        serde_json::from_value(body)
            .map_err(|error| ApiError::failed(format!("decode table {table}: {error}")))
    }

    pub fn ask(&self, question: &str) -> Result<QueryOutcome, ApiError> {
        let url = self.endpoint(&["query"])?;
        debug!(%url, "submitting question");
        let response = self
            .http
            .post(url)
            .json(&QueryRequest { question })
            .send()
            .map_err(|error| self.connection_error(error))?;
        let body = expect_success(response)?;

        serde_json::from_value(body)
            .map_err(|error| ApiError::failed(format!("decode query response: {error}")))
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::failed(format!("{} cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn connection_error(&self, error: reqwest::Error) -> ApiError {
        warn!(base_url = self.base_url(), %error, "request failed");
        let message = if error.is_timeout() {
            format!(
                "request to {} timed out after {:?}",
                self.base_url(),
                self.timeout
            )
        } else {
            format!("cannot reach {} ({error})", self.base_url())
        };
        ApiError::failed(message)
    }
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    question: &'a str,
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).with_context(|| format!("invalid server.base_url {raw:?}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!(
            "server.base_url {raw:?} must use http or https, got {:?}",
            url.scheme()
        );
    }
    if url.cannot_be_a_base() {
        bail!("server.base_url {raw:?} cannot carry a path");
    }
    Ok(url)
}

pub fn validate_base_url(raw: &str) -> Result<()> {
    parse_base_url(raw.trim().trim_end_matches('/')).map(|_| ())
}

/// `None` means the body was not JSON.
fn read_body(response: Response) -> Result<(StatusCode, Option<Value>), ApiError> {
    let status = response.status();
    let text = response
        .text()
        .map_err(|error| ApiError::failed(format!("read response body: {error}")))?;
    Ok((status, serde_json::from_str(&text).ok()))
}

fn expect_success(response: Response) -> Result<Value, ApiError> {
    let (status, body) = read_body(response)?;
    if !status.is_success() {
        let message = body.as_ref().and_then(error_field);
        warn!(status = status.as_u16(), ?message, "request rejected");
        return Err(ApiError::Rejected {
            status: status.as_u16(),
            message,
        });
    }
    body.ok_or_else(|| {
        ApiError::failed(format!(
            "server returned {} with a non-JSON body",
            status.as_u16()
        ))
    })
}

/// `null`, `false`, `0` and `""` count as an absent table list.
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

fn error_field(body: &Value) -> Option<String> {
    body.get("error")
        .and_then(Value::as_str)
        .filter(|message| !message.is_empty())
        .map(str::to_owned)
}
