// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! In-process stand-in for the text-to-SQL backend. Every request is recorded
//! before it is answered, so callers can assert on exactly what was sent once
//! their blocking call returns.

use anyhow::{Result, anyhow};
use serde_json::{Value, json};
use std::io::Read;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use tiny_http::{Header, Response, Server};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub url: String,
    pub body: String,
}

impl RecordedRequest {
    pub fn json_body(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockResponse {
    pub status: u16,
    pub body: String,
    pub json: bool,
}

impl MockResponse {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            body: body.to_string(),
            json: true,
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_owned(),
            json: false,
        }
    }
}

pub struct MockBackend {
    base_url: String,
    server: Arc<Server>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    handle: Option<JoinHandle<()>>,
}

impl MockBackend {
    pub fn start<F>(handler: F) -> Result<Self>
    where
        F: Fn(&RecordedRequest) -> MockResponse + Send + 'static,
    {
        let server = Server::http("127.0.0.1:0")
            .map_err(|error| anyhow!("start mock backend: {error}"))?;
        let server = Arc::new(server);
        let base_url = format!("http://{}", server.server_addr());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let thread_server = Arc::clone(&server);
        let thread_requests = Arc::clone(&requests);
        let handle = thread::spawn(move || {
            for mut request in thread_server.incoming_requests() {
                let mut body = String::new();
                let _ = request.as_reader().read_to_string(&mut body);
                let recorded = RecordedRequest {
                    method: request.method().to_string(),
                    url: request.url().to_owned(),
                    body,
                };
                let reply = handler(&recorded);
                match thread_requests.lock() {
                    Ok(mut guard) => guard.push(recorded),
                    Err(poisoned) => poisoned.into_inner().push(recorded),
                }

                let mut response = Response::from_string(reply.body).with_status_code(reply.status);
                let content_type = if reply.json {
                    "application/json"
                } else {
                    "text/plain"
                };
                if let Ok(header) = Header::from_bytes("Content-Type", content_type) {
                    response = response.with_header(header);
                }
                let _ = request.respond(response);
            }
        });

        Ok(Self {
            base_url,
            server,
            requests,
            handle: Some(handle),
        })
    }

    /// Serves a small two-table catalog. Asking `"bad question"` is rejected
    /// with HTTP 500.
    pub fn standard() -> Result<Self> {
        Self::start(standard_routes)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        match self.requests.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

pub fn standard_routes(request: &RecordedRequest) -> MockResponse {
    match (request.method.as_str(), request.url.as_str()) {
        ("GET", "/tables") => MockResponse::json(200, json!({ "tables": ["orders", "users"] })),
        ("GET", "/tables/users") => MockResponse::json(
            200,
            json!({
                "columns": ["id", "name", "active"],
                "rows": [
                    { "id": 1, "name": "ada", "active": true },
                    { "id": 2, "name": "grace", "active": null },
                ],
            }),
        ),
        ("GET", "/tables/orders") => MockResponse::json(
            200,
            json!({ "columns": ["id", "total"], "rows": [] }),
        ),
        ("GET", _) => MockResponse::json(404, json!({ "error": "no such table" })),
        ("POST", "/query") => {
            let question = request
                .json_body()
                .and_then(|body| body.get("question").and_then(Value::as_str).map(str::to_owned))
                .unwrap_or_default();
            if question == "bad question" {
                return MockResponse::json(500, json!({ "error": "bad question" }));
            }
            MockResponse::json(
                200,
                json!({
                    "sql": "SELECT id, name FROM users",
                    "results": [
                        { "id": 1, "name": "ada" },
                        { "id": 2, "name": "grace" },
                    ],
                }),
            )
        }
        _ => MockResponse::text(405, "method not allowed"),
    }
}
