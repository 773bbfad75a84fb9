// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use std::sync::mpsc::Sender;
use std::thread;
use text2sql_app::{ApiRequest, QueryOutcome, TableData};
use text2sql_client::Client;
use text2sql_tui::{AppRuntime, InternalEvent, resolve_request};
use tracing::debug;

/// Runs every request on its own worker thread so the UI loop never blocks on
/// the network. Completions arrive in whatever order they resolve.
#[derive(Debug, Clone)]
pub struct HttpRuntime {
    client: Client,
}

impl HttpRuntime {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl AppRuntime for HttpRuntime {
    fn ask(&mut self, question: &str) -> Result<QueryOutcome> {
        Ok(self.client.ask(question)?)
    }

    fn list_tables(&mut self) -> Result<Vec<String>> {
        Ok(self.client.list_tables()?)
    }

    fn load_table(&mut self, table: &str) -> Result<TableData> {
        Ok(self.client.table_data(table)?)
    }

    fn spawn_request(&mut self, request: ApiRequest, tx: Sender<InternalEvent>) -> Result<()> {
        let mut worker = self.clone();
        thread::Builder::new()
            .name("text2sql-request".to_owned())
            .spawn(move || {
                let command = resolve_request(&mut worker, request);
                if tx.send(InternalEvent::Resolved(command)).is_err() {
                    debug!("ui loop gone; dropping request result");
                }
            })
            .context("spawn request worker")?;
        Ok(())
    }
}
