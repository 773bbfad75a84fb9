// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use std::io::Write;
use text2sql_app::{ResultGrid, format_results_table};
use text2sql_client::Client;

pub fn ask(client: &Client, question: &str, out: &mut impl Write) -> Result<()> {
    let outcome = client
        .ask(question)
        .map_err(|error| anyhow!("query failed: {error}"))?;
    let grid = ResultGrid::from_records(&outcome.results);

    writeln!(out, "{}", outcome.sql).context("write sql")?;
    writeln!(out).context("write separator")?;
    write!(out, "{}", format_results_table(&grid)).context("write results")?;
    Ok(())
}

pub fn list_tables(client: &Client, out: &mut impl Write) -> Result<()> {
    let tables = client
        .list_tables()
        .map_err(|error| anyhow!("list tables failed: {error}"))?;
    for table in tables {
        writeln!(out, "{table}").context("write table name")?;
    }
    Ok(())
}

pub fn show_table(client: &Client, table: &str, out: &mut impl Write) -> Result<()> {
    let data = client
        .table_data(table)
        .map_err(|error| anyhow!("load table {table} failed: {error}"))?;
    write!(out, "{}", format_results_table(&ResultGrid::from_table(&data)))
        .context("write table rows")?;
    Ok(())
}

/// Confirms the backend answers the table listing.
pub fn check(client: &Client, out: &mut impl Write) -> Result<()> {
    let tables = client.list_tables().map_err(|error| {
        anyhow!(
            "backend check failed at {}: {error}; verify [server].base_url or pass --url",
            client.base_url()
        )
    })?;
    writeln!(out, "ok: {} tables at {}", tables.len(), client.base_url())
        .context("write check result")?;
    Ok(())
}
