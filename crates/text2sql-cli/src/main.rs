// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod commands;
mod config;
mod logging;
mod runtime;

use anyhow::{Context, Result, anyhow};
use config::Config;
use runtime::HttpRuntime;
use std::env;
use std::io;
use std::path::PathBuf;
use text2sql_app::AppState;
use text2sql_client::Client;
use tracing::info;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `text2sql --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;

    let target = logging::target_for(config.log_file(), options.is_interactive());
    let level = config
        .log_level()
        .unwrap_or_else(|| logging::default_level(&target));
    logging::init(&target, level)?;

    let base_url = options.base_url.clone().unwrap_or_else(|| config.base_url());
    let client = Client::new(&base_url, config.timeout()?).with_context(|| {
        format!(
            "invalid backend url {base_url:?}; fix [server].base_url in {} or pass --url",
            options.config_path.display()
        )
    })?;
    info!(base_url = client.base_url(), "backend configured");

    let mut stdout = io::stdout().lock();
    if options.check_only {
        return commands::check(&client, &mut stdout);
    }
    if let Some(question) = &options.ask {
        return commands::ask(&client, question, &mut stdout);
    }
    if options.list_tables {
        return commands::list_tables(&client, &mut stdout);
    }
    if let Some(table) = &options.table {
        return commands::show_table(&client, table, &mut stdout);
    }
    drop(stdout);

    let mut state = AppState {
        focus: config.start_panel(),
        ..AppState::default()
    };
    let mut runtime = HttpRuntime::new(client);
    text2sql_tui::run_app(&mut state, &mut runtime)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    base_url: Option<String>,
    print_config_path: bool,
    print_example: bool,
    check_only: bool,
    ask: Option<String>,
    list_tables: bool,
    table: Option<String>,
    show_help: bool,
}

impl CliOptions {
    fn is_interactive(&self) -> bool {
        !self.check_only && self.ask.is_none() && !self.list_tables && self.table.is_none()
    }
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        base_url: None,
        print_config_path: false,
        print_example: false,
        check_only: false,
        ask: None,
        list_tables: false,
        table: None,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--url" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--url requires a backend url"))?;
                options.base_url = Some(value.as_ref().to_owned());
            }
            "--ask" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--ask requires a question"))?;
                options.ask = Some(value.as_ref().to_owned());
            }
            "--table" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--table requires a table name"))?;
                let name = value.as_ref().trim();
                if name.is_empty() {
                    return Err(anyhow!("--table requires a non-empty table name"));
                }
                options.table = Some(name.to_owned());
            }
            "--tables" => {
                options.list_tables = true;
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    let one_shot = [
        options.check_only,
        options.ask.is_some(),
        options.list_tables,
        options.table.is_some(),
    ];
    if one_shot.iter().filter(|set| **set).count() > 1 {
        return Err(anyhow!(
            "--check, --ask, --tables and --table are mutually exclusive"
        ));
    }

    Ok(options)
}

fn print_help() {
    println!("text2sql");
    println!("  --config <path>          Use a specific config path");
    println!("  --url <url>              Override the backend base url");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --check                  Validate config and reach the backend");
    println!("  --ask <question>         Ask one question and print SQL and rows");
    println!("  --tables                 List browsable tables");
    println!("  --table <name>           Print every row of one table");
    println!("  --help                   Show this help");
    println!();
    println!("Without a one-shot flag the interactive interface starts.");
}
