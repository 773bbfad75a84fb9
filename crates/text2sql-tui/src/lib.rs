// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, Borders, Cell, List, ListItem, ListState, Paragraph, Row, Table, Wrap,
};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use text2sql_app::{
    ApiRequest, AppCommand, AppEvent, AppState, Panel, QueryOutcome, ResultGrid,
    TABLE_PLACEHOLDER, TableData,
};
use tracing::{debug, warn};

const PAGE_ROWS: usize = 10;
const STATUS_CLEAR_AFTER: Duration = Duration::from_secs(4);
const QUESTION_PLACEHOLDER: &str = "Type your question…";
const MIN_GRID_HEIGHT: u16 = 5;

pub trait AppRuntime {
    fn ask(&mut self, question: &str) -> Result<QueryOutcome>;
    fn list_tables(&mut self) -> Result<Vec<String>>;
    fn load_table(&mut self, table: &str) -> Result<TableData>;

    /// Runs `request` and posts its resolution to `tx`. The default runs on
    /// the calling thread; network-backed runtimes hand it to a worker.
    fn spawn_request(&mut self, request: ApiRequest, tx: Sender<InternalEvent>) -> Result<()> {
        let command = resolve_request(self, request);
        tx.send(InternalEvent::Resolved(command))
            .map_err(|_| anyhow::anyhow!("request event channel closed"))?;
        Ok(())
    }
}

/// Turns a request into the command that records its outcome.
pub fn resolve_request<R: AppRuntime + ?Sized>(runtime: &mut R, request: ApiRequest) -> AppCommand {
    match request {
        ApiRequest::Query { question } => {
            AppCommand::QueryResolved(runtime.ask(&question).map_err(|error| error.to_string()))
        }
        ApiRequest::ListTables => {
            AppCommand::TablesResolved(runtime.list_tables().map_err(|error| error.to_string()))
        }
        ApiRequest::TableData { table } => {
            let result = runtime.load_table(&table).map_err(|error| error.to_string());
            AppCommand::TableDataResolved { table, result }
        }
    }
}

fn failed_resolution(request: ApiRequest, error: String) -> AppCommand {
    match request {
        ApiRequest::Query { .. } => AppCommand::QueryResolved(Err(error)),
        ApiRequest::ListTables => AppCommand::TablesResolved(Err(error)),
        ApiRequest::TableData { table } => AppCommand::TableDataResolved {
            table,
            result: Err(error),
        },
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
    Resolved(AppCommand),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct ViewData {
    /// Index into the browser entries; 0 is the placeholder.
    browser_cursor: usize,
    query_scroll: usize,
    table_scroll: usize,
    /// First grid column drawn; wide results slide left and right.
    query_column: usize,
    table_column: usize,
    sql_scroll: usize,
    status_token: u64,
}

pub fn run_app<R: AppRuntime>(state: &mut AppState, runtime: &mut R) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::default();
    let (internal_tx, internal_rx) = mpsc::channel();

    let events = state.dispatch(AppCommand::LoadTables);
    apply_events(state, runtime, &mut view_data, &internal_tx, events);

    let result = event_loop(
        &mut terminal,
        state,
        runtime,
        &mut view_data,
        &internal_tx,
        &internal_rx,
    );

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn event_loop<R: AppRuntime>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    internal_rx: &Receiver<InternalEvent>,
) -> Result<()> {
    loop {
        process_internal_events(state, runtime, view_data, internal_tx, internal_rx);

        terminal
            .draw(|frame| render(frame, state, view_data))
            .context("draw frame")?;

        if !event::poll(Duration::from_millis(120)).context("poll event")? {
            continue;
        }
        if let Event::Key(key) = event::read().context("read event")?
            && key.kind != KeyEventKind::Release
            && handle_key_event(state, runtime, view_data, internal_tx, key)
        {
            return Ok(());
        }
    }
}

fn process_internal_events<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(AppCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
            InternalEvent::Resolved(command) => {
                let events = state.dispatch(command);
                apply_events(state, runtime, view_data, tx, events);
            }
        }
    }
}

fn apply_events<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    events: Vec<AppEvent>,
) {
    for event in events {
        match event {
            AppEvent::RequestIssued(request) => {
                debug!(?request, "issuing request");
                if let Err(error) = runtime.spawn_request(request.clone(), tx.clone()) {
                    warn!(%error, "request could not be started");
                    let follow_up = state.dispatch(failed_resolution(request, error.to_string()));
                    apply_events(state, runtime, view_data, tx, follow_up);
                }
            }
            AppEvent::QueryDisplayed { .. } | AppEvent::QueryFailed(_) => {
                view_data.query_scroll = 0;
                view_data.query_column = 0;
                view_data.sql_scroll = 0;
            }
            AppEvent::TableCleared | AppEvent::TableDisplayed { .. } => {
                view_data.table_scroll = 0;
                view_data.table_column = 0;
            }
            AppEvent::TablesListed(count) => {
                view_data.browser_cursor = view_data.browser_cursor.min(count);
            }
            AppEvent::StatusUpdated(_) => {
                view_data.status_token = view_data.status_token.saturating_add(1);
                schedule_status_clear(tx, view_data.status_token);
            }
            AppEvent::FocusChanged(_)
            | AppEvent::QuestionEdited
            | AppEvent::TablesFailed(_)
            | AppEvent::TableFailed(_)
            | AppEvent::StatusCleared => {}
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(STATUS_CLEAR_AFTER);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn handle_key_event<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c' | 'q') if ctrl => return true,
        KeyCode::Esc => return true,
        KeyCode::Tab | KeyCode::BackTab => {
            state.dispatch(AppCommand::FocusNext);
            return false;
        }
        KeyCode::PageDown => {
            scroll_focused(state, view_data, PAGE_ROWS as isize);
            return false;
        }
        KeyCode::PageUp => {
            scroll_focused(state, view_data, -(PAGE_ROWS as isize));
            return false;
        }
        KeyCode::Right => {
            shift_columns(state, view_data, 1);
            return false;
        }
        KeyCode::Left => {
            shift_columns(state, view_data, -1);
            return false;
        }
        KeyCode::Down if state.focus == Panel::Query => {
            scroll_sql(state, view_data, 1);
            return false;
        }
        KeyCode::Up if state.focus == Panel::Query => {
            scroll_sql(state, view_data, -1);
            return false;
        }
        _ => {}
    }

    let command = match state.focus {
        Panel::Query => query_command_for_key(key),
        Panel::Browse => browse_command_for_key(state, view_data, key),
    };
    if let Some(command) = command {
        let events = state.dispatch(command);
        apply_events(state, runtime, view_data, internal_tx, events);
    }
    false
}

fn query_command_for_key(key: KeyEvent) -> Option<AppCommand> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Enter => Some(AppCommand::SubmitQuestion),
        KeyCode::Backspace => Some(AppCommand::DeleteChar),
        KeyCode::Char('u') if ctrl => Some(AppCommand::ClearQuestion),
        KeyCode::Char(ch) if !ctrl => Some(AppCommand::InsertChar(ch)),
        _ => None,
    }
}

fn browse_command_for_key(
    state: &AppState,
    view_data: &mut ViewData,
    key: KeyEvent,
) -> Option<AppCommand> {
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => {
            move_browser_cursor(state, view_data, -1);
            None
        }
        KeyCode::Down | KeyCode::Char('j') => {
            move_browser_cursor(state, view_data, 1);
            None
        }
        KeyCode::Home | KeyCode::Char('g') => {
            view_data.browser_cursor = 0;
            None
        }
        KeyCode::Char('l') => {
            shift_columns(state, view_data, 1);
            None
        }
        KeyCode::Char('h') => {
            shift_columns(state, view_data, -1);
            None
        }
        KeyCode::Enter => Some(AppCommand::SelectTable(selection_at(
            state,
            view_data.browser_cursor,
        ))),
        KeyCode::Char('r') => Some(AppCommand::LoadTables),
        _ => None,
    }
}

fn move_browser_cursor(state: &AppState, view_data: &mut ViewData, delta: isize) {
    let last = state.browser.tables.len();
    let next = view_data.browser_cursor.saturating_add_signed(delta);
    view_data.browser_cursor = next.min(last);
}

/// Entry 0 is the placeholder and selects nothing.
fn selection_at(state: &AppState, cursor: usize) -> Option<String> {
    cursor
        .checked_sub(1)
        .and_then(|index| state.browser.tables.get(index))
        .cloned()
}

fn scroll_focused(state: &AppState, view_data: &mut ViewData, delta: isize) {
    let (scroll, rows) = match state.focus {
        Panel::Query => (&mut view_data.query_scroll, state.query.results.len()),
        Panel::Browse => (&mut view_data.table_scroll, state.browser.data.rows.len()),
    };
    *scroll = scroll
        .saturating_add_signed(delta)
        .min(rows.saturating_sub(1));
}

fn shift_columns(state: &AppState, view_data: &mut ViewData, delta: isize) {
    let (column, columns) = match state.focus {
        Panel::Query => (
            &mut view_data.query_column,
            state.query.results.first().map_or(0, |record| record.len()),
        ),
        Panel::Browse => (&mut view_data.table_column, state.browser.data.columns.len()),
    };
    *column = column
        .saturating_add_signed(delta)
        .min(columns.saturating_sub(1));
}

fn scroll_sql(state: &AppState, view_data: &mut ViewData, delta: isize) {
    let lines = state.query.sql.lines().count();
    view_data.sql_scroll = view_data
        .sql_scroll
        .saturating_add_signed(delta)
        .min(lines.saturating_sub(1));
}

fn render(frame: &mut ratatui::Frame<'_>, state: &AppState, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(55),
            Constraint::Min(6),
            Constraint::Length(3),
        ])
        .split(frame.area());

    render_query_panel(frame, layout[0], state, view_data);
    render_browser(frame, layout[1], state, view_data);

    let status = Paragraph::new(status_text(state))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, layout[2]);
}

fn panel_block(title: String, focused: bool) -> Block<'static> {
    let style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(style)
}

fn query_panel_title(state: &AppState) -> String {
    if state.query.in_flight > 0 {
        "Text-to-SQL (loading)".to_owned()
    } else {
        "Text-to-SQL".to_owned()
    }
}

fn browser_title(state: &AppState) -> String {
    if state.browser.in_flight > 0 {
        "Browse Tables (loading)".to_owned()
    } else {
        "Browse Tables".to_owned()
    }
}

fn render_query_panel(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    state: &AppState,
    view_data: &ViewData,
) {
    let focused = state.focus == Panel::Query;
    let block = panel_block(query_panel_title(state), focused);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let grid = ResultGrid::from_records(&state.query.results);
    let detail_lines = query_detail_lines(state);
    let wanted_height = if detail_lines.is_empty() {
        0
    } else {
        wrapped_height(&detail_lines, inner.width.saturating_sub(2)).saturating_add(2)
    };
    let reserved = if grid.is_empty() { 3 } else { 3 + MIN_GRID_HEIGHT };
    let detail_height = wanted_height.min(inner.height.saturating_sub(reserved));
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(detail_height),
            Constraint::Min(0),
        ])
        .split(inner);

    let input = if state.query.question.is_empty() {
        Line::from(Span::styled(
            QUESTION_PLACEHOLDER,
            Style::default().fg(Color::DarkGray),
        ))
    } else if focused {
        Line::from(format!("{}▏", state.query.question))
    } else {
        Line::from(state.query.question.clone())
    };
    let input = Paragraph::new(input).block(
        Block::default()
            .title("question (enter to ask)")
            .borders(Borders::ALL),
    );
    frame.render_widget(input, sections[0]);

    if !detail_lines.is_empty() {
        let title = if !state.query.error.is_empty() {
            "error".to_owned()
        } else if view_data.sql_scroll > 0 {
            format!("sql · from line {}", view_data.sql_scroll + 1)
        } else if wanted_height > detail_height {
            "sql · more below (up/down)".to_owned()
        } else {
            "sql".to_owned()
        };
        let visible = detail_lines
            .into_iter()
            .skip(view_data.sql_scroll)
            .collect::<Vec<_>>();
        let detail = Paragraph::new(visible)
            .wrap(Wrap { trim: false })
            .block(Block::default().title(title).borders(Borders::ALL));
        frame.render_widget(detail, sections[1]);
    }

    if !grid.is_empty() {
        frame.render_widget(
            grid_table(
                &grid,
                view_data.query_scroll,
                view_data.query_column,
                "results",
            ),
            sections[2],
        );
    }
}

/// Error text, or every line of the generated SQL as returned.
fn query_detail_lines(state: &AppState) -> Vec<Line<'static>> {
    if !state.query.error.is_empty() {
        return vec![Line::from(Span::styled(
            state.query.error.clone(),
            Style::default().fg(Color::Red),
        ))];
    }
    state
        .query
        .sql
        .lines()
        .map(|line| Line::from(line.to_owned()))
        .collect()
}

/// Rows `lines` occupy once wrapped to `width` columns.
fn wrapped_height(lines: &[Line<'_>], width: u16) -> u16 {
    let width = usize::from(width.max(1));
    let rows = lines
        .iter()
        .map(|line| line.width().div_ceil(width).max(1))
        .sum::<usize>();
    u16::try_from(rows).unwrap_or(u16::MAX)
}

fn render_browser(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    state: &AppState,
    view_data: &ViewData,
) {
    let focused = state.focus == Panel::Browse;
    let block = panel_block(browser_title(state), focused);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(30), Constraint::Min(10)])
        .split(inner);

    let entries = browser_entries(state)
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let selected = index > 0 && state.browser.selected.as_deref() == Some(entry.as_str());
            let marker = if selected { "● " } else { "  " };
            let style = if index == 0 {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(Span::styled(format!("{marker}{entry}"), style)))
        })
        .collect::<Vec<_>>();
    let list = List::new(entries)
        .block(
            Block::default()
                .title("Select a Table")
                .borders(Borders::ALL),
        )
        .highlight_style(Style::default().fg(Color::Black).bg(Color::Cyan));
    let mut list_state = ListState::default().with_selected(Some(view_data.browser_cursor));
    frame.render_stateful_widget(list, columns[0], &mut list_state);

    let right = if state.browser.error.is_empty() {
        [Rect::default(), columns[1]]
    } else {
        let split = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(0)])
            .split(columns[1]);
        [split[0], split[1]]
    };
    if !state.browser.error.is_empty() {
        let error = Paragraph::new(state.browser.error.clone()).style(Style::default().fg(Color::Red));
        frame.render_widget(error, right[0]);
    }

    let grid = ResultGrid::from_table(&state.browser.data);
    if !grid.is_empty() {
        let title = state.browser.selected.clone().unwrap_or_default();
        frame.render_widget(
            grid_table(&grid, view_data.table_scroll, view_data.table_column, &title),
            right[1],
        );
    }
}

fn browser_entries(state: &AppState) -> Vec<String> {
    std::iter::once(TABLE_PLACEHOLDER.to_owned())
        .chain(state.browser.tables.iter().cloned())
        .collect()
}

/// Draws rows from `scroll` down and columns from `column` rightwards.
fn grid_table<'a>(grid: &'a ResultGrid, scroll: usize, column: usize, title: &str) -> Table<'a> {
    let column = column.min(grid.column_count().saturating_sub(1));
    let header = Row::new(grid.columns.iter().skip(column).map(|name| {
        Cell::from(name.as_str()).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    }));
    let rows = grid.rows.iter().skip(scroll).map(|row| {
        Row::new(
            row.iter()
                .skip(column)
                .map(|value| Cell::from(value.as_str())),
        )
    });
    let visible = grid.column_count().saturating_sub(column);
    let widths = vec![Constraint::Min(8); visible.max(1)];

    Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(
            Block::default()
                .title(grid_title(grid, scroll, column, title))
                .borders(Borders::ALL),
        )
}

fn grid_title(grid: &ResultGrid, scroll: usize, column: usize, title: &str) -> String {
    let rows = grid.row_count();
    let noun = if rows == 1 { "row" } else { "rows" };
    let mut text = format!("{title} · {rows} {noun}");
    if scroll > 0 {
        text.push_str(&format!(" · from {}", scroll + 1));
    }
    if column > 0 {
        text.push_str(&format!(" · col {}/{}", column + 1, grid.column_count()));
    }
    text
}

fn status_text(state: &AppState) -> String {
    let hints = match state.focus {
        Panel::Query => {
            "enter ask | ctrl+u clear | up/down sql | pgup/pgdn rows | left/right cols | tab browse | esc quit"
        }
        Panel::Browse => {
            "j/k move | enter select | r reload | pgup/pgdn rows | h/l cols | tab query | esc quit"
        }
    };
    match &state.status_line {
        Some(status) => format!("{} | {status} | {hints}", state.focus.label().to_uppercase()),
        None => format!("{} | {hints}", state.focus.label().to_uppercase()),
    }
}
