// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{QueryOutcome, ResultRecord, TableData};

pub const TABLE_PLACEHOLDER: &str = "-- Choose a table --";
pub const GENERIC_SERVER_ERROR: &str = "Server error";
pub const TABLE_LIST_ERROR: &str = "Failed to load tables";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Query,
    Browse,
}

impl Panel {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Browse => "browse",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "query" => Some(Self::Query),
            "browse" => Some(Self::Browse),
            _ => None,
        }
    }

    const fn other(self) -> Self {
        match self {
            Self::Query => Self::Browse,
            Self::Browse => Self::Query,
        }
    }
}

/// Work the runtime must perform on behalf of the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiRequest {
    Query { question: String },
    ListTables,
    TableData { table: String },
}

impl ApiRequest {
    pub const fn panel(&self) -> Panel {
        match self {
            Self::Query { .. } => Panel::Query,
            Self::ListTables | Self::TableData { .. } => Panel::Browse,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryPanel {
    pub question: String,
    pub sql: String,
    pub results: Vec<ResultRecord>,
    pub error: String,
    pub in_flight: usize,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableBrowser {
    pub tables: Vec<String>,
    pub selected: Option<String>,
    pub data: TableData,
    pub error: String,
    pub in_flight: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    pub focus: Panel,
    pub query: QueryPanel,
    pub browser: TableBrowser,
    pub status_line: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            focus: Panel::Query,
            query: QueryPanel::default(),
            browser: TableBrowser::default(),
            status_line: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    FocusNext,
    Focus(Panel),
    InsertChar(char),
    DeleteChar,
    ClearQuestion,
    SubmitQuestion,
    QueryResolved(Result<QueryOutcome, String>),
    LoadTables,
    TablesResolved(Result<Vec<String>, String>),
    SelectTable(Option<String>),
    TableDataResolved {
        table: String,
        result: Result<TableData, String>,
    },
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    FocusChanged(Panel),
    QuestionEdited,
    RequestIssued(ApiRequest),
    QueryDisplayed { rows: usize },
    QueryFailed(String),
    TablesListed(usize),
    TablesFailed(String),
    TableCleared,
    TableDisplayed { table: String, rows: usize },
    TableFailed(String),
    StatusUpdated(String),
    StatusCleared,
}

impl AppState {
    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::FocusNext => {
                self.focus = self.focus.other();
                vec![AppEvent::FocusChanged(self.focus)]
            }
            AppCommand::Focus(panel) => {
                self.focus = panel;
                vec![AppEvent::FocusChanged(self.focus)]
            }
            AppCommand::InsertChar(ch) => {
                self.query.question.push(ch);
                vec![AppEvent::QuestionEdited]
            }
            AppCommand::DeleteChar => {
                self.query.question.pop();
                vec![AppEvent::QuestionEdited]
            }
            AppCommand::ClearQuestion => {
                self.query.question.clear();
                vec![AppEvent::QuestionEdited]
            }
            AppCommand::SubmitQuestion => self.submit_question(),
            AppCommand::QueryResolved(result) => self.resolve_query(result),
            AppCommand::LoadTables => {
                self.browser.error.clear();
                vec![self.issue(ApiRequest::ListTables)]
            }
            AppCommand::TablesResolved(result) => {
                self.browser.in_flight = self.browser.in_flight.saturating_sub(1);
                match result {
                    Ok(tables) => {
                        self.browser.tables = tables;
                        let count = self.browser.tables.len();
                        vec![
                            AppEvent::TablesListed(count),
                            self.set_status(&format!("tables loaded: {count}")),
                        ]
                    }
                    Err(error) => {
                        self.browser.error = error.clone();
                        vec![AppEvent::TablesFailed(error)]
                    }
                }
            }
            AppCommand::SelectTable(table) => self.select_table(table),
            AppCommand::TableDataResolved { table, result } => {
                self.browser.in_flight = self.browser.in_flight.saturating_sub(1);
                match result {
                    Ok(data) => {
                        let rows = data.rows.len();
                        self.browser.data = data;
                        vec![
                            AppEvent::TableDisplayed {
                                table: table.clone(),
                                rows,
                            },
                            self.set_status(&format!("{table}: {rows} rows")),
                        ]
                    }
                    Err(error) => {
                        self.browser.error = error.clone();
                        vec![AppEvent::TableFailed(error)]
                    }
                }
            }
            AppCommand::SetStatus(message) => vec![self.set_status(&message)],
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }

    fn submit_question(&mut self) -> Vec<AppEvent> {
        self.query.error.clear();
        self.query.sql.clear();
        self.query.results.clear();
        let question = self.query.question.clone();
        vec![self.issue(ApiRequest::Query { question })]
    }

    fn resolve_query(&mut self, result: Result<QueryOutcome, String>) -> Vec<AppEvent> {
        self.query.in_flight = self.query.in_flight.saturating_sub(1);
        match result {
            Ok(outcome) => {
                let rows = outcome.results.len();
                self.query.error.clear();
                self.query.sql = outcome.sql;
                self.query.results = outcome.results;
                vec![
                    AppEvent::QueryDisplayed { rows },
                    self.set_status(&format!("query ok: {rows} rows")),
                ]
            }
            Err(error) => {
                self.query.sql.clear();
                self.query.results.clear();
                self.query.error = if error.is_empty() {
                    GENERIC_SERVER_ERROR.to_owned()
                } else {
                    error
                };
                vec![AppEvent::QueryFailed(self.query.error.clone())]
            }
        }
    }

    fn select_table(&mut self, table: Option<String>) -> Vec<AppEvent> {
        let table = table.filter(|name| !name.is_empty());
        self.browser.selected = table.clone();
        self.browser.data = TableData::default();
        self.browser.error.clear();

        match table {
            None => vec![AppEvent::TableCleared],
            Some(table) => vec![
                AppEvent::TableCleared,
                self.issue(ApiRequest::TableData { table }),
            ],
        }
    }

    fn issue(&mut self, request: ApiRequest) -> AppEvent {
        match request.panel() {
            Panel::Query => self.query.in_flight += 1,
            Panel::Browse => self.browser.in_flight += 1,
        }
        AppEvent::RequestIssued(request)
    }

    fn set_status(&mut self, message: &str) -> AppEvent {
        self.status_line = Some(message.to_owned());
        AppEvent::StatusUpdated(message.to_owned())
    }
}

pub fn requests_in(events: &[AppEvent]) -> Vec<ApiRequest> {
    events
        .iter()
        .filter_map(|event| match event {
            AppEvent::RequestIssued(request) => Some(request.clone()),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{ApiRequest, AppCommand, AppEvent, AppState, Panel, requests_in};
    use crate::{QueryOutcome, TableData};
    use serde_json::json;

    fn outcome(sql: &str, results: serde_json::Value) -> QueryOutcome {
        QueryOutcome {
            sql: sql.to_owned(),
            results: serde_json::from_value(results).expect("results should decode"),
        }
    }

    fn type_question(state: &mut AppState, question: &str) {
        for ch in question.chars() {
            state.dispatch(AppCommand::InsertChar(ch));
        }
    }

    #[test]
    fn submit_issues_exactly_one_query_request() {
        let mut state = AppState::default();
        type_question(&mut state, "how many users?");

        let events = state.dispatch(AppCommand::SubmitQuestion);
        assert_eq!(
            requests_in(&events),
            vec![ApiRequest::Query {
                question: "how many users?".to_owned(),
            }],
        );
        assert_eq!(state.query.in_flight, 1);
        assert_eq!(state.query.question, "how many users?");
    }

    #[test]
    fn submit_clears_previous_answer_and_error() {
        let mut state = AppState::default();
        state.query.sql = "SELECT 1".to_owned();
        state.query.error = "old".to_owned();
        state.query.results = outcome("", json!([{"a": 1}])).results;

        state.dispatch(AppCommand::SubmitQuestion);
        assert!(state.query.sql.is_empty());
        assert!(state.query.error.is_empty());
        assert!(state.query.results.is_empty());
    }

    #[test]
    fn successful_query_shows_sql_and_rows() {
        let mut state = AppState::default();
        state.dispatch(AppCommand::SubmitQuestion);

        let events = state.dispatch(AppCommand::QueryResolved(Ok(outcome(
            "SELECT name FROM users",
            json!([{"name": "ada"}, {"name": "grace"}]),
        ))));
        assert_eq!(state.query.sql, "SELECT name FROM users");
        assert_eq!(state.query.results.len(), 2);
        assert_eq!(state.query.in_flight, 0);
        assert_eq!(
            events,
            vec![
                AppEvent::QueryDisplayed { rows: 2 },
                AppEvent::StatusUpdated("query ok: 2 rows".to_owned()),
            ],
        );
    }

    #[test]
    fn failed_query_shows_error_without_answer() {
        let mut state = AppState::default();
        state.dispatch(AppCommand::SubmitQuestion);

        let events =
            state.dispatch(AppCommand::QueryResolved(Err("bad question".to_owned())));
        assert_eq!(state.query.error, "bad question");
        assert!(state.query.sql.is_empty());
        assert!(state.query.results.is_empty());
        assert_eq!(events, vec![AppEvent::QueryFailed("bad question".to_owned())]);
    }

    #[test]
    fn failed_query_without_message_uses_generic_error() {
        let mut state = AppState::default();
        state.dispatch(AppCommand::QueryResolved(Err(String::new())));
        assert_eq!(state.query.error, "Server error");
    }

    #[test]
    fn overlapping_queries_apply_last_resolution() {
        let mut state = AppState::default();
        state.dispatch(AppCommand::SubmitQuestion);
        state.dispatch(AppCommand::SubmitQuestion);
        assert_eq!(state.query.in_flight, 2);

        state.dispatch(AppCommand::QueryResolved(Ok(outcome("SELECT 2", json!([])))));
        state.dispatch(AppCommand::QueryResolved(Ok(outcome("SELECT 1", json!([])))));
        assert_eq!(state.query.sql, "SELECT 1");
        assert_eq!(state.query.in_flight, 0);
    }

    #[test]
    fn selecting_table_issues_one_request_and_clears_stale_data() {
        let mut state = AppState::default();
        state.browser.data = TableData {
            columns: vec!["a".to_owned()],
            rows: outcome("", json!([{"a": 1}])).results,
        };
        state.browser.error = "stale".to_owned();

        let events = state.dispatch(AppCommand::SelectTable(Some("users".to_owned())));
        assert_eq!(
            requests_in(&events),
            vec![ApiRequest::TableData {
                table: "users".to_owned(),
            }],
        );
        assert_eq!(state.browser.selected.as_deref(), Some("users"));
        assert!(state.browser.data.is_empty());
        assert!(state.browser.error.is_empty());
    }

    #[test]
    fn selecting_placeholder_clears_without_request() {
        let mut state = AppState::default();
        state.browser.selected = Some("users".to_owned());
        state.browser.data = TableData {
            columns: vec!["a".to_owned()],
            rows: outcome("", json!([{"a": 1}])).results,
        };

        let events = state.dispatch(AppCommand::SelectTable(None));
        assert!(requests_in(&events).is_empty());
        assert_eq!(events, vec![AppEvent::TableCleared]);
        assert_eq!(state.browser.selected, None);
        assert!(state.browser.data.is_empty());

        let events = state.dispatch(AppCommand::SelectTable(Some(String::new())));
        assert!(requests_in(&events).is_empty());
    }

    #[test]
    fn table_data_resolution_replaces_data_wholesale() {
        let mut state = AppState::default();
        state.dispatch(AppCommand::SelectTable(Some("users".to_owned())));

        let data = TableData {
            columns: vec!["a".to_owned(), "b".to_owned()],
            rows: outcome("", json!([{"a": 1, "b": "x"}])).results,
        };
        let events = state.dispatch(AppCommand::TableDataResolved {
            table: "users".to_owned(),
            result: Ok(data.clone()),
        });
        assert_eq!(state.browser.data, data);
        assert_eq!(state.browser.in_flight, 0);
        assert_eq!(
            events[0],
            AppEvent::TableDisplayed {
                table: "users".to_owned(),
                rows: 1,
            },
        );
    }

    #[test]
    fn browser_errors_stay_independent_of_query_errors() {
        let mut state = AppState::default();
        state.dispatch(AppCommand::QueryResolved(Err("bad question".to_owned())));
        state.dispatch(AppCommand::LoadTables);
        state.dispatch(AppCommand::TablesResolved(Err("no db".to_owned())));

        assert_eq!(state.query.error, "bad question");
        assert_eq!(state.browser.error, "no db");

        state.dispatch(AppCommand::SelectTable(Some("users".to_owned())));
        state.dispatch(AppCommand::TableDataResolved {
            table: "users".to_owned(),
            result: Err("no such table".to_owned()),
        });
        assert_eq!(state.query.error, "bad question");
        assert_eq!(state.browser.error, "no such table");
    }

    #[test]
    fn load_tables_populates_list() {
        let mut state = AppState::default();
        let events = state.dispatch(AppCommand::LoadTables);
        assert_eq!(requests_in(&events), vec![ApiRequest::ListTables]);
        assert_eq!(state.browser.in_flight, 1);

        state.dispatch(AppCommand::TablesResolved(Ok(vec![
            "orders".to_owned(),
            "users".to_owned(),
        ])));
        assert_eq!(state.browser.tables, vec!["orders", "users"]);
        assert_eq!(state.status_line.as_deref(), Some("tables loaded: 2"));
    }

    #[test]
    fn focus_toggles_between_panels() {
        let mut state = AppState::default();
        assert_eq!(state.focus, Panel::Query);

        let events = state.dispatch(AppCommand::FocusNext);
        assert_eq!(state.focus, Panel::Browse);
        assert_eq!(events, vec![AppEvent::FocusChanged(Panel::Browse)]);

        state.dispatch(AppCommand::FocusNext);
        assert_eq!(state.focus, Panel::Query);
    }

    #[test]
    fn question_editing_commands() {
        let mut state = AppState::default();
        type_question(&mut state, "abc");
        state.dispatch(AppCommand::DeleteChar);
        assert_eq!(state.query.question, "ab");

        state.dispatch(AppCommand::ClearQuestion);
        assert!(state.query.question.is_empty());
    }

    #[test]
    fn panel_labels_round_trip_through_parse() {
        for panel in [Panel::Query, Panel::Browse] {
            assert_eq!(Panel::parse(panel.label()), Some(panel));
        }
        assert_eq!(Panel::parse("dashboard"), None);
    }
}
