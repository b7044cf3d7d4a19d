use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;

use crate::store::WorkingLedger;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Teacher,
}

impl Role {
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "admin" => Some(Role::Admin),
            "teacher" => Some(Role::Teacher),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Teacher => "teacher",
        }
    }
}

/// The signed-in account for this daemon process. One session at a time;
/// login replaces it, logout clears it.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: i64,
    pub name: String,
    pub role: Role,
    pub assigned_class: Option<String>,
    pub token: String,
}

/// Root-owned shared state: workspace, connection, session and the working
/// ledger all live here and are passed into handlers, never reached as
/// globals.
pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub session: Option<Session>,
    pub ledger: WorkingLedger,
}

impl AppState {
    pub fn new() -> Self {
        AppState {
            workspace: None,
            db: None,
            session: None,
            ledger: WorkingLedger::default(),
        }
    }
}
