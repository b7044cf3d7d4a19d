use rusqlite::Connection;

use super::error::HandlerErr;
use super::types::{AppState, Role, Session};

/// Role scoping is enforced here, at the data boundary, for every read and
/// write; hiding a selector client-side is not an access-control boundary.

pub fn db_conn<'a>(state: &'a AppState) -> Result<&'a Connection, HandlerErr> {
    state
        .db
        .as_ref()
        .ok_or_else(|| HandlerErr::new("no_workspace", "select a workspace first"))
}

pub fn current_session(state: &AppState) -> Result<Session, HandlerErr> {
    state
        .session
        .clone()
        .ok_or_else(|| HandlerErr::new("no_session", "login first"))
}

pub fn require_admin(state: &AppState) -> Result<Session, HandlerErr> {
    let session = current_session(state)?;
    if session.role != Role::Admin {
        return Err(HandlerErr::new(
            "forbidden",
            "this operation requires the admin role",
        ));
    }
    Ok(session)
}

fn teacher_class(session: &Session) -> Result<String, HandlerErr> {
    session
        .assigned_class
        .clone()
        .ok_or_else(|| HandlerErr::new("forbidden", "teacher account has no assigned class"))
}

/// The class filter a read actually runs with. An admin's requested filter
/// is honored ("all" means none); a teacher is pinned to the assigned class
/// and any supplied filter is ignored.
pub fn read_scope(
    session: &Session,
    requested: Option<&str>,
) -> Result<Option<String>, HandlerErr> {
    match session.role {
        Role::Admin => Ok(requested
            .filter(|g| !g.is_empty() && *g != "all")
            .map(|g| g.to_string())),
        Role::Teacher => Ok(Some(teacher_class(session)?)),
    }
}

/// Any access naming a class outside the caller's scope fails loudly, never
/// silently no-ops.
pub fn ensure_class_in_scope(session: &Session, class_key: &str) -> Result<(), HandlerErr> {
    match session.role {
        Role::Admin => Ok(()),
        Role::Teacher => {
            let assigned = teacher_class(session)?;
            if assigned == class_key {
                Ok(())
            } else {
                Err(HandlerErr::new(
                    "forbidden",
                    format!("class {} is outside your assigned class", class_key),
                ))
            }
        }
    }
}
