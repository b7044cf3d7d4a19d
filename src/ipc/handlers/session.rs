use rusqlite::OptionalExtension;
use serde_json::json;
use uuid::Uuid;

use crate::db;
use crate::ipc::error::{ok, HandlerErr};
use crate::ipc::guard;
use crate::ipc::helpers::required_field;
use crate::ipc::types::{AppState, Request, Role, Session};

fn login(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let username = required_field(params, "username")?.to_lowercase();
    let password = required_field(params, "password")?;

    let row = {
        let conn = guard::db_conn(state)?;
        conn.query_row(
            "SELECT id, name, role, assigned_class, password_hash
             FROM users WHERE username = ?",
            [&username],
            |r| {
                Ok((
                    r.get::<_, i64>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, Option<String>>(3)?,
                    r.get::<_, String>(4)?,
                ))
            },
        )
        .optional()?
    };

    let Some((user_id, name, role_raw, assigned_class, password_hash)) = row else {
        return Err(HandlerErr::new(
            "invalid_credentials",
            "unknown username or wrong password",
        ));
    };
    if db::hash_password(&password) != password_hash {
        return Err(HandlerErr::new(
            "invalid_credentials",
            "unknown username or wrong password",
        ));
    }
    let Some(role) = Role::parse(&role_raw) else {
        return Err(HandlerErr::new(
            "db_query_failed",
            format!("account has an unknown role: {}", role_raw),
        ));
    };

    let token = Uuid::new_v4().to_string();
    state.session = Some(Session {
        user_id,
        name: name.clone(),
        role,
        assigned_class: assigned_class.clone(),
        token: token.clone(),
    });

    Ok(json!({
        "token": token,
        "name": name,
        "role": role.as_str(),
        "assignedClass": assigned_class,
    }))
}

fn current(state: &AppState) -> Result<serde_json::Value, HandlerErr> {
    let session = guard::current_session(state)?;
    Ok(json!({
        "name": session.name,
        "role": session.role.as_str(),
        "assignedClass": session.assigned_class,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "session.login" => Some(match login(state, &req.params) {
            Ok(result) => ok(&req.id, result),
            Err(e) => e.response(&req.id),
        }),
        "session.logout" => {
            state.session = None;
            Some(ok(&req.id, json!({ "ok": true })))
        }
        "session.current" => Some(match current(state) {
            Ok(result) => ok(&req.id, result),
            Err(e) => e.response(&req.id),
        }),
        _ => None,
    }
}
