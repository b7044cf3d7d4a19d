use rusqlite::{Connection, OptionalExtension};
use serde_json::json;

use crate::db;
use crate::ipc::error::{ok, HandlerErr};
use crate::ipc::guard;
use crate::ipc::helpers::{optional_str, required_field, required_i64};
use crate::ipc::types::{AppState, Request, Role, Session};

fn user_json(id: i64, name: &str, username: &str, role: &str, assigned_class: Option<&str>) -> serde_json::Value {
    json!({
        "id": id,
        "name": name,
        "username": username,
        "role": role,
        "assignedClass": assigned_class,
    })
}

fn username_taken(conn: &Connection, username: &str, exclude: Option<i64>) -> Result<bool, HandlerErr> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM users WHERE username = ?",
            [username],
            |r| r.get(0),
        )
        .optional()?;
    Ok(matches!(existing, Some(id) if Some(id) != exclude))
}

fn parse_role(params: &serde_json::Value) -> Result<Role, HandlerErr> {
    let raw = required_field(params, "role")?;
    Role::parse(&raw)
        .ok_or_else(|| HandlerErr::new("validation_failed", "role must be admin or teacher"))
}

/// Teacher accounts are scoped to exactly one class; admin accounts carry
/// none.
fn resolve_assigned_class(
    params: &serde_json::Value,
    role: Role,
) -> Result<Option<String>, HandlerErr> {
    match role {
        Role::Admin => Ok(None),
        Role::Teacher => {
            let class = optional_str(params, "assignedClass").unwrap_or_default();
            if class.trim().is_empty() {
                return Err(HandlerErr::new(
                    "validation_failed",
                    "teacher accounts need an assigned class",
                ));
            }
            Ok(Some(class.trim().to_string()))
        }
    }
}

fn list(conn: &Connection) -> Result<serde_json::Value, HandlerErr> {
    let mut stmt =
        conn.prepare("SELECT id, name, username, role, assigned_class FROM users ORDER BY id")?;
    let rows = stmt
        .query_map([], |r| {
            Ok(user_json(
                r.get(0)?,
                &r.get::<_, String>(1)?,
                &r.get::<_, String>(2)?,
                &r.get::<_, String>(3)?,
                r.get::<_, Option<String>>(4)?.as_deref(),
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(json!({ "users": rows }))
}

fn create(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let name = required_field(params, "name")?;
    let username = required_field(params, "username")?.to_lowercase();
    let password = required_field(params, "password")?;
    let role = parse_role(params)?;
    let assigned_class = resolve_assigned_class(params, role)?;

    if username_taken(conn, &username, None)? {
        return Err(HandlerErr::new("validation_failed", "username already exists"));
    }

    conn.execute(
        "INSERT INTO users(name, username, password_hash, role, assigned_class)
         VALUES(?, ?, ?, ?, ?)",
        (
            &name,
            &username,
            db::hash_password(&password),
            role.as_str(),
            &assigned_class,
        ),
    )
    .map_err(|e| HandlerErr::new("db_insert_failed", e.to_string()))?;

    Ok(json!({
        "user": user_json(
            conn.last_insert_rowid(),
            &name,
            &username,
            role.as_str(),
            assigned_class.as_deref(),
        )
    }))
}

fn update(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let user_id = required_i64(params, "userId")?;
    let exists: Option<i64> = conn
        .query_row("SELECT id FROM users WHERE id = ?", [user_id], |r| r.get(0))
        .optional()?;
    if exists.is_none() {
        return Err(HandlerErr::new("not_found", "user not found"));
    }

    let name = required_field(params, "name")?;
    let username = required_field(params, "username")?.to_lowercase();
    let role = parse_role(params)?;
    let assigned_class = resolve_assigned_class(params, role)?;

    if username_taken(conn, &username, Some(user_id))? {
        return Err(HandlerErr::new("validation_failed", "username already exists"));
    }

    conn.execute(
        "UPDATE users SET name = ?, username = ?, role = ?, assigned_class = ? WHERE id = ?",
        (&name, &username, role.as_str(), &assigned_class, user_id),
    )
    .map_err(|e| HandlerErr::new("db_update_failed", e.to_string()))?;

    // Empty password keeps the current one.
    let password = optional_str(params, "password").unwrap_or_default();
    if !password.is_empty() {
        conn.execute(
            "UPDATE users SET password_hash = ? WHERE id = ?",
            (db::hash_password(&password), user_id),
        )
        .map_err(|e| HandlerErr::new("db_update_failed", e.to_string()))?;
    }

    Ok(json!({
        "user": user_json(user_id, &name, &username, role.as_str(), assigned_class.as_deref())
    }))
}

fn delete(
    conn: &Connection,
    session: &Session,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let user_id = required_i64(params, "userId")?;
    let exists: Option<i64> = conn
        .query_row("SELECT id FROM users WHERE id = ?", [user_id], |r| r.get(0))
        .optional()?;
    if exists.is_none() {
        return Err(HandlerErr::new("not_found", "user not found"));
    }
    if user_id == session.user_id {
        return Err(HandlerErr::new(
            "validation_failed",
            "cannot delete the signed-in account",
        ));
    }

    conn.execute("DELETE FROM users WHERE id = ?", [user_id])
        .map_err(|e| HandlerErr::new("db_delete_failed", e.to_string()))?;
    Ok(json!({ "ok": true }))
}

fn dispatch(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let session = guard::require_admin(state)?;
    let conn = guard::db_conn(state)?;
    match req.method.as_str() {
        "users.list" => list(conn),
        "users.create" => create(conn, &req.params),
        "users.update" => update(conn, &req.params),
        "users.delete" => delete(conn, &session, &req.params),
        _ => unreachable!("routed method"),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "users.list" | "users.create" | "users.update" | "users.delete" => {
            Some(match dispatch(state, req) {
                Ok(result) => ok(&req.id, result),
                Err(e) => e.response(&req.id),
            })
        }
        _ => None,
    }
}
