use rusqlite::Connection;
use serde_json::json;

use crate::ipc::error::{ok, HandlerErr};
use crate::ipc::guard;
use crate::ipc::helpers::{optional_str, required_field, required_i64};
use crate::ipc::types::{AppState, Request};
use crate::store::{self, Entity, Kind};

fn teacher_json(t: &Entity) -> serde_json::Value {
    json!({
        "id": t.id,
        "name": t.name,
        "subject": t.subject,
        "assignedClass": t.class_key,
        "whatsapp": t.whatsapp,
        "avatar": t.avatar,
        "attendance": t.attendance,
        "status": t.status,
        "totalClasses": t.total_classes,
        "presentCount": t.present_count,
        "absentCount": t.absent_count,
    })
}

fn load_teacher(conn: &Connection, id: i64) -> Result<Entity, HandlerErr> {
    store::load_one(conn, Kind::Teacher, id)?
        .ok_or_else(|| HandlerErr::new("not_found", "teacher not found"))
}

fn list(conn: &Connection) -> Result<serde_json::Value, HandlerErr> {
    let teachers = store::load_all(conn, Kind::Teacher, None)?;
    let rows: Vec<serde_json::Value> = teachers.iter().map(teacher_json).collect();
    Ok(json!({ "teachers": rows }))
}

fn create(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let name = required_field(params, "name")?;
    let assigned_class = required_field(params, "assignedClass")?;
    let subject = optional_str(params, "subject").unwrap_or_default();
    let whatsapp = optional_str(params, "whatsapp").unwrap_or_default();
    let avatar = store::avatar_initials(&name);

    conn.execute(
        "INSERT INTO teachers(name, subject, assigned_class, whatsapp, avatar, attendance,
                              status, total_classes, present_count, absent_count)
         VALUES(?, ?, ?, ?, ?, 100, 'none', 0, 0, 0)",
        (&name, &subject, &assigned_class, &whatsapp, &avatar),
    )
    .map_err(|e| HandlerErr::new("db_insert_failed", e.to_string()))?;

    let teacher = load_teacher(conn, conn.last_insert_rowid())?;
    Ok(json!({ "teacher": teacher_json(&teacher) }))
}

fn update(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let teacher_id = required_i64(params, "teacherId")?;
    let existing = load_teacher(conn, teacher_id)?;

    let name = required_field(params, "name")?;
    let assigned_class = required_field(params, "assignedClass")?;
    let subject = optional_str(params, "subject").unwrap_or(existing.subject);
    let whatsapp = optional_str(params, "whatsapp").unwrap_or(existing.whatsapp);
    let avatar = store::avatar_initials(&name);

    conn.execute(
        "UPDATE teachers SET name = ?, subject = ?, assigned_class = ?, whatsapp = ?, avatar = ?
         WHERE id = ?",
        (&name, &subject, &assigned_class, &whatsapp, &avatar, teacher_id),
    )
    .map_err(|e| HandlerErr::new("db_update_failed", e.to_string()))?;

    let teacher = load_teacher(conn, teacher_id)?;
    Ok(json!({ "teacher": teacher_json(&teacher) }))
}

fn delete(conn: &Connection, params: &serde_json::Value) -> Result<i64, HandlerErr> {
    let teacher_id = required_i64(params, "teacherId")?;
    load_teacher(conn, teacher_id)?;

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| HandlerErr::new("db_tx_failed", e.to_string()))?;
    tx.execute(
        "DELETE FROM working_marks WHERE kind = 'teacher' AND entity_id = ?",
        [teacher_id],
    )
    .map_err(|e| HandlerErr::new("db_delete_failed", e.to_string()))?;
    tx.execute("DELETE FROM teachers WHERE id = ?", [teacher_id])
        .map_err(|e| HandlerErr::new("db_delete_failed", e.to_string()))?;
    tx.commit()
        .map_err(|e| HandlerErr::new("db_commit_failed", e.to_string()))?;

    Ok(teacher_id)
}

fn dispatch(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    // The whole roster surface is admin-only, not merely hidden from the UI.
    guard::require_admin(state)?;
    match req.method.as_str() {
        "teachers.list" => list(guard::db_conn(state)?),
        "teachers.create" => create(guard::db_conn(state)?, &req.params),
        "teachers.update" => update(guard::db_conn(state)?, &req.params),
        "teachers.delete" => {
            let teacher_id = delete(guard::db_conn(state)?, &req.params)?;
            state.ledger.remove(Kind::Teacher, teacher_id);
            Ok(json!({ "ok": true }))
        }
        _ => unreachable!("routed method"),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "teachers.list" | "teachers.create" | "teachers.update" | "teachers.delete" => {
            Some(match dispatch(state, req) {
                Ok(result) => ok(&req.id, result),
                Err(e) => e.response(&req.id),
            })
        }
        _ => None,
    }
}
