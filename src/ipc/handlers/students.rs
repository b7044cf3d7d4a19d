use rusqlite::Connection;
use serde_json::json;

use crate::ipc::error::{ok, HandlerErr};
use crate::ipc::guard;
use crate::ipc::helpers::{optional_str, required_field, required_i64};
use crate::ipc::types::{AppState, Request, Session};
use crate::store::{self, Entity, Kind};

fn student_json(s: &Entity) -> serde_json::Value {
    json!({
        "id": s.id,
        "name": s.name,
        "grade": s.class_key,
        "whatsapp": s.whatsapp,
        "avatar": s.avatar,
        "birthdate": s.birthdate,
        "attendance": s.attendance,
        "status": s.status,
        "totalClasses": s.total_classes,
        "presentCount": s.present_count,
        "absentCount": s.absent_count,
    })
}

fn load_student(conn: &Connection, id: i64) -> Result<Entity, HandlerErr> {
    store::load_one(conn, Kind::Student, id)?
        .ok_or_else(|| HandlerErr::new("not_found", "student not found"))
}

fn list(
    conn: &Connection,
    session: &Session,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let requested = optional_str(params, "grade");
    let scope = guard::read_scope(session, requested.as_deref())?;
    let students = store::load_all(conn, Kind::Student, scope.as_deref())?;
    let rows: Vec<serde_json::Value> = students.iter().map(student_json).collect();
    Ok(json!({ "students": rows }))
}

fn create(
    conn: &Connection,
    session: &Session,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let name = required_field(params, "name")?;
    let grade = required_field(params, "grade")?;
    guard::ensure_class_in_scope(session, &grade)?;
    let whatsapp = optional_str(params, "whatsapp").unwrap_or_default();
    let avatar = store::avatar_initials(&name);

    conn.execute(
        "INSERT INTO students(name, grade, whatsapp, avatar, attendance, status,
                              total_classes, present_count, absent_count)
         VALUES(?, ?, ?, ?, 100, 'none', 0, 0, 0)",
        (&name, &grade, &whatsapp, &avatar),
    )
    .map_err(|e| HandlerErr::new("db_insert_failed", e.to_string()))?;

    let student = load_student(conn, conn.last_insert_rowid())?;
    Ok(json!({ "student": student_json(&student) }))
}

fn update(
    conn: &Connection,
    session: &Session,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = required_i64(params, "studentId")?;
    let existing = load_student(conn, student_id)?;
    guard::ensure_class_in_scope(session, &existing.class_key)?;

    let name = required_field(params, "name")?;
    let grade = required_field(params, "grade")?;
    guard::ensure_class_in_scope(session, &grade)?;
    let whatsapp = optional_str(params, "whatsapp").unwrap_or(existing.whatsapp);
    let birthdate = optional_str(params, "birthdate").unwrap_or(existing.birthdate);
    let avatar = store::avatar_initials(&name);

    conn.execute(
        "UPDATE students SET name = ?, grade = ?, whatsapp = ?, birthdate = ?, avatar = ?
         WHERE id = ?",
        (&name, &grade, &whatsapp, &birthdate, &avatar, student_id),
    )
    .map_err(|e| HandlerErr::new("db_update_failed", e.to_string()))?;

    let student = load_student(conn, student_id)?;
    Ok(json!({ "student": student_json(&student) }))
}

fn delete(
    conn: &Connection,
    session: &Session,
    params: &serde_json::Value,
) -> Result<i64, HandlerErr> {
    let student_id = required_i64(params, "studentId")?;
    let existing = load_student(conn, student_id)?;
    guard::ensure_class_in_scope(session, &existing.class_key)?;

    // The working slot goes with the entity; past log entries stay.
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| HandlerErr::new("db_tx_failed", e.to_string()))?;
    tx.execute(
        "DELETE FROM working_marks WHERE kind = 'student' AND entity_id = ?",
        [student_id],
    )
    .map_err(|e| HandlerErr::new("db_delete_failed", e.to_string()))?;
    tx.execute("DELETE FROM students WHERE id = ?", [student_id])
        .map_err(|e| HandlerErr::new("db_delete_failed", e.to_string()))?;
    tx.commit()
        .map_err(|e| HandlerErr::new("db_commit_failed", e.to_string()))?;

    Ok(student_id)
}

fn history(
    conn: &Connection,
    session: &Session,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = required_i64(params, "studentId")?;
    let existing = load_student(conn, student_id)?;
    guard::ensure_class_in_scope(session, &existing.class_key)?;

    let mut stmt = conn.prepare(
        "SELECT record_date, status FROM attendance_log
         WHERE kind = 'student' AND entity_id = ?
         ORDER BY record_date DESC",
    )?;
    let rows = stmt
        .query_map([student_id], |r| {
            Ok(json!({
                "date": r.get::<_, String>(0)?,
                "status": r.get::<_, String>(1)?,
            }))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(json!({ "records": rows }))
}

fn dispatch(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let session = guard::current_session(state)?;
    match req.method.as_str() {
        "students.list" => list(guard::db_conn(state)?, &session, &req.params),
        "students.create" => create(guard::db_conn(state)?, &session, &req.params),
        "students.update" => update(guard::db_conn(state)?, &session, &req.params),
        "students.delete" => {
            let student_id = delete(guard::db_conn(state)?, &session, &req.params)?;
            state.ledger.remove(Kind::Student, student_id);
            Ok(json!({ "ok": true }))
        }
        "students.history" => history(guard::db_conn(state)?, &session, &req.params),
        _ => unreachable!("routed method"),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" | "students.create" | "students.update" | "students.delete"
        | "students.history" => Some(match dispatch(state, req) {
            Ok(result) => ok(&req.id, result),
            Err(e) => e.response(&req.id),
        }),
        _ => None,
    }
}
