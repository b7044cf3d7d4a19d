use rusqlite::{params_from_iter, types::Value};
use serde_json::json;

use crate::ipc::error::{ok, HandlerErr};
use crate::ipc::guard;
use crate::ipc::helpers::{optional_day, optional_str};
use crate::ipc::types::{AppState, Request, Session};

/// Permanent-log queries. These read the `attendance_log` table written by
/// save, never the working ledger, so results survive the post-save clear.

fn student_log(
    state: &AppState,
    session: &Session,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let date = optional_day(params, "date")?;
    let requested_grade = optional_str(params, "grade");
    let grade = guard::read_scope(session, requested_grade.as_deref())?;

    let mut sql = "SELECT al.record_date, al.status, s.id, s.name, s.grade
                   FROM attendance_log al
                   JOIN students s ON s.id = al.entity_id
                   WHERE al.kind = 'student'"
        .to_string();
    let mut values: Vec<Value> = Vec::new();
    if let Some(d) = &date {
        sql.push_str(" AND al.record_date = ?");
        values.push(Value::Text(d.clone()));
    }
    if let Some(g) = &grade {
        sql.push_str(" AND s.grade = ?");
        values.push(Value::Text(g.clone()));
    }
    sql.push_str(" ORDER BY al.record_date DESC, s.grade, s.name");

    let conn = guard::db_conn(state)?;
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(values), |r| {
            Ok(json!({
                "date": r.get::<_, String>(0)?,
                "status": r.get::<_, String>(1)?,
                "studentId": r.get::<_, i64>(2)?,
                "name": r.get::<_, String>(3)?,
                "grade": r.get::<_, String>(4)?,
            }))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(json!({ "records": rows }))
}

fn teacher_log(
    state: &AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let date = optional_day(params, "date")?;

    let mut sql = "SELECT al.record_date, al.status, t.id, t.name, t.subject, t.assigned_class
                   FROM attendance_log al
                   JOIN teachers t ON t.id = al.entity_id
                   WHERE al.kind = 'teacher'"
        .to_string();
    let mut values: Vec<Value> = Vec::new();
    if let Some(d) = &date {
        sql.push_str(" AND al.record_date = ?");
        values.push(Value::Text(d.clone()));
    }
    sql.push_str(" ORDER BY al.record_date DESC, t.name");

    let conn = guard::db_conn(state)?;
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(values), |r| {
            Ok(json!({
                "date": r.get::<_, String>(0)?,
                "status": r.get::<_, String>(1)?,
                "teacherId": r.get::<_, i64>(2)?,
                "name": r.get::<_, String>(3)?,
                "subject": r.get::<_, String>(4)?,
                "assignedClass": r.get::<_, String>(5)?,
            }))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(json!({ "records": rows }))
}

fn dispatch(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    match req.method.as_str() {
        "log.query" => {
            let session = guard::current_session(state)?;
            student_log(state, &session, &req.params)
        }
        "teacherLog.query" => {
            guard::require_admin(state)?;
            teacher_log(state, &req.params)
        }
        _ => unreachable!("routed method"),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "log.query" | "teacherLog.query" => Some(match dispatch(state, req) {
            Ok(result) => ok(&req.id, result),
            Err(e) => e.response(&req.id),
        }),
        _ => None,
    }
}
