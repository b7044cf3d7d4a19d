use std::collections::HashSet;

use rusqlite::{Connection, OptionalExtension};
use serde_json::json;

use crate::agg::{self, DayRow};
use crate::ipc::error::{ok, HandlerErr};
use crate::ipc::guard;
use crate::ipc::helpers::day_param;
use crate::ipc::types::{AppState, Request, Session};
use crate::store::{self, Kind, MarkStatus};

pub(super) fn load_history(
    conn: &Connection,
    limit: Option<usize>,
) -> Result<Vec<DayRow>, HandlerErr> {
    let mut sql = "SELECT record_date, present_count, absent_count, late_count
                   FROM daily_history ORDER BY record_date DESC"
        .to_string();
    if let Some(n) = limit {
        sql.push_str(&format!(" LIMIT {}", n));
    }
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |r| {
            Ok(DayRow {
                date: r.get(0)?,
                present: r.get(1)?,
                absent: r.get(2)?,
                late: r.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn history_row(conn: &Connection, date: &str) -> Result<Option<DayRow>, HandlerErr> {
    let row = conn
        .query_row(
            "SELECT record_date, present_count, absent_count, late_count
             FROM daily_history WHERE record_date = ?",
            [date],
            |r| {
                Ok(DayRow {
                    date: r.get(0)?,
                    present: r.get(1)?,
                    absent: r.get(2)?,
                    late: r.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

fn stats(
    state: &AppState,
    session: &Session,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let date = day_param(params, "date")?;
    let scope = guard::read_scope(session, None)?;
    let conn = guard::db_conn(state)?;

    let students = store::load_all(conn, Kind::Student, scope.as_deref())?;
    let ids: HashSet<i64> = students.iter().map(|s| s.id).collect();

    let working: Vec<MarkStatus> = state
        .ledger
        .marks_for_date(Kind::Student, &date)
        .into_iter()
        .filter(|(id, _)| ids.contains(id))
        .map(|(_, status)| status)
        .collect();
    let saved = history_row(conn, &date)?;

    let stats = agg::today_stats(&working, saved.as_ref());
    Ok(json!({
        "totalStudents": students.len(),
        "present": stats.present,
        "absent": stats.absent,
        "late": stats.late,
        "source": stats.source.as_str(),
    }))
}

fn trends(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let limit = params
        .get("limit")
        .and_then(|v| v.as_u64())
        .map(|n| n as usize)
        .unwrap_or(agg::DEFAULT_TREND_DAYS);
    let conn = guard::db_conn(state)?;
    let rows = load_history(conn, Some(limit))?;
    let series: Vec<serde_json::Value> = agg::trend_series(&rows, limit)
        .into_iter()
        .map(|t| {
            json!({
                "date": t.date,
                "total": t.total,
                "presentPct": t.present_pct,
                "absentPct": t.absent_pct,
                "latePct": t.late_pct,
            })
        })
        .collect();
    Ok(json!({ "trends": series }))
}

fn top_performers(state: &AppState, session: &Session) -> Result<serde_json::Value, HandlerErr> {
    let scope = guard::read_scope(session, None)?;
    let conn = guard::db_conn(state)?;
    let students = store::load_all(conn, Kind::Student, scope.as_deref())?;
    let top: Vec<serde_json::Value> = agg::top_performers(&students)
        .into_iter()
        .map(|p| {
            json!({
                "id": p.id,
                "name": p.name,
                "grade": p.class_key,
                "rate": p.rate,
                "rank": p.rank,
                "badge": p.badge,
            })
        })
        .collect();
    Ok(json!({ "performers": top }))
}

fn dispatch(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let session = guard::current_session(state)?;
    match req.method.as_str() {
        "dashboard.stats" => stats(state, &session, &req.params),
        "dashboard.trends" => trends(state, &req.params),
        "dashboard.topPerformers" => top_performers(state, &session),
        _ => unreachable!("routed method"),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "dashboard.stats" | "dashboard.trends" | "dashboard.topPerformers" => {
            Some(match dispatch(state, req) {
                Ok(result) => ok(&req.id, result),
                Err(e) => e.response(&req.id),
            })
        }
        _ => None,
    }
}
