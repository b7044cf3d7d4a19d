use serde_json::json;

use crate::agg;
use crate::ipc::error::{ok, HandlerErr};
use crate::ipc::guard;
use crate::ipc::types::{AppState, Request, Session};
use crate::store::{self, Kind, GRADE_KEYS};

use super::dashboard;

fn grade_averages(state: &AppState, session: &Session) -> Result<serde_json::Value, HandlerErr> {
    let scope = guard::read_scope(session, None)?;
    let conn = guard::db_conn(state)?;
    let students = store::load_all(conn, Kind::Student, scope.as_deref())?;
    let grades: Vec<serde_json::Value> = agg::grade_averages(&GRADE_KEYS, &students)
        .into_iter()
        .map(|g| {
            json!({
                "grade": g.grade,
                "studentCount": g.student_count,
                "average": g.average,
            })
        })
        .collect();
    Ok(json!({ "grades": grades }))
}

fn monthly_summary(state: &AppState) -> Result<serde_json::Value, HandlerErr> {
    let conn = guard::db_conn(state)?;
    let rows = dashboard::load_history(conn, None)?;
    let Some(summary) = agg::period_summary(&rows) else {
        return Ok(json!({ "summary": serde_json::Value::Null }));
    };
    Ok(json!({
        "summary": {
            "presentPct": summary.present_pct,
            "absentPct": summary.absent_pct,
            "latePct": summary.late_pct,
            "totalDays": summary.total_days,
            "avgDailyPresent": summary.avg_daily_present,
            "bestDay": { "date": summary.best_day.date, "present": summary.best_day.present },
            "worstDay": { "date": summary.worst_day.date, "present": summary.worst_day.present },
        }
    }))
}

fn attention(state: &AppState, session: &Session) -> Result<serde_json::Value, HandlerErr> {
    let scope = guard::read_scope(session, None)?;
    let conn = guard::db_conn(state)?;
    let students = store::load_all(conn, Kind::Student, scope.as_deref())?;
    let low: Vec<serde_json::Value> = agg::attention_list(&students)
        .into_iter()
        .map(|s| {
            json!({
                "id": s.id,
                "name": s.name,
                "grade": s.class_key,
                "avatar": s.avatar,
                "attendance": s.attendance,
            })
        })
        .collect();
    Ok(json!({ "students": low, "threshold": agg::ATTENTION_THRESHOLD }))
}

fn dispatch(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let session = guard::current_session(state)?;
    match req.method.as_str() {
        "reports.gradeAverages" => grade_averages(state, &session),
        "reports.monthlySummary" => monthly_summary(state),
        "reports.attention" => attention(state, &session),
        _ => unreachable!("routed method"),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.gradeAverages" | "reports.monthlySummary" | "reports.attention" => {
            Some(match dispatch(state, req) {
                Ok(result) => ok(&req.id, result),
                Err(e) => e.response(&req.id),
            })
        }
        _ => None,
    }
}
