use std::collections::HashSet;

use serde_json::json;

use crate::engine;
use crate::ipc::error::{ok, HandlerErr};
use crate::ipc::guard;
use crate::ipc::helpers::{day_param, required_i64, required_str};
use crate::ipc::types::{AppState, Request, Session};
use crate::store::{self, Kind, MarkStatus};

/// Overwrite the entity's working slot for the day. The local ledger updates
/// synchronously; the mirror write may fail without failing the call. The
/// failure is logged and reported through `persisted`, and the slot is
/// re-written by the next save anyway.
pub(super) fn mark_entity(
    state: &mut AppState,
    session: &Session,
    kind: Kind,
    id_key: &str,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let entity_id = required_i64(params, id_key)?;
    let status_raw = required_str(params, "status")?;
    let Some(status) = MarkStatus::parse(&status_raw) else {
        return Err(HandlerErr::new(
            "bad_params",
            "status must be present, absent or late",
        ));
    };
    let date = day_param(params, "date")?;

    {
        let conn = guard::db_conn(state)?;
        let entity = store::load_one(conn, kind, entity_id)?
            .ok_or_else(|| HandlerErr::new("not_found", format!("{} not found", kind.as_str())))?;
        guard::ensure_class_in_scope(session, &entity.class_key)?;
    }

    state.ledger.set(kind, entity_id, status, &date);

    let persisted = {
        let conn = guard::db_conn(state)?;
        match conn.execute(
            "INSERT INTO working_marks(kind, entity_id, mark_date, status)
             VALUES(?, ?, ?, ?)
             ON CONFLICT(kind, entity_id) DO UPDATE SET
               mark_date = excluded.mark_date,
               status = excluded.status",
            (kind.as_str(), entity_id, &date, status.as_str()),
        ) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(
                    kind = kind.as_str(),
                    entity_id,
                    error = %e,
                    "working mark mirror write failed"
                );
                false
            }
        }
    };

    Ok(json!({
        "entityId": entity_id,
        "status": status.as_str(),
        "date": date,
        "persisted": persisted,
    }))
}

pub(super) fn records(
    state: &AppState,
    session: &Session,
    kind: Kind,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let date = day_param(params, "date")?;
    let scope = guard::read_scope(session, None)?;
    let allowed: Option<HashSet<i64>> = match scope.as_deref() {
        Some(class_key) => {
            let conn = guard::db_conn(state)?;
            let ids = store::load_all(conn, kind, Some(class_key))?
                .into_iter()
                .map(|e| e.id)
                .collect();
            Some(ids)
        }
        None => None,
    };

    let mut map = serde_json::Map::new();
    for (entity_id, status) in state.ledger.marks_for_date(kind, &date) {
        if allowed.as_ref().is_some_and(|ids| !ids.contains(&entity_id)) {
            continue;
        }
        map.insert(entity_id.to_string(), json!(status.as_str()));
    }
    Ok(json!({ "records": map }))
}

pub(super) fn save_population(
    state: &mut AppState,
    session: &Session,
    kind: Kind,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let date = day_param(params, "date")?;
    let scope = guard::read_scope(session, None)?;

    let Some(conn) = state.db.as_ref() else {
        return Err(HandlerErr::new("no_workspace", "select a workspace first"));
    };
    let outcome = engine::save_day(conn, &mut state.ledger, kind, &date, scope.as_deref())
        .map_err(|e| HandlerErr::new(e.code, e.message))?;

    Ok(json!({ "updated": outcome.updated }))
}

fn dispatch(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let session = guard::current_session(state)?;
    match req.method.as_str() {
        "attendance.mark" => mark_entity(state, &session, Kind::Student, "studentId", &req.params),
        "attendance.records" => records(state, &session, Kind::Student, &req.params),
        "attendance.save" => save_population(state, &session, Kind::Student, &req.params),
        _ => unreachable!("routed method"),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "attendance.mark" | "attendance.records" | "attendance.save" => {
            Some(match dispatch(state, req) {
                Ok(result) => ok(&req.id, result),
                Err(e) => e.response(&req.id),
            })
        }
        _ => None,
    }
}
