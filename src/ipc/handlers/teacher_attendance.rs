use crate::ipc::error::ok;
use crate::ipc::error::HandlerErr;
use crate::ipc::guard;
use crate::ipc::types::{AppState, Request};
use crate::store::Kind;

use super::attendance;

/// Teacher attendance is an admin-only surface; the engine underneath is the
/// same one the student population uses.
fn dispatch(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let session = guard::require_admin(state)?;
    match req.method.as_str() {
        "teacherAttendance.mark" => {
            attendance::mark_entity(state, &session, Kind::Teacher, "teacherId", &req.params)
        }
        "teacherAttendance.records" => {
            attendance::records(state, &session, Kind::Teacher, &req.params)
        }
        "teacherAttendance.save" => {
            attendance::save_population(state, &session, Kind::Teacher, &req.params)
        }
        _ => unreachable!("routed method"),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "teacherAttendance.mark" | "teacherAttendance.records" | "teacherAttendance.save" => {
            Some(match dispatch(state, req) {
                Ok(result) => ok(&req.id, result),
                Err(e) => e.response(&req.id),
            })
        }
        _ => None,
    }
}
