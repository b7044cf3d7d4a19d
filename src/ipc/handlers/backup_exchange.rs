use serde_json::json;
use std::path::PathBuf;

use crate::backup;
use crate::db;
use crate::ipc::error::{ok, HandlerErr};
use crate::ipc::guard;
use crate::ipc::helpers::required_str;
use crate::ipc::types::{AppState, Request};
use crate::store;

fn export(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let out_path = PathBuf::from(required_str(params, "outPath")?);
    let Some(workspace) = state.workspace.as_ref() else {
        return Err(HandlerErr::new("no_workspace", "select a workspace first"));
    };

    let summary = backup::export_workspace_bundle(workspace, &out_path)
        .map_err(|e| HandlerErr::new("backup_export_failed", format!("{e:?}")))?;
    Ok(json!({
        "bundleFormat": summary.bundle_format,
        "entryCount": summary.entry_count,
        "dbSha256": summary.db_sha256,
        "outPath": out_path.to_string_lossy(),
    }))
}

fn import(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let in_path = PathBuf::from(required_str(params, "inPath")?);
    let Some(workspace) = state.workspace.clone() else {
        return Err(HandlerErr::new("no_workspace", "select a workspace first"));
    };

    // The connection must be closed before the database file is replaced.
    state.db = None;
    let restored = backup::import_workspace_bundle(&in_path, &workspace)
        .map_err(|e| HandlerErr::new("backup_import_failed", format!("{e:?}")));

    let conn = db::open_db(&workspace)
        .map_err(|e| HandlerErr::new("db_open_failed", format!("{e:?}")))?;
    let ledger = store::hydrate_ledger(&conn)?;
    state.db = Some(conn);
    state.ledger = ledger;
    // Restored accounts are authoritative; the old session no longer maps.
    state.session = None;

    let summary = restored?;
    Ok(json!({ "bundleFormat": summary.bundle_format_detected }))
}

fn dispatch(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    guard::require_admin(state)?;
    match req.method.as_str() {
        "backup.export" => export(state, &req.params),
        "backup.import" => import(state, &req.params),
        _ => unreachable!("routed method"),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.export" | "backup.import" => Some(match dispatch(state, req) {
            Ok(result) => ok(&req.id, result),
            Err(e) => e.response(&req.id),
        }),
        _ => None,
    }
}
