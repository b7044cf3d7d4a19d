use rusqlite::{Connection, OptionalExtension};
use std::collections::HashMap;

use crate::store::{self, Entity, Kind, MarkStatus, WorkingLedger};

#[derive(Debug, Clone)]
pub struct EngineError {
    pub code: String,
    pub message: String,
}

impl EngineError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError {
            code: code.into(),
            message: message.into(),
        }
    }
}

fn db_err(e: rusqlite::Error) -> EngineError {
    EngineError::new("db_update_failed", e.to_string())
}

#[derive(Debug, Clone, Copy)]
pub struct SaveOutcome {
    pub updated: usize,
}

/// Commit one day of working marks for a population.
///
/// Runs as a single transaction: per-entity counters, the student
/// `daily_history` row, the permanent log and the ledger mirror either all
/// move or none do. The in-memory ledger is only cleared after commit, so a
/// failed save leaves the working day intact for retry.
///
/// A day is a replacement, not an increment: when the permanent log already
/// holds an entry for (entity, date), that entry's contribution is reversed
/// before the new mark is applied, so re-saving a day converges to the
/// latest marks instead of compounding them.
pub fn save_day(
    conn: &Connection,
    ledger: &mut WorkingLedger,
    kind: Kind,
    date: &str,
    class_scope: Option<&str>,
) -> Result<SaveOutcome, EngineError> {
    let entities = store::load_all(conn, kind, class_scope)
        .map_err(|e| EngineError::new("db_query_failed", e.to_string()))?;
    let by_id: HashMap<i64, &Entity> = entities.iter().map(|e| (e.id, e)).collect();

    let marks: Vec<(i64, MarkStatus)> = ledger
        .marks_for_date(kind, date)
        .into_iter()
        .filter(|(id, _)| by_id.contains_key(id))
        .collect();

    if marks.is_empty() {
        return Err(EngineError::new(
            "no_attendance_marked",
            "no attendance marked for this day",
        ));
    }

    let tx = conn.unchecked_transaction().map_err(db_err)?;

    let mut present_c: i64 = 0;
    let mut absent_c: i64 = 0;
    let mut late_c: i64 = 0;

    for (entity_id, status) in &marks {
        let entity = by_id[entity_id];
        let mut present = entity.present_count;
        let mut absent = entity.absent_count;
        let mut total = entity.total_classes;

        let prior: Option<String> = tx
            .query_row(
                "SELECT status FROM attendance_log
                 WHERE kind = ? AND entity_id = ? AND record_date = ?",
                (kind.as_str(), entity_id, date),
                |r| r.get(0),
            )
            .optional()
            .map_err(|e| EngineError::new("db_query_failed", e.to_string()))?;
        if let Some(prior_status) = prior.as_deref().and_then(MarkStatus::parse) {
            if prior_status.counts_as_present() {
                present -= 1;
            } else {
                absent -= 1;
            }
            total -= 1;
        }

        total += 1;
        if status.counts_as_present() {
            present += 1;
        } else {
            absent += 1;
        }
        let rate = store::attendance_rate(present, total);

        let sql = format!(
            "UPDATE {} SET present_count = ?, absent_count = ?, total_classes = ?,
                           attendance = ?, status = ?
             WHERE id = ?",
            kind.table()
        );
        tx.execute(&sql, (present, absent, total, rate, status.as_str(), entity_id))
            .map_err(db_err)?;

        tx.execute(
            "INSERT INTO attendance_log(kind, entity_id, record_date, status)
             VALUES(?, ?, ?, ?)
             ON CONFLICT(kind, entity_id, record_date) DO UPDATE SET
               status = excluded.status",
            (kind.as_str(), entity_id, date, status.as_str()),
        )
        .map_err(db_err)?;

        match status {
            MarkStatus::Present => present_c += 1,
            MarkStatus::Absent => absent_c += 1,
            MarkStatus::Late => late_c += 1,
        }
    }

    // Population-level history tracks students only; last write for a date
    // wins, so re-running save corrects the prior tally.
    if kind == Kind::Student {
        tx.execute(
            "INSERT INTO daily_history(record_date, present_count, absent_count, late_count)
             VALUES(?, ?, ?, ?)
             ON CONFLICT(record_date) DO UPDATE SET
               present_count = excluded.present_count,
               absent_count = excluded.absent_count,
               late_count = excluded.late_count",
            (date, present_c, absent_c, late_c),
        )
        .map_err(db_err)?;
    }

    tx.execute("DELETE FROM working_marks WHERE kind = ?", [kind.as_str()])
        .map_err(db_err)?;

    tx.commit()
        .map_err(|e| EngineError::new("db_commit_failed", e.to_string()))?;

    ledger.clear(kind);

    Ok(SaveOutcome {
        updated: marks.len(),
    })
}
