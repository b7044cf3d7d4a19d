use rusqlite::Connection;
use sha2::{Digest, Sha256};
use std::path::Path;

pub const DB_FILE: &str = "rollcall.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE);
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            grade TEXT NOT NULL,
            whatsapp TEXT NOT NULL DEFAULT '',
            avatar TEXT NOT NULL DEFAULT '',
            attendance INTEGER NOT NULL DEFAULT 100,
            status TEXT NOT NULL DEFAULT 'none',
            total_classes INTEGER NOT NULL DEFAULT 0,
            present_count INTEGER NOT NULL DEFAULT 0,
            absent_count INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_grade ON students(grade)",
        [],
    )?;

    // Older workspaces predate the birthdate field. Add it if needed.
    ensure_students_birthdate(&conn)?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS teachers(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            subject TEXT NOT NULL DEFAULT '',
            assigned_class TEXT NOT NULL,
            whatsapp TEXT NOT NULL DEFAULT '',
            avatar TEXT NOT NULL DEFAULT '',
            attendance INTEGER NOT NULL DEFAULT 100,
            status TEXT NOT NULL DEFAULT 'none',
            total_classes INTEGER NOT NULL DEFAULT 0,
            present_count INTEGER NOT NULL DEFAULT 0,
            absent_count INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;

    // One working slot per entity; marking overwrites, never appends.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS working_marks(
            kind TEXT NOT NULL,
            entity_id INTEGER NOT NULL,
            mark_date TEXT NOT NULL,
            status TEXT NOT NULL,
            PRIMARY KEY(kind, entity_id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS daily_history(
            record_date TEXT PRIMARY KEY,
            present_count INTEGER NOT NULL DEFAULT 0,
            absent_count INTEGER NOT NULL DEFAULT 0,
            late_count INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;

    // Permanent per-entity-per-date log, written only by save.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS attendance_log(
            kind TEXT NOT NULL,
            entity_id INTEGER NOT NULL,
            record_date TEXT NOT NULL,
            status TEXT NOT NULL,
            PRIMARY KEY(kind, entity_id, record_date)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_log_date ON attendance_log(kind, record_date)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS users(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            role TEXT NOT NULL,
            assigned_class TEXT
        )",
        [],
    )?;

    seed_default_admin(&conn)?;

    Ok(conn)
}

fn ensure_students_birthdate(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "students", "birthdate")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE students ADD COLUMN birthdate TEXT", [])?;
    Ok(())
}

/// A fresh workspace must be reachable; seed admin/admin until the operator
/// rotates it.
fn seed_default_admin(conn: &Connection) -> anyhow::Result<()> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?;
    if count > 0 {
        return Ok(());
    }
    conn.execute(
        "INSERT INTO users(name, username, password_hash, role, assigned_class)
         VALUES(?, ?, ?, 'admin', NULL)",
        ("Administrator", "admin", hash_password("admin")),
    )?;
    Ok(())
}

pub fn hash_password(raw: &str) -> String {
    format!("{:x}", Sha256::digest(raw.as_bytes()))
}

pub fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}
