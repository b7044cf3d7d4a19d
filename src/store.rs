use rusqlite::{Connection, OptionalExtension};
use std::collections::HashMap;

/// Grade keys known to the system, in report order.
pub const GRADE_KEYS: [&str; 14] = [
    "KG1", "KG2", "1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "12",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Student,
    Teacher,
}

impl Kind {
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Student => "student",
            Kind::Teacher => "teacher",
        }
    }

    pub fn table(self) -> &'static str {
        match self {
            Kind::Student => "students",
            Kind::Teacher => "teachers",
        }
    }
}

/// A markable status. Entity `status` additionally holds "none" before the
/// first save; in the ledger, absence of a slot is "none".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkStatus {
    Present,
    Absent,
    Late,
}

impl MarkStatus {
    pub fn parse(s: &str) -> Option<MarkStatus> {
        match s {
            "present" => Some(MarkStatus::Present),
            "absent" => Some(MarkStatus::Absent),
            "late" => Some(MarkStatus::Late),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MarkStatus::Present => "present",
            MarkStatus::Absent => "absent",
            MarkStatus::Late => "late",
        }
    }

    /// Late arrivals still count as in attendance for rate purposes.
    pub fn counts_as_present(self) -> bool {
        matches!(self, MarkStatus::Present | MarkStatus::Late)
    }
}

#[derive(Debug, Clone)]
pub struct WorkingMark {
    pub status: MarkStatus,
    pub date: String,
}

/// Today's unsaved marks, one slot per entity per population. The in-memory
/// maps are authoritative for save; the `working_marks` table is a mirror so
/// a restarted daemon can rehydrate.
#[derive(Debug, Default)]
pub struct WorkingLedger {
    students: HashMap<i64, WorkingMark>,
    teachers: HashMap<i64, WorkingMark>,
}

impl WorkingLedger {
    pub fn slot(&self, kind: Kind) -> &HashMap<i64, WorkingMark> {
        match kind {
            Kind::Student => &self.students,
            Kind::Teacher => &self.teachers,
        }
    }

    fn slot_mut(&mut self, kind: Kind) -> &mut HashMap<i64, WorkingMark> {
        match kind {
            Kind::Student => &mut self.students,
            Kind::Teacher => &mut self.teachers,
        }
    }

    pub fn set(&mut self, kind: Kind, entity_id: i64, status: MarkStatus, date: &str) {
        self.slot_mut(kind).insert(
            entity_id,
            WorkingMark {
                status,
                date: date.to_string(),
            },
        );
    }

    pub fn remove(&mut self, kind: Kind, entity_id: i64) {
        self.slot_mut(kind).remove(&entity_id);
    }

    pub fn clear(&mut self, kind: Kind) {
        self.slot_mut(kind).clear();
    }

    pub fn marks_for_date(&self, kind: Kind, date: &str) -> Vec<(i64, MarkStatus)> {
        let mut out: Vec<(i64, MarkStatus)> = self
            .slot(kind)
            .iter()
            .filter(|(_, m)| m.date == date)
            .map(|(id, m)| (*id, m.status))
            .collect();
        out.sort_by_key(|(id, _)| *id);
        out
    }
}

/// One directory row; students and teachers share the shape, teachers carry
/// `subject` and use `class_key` for the assigned class.
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: i64,
    pub name: String,
    pub class_key: String,
    pub subject: String,
    pub whatsapp: String,
    pub avatar: String,
    pub birthdate: String,
    pub attendance: i64,
    pub status: String,
    pub total_classes: i64,
    pub present_count: i64,
    pub absent_count: i64,
}

/// round(present / total × 100); by convention 100 before any save.
pub fn attendance_rate(present_count: i64, total_classes: i64) -> i64 {
    if total_classes <= 0 {
        return 100;
    }
    ((present_count as f64 / total_classes as f64) * 100.0).round() as i64
}

/// Initials avatar: first letters of the first two words, else the first two
/// characters of the name.
pub fn avatar_initials(name: &str) -> String {
    let parts: Vec<&str> = name.split_whitespace().collect();
    let initials = if parts.len() > 1 {
        parts[0].chars().take(1).chain(parts[1].chars().take(1)).collect::<String>()
    } else {
        name.trim().chars().take(2).collect::<String>()
    };
    initials.to_uppercase()
}

fn entity_select(kind: Kind) -> String {
    match kind {
        Kind::Student => "SELECT id, name, grade, '', whatsapp, avatar, COALESCE(birthdate, ''), \
                          attendance, status, total_classes, present_count, absent_count \
                          FROM students"
            .to_string(),
        Kind::Teacher => "SELECT id, name, assigned_class, subject, whatsapp, avatar, '', \
                          attendance, status, total_classes, present_count, absent_count \
                          FROM teachers"
            .to_string(),
    }
}

fn row_to_entity(r: &rusqlite::Row<'_>) -> rusqlite::Result<Entity> {
    Ok(Entity {
        id: r.get(0)?,
        name: r.get(1)?,
        class_key: r.get(2)?,
        subject: r.get(3)?,
        whatsapp: r.get(4)?,
        avatar: r.get(5)?,
        birthdate: r.get(6)?,
        attendance: r.get(7)?,
        status: r.get(8)?,
        total_classes: r.get(9)?,
        present_count: r.get(10)?,
        absent_count: r.get(11)?,
    })
}

pub fn load_all(
    conn: &Connection,
    kind: Kind,
    class_key: Option<&str>,
) -> rusqlite::Result<Vec<Entity>> {
    let mut sql = entity_select(kind);
    if class_key.is_some() {
        sql.push_str(match kind {
            Kind::Student => " WHERE grade = ?",
            Kind::Teacher => " WHERE assigned_class = ?",
        });
    }
    sql.push_str(" ORDER BY id");

    let mut stmt = conn.prepare(&sql)?;
    let rows = match class_key {
        Some(k) => stmt.query_map([k], row_to_entity)?.collect::<Result<Vec<_>, _>>()?,
        None => stmt.query_map([], row_to_entity)?.collect::<Result<Vec<_>, _>>()?,
    };
    Ok(rows)
}

pub fn load_one(conn: &Connection, kind: Kind, id: i64) -> rusqlite::Result<Option<Entity>> {
    let sql = format!("{} WHERE id = ?", entity_select(kind));
    conn.query_row(&sql, [id], row_to_entity).optional()
}

/// Rebuild the in-memory ledger from the `working_marks` mirror. Rows whose
/// status fails to parse are dropped rather than carried.
pub fn hydrate_ledger(conn: &Connection) -> rusqlite::Result<WorkingLedger> {
    let mut ledger = WorkingLedger::default();
    let mut stmt =
        conn.prepare("SELECT kind, entity_id, mark_date, status FROM working_marks")?;
    let rows = stmt
        .query_map([], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, i64>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, String>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    for (kind_raw, entity_id, date, status_raw) in rows {
        let kind = match kind_raw.as_str() {
            "student" => Kind::Student,
            "teacher" => Kind::Teacher,
            _ => continue,
        };
        let Some(status) = MarkStatus::parse(&status_raw) else {
            continue;
        };
        ledger.set(kind, entity_id, status, &date);
    }
    Ok(ledger)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_convention_before_first_save() {
        assert_eq!(attendance_rate(0, 0), 100);
        assert_eq!(attendance_rate(10, 11), 91);
        assert_eq!(attendance_rate(9, 10), 90);
        assert_eq!(attendance_rate(1, 3), 33);
        assert_eq!(attendance_rate(2, 3), 67);
    }

    #[test]
    fn avatar_takes_word_initials() {
        assert_eq!(avatar_initials("Mina Gerges"), "MG");
        assert_eq!(avatar_initials("mario"), "MA");
        assert_eq!(avatar_initials("A B C"), "AB");
    }

    #[test]
    fn ledger_overwrites_single_slot() {
        let mut ledger = WorkingLedger::default();
        ledger.set(Kind::Student, 7, MarkStatus::Present, "2026-02-01");
        ledger.set(Kind::Student, 7, MarkStatus::Absent, "2026-02-01");
        ledger.set(Kind::Student, 7, MarkStatus::Late, "2026-02-01");
        let marks = ledger.marks_for_date(Kind::Student, "2026-02-01");
        assert_eq!(marks, vec![(7, MarkStatus::Late)]);
    }

    #[test]
    fn marks_for_other_dates_are_ignored() {
        let mut ledger = WorkingLedger::default();
        ledger.set(Kind::Student, 1, MarkStatus::Present, "2026-02-01");
        ledger.set(Kind::Student, 2, MarkStatus::Present, "2026-02-02");
        let marks = ledger.marks_for_date(Kind::Student, "2026-02-02");
        assert_eq!(marks, vec![(2, MarkStatus::Present)]);
    }
}
