use crate::store::{Entity, MarkStatus};

/// Students below this rate land on the attention list.
pub const ATTENTION_THRESHOLD: i64 = 85;

/// How many history rows the dashboard trend strip shows by default.
pub const DEFAULT_TREND_DAYS: usize = 5;

/// How many students the top-performers card shows.
pub const TOP_PERFORMER_COUNT: usize = 5;

/// Ranks 1..=3 get the award badge; later ranks show the number.
pub const BADGE_RANKS: usize = 3;

/// One `daily_history` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayRow {
    pub date: String,
    pub present: i64,
    pub absent: i64,
    pub late: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatSource {
    Working,
    History,
    Empty,
}

impl StatSource {
    pub fn as_str(self) -> &'static str {
        match self {
            StatSource::Working => "working",
            StatSource::History => "history",
            StatSource::Empty => "empty",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TodayStats {
    pub present: i64,
    pub absent: i64,
    pub late: i64,
    pub source: StatSource,
}

/// Today's banner counts. Working marks win whenever any exist for the day
/// (the in-progress case); otherwise the saved history row covers the day.
/// Never a mix of both.
pub fn today_stats(working: &[MarkStatus], history: Option<&DayRow>) -> TodayStats {
    if !working.is_empty() {
        let mut present = 0;
        let mut absent = 0;
        let mut late = 0;
        for status in working {
            match status {
                MarkStatus::Present => present += 1,
                MarkStatus::Absent => absent += 1,
                MarkStatus::Late => late += 1,
            }
        }
        return TodayStats {
            present,
            absent,
            late,
            source: StatSource::Working,
        };
    }
    match history {
        Some(row) => TodayStats {
            present: row.present,
            absent: row.absent,
            late: row.late,
            source: StatSource::History,
        },
        None => TodayStats {
            present: 0,
            absent: 0,
            late: 0,
            source: StatSource::Empty,
        },
    }
}

#[derive(Debug, Clone)]
pub struct TrendRow {
    pub date: String,
    pub total: i64,
    pub present_pct: f64,
    pub absent_pct: f64,
    pub late_pct: f64,
}

/// Newest-first trend strip over history rows (already ordered date
/// descending). Zero-total days are omitted, never rendered as empty bars.
pub fn trend_series(rows: &[DayRow], limit: usize) -> Vec<TrendRow> {
    rows.iter()
        .take(limit)
        .filter_map(|day| {
            let total = day.present + day.absent + day.late;
            if total == 0 {
                return None;
            }
            let t = total as f64;
            Some(TrendRow {
                date: day.date.clone(),
                total,
                present_pct: day.present as f64 / t * 100.0,
                absent_pct: day.absent as f64 / t * 100.0,
                late_pct: day.late as f64 / t * 100.0,
            })
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct Performer {
    pub id: i64,
    pub name: String,
    pub class_key: String,
    pub rate: i64,
    pub rank: usize,
    pub badge: bool,
}

/// Top students by attendance rate. The sort is stable, so ties keep the
/// directory order; no secondary key.
pub fn top_performers(students: &[Entity]) -> Vec<Performer> {
    let mut sorted: Vec<&Entity> = students.iter().collect();
    sorted.sort_by(|a, b| b.attendance.cmp(&a.attendance));
    sorted
        .into_iter()
        .take(TOP_PERFORMER_COUNT)
        .enumerate()
        .map(|(i, s)| Performer {
            id: s.id,
            name: s.name.clone(),
            class_key: s.class_key.clone(),
            rate: s.attendance,
            rank: i + 1,
            badge: i < BADGE_RANKS,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeAverage {
    pub grade: String,
    pub student_count: usize,
    pub average: i64,
}

/// Mean rate per grade key, integer-rounded. Grades with no students are
/// omitted entirely rather than reported as 0%.
pub fn grade_averages(grade_keys: &[&str], students: &[Entity]) -> Vec<GradeAverage> {
    grade_keys
        .iter()
        .filter_map(|grade| {
            let rates: Vec<i64> = students
                .iter()
                .filter(|s| s.class_key == *grade)
                .map(|s| s.attendance)
                .collect();
            if rates.is_empty() {
                return None;
            }
            let sum: i64 = rates.iter().sum();
            Some(GradeAverage {
                grade: grade.to_string(),
                student_count: rates.len(),
                average: (sum as f64 / rates.len() as f64).round() as i64,
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayRef {
    pub date: String,
    pub present: i64,
}

#[derive(Debug, Clone)]
pub struct PeriodSummary {
    pub present_pct: i64,
    pub absent_pct: i64,
    pub late_pct: i64,
    pub total_days: usize,
    pub avg_daily_present: i64,
    pub best_day: DayRef,
    pub worst_day: DayRef,
}

/// Whole-period breakdown over all history rows. Best/worst day go by raw
/// present count; ties resolve to the first row encountered.
pub fn period_summary(rows: &[DayRow]) -> Option<PeriodSummary> {
    if rows.is_empty() {
        return None;
    }

    let tp: i64 = rows.iter().map(|d| d.present).sum();
    let ta: i64 = rows.iter().map(|d| d.absent).sum();
    let tl: i64 = rows.iter().map(|d| d.late).sum();
    let grand = tp + ta + tl;

    let pct = |part: i64| -> i64 {
        if grand == 0 {
            0
        } else {
            (part as f64 / grand as f64 * 100.0).round() as i64
        }
    };

    let mut best = &rows[0];
    let mut worst = &rows[0];
    for day in rows {
        if day.present > best.present {
            best = day;
        }
        if day.present < worst.present {
            worst = day;
        }
    }

    Some(PeriodSummary {
        present_pct: pct(tp),
        absent_pct: pct(ta),
        late_pct: pct(tl),
        total_days: rows.len(),
        avg_daily_present: (tp as f64 / rows.len() as f64).round() as i64,
        best_day: DayRef {
            date: best.date.clone(),
            present: best.present,
        },
        worst_day: DayRef {
            date: worst.date.clone(),
            present: worst.present,
        },
    })
}

/// Students under the attention threshold, in directory order.
pub fn attention_list(students: &[Entity]) -> Vec<&Entity> {
    students
        .iter()
        .filter(|s| s.attendance < ATTENTION_THRESHOLD)
        .collect()
}
