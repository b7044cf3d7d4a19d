
use serde_json::json;
use test_support::{
    create_student, login_admin, mark_student, open_workspace, request_ok, save_day,
    spawn_sidecar, temp_dir,
};

#[test]
fn grade_averages_cover_only_populated_grades() {
    let workspace = temp_dir("rollcall-grade-averages");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    open_workspace(&mut stdin, &mut reader, "1", &workspace);
    login_admin(&mut stdin, &mut reader, "2");

    let a = create_student(&mut stdin, &mut reader, "3", "A One", "3");
    let b = create_student(&mut stdin, &mut reader, "4", "B Two", "3");
    let c = create_student(&mut stdin, &mut reader, "5", "C Three", "7");

    // Rates: a 100 (1/1), b 50 (1/2), c 0 (0/1). Class 3 averages to 75.
    mark_student(&mut stdin, &mut reader, "6", a, "present", "2026-03-02");
    mark_student(&mut stdin, &mut reader, "7", b, "absent", "2026-03-02");
    mark_student(&mut stdin, &mut reader, "8", c, "absent", "2026-03-02");
    save_day(&mut stdin, &mut reader, "9", "2026-03-02");
    mark_student(&mut stdin, &mut reader, "10", b, "present", "2026-03-03");
    save_day(&mut stdin, &mut reader, "11", "2026-03-03");

    let result = request_ok(&mut stdin, &mut reader, "12", "reports.gradeAverages", json!({}));
    let grades = result.get("grades").and_then(|v| v.as_array()).cloned().unwrap();
    assert_eq!(grades.len(), 2, "grades without students are omitted, not 0%");

    assert_eq!(grades[0].get("grade").and_then(|v| v.as_str()), Some("3"));
    assert_eq!(grades[0].get("studentCount").and_then(|v| v.as_u64()), Some(2));
    assert_eq!(grades[0].get("average").and_then(|v| v.as_i64()), Some(75));

    assert_eq!(grades[1].get("grade").and_then(|v| v.as_str()), Some("7"));
    assert_eq!(grades[1].get("studentCount").and_then(|v| v.as_u64()), Some(1));
    assert_eq!(grades[1].get("average").and_then(|v| v.as_i64()), Some(0));
}

#[test]
fn monthly_summary_breaks_down_the_whole_period() {
    let workspace = temp_dir("rollcall-monthly-summary");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    open_workspace(&mut stdin, &mut reader, "1", &workspace);
    login_admin(&mut stdin, &mut reader, "2");

    let a = create_student(&mut stdin, &mut reader, "3", "A One", "3");
    let b = create_student(&mut stdin, &mut reader, "4", "B Two", "3");

    // Day 1: 2 present. Day 2: 1 late, 1 present. Day 3: 1 present, 1 absent.
    // A late arrival is its own bucket in the daily tallies.
    mark_student(&mut stdin, &mut reader, "5", a, "present", "2026-03-02");
    mark_student(&mut stdin, &mut reader, "6", b, "present", "2026-03-02");
    save_day(&mut stdin, &mut reader, "7", "2026-03-02");

    mark_student(&mut stdin, &mut reader, "8", a, "late", "2026-03-03");
    mark_student(&mut stdin, &mut reader, "9", b, "present", "2026-03-03");
    save_day(&mut stdin, &mut reader, "10", "2026-03-03");

    mark_student(&mut stdin, &mut reader, "11", a, "present", "2026-03-04");
    mark_student(&mut stdin, &mut reader, "12", b, "absent", "2026-03-04");
    save_day(&mut stdin, &mut reader, "13", "2026-03-04");

    let result = request_ok(&mut stdin, &mut reader, "14", "reports.monthlySummary", json!({}));
    let summary = result.get("summary").cloned().unwrap();

    assert_eq!(summary.get("totalDays").and_then(|v| v.as_u64()), Some(3));
    // Grand total 6: 4 present, 1 absent, 1 late.
    assert_eq!(summary.get("presentPct").and_then(|v| v.as_i64()), Some(67));
    assert_eq!(summary.get("absentPct").and_then(|v| v.as_i64()), Some(17));
    assert_eq!(summary.get("latePct").and_then(|v| v.as_i64()), Some(17));
    // 4 present across 3 days rounds to 1.
    assert_eq!(summary.get("avgDailyPresent").and_then(|v| v.as_i64()), Some(1));

    let best = summary.get("bestDay").cloned().unwrap();
    assert_eq!(best.get("date").and_then(|v| v.as_str()), Some("2026-03-02"));
    assert_eq!(best.get("present").and_then(|v| v.as_i64()), Some(2));

    // Days 2 and 3 tie at 1 present; rows iterate newest-first, so the tie
    // resolves to the first row encountered.
    let worst = summary.get("worstDay").cloned().unwrap();
    assert_eq!(worst.get("present").and_then(|v| v.as_i64()), Some(1));
    assert_eq!(worst.get("date").and_then(|v| v.as_str()), Some("2026-03-04"));
}

#[test]
fn attention_list_flags_students_below_the_threshold() {
    let workspace = temp_dir("rollcall-attention");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    open_workspace(&mut stdin, &mut reader, "1", &workspace);
    login_admin(&mut stdin, &mut reader, "2");

    let a = create_student(&mut stdin, &mut reader, "3", "A One", "3");
    let b = create_student(&mut stdin, &mut reader, "4", "B Two", "3");

    // a ends at 50%, b at 100%.
    mark_student(&mut stdin, &mut reader, "5", a, "absent", "2026-03-02");
    mark_student(&mut stdin, &mut reader, "6", b, "present", "2026-03-02");
    save_day(&mut stdin, &mut reader, "7", "2026-03-02");
    mark_student(&mut stdin, &mut reader, "8", a, "present", "2026-03-03");
    mark_student(&mut stdin, &mut reader, "9", b, "present", "2026-03-03");
    save_day(&mut stdin, &mut reader, "10", "2026-03-03");

    let result = request_ok(&mut stdin, &mut reader, "11", "reports.attention", json!({}));
    assert_eq!(result.get("threshold").and_then(|v| v.as_i64()), Some(85));
    let low = result.get("students").and_then(|v| v.as_array()).cloned().unwrap();
    assert_eq!(low.len(), 1);
    assert_eq!(low[0].get("id").and_then(|v| v.as_i64()), Some(a));
    assert_eq!(low[0].get("attendance").and_then(|v| v.as_i64()), Some(50));
}
