
use serde_json::json;
use test_support::{
    create_student, login_admin, mark_student, open_workspace, request_ok, save_day,
    spawn_sidecar, temp_dir,
};

#[test]
fn stats_prefer_working_marks_then_fall_back_to_history() {
    let workspace = temp_dir("rollcall-stats-fallback");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    open_workspace(&mut stdin, &mut reader, "1", &workspace);
    login_admin(&mut stdin, &mut reader, "2");

    let a = create_student(&mut stdin, &mut reader, "3", "A One", "3");
    let b = create_student(&mut stdin, &mut reader, "4", "B Two", "3");
    let _c = create_student(&mut stdin, &mut reader, "5", "C Three", "4");

    // Before any mark: nothing to show for the day.
    let stats = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "dashboard.stats",
        json!({ "date": "2026-03-02" }),
    );
    assert_eq!(stats.get("source").and_then(|v| v.as_str()), Some("empty"));
    assert_eq!(stats.get("totalStudents").and_then(|v| v.as_i64()), Some(3));
    assert_eq!(stats.get("present").and_then(|v| v.as_i64()), Some(0));

    // Mid-marking: the working ledger is the source.
    mark_student(&mut stdin, &mut reader, "7", a, "present", "2026-03-02");
    mark_student(&mut stdin, &mut reader, "8", b, "late", "2026-03-02");
    let stats = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "dashboard.stats",
        json!({ "date": "2026-03-02" }),
    );
    assert_eq!(stats.get("source").and_then(|v| v.as_str()), Some("working"));
    assert_eq!(stats.get("present").and_then(|v| v.as_i64()), Some(1));
    assert_eq!(stats.get("late").and_then(|v| v.as_i64()), Some(1));
    assert_eq!(stats.get("absent").and_then(|v| v.as_i64()), Some(0));

    // After save the ledger is empty and history carries the day.
    save_day(&mut stdin, &mut reader, "10", "2026-03-02");
    let stats = request_ok(
        &mut stdin,
        &mut reader,
        "11",
        "dashboard.stats",
        json!({ "date": "2026-03-02" }),
    );
    assert_eq!(stats.get("source").and_then(|v| v.as_str()), Some("history"));
    assert_eq!(stats.get("present").and_then(|v| v.as_i64()), Some(1));
    assert_eq!(stats.get("late").and_then(|v| v.as_i64()), Some(1));
}

#[test]
fn trends_list_saved_days_newest_first_and_omit_gaps() {
    let workspace = temp_dir("rollcall-trends");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    open_workspace(&mut stdin, &mut reader, "1", &workspace);
    login_admin(&mut stdin, &mut reader, "2");

    let a = create_student(&mut stdin, &mut reader, "3", "A One", "3");
    let b = create_student(&mut stdin, &mut reader, "4", "B Two", "3");

    // Two saved days around an unsaved gap (2026-03-03 never existed).
    mark_student(&mut stdin, &mut reader, "5", a, "present", "2026-03-02");
    mark_student(&mut stdin, &mut reader, "6", b, "absent", "2026-03-02");
    save_day(&mut stdin, &mut reader, "7", "2026-03-02");

    mark_student(&mut stdin, &mut reader, "8", a, "present", "2026-03-04");
    mark_student(&mut stdin, &mut reader, "9", b, "present", "2026-03-04");
    save_day(&mut stdin, &mut reader, "10", "2026-03-04");

    let trends = request_ok(&mut stdin, &mut reader, "11", "dashboard.trends", json!({}));
    let rows = trends.get("trends").and_then(|v| v.as_array()).cloned().unwrap();
    assert_eq!(rows.len(), 2, "the gap day must not appear at all");
    assert_eq!(rows[0].get("date").and_then(|v| v.as_str()), Some("2026-03-04"));
    assert_eq!(rows[1].get("date").and_then(|v| v.as_str()), Some("2026-03-02"));

    let p0 = rows[0].get("presentPct").and_then(|v| v.as_f64()).unwrap();
    assert!((p0 - 100.0).abs() < 1e-9);
    let p1 = rows[1].get("presentPct").and_then(|v| v.as_f64()).unwrap();
    assert!((p1 - 50.0).abs() < 1e-9);
}

#[test]
fn top_performers_rank_by_rate_with_stable_ties() {
    let workspace = temp_dir("rollcall-top");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    open_workspace(&mut stdin, &mut reader, "1", &workspace);
    login_admin(&mut stdin, &mut reader, "2");

    let a = create_student(&mut stdin, &mut reader, "3", "A One", "3");
    let b = create_student(&mut stdin, &mut reader, "4", "B Two", "3");
    let c = create_student(&mut stdin, &mut reader, "5", "C Three", "4");

    // Day 1: a and c present, b absent. Day 2: everyone present.
    // Rates end at a=100, b=50, c=100; a ties c and stays first.
    mark_student(&mut stdin, &mut reader, "6", a, "present", "2026-03-02");
    mark_student(&mut stdin, &mut reader, "7", b, "absent", "2026-03-02");
    mark_student(&mut stdin, &mut reader, "8", c, "present", "2026-03-02");
    save_day(&mut stdin, &mut reader, "9", "2026-03-02");

    mark_student(&mut stdin, &mut reader, "10", a, "present", "2026-03-03");
    mark_student(&mut stdin, &mut reader, "11", b, "present", "2026-03-03");
    mark_student(&mut stdin, &mut reader, "12", c, "present", "2026-03-03");
    save_day(&mut stdin, &mut reader, "13", "2026-03-03");

    let result = request_ok(&mut stdin, &mut reader, "14", "dashboard.topPerformers", json!({}));
    let top = result.get("performers").and_then(|v| v.as_array()).cloned().unwrap();
    assert_eq!(top.len(), 3);

    assert_eq!(top[0].get("id").and_then(|v| v.as_i64()), Some(a));
    assert_eq!(top[1].get("id").and_then(|v| v.as_i64()), Some(c));
    assert_eq!(top[2].get("id").and_then(|v| v.as_i64()), Some(b));

    assert_eq!(top[0].get("rank").and_then(|v| v.as_u64()), Some(1));
    assert_eq!(top[0].get("badge").and_then(|v| v.as_bool()), Some(true));
    assert_eq!(top[2].get("rank").and_then(|v| v.as_u64()), Some(3));
    assert_eq!(top[2].get("rate").and_then(|v| v.as_i64()), Some(50));
}
