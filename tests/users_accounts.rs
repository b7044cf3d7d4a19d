
use serde_json::json;
use test_support::{
    login, login_admin, open_workspace, request, request_err, request_ok, spawn_sidecar, temp_dir,
};

#[test]
fn default_admin_can_sign_in_and_out() {
    let workspace = temp_dir("rollcall-login");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    open_workspace(&mut stdin, &mut reader, "1", &workspace);

    let session = login_admin(&mut stdin, &mut reader, "2");
    assert_eq!(session.get("role").and_then(|v| v.as_str()), Some("admin"));
    assert!(session
        .get("token")
        .and_then(|v| v.as_str())
        .map(|t| !t.is_empty())
        .unwrap_or(false));

    let current = request_ok(&mut stdin, &mut reader, "3", "session.current", json!({}));
    assert_eq!(current.get("role").and_then(|v| v.as_str()), Some("admin"));

    let _ = request_ok(&mut stdin, &mut reader, "4", "session.logout", json!({}));
    let code = request_err(&mut stdin, &mut reader, "5", "session.current", json!({}));
    assert_eq!(code, "no_session");
    let code = request_err(&mut stdin, &mut reader, "6", "students.list", json!({}));
    assert_eq!(code, "no_session");
}

#[test]
fn wrong_credentials_do_not_create_a_session() {
    let workspace = temp_dir("rollcall-bad-login");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    open_workspace(&mut stdin, &mut reader, "1", &workspace);

    let resp = request(
        &mut stdin,
        &mut reader,
        "2",
        "session.login",
        json!({ "username": "admin", "password": "wrong" }),
    );
    assert_eq!(resp.get("ok").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(
        resp.get("error")
            .and_then(|e| e.get("code"))
            .and_then(|c| c.as_str()),
        Some("invalid_credentials")
    );

    let code = request_err(&mut stdin, &mut reader, "3", "session.current", json!({}));
    assert_eq!(code, "no_session");
}

#[test]
fn account_crud_validates_and_round_trips() {
    let workspace = temp_dir("rollcall-users-crud");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    open_workspace(&mut stdin, &mut reader, "1", &workspace);
    login_admin(&mut stdin, &mut reader, "2");

    // Teacher accounts need a class.
    let code = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "users.create",
        json!({ "name": "T", "username": "t1", "password": "secret123", "role": "teacher" }),
    );
    assert_eq!(code, "validation_failed");

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "users.create",
        json!({
            "name": "Class Teacher",
            "username": "Teach3",
            "password": "secret123",
            "role": "teacher",
            "assignedClass": "3",
        }),
    );
    let user = created.get("user").cloned().unwrap();
    let user_id = user.get("id").and_then(|v| v.as_i64()).unwrap();
    // Usernames normalize to lowercase.
    assert_eq!(user.get("username").and_then(|v| v.as_str()), Some("teach3"));
    assert_eq!(user.get("assignedClass").and_then(|v| v.as_str()), Some("3"));

    let code = request_err(
        &mut stdin,
        &mut reader,
        "5",
        "users.create",
        json!({
            "name": "Duplicate",
            "username": "teach3",
            "password": "secret123",
            "role": "teacher",
            "assignedClass": "4",
        }),
    );
    assert_eq!(code, "validation_failed");

    let listed = request_ok(&mut stdin, &mut reader, "6", "users.list", json!({}));
    let users = listed.get("users").and_then(|v| v.as_array()).cloned().unwrap();
    assert_eq!(users.len(), 2, "seeded admin plus the new teacher");
    assert!(users.iter().all(|u| u.get("password").is_none()
        && u.get("passwordHash").is_none()));

    // Password change takes effect; the old one stops working.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "users.update",
        json!({
            "userId": user_id,
            "name": "Class Teacher",
            "username": "teach3",
            "password": "newsecret",
            "role": "teacher",
            "assignedClass": "4",
        }),
    );
    let code = request_err(
        &mut stdin,
        &mut reader,
        "8",
        "session.login",
        json!({ "username": "teach3", "password": "secret123" }),
    );
    assert_eq!(code, "invalid_credentials");
    let session = login(&mut stdin, &mut reader, "9", "teach3", "newsecret");
    assert_eq!(
        session.get("assignedClass").and_then(|v| v.as_str()),
        Some("4")
    );

    // Back to admin to exercise delete.
    login_admin(&mut stdin, &mut reader, "10");
    let code = request_err(
        &mut stdin,
        &mut reader,
        "11",
        "users.delete",
        json!({ "userId": 1 }),
    );
    assert_eq!(code, "validation_failed", "self-delete is rejected");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "12",
        "users.delete",
        json!({ "userId": user_id }),
    );
    let code = request_err(
        &mut stdin,
        &mut reader,
        "13",
        "users.delete",
        json!({ "userId": user_id }),
    );
    assert_eq!(code, "not_found");
}
