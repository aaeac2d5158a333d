mod test_support;

use serde_json::json;
use test_support::{request_err, request_ok, spawn_sidecar, temp_dir};

#[test]
fn payments_recompute_balance_and_feed_overall_clearance() {
    let workspace = temp_dir("eclari-finance-update");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let (si, rd) = (&mut stdin, &mut reader);

    let _ = request_ok(si, rd, "1", "workspace.select", json!({ "path": workspace.to_string_lossy() }));
    let _ = request_ok(
        si,
        rd,
        "2",
        "staff.create",
        json!({ "staffId": "F1", "authUid": "uid-f1", "role": "finance", "firstName": "Luca", "lastName": "Pacioli" }),
    );
    let _ = request_ok(
        si,
        rd,
        "3",
        "students.create",
        json!({ "studentId": "S1", "authUid": "uid-s1", "firstName": "Kim", "lastName": "Lee" }),
    );
    let _ = request_ok(
        si,
        rd,
        "4",
        "students.create",
        json!({ "studentId": "S2", "authUid": "uid-s2", "firstName": "Ana", "lastName": "Ruiz" }),
    );
    let _ = request_ok(si, rd, "5", "finance.create", json!({ "studentId": "S1", "tuitionDue": 1200.0 }));
    let _ = request_ok(si, rd, "6", "finance.create", json!({ "studentId": "S2", "tuitionDue": 800.0, "amountPaid": 800.0 }));

    let partial = request_ok(
        si,
        rd,
        "7",
        "finance.update",
        json!({ "authUid": "uid-f1", "studentId": "S1", "amountPaid": 450.0 }),
    );
    assert_eq!(partial["record"]["amountPaid"].as_f64(), Some(450.0));
    assert_eq!(partial["record"]["balance"].as_f64(), Some(750.0));
    assert_eq!(partial["record"]["status"].as_str(), Some("Partial"));

    // Only the financial item exists, so it alone decides the overall figure.
    let overall = request_ok(si, rd, "8", "clearance.overall", json!({ "studentId": "S1" }));
    assert_eq!(overall["percentage"].as_i64(), Some(0));
    assert_eq!(overall["status"].as_str(), Some("not-started"));

    let own = request_ok(si, rd, "9", "finance.get", json!({ "authUid": "uid-s1" }));
    assert_eq!(own["record"]["balance"].as_f64(), Some(750.0));
    let code = request_err(si, rd, "10", "finance.get", json!({ "authUid": "uid-s1", "studentId": "S2" }));
    assert_eq!(code, "forbidden");
    let code = request_err(
        si,
        rd,
        "11",
        "finance.update",
        json!({ "authUid": "uid-s1", "studentId": "S1", "amountPaid": 1200.0 }),
    );
    assert_eq!(code, "forbidden");

    let code = request_err(si, rd, "12", "finance.update", json!({ "authUid": "uid-f1", "studentId": "S1" }));
    assert_eq!(code, "bad_params");
    let code = request_err(
        si,
        rd,
        "13",
        "finance.update",
        json!({ "authUid": "uid-f1", "studentId": "S1", "amountPaid": -1.0 }),
    );
    assert_eq!(code, "bad_params");
    let code = request_err(
        si,
        rd,
        "14",
        "finance.update",
        json!({ "authUid": "uid-f1", "studentId": "nobody", "amountPaid": 1.0 }),
    );
    assert_eq!(code, "not_found");

    let paid = request_ok(
        si,
        rd,
        "15",
        "finance.update",
        json!({ "authUid": "uid-f1", "studentId": "S1", "amountPaid": 1200.0 }),
    );
    assert_eq!(paid["record"]["balance"].as_f64(), Some(0.0));
    assert_eq!(paid["record"]["status"].as_str(), Some("Paid"));
    let overall = request_ok(si, rd, "16", "clearance.overall", json!({ "studentId": "S1" }));
    assert_eq!(overall["percentage"].as_i64(), Some(100));
    assert_eq!(overall["status"].as_str(), Some("approved"));

    let listed = request_ok(si, rd, "17", "finance.list", json!({ "authUid": "uid-f1" }));
    let rows = listed["rows"].as_array().expect("rows");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["displayName"].as_str(), Some("Lee, Kim"));

    let summary = request_ok(si, rd, "18", "finance.summary", json!({ "authUid": "uid-f1" }));
    assert_eq!(summary["recordCount"].as_i64(), Some(2));
    assert_eq!(summary["summary"]["totalTuition"].as_f64(), Some(2000.0));
    assert_eq!(summary["summary"]["totalOutstanding"].as_f64(), Some(0.0));
    assert_eq!(summary["summary"]["paidCount"].as_i64(), Some(2));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn balance_adjustment_keeps_paid_in_step() {
    let workspace = temp_dir("eclari-finance-balance");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let (si, rd) = (&mut stdin, &mut reader);

    let _ = request_ok(si, rd, "1", "workspace.select", json!({ "path": workspace.to_string_lossy() }));
    let _ = request_ok(
        si,
        rd,
        "2",
        "staff.create",
        json!({ "staffId": "F1", "authUid": "uid-f1", "role": "finance", "firstName": "Luca", "lastName": "Pacioli" }),
    );
    let _ = request_ok(si, rd, "3", "students.create", json!({ "studentId": "S1", "firstName": "Kim", "lastName": "Lee" }));
    let _ = request_ok(si, rd, "4", "finance.create", json!({ "studentId": "S1", "tuitionDue": 900.0 }));

    let adjusted = request_ok(
        si,
        rd,
        "5",
        "finance.update",
        json!({ "authUid": "uid-f1", "studentId": "S1", "balance": 300.0, "status": "Partial" }),
    );
    assert_eq!(adjusted["record"]["amountPaid"].as_f64(), Some(600.0));
    assert_eq!(adjusted["record"]["balance"].as_f64(), Some(300.0));
    assert_eq!(adjusted["record"]["status"].as_str(), Some("Partial"));

    let fetched = request_ok(si, rd, "6", "finance.get", json!({ "authUid": "uid-f1", "studentId": "S1" }));
    assert_eq!(fetched["record"], adjusted["record"]);

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
