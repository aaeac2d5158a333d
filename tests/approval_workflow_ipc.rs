mod test_support;

use serde_json::json;
use std::io::BufReader;
use std::process::{ChildStdin, ChildStdout};
use test_support::{request_err, request_ok, spawn_sidecar, temp_dir};

fn seed(si: &mut ChildStdin, rd: &mut BufReader<ChildStdout>) {
    let _ = request_ok(si, rd, "s1", "subjects.create", json!({ "subjectId": "MATH", "name": "Mathematics" }));
    let _ = request_ok(si, rd, "s2", "subjects.create", json!({ "subjectId": "SCI", "name": "Science" }));
    let staff = [
        ("T1", "uid-t1", "teacher"),
        ("T2", "uid-t2", "teacher"),
        ("L1", "uid-l1", "lab"),
        ("C1", "uid-c1", "coach"),
    ];
    for (i, (id, uid, role)) in staff.iter().enumerate() {
        let _ = request_ok(
            si,
            rd,
            &format!("st{}", i),
            "staff.create",
            json!({ "staffId": id, "authUid": uid, "role": role, "firstName": "Staff", "lastName": id }),
        );
    }
    let _ = request_ok(
        si,
        rd,
        "s3",
        "classes.create",
        json!({ "classId": "C-MATH", "name": "Maths 7", "subjectId": "MATH", "teacherId": "T1", "yearGroup": 1 }),
    );
    let _ = request_ok(
        si,
        rd,
        "s4",
        "students.create",
        json!({ "studentId": "Y1", "authUid": "uid-y1", "firstName": "Mia", "lastName": "Stone", "yearGroup": 1 }),
    );
    let _ = request_ok(
        si,
        rd,
        "s5",
        "students.create",
        json!({ "studentId": "Y2", "authUid": "uid-y2", "firstName": "Noah", "lastName": "Reed", "yearGroup": 2 }),
    );
    let _ = request_ok(si, rd, "s6", "books.create", json!({ "bookId": "B1", "studentId": "Y1", "subjectId": "MATH", "title": "Number Sense" }));
    let _ = request_ok(si, rd, "s7", "books.create", json!({ "bookId": "B2", "studentId": "Y2", "subjectId": "MATH", "title": "Fractions" }));
    let _ = request_ok(si, rd, "s8", "materials.create", json!({ "materialId": "M1", "studentId": "Y1", "subjectId": "SCI", "name": "Lab coat" }));
}

fn item_status(v: &serde_json::Value) -> &str {
    v["item"]["approvalStatus"].as_str().expect("approvalStatus")
}

#[test]
fn year1_book_goes_through_submit_reject_resubmit_approve() {
    let workspace = temp_dir("eclari-approvals-book");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let (si, rd) = (&mut stdin, &mut reader);
    let _ = request_ok(si, rd, "1", "workspace.select", json!({ "path": workspace.to_string_lossy() }));
    seed(si, rd);

    let submitted = request_ok(
        si,
        rd,
        "2",
        "approvals.submitProof",
        json!({ "authUid": "uid-y1", "kind": "book", "itemId": "B1", "proofUrl": "https://proofs/b1.jpg" }),
    );
    assert_eq!(item_status(&submitted), "pending");
    assert_eq!(submitted["item"]["kind"].as_str(), Some("book"));
    assert_eq!(submitted["item"]["imageProofUrl"].as_str(), Some("https://proofs/b1.jpg"));
    assert!(submitted["item"]["submittedAt"].as_str().is_some());

    let queue = request_ok(si, rd, "3", "approvals.pending", json!({ "authUid": "uid-t1" }));
    let books = queue["books"].as_array().expect("books");
    assert_eq!(books.len(), 1);
    assert_eq!(books[0]["id"].as_str(), Some("B1"));

    // Pending proof alone does not clear the book.
    let subject = request_ok(si, rd, "4", "clearance.subject", json!({ "studentId": "Y1", "subjectId": "MATH" }));
    assert_eq!(subject["percentage"].as_i64(), Some(0));

    let code = request_err(
        si,
        rd,
        "5",
        "approvals.decide",
        json!({ "authUid": "uid-l1", "kind": "book", "itemId": "B1", "action": "approve" }),
    );
    assert_eq!(code, "forbidden");

    let code = request_err(
        si,
        rd,
        "6",
        "approvals.decide",
        json!({ "authUid": "uid-t1", "kind": "book", "itemId": "B1", "action": "reject", "reason": "  " }),
    );
    assert_eq!(code, "bad_params");

    let rejected = request_ok(
        si,
        rd,
        "7",
        "approvals.decide",
        json!({ "authUid": "uid-t1", "kind": "book", "itemId": "B1", "action": "reject", "reason": "photo is blurry" }),
    );
    assert_eq!(item_status(&rejected), "rejected");
    assert_eq!(rejected["item"]["returned"].as_bool(), Some(false));
    assert_eq!(rejected["item"]["rejectionReason"].as_str(), Some("photo is blurry"));
    assert_eq!(rejected["item"]["approvedBy"].as_str(), Some("T1"));

    let queue = request_ok(si, rd, "8", "approvals.pending", json!({ "authUid": "uid-t1" }));
    assert_eq!(queue["books"].as_array().map(|a| a.len()), Some(0));

    let resubmitted = request_ok(
        si,
        rd,
        "9",
        "approvals.submitProof",
        json!({ "authUid": "uid-y1", "kind": "book", "itemId": "B1", "proofUrl": "https://proofs/b1-retake.jpg" }),
    );
    assert_eq!(item_status(&resubmitted), "pending");

    let approved = request_ok(
        si,
        rd,
        "10",
        "approvals.decide",
        json!({ "authUid": "uid-t1", "kind": "book", "itemId": "B1", "action": "approve" }),
    );
    assert_eq!(item_status(&approved), "approved");
    assert_eq!(approved["item"]["returned"].as_bool(), Some(true));
    assert!(approved["item"]["rejectionReason"].is_null());

    let subject = request_ok(si, rd, "11", "clearance.subject", json!({ "studentId": "Y1", "subjectId": "MATH" }));
    assert_eq!(subject["percentage"].as_i64(), Some(100));
    assert_eq!(subject["status"].as_str(), Some("approved"));

    // Approved items take no new proof.
    let code = request_err(
        si,
        rd,
        "12",
        "approvals.submitProof",
        json!({ "authUid": "uid-y1", "kind": "book", "itemId": "B1", "proofUrl": "https://proofs/again.jpg" }),
    );
    assert_eq!(code, "bad_params");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn proof_submission_guards_owner_and_year_group() {
    let workspace = temp_dir("eclari-approvals-guards");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let (si, rd) = (&mut stdin, &mut reader);
    let _ = request_ok(si, rd, "1", "workspace.select", json!({ "path": workspace.to_string_lossy() }));
    seed(si, rd);

    let code = request_err(
        si,
        rd,
        "2",
        "approvals.submitProof",
        json!({ "authUid": "uid-y2", "kind": "book", "itemId": "B2", "proofUrl": "https://proofs/b2.jpg" }),
    );
    assert_eq!(code, "bad_params");

    let code = request_err(
        si,
        rd,
        "3",
        "approvals.submitProof",
        json!({ "authUid": "uid-y2", "kind": "book", "itemId": "B1", "proofUrl": "https://proofs/b1.jpg" }),
    );
    assert_eq!(code, "forbidden");

    let code = request_err(
        si,
        rd,
        "4",
        "approvals.submitProof",
        json!({ "authUid": "uid-t1", "kind": "book", "itemId": "B1", "proofUrl": "https://proofs/b1.jpg" }),
    );
    assert_eq!(code, "forbidden");

    let code = request_err(
        si,
        rd,
        "5",
        "approvals.submitProof",
        json!({ "authUid": "uid-nobody", "kind": "book", "itemId": "B1", "proofUrl": "https://proofs/b1.jpg" }),
    );
    assert_eq!(code, "unauthorized");

    let code = request_err(
        si,
        rd,
        "6",
        "approvals.submitProof",
        json!({ "authUid": "uid-y1", "kind": "book", "itemId": "nope", "proofUrl": "https://proofs/b1.jpg" }),
    );
    assert_eq!(code, "not_found");

    let code = request_err(
        si,
        rd,
        "7",
        "approvals.decide",
        json!({ "authUid": "uid-t1", "kind": "book", "itemId": "B1", "action": "approve" }),
    );
    assert_eq!(code, "bad_params");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn lab_materials_are_decided_by_lab_staff_only() {
    let workspace = temp_dir("eclari-approvals-lab");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let (si, rd) = (&mut stdin, &mut reader);
    let _ = request_ok(si, rd, "1", "workspace.select", json!({ "path": workspace.to_string_lossy() }));
    seed(si, rd);

    let _ = request_ok(
        si,
        rd,
        "2",
        "approvals.submitProof",
        json!({ "authUid": "uid-y1", "kind": "material", "itemId": "M1", "proofUrl": "https://proofs/m1.jpg" }),
    );

    let lab_queue = request_ok(si, rd, "3", "approvals.pending", json!({ "authUid": "uid-l1" }));
    assert_eq!(lab_queue["materials"].as_array().map(|a| a.len()), Some(1));
    let coach_queue = request_ok(si, rd, "4", "approvals.pending", json!({ "authUid": "uid-c1" }));
    assert_eq!(coach_queue["materials"].as_array().map(|a| a.len()), Some(0));
    let teacher_queue = request_ok(si, rd, "5", "approvals.pending", json!({ "authUid": "uid-t1" }));
    assert_eq!(teacher_queue["materials"].as_array().map(|a| a.len()), Some(0));

    for (id, uid) in [("6", "uid-c1"), ("7", "uid-t1")] {
        let code = request_err(
            si,
            rd,
            id,
            "approvals.decide",
            json!({ "authUid": uid, "kind": "material", "itemId": "M1", "action": "approve" }),
        );
        assert_eq!(code, "forbidden");
    }

    let approved = request_ok(
        si,
        rd,
        "8",
        "approvals.decide",
        json!({ "authUid": "uid-l1", "kind": "material", "itemId": "M1", "action": "approve" }),
    );
    assert_eq!(item_status(&approved), "approved");
    assert_eq!(approved["item"]["kind"].as_str(), Some("material"));
    assert_eq!(approved["item"]["returned"].as_bool(), Some(true));

    let subject = request_ok(si, rd, "9", "clearance.subject", json!({ "studentId": "Y1", "subjectId": "SCI" }));
    assert_eq!(subject["percentage"].as_i64(), Some(100));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn direct_return_moves_rejected_item_out_of_workflow() {
    let workspace = temp_dir("eclari-approvals-direct-return");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let (si, rd) = (&mut stdin, &mut reader);
    let _ = request_ok(si, rd, "1", "workspace.select", json!({ "path": workspace.to_string_lossy() }));
    seed(si, rd);

    let _ = request_ok(
        si,
        rd,
        "2",
        "approvals.submitProof",
        json!({ "authUid": "uid-y1", "kind": "book", "itemId": "B1", "proofUrl": "https://proofs/b1.jpg" }),
    );
    let _ = request_ok(
        si,
        rd,
        "3",
        "approvals.decide",
        json!({ "authUid": "uid-t1", "kind": "book", "itemId": "B1", "action": "reject", "reason": "wrong book" }),
    );
    let returned = request_ok(
        si,
        rd,
        "4",
        "items.setReturned",
        json!({ "authUid": "uid-t1", "kind": "book", "itemId": "B1", "returned": true }),
    );
    assert_eq!(item_status(&returned), "none");
    assert_eq!(returned["item"]["returned"].as_bool(), Some(true));

    let code = request_err(
        si,
        rd,
        "5",
        "items.setReturned",
        json!({ "authUid": "uid-l1", "kind": "book", "itemId": "B1", "returned": false }),
    );
    assert_eq!(code, "forbidden");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn staff_return_toggle_keeps_approval_in_step() {
    let workspace = temp_dir("eclari-approvals-return-toggle");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let (si, rd) = (&mut stdin, &mut reader);
    let _ = request_ok(si, rd, "1", "workspace.select", json!({ "path": workspace.to_string_lossy() }));
    seed(si, rd);

    let _ = request_ok(
        si,
        rd,
        "2",
        "approvals.submitProof",
        json!({ "authUid": "uid-y1", "kind": "book", "itemId": "B1", "proofUrl": "https://proofs/b1.jpg" }),
    );

    // Returned in person while the proof is still waiting.
    let returned = request_ok(
        si,
        rd,
        "3",
        "items.setReturned",
        json!({ "authUid": "uid-t1", "kind": "book", "itemId": "B1", "returned": true }),
    );
    assert_eq!(item_status(&returned), "pending");
    assert_eq!(returned["item"]["returned"].as_bool(), Some(true));
    let queue = request_ok(si, rd, "4", "approvals.pending", json!({ "authUid": "uid-t1" }));
    assert_eq!(queue["books"].as_array().map(|a| a.len()), Some(1));
    let subject = request_ok(si, rd, "5", "clearance.subject", json!({ "studentId": "Y1", "subjectId": "MATH" }));
    assert_eq!(subject["percentage"].as_i64(), Some(100));

    let approved = request_ok(
        si,
        rd,
        "6",
        "approvals.decide",
        json!({ "authUid": "uid-t1", "kind": "book", "itemId": "B1", "action": "approve" }),
    );
    assert_eq!(item_status(&approved), "approved");

    let unreturned = request_ok(
        si,
        rd,
        "7",
        "items.setReturned",
        json!({ "authUid": "uid-t1", "kind": "book", "itemId": "B1", "returned": false }),
    );
    assert_eq!(item_status(&unreturned), "none");
    assert_eq!(unreturned["item"]["returned"].as_bool(), Some(false));
    let subject = request_ok(si, rd, "8", "clearance.subject", json!({ "studentId": "Y1", "subjectId": "MATH" }));
    assert_eq!(subject["percentage"].as_i64(), Some(0));
    assert_eq!(subject["status"].as_str(), Some("not-started"));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn teachers_only_act_on_subjects_they_teach() {
    let workspace = temp_dir("eclari-approvals-subject-scope");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let (si, rd) = (&mut stdin, &mut reader);
    let _ = request_ok(si, rd, "1", "workspace.select", json!({ "path": workspace.to_string_lossy() }));
    seed(si, rd);

    let _ = request_ok(
        si,
        rd,
        "2",
        "approvals.submitProof",
        json!({ "authUid": "uid-y1", "kind": "book", "itemId": "B1", "proofUrl": "https://proofs/b1.jpg" }),
    );
    let queue = request_ok(si, rd, "3", "approvals.pending", json!({ "authUid": "uid-t2" }));
    assert_eq!(queue["books"].as_array().map(|a| a.len()), Some(0));

    let code = request_err(
        si,
        rd,
        "4",
        "approvals.decide",
        json!({ "authUid": "uid-t2", "kind": "book", "itemId": "B1", "action": "approve" }),
    );
    assert_eq!(code, "forbidden");
    let code = request_err(
        si,
        rd,
        "5",
        "items.setReturned",
        json!({ "authUid": "uid-t2", "kind": "book", "itemId": "B1", "returned": true }),
    );
    assert_eq!(code, "forbidden");

    let approved = request_ok(
        si,
        rd,
        "6",
        "approvals.decide",
        json!({ "authUid": "uid-t1", "kind": "book", "itemId": "B1", "action": "approve" }),
    );
    assert_eq!(item_status(&approved), "approved");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
