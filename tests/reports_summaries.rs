use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_reportcardd");
    let mut child = Command::new(exe)
        .env("REPORTCARDD_DEFAULT_QUARTER_WEIGHT", "40")
        .env("REPORTCARDD_PASS_MARK", "60")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn reportcardd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(true),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn error_code(value: &serde_json::Value) -> &str {
    assert_eq!(value.get("ok").and_then(|v| v.as_bool()), Some(false));
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
}

fn simple_sum() -> serde_json::Value {
    json!({ "engine": "preset", "preset": "simpleSum" })
}

#[test]
fn student_card_skips_subjects_outside_the_average() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let res = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "reports.studentCard",
        json!({
            "className": "7",
            "term": "quarter-1",
            "subjects": [
                {
                    "subject": "Math",
                    "system": simple_sum(),
                    "credits": 1,
                    "marks": { "quarter-1": [45, 45, null, null] },
                },
                {
                    "subject": "Behavior",
                    "system": simple_sum(),
                    "marks": { "quarter-1": [20, 20, null, null] },
                },
                {
                    "subject": "Science",
                    "system": simple_sum(),
                    "credits": 1,
                    "marks": { "quarter-1": [30, 30, null, null] },
                },
            ],
        }),
    );

    let subjects = res["subjects"].as_array().expect("subjects");
    assert_eq!(subjects.len(), 3);
    assert_eq!(subjects[0]["mark100"].as_f64(), Some(90.0));
    assert_eq!(subjects[0]["letter"].as_str(), Some("A"));
    assert_eq!(subjects[1]["countsInAverage"].as_bool(), Some(false));
    assert_eq!(subjects[1]["mark100"].as_f64(), Some(40.0));
    assert_eq!(subjects[2]["creditsEarned"].as_f64(), Some(1.0));

    assert_eq!(res["average"].as_f64(), Some(75.0));
    assert_eq!(res["countedCount"].as_u64(), Some(2));
    assert_eq!(res["passed"].as_bool(), Some(true));
    assert_eq!(res["failedSubjects"], json!([]));
    assert_eq!(res["gpa"]["letter"].as_str(), Some("C"));
    assert_eq!(res["gpa"]["point"].as_f64(), Some(2.2));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn student_card_reports_validation_per_subject() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let res = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "reports.studentCard",
        json!({
            "className": "7",
            "term": "quarter-2",
            "subjects": [
                {
                    "subject": "Math",
                    "system": simple_sum(),
                    "marks": { "quarter-2": [45, "n/a", null, null] },
                },
                {
                    "subject": "English",
                    "system": simple_sum(),
                    "marks": { "quarter-2": [40, 40, null, null] },
                },
            ],
        }),
    );

    let subjects = res["subjects"].as_array().expect("subjects");
    assert_eq!(
        subjects[0]["validation"]["code"].as_str(),
        Some("invalid_range_of_marks")
    );
    assert_eq!(subjects[0]["ready"].as_bool(), Some(false));
    assert!(subjects[1].get("validation").is_none());
    assert_eq!(res["passed"].as_bool(), Some(false));
    assert_eq!(res["failedSubjects"], json!(["Math"]));
    assert_eq!(res["missingCount"].as_u64(), Some(1));
    assert_eq!(res["average"].as_f64(), Some(80.0));

    let missing_subject = request(
        &mut stdin,
        &mut reader,
        "2",
        "reports.studentCard",
        json!({ "className": "7", "term": "quarter-2", "subjects": [{ "marks": {} }] }),
    );
    assert_eq!(error_code(&missing_subject), "bad_params");

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn class_stats_ignore_missing_marks() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let res = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "reports.classStats",
        json!({
            "subject": "Math",
            "term": "quarter-1",
            "system": simple_sum(),
            "students": [
                { "studentId": "s1", "marks": { "quarter-1": [50, 40, null, null] } },
                { "studentId": "s2", "marks": { "quarter-1": [20, 30, null, null] } },
                { "studentId": "s3", "marks": { "quarter-1": [40, null, null, null] } },
                { "studentId": "s4", "marks": { "quarter-1": [35, 35, null, null] } },
            ],
        }),
    );

    assert_eq!(res["studentCount"].as_u64(), Some(4));
    assert_eq!(res["readyCount"].as_u64(), Some(3));
    assert_eq!(res["missingCount"].as_u64(), Some(1));
    assert_eq!(res["passCount"].as_u64(), Some(2));
    assert_eq!(res["mean"].as_f64(), Some(70.0));
    assert_eq!(res["median"].as_f64(), Some(70.0));
    assert_eq!(res["min"].as_f64(), Some(50.0));
    assert_eq!(res["max"].as_f64(), Some(90.0));

    let per_student = res["perStudent"].as_array().expect("perStudent");
    assert_eq!(per_student[0]["letter"].as_str(), Some("A"));
    assert_eq!(per_student[2]["ready"].as_bool(), Some(false));
    assert!(per_student[2]["mark100"].is_null());

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn class_stats_need_students() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let res = request(
        &mut stdin,
        &mut reader,
        "1",
        "reports.classStats",
        json!({ "subject": "Math", "term": "quarter-1", "system": simple_sum() }),
    );
    assert_eq!(error_code(&res), "bad_params");

    drop(stdin);
    let _ = child.wait();
}
