use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_prequald");
    let mut child = Command::new(exe)
        .env("PREQUALD_ANIMATION_MS", "0")
        .env_remove("PREQUALD_WORKSPACE")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn prequald");
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
    assert!(!line.trim().is_empty(), "empty response for {}", method);
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
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn step_of(result: &serde_json::Value) -> i64 {
    result
        .pointer("/view/stepIndex")
        .and_then(|v| v.as_i64())
        .expect("view.stepIndex")
}

#[test]
fn forward_back_and_skip_rule_over_ipc() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let start = request_ok(&mut stdin, &mut reader, "1", "wizard.state", json!({}));
    assert_eq!(step_of(&start), 0);
    assert_eq!(
        start.pointer("/view/progressVisible").and_then(|v| v.as_bool()),
        Some(false)
    );

    let r = request_ok(&mut stdin, &mut reader, "2", "wizard.forward", json!({}));
    assert_eq!(step_of(&r), 1);
    assert_eq!(
        r.pointer("/transition/historyQuery").and_then(|v| v.as_str()),
        Some("?step=1")
    );

    // Blank location is rejected without moving.
    let bad = request(
        &mut stdin,
        &mut reader,
        "3",
        "wizard.forward",
        json!({ "value": "  " }),
    );
    assert_eq!(
        bad.pointer("/error/code").and_then(|v| v.as_str()),
        Some("validation_failed")
    );
    assert_eq!(
        bad.pointer("/error/details/field").and_then(|v| v.as_str()),
        Some("location")
    );

    let r = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "wizard.forward",
        json!({ "value": "Austin, TX" }),
    );
    assert_eq!(step_of(&r), 2);
    assert_eq!(
        r.pointer("/view/prefill/value").and_then(|v| v.as_i64()),
        Some(300_000)
    );

    let s = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "wizard.slider",
        json!({ "value": 452_000 }),
    );
    assert_eq!(s.get("sliderValue").and_then(|v| v.as_i64()), Some(452_000));

    let r = request_ok(&mut stdin, &mut reader, "6", "wizard.forward", json!({}));
    assert_eq!(step_of(&r), 3);
    // Down payment defaults to a fifth of the chosen price.
    assert_eq!(
        r.pointer("/view/prefill/value").and_then(|v| v.as_i64()),
        Some(90_000)
    );
    let r = request_ok(&mut stdin, &mut reader, "7", "wizard.forward", json!({}));
    assert_eq!(step_of(&r), 4);
    let r = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "wizard.forward",
        json!({ "value": "Primary residence" }),
    );
    assert_eq!(step_of(&r), 5);

    let r = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "wizard.forward",
        json!({ "value": "No, I don't own a home" }),
    );
    assert_eq!(step_of(&r), 7, "plan-to-sell step must be skipped");

    let r = request_ok(&mut stdin, &mut reader, "10", "wizard.back", json!({}));
    assert_eq!(step_of(&r), 5);
    assert_eq!(
        r.pointer("/view/prefill/value").and_then(|v| v.as_str()),
        Some("No, I don't own a home")
    );
    assert_eq!(
        r.pointer("/transition/enterClass").and_then(|v| v.as_str()),
        Some("step-enter-left")
    );

    let r = request_ok(
        &mut stdin,
        &mut reader,
        "11",
        "wizard.forward",
        json!({ "value": "Yes, I currently own a home" }),
    );
    assert_eq!(step_of(&r), 6);

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn saved_session_survives_restart_of_the_sidecar() {
    let workspace = temp_dir("prequal-session");

    {
        let (mut child, mut stdin, mut reader) = spawn_sidecar();
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            "1",
            "workspace.select",
            json!({ "path": workspace.to_string_lossy() }),
        );
        let _ = request_ok(&mut stdin, &mut reader, "2", "wizard.forward", json!({}));
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            "3",
            "wizard.forward",
            json!({ "value": "Boise, ID" }),
        );
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            "4",
            "wizard.slider",
            json!({ "value": 515_000 }),
        );
        drop(stdin);
        let _ = child.wait();
    }

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let session = request_ok(&mut stdin, &mut reader, "2", "wizard.session", json!({}));
    assert_eq!(session.get("saved").and_then(|v| v.as_bool()), Some(true));
    assert_eq!(session.get("stepIndex").and_then(|v| v.as_i64()), Some(2));

    let resumed = request_ok(&mut stdin, &mut reader, "3", "wizard.continue", json!({}));
    assert_eq!(step_of(&resumed), 2);
    assert_eq!(
        resumed.pointer("/view/sliderValue").and_then(|v| v.as_i64()),
        Some(515_000)
    );

    let back = request_ok(&mut stdin, &mut reader, "4", "wizard.back", json!({}));
    assert_eq!(
        back.pointer("/view/prefill/value").and_then(|v| v.as_str()),
        Some("Boise, ID")
    );

    let restarted = request_ok(&mut stdin, &mut reader, "5", "wizard.restart", json!({}));
    assert_eq!(step_of(&restarted), 0);
    let session = request_ok(&mut stdin, &mut reader, "6", "wizard.session", json!({}));
    assert_eq!(session.get("saved").and_then(|v| v.as_bool()), Some(false));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn bookmarked_query_is_capped_at_first_unanswered_step() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(&mut stdin, &mut reader, "1", "wizard.forward", json!({}));
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "wizard.forward",
        json!({ "value": "Denver, CO" }),
    );

    let r = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "wizard.open",
        json!({ "query": "?step=14" }),
    );
    // Sliders carry defaults, so the first gap is the property-use choice.
    assert_eq!(step_of(&r), 4);

    let r = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "wizard.open",
        json!({ "query": "?step=results" }),
    );
    assert_eq!(step_of(&r), 0);

    drop(stdin);
    let _ = child.wait();
}
