mod config;
mod db;
mod ipc;
mod verify;
mod wizard;

use serde_json::json;
use std::io::{self, BufRead, Write};
use std::sync::mpsc;
use std::thread;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    // stdout carries the IPC stream; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("prequald=info")),
        )
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();
}

fn spawn_stdin_reader(tx: mpsc::Sender<ipc::Event>) {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(v) => v,
                Err(_) => break,
            };
            if tx.send(ipc::Event::Line(line)).is_err() {
                return;
            }
        }
        let _ = tx.send(ipc::Event::InputClosed);
    });
}

fn write_line(stdout: &mut impl Write, value: &serde_json::Value) {
    let _ = writeln!(
        stdout,
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{\"ok\":false}".to_string())
    );
    let _ = stdout.flush();
}

fn main() {
    init_tracing();

    let (tx, rx) = mpsc::channel();
    let mut state = match ipc::AppState::new(tx.clone()) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "failed to resolve settings");
            std::process::exit(1);
        }
    };
    if let Some(path) = config::workspace_from_env() {
        if let Err(e) = state.select_workspace(&path) {
            warn!(error = %e, "could not open workspace from environment");
        }
    }

    spawn_stdin_reader(tx);
    info!(version = env!("CARGO_PKG_VERSION"), "prequald ready");

    let mut stdout = io::stdout();
    for event in rx {
        match event {
            ipc::Event::Line(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let req: ipc::Request = match serde_json::from_str(&line) {
                    Ok(v) => v,
                    Err(e) => {
                        // Can't reply without id.
                        write_line(
                            &mut stdout,
                            &json!({
                                "ok": false,
                                "error": { "code": "bad_json", "message": e.to_string() }
                            }),
                        );
                        continue;
                    }
                };
                if let ipc::Reply::Ready(resp) = ipc::handle_request(&mut state, req) {
                    write_line(&mut stdout, &resp);
                }
            }
            ipc::Event::Verified {
                request_id,
                ticket,
                outcome,
            } => {
                let resp = ipc::handle_verified(&mut state, &request_id, ticket, outcome);
                write_line(&mut stdout, &resp);
            }
            ipc::Event::InputClosed => break,
        }
    }
}
