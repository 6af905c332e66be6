use chrono::Utc;
use rusqlite::Connection;
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use crate::db::{self, SubmissionRow};
use crate::ipc::error::{err, ok, wizard_err};
use crate::ipc::types::{store, AppState, Event, Reply, Request};
use crate::verify::{self, VerifyError};
use crate::wizard::steps::EMAIL;
use crate::wizard::{persist, Answer, Forward, Gate, RenderPlan, StepInput, Ticket, Wizard};

fn view_result(wizard: &Wizard, transition: Option<RenderPlan>) -> serde_json::Value {
    json!({
        "view": wizard.view(),
        "transition": transition,
    })
}

fn handle_state(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, view_result(&state.wizard, None))
}

fn handle_session(state: &mut AppState, req: &Request) -> serde_json::Value {
    let AppState { db, scratch, .. } = state;
    let store = store(db, scratch);
    if !persist::has_saved(store) {
        return ok(&req.id, json!({ "saved": false }));
    }
    let saved = persist::load(store);
    let resume_at = Wizard::landing_step(&saved, saved.step_index);
    ok(
        &req.id,
        json!({
            "saved": true,
            "stepIndex": saved.step_index,
            "resumeStepIndex": resume_at,
        }),
    )
}

fn handle_continue(state: &mut AppState, req: &Request) -> serde_json::Value {
    let AppState {
        db, scratch, wizard, ..
    } = state;
    let plan = wizard.continue_session(store(db, scratch));
    ok(&req.id, view_result(wizard, Some(plan)))
}

fn handle_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(query) = req.params.get("query").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing query", None);
    };
    let AppState {
        db, scratch, wizard, ..
    } = state;
    let plan = wizard.open_query(query, store(db, scratch));
    ok(&req.id, view_result(wizard, Some(plan)))
}

fn handle_forward(state: &mut AppState, req: &Request) -> Reply {
    let input: StepInput = if req.params.is_null() {
        StepInput::default()
    } else {
        match serde_json::from_value(req.params.clone()) {
            Ok(v) => v,
            Err(e) => return Reply::Ready(err(&req.id, "bad_params", e.to_string(), None)),
        }
    };

    let AppState {
        db,
        scratch,
        wizard,
        verifier,
        events,
        ..
    } = state;
    match wizard.go_forward(&input, store(db, scratch)) {
        Ok(Forward::Moved(plan)) => Reply::Ready(ok(&req.id, view_result(wizard, Some(plan)))),
        Ok(Forward::Verify(ticket)) => {
            let job = verify::Job::new(ticket, wizard.state());
            let tx = events.clone();
            let request_id = req.id.clone();
            verify::spawn(verifier.clone(), job, move |ticket, outcome| {
                // The loop is gone only when stdin closed; nobody is left to answer.
                let _ = tx.send(Event::Verified {
                    request_id,
                    ticket,
                    outcome,
                });
            });
            Reply::Deferred
        }
        Err(e) => Reply::Ready(wizard_err(&req.id, &e)),
    }
}

/// Answers a deferred `wizard.forward` once its verification call returns.
pub fn handle_verified(
    state: &mut AppState,
    request_id: &str,
    ticket: Ticket,
    outcome: Result<(), VerifyError>,
) -> serde_json::Value {
    let AppState {
        db, scratch, wizard, ..
    } = state;
    match wizard.complete_verification(ticket, outcome, store(db, scratch)) {
        Ok(plan) => {
            if ticket.gate == Gate::ConfirmCode {
                record_submission(db.as_ref(), wizard);
            }
            ok(request_id, view_result(wizard, Some(plan)))
        }
        Err(e) => wizard_err(request_id, &e),
    }
}

fn record_submission(conn: Option<&Connection>, wizard: &mut Wizard) {
    let reference_id = Uuid::new_v4().to_string();
    let email = wizard
        .state()
        .answer(EMAIL)
        .and_then(Answer::email)
        .unwrap_or_default();
    let row = SubmissionRow {
        id: reference_id.clone(),
        email_sha256: verify::email_digest(email),
        payload: serde_json::Value::Object(verify::lead_payload(wizard.state())),
        created_at: Utc::now().to_rfc3339(),
    };
    if let Some(conn) = conn {
        if let Err(e) = db::insert_submission(conn, &row) {
            warn!(error = %e, "failed to record submission");
        }
    }
    wizard.attach_reference(reference_id);
}

fn handle_back(state: &mut AppState, req: &Request) -> serde_json::Value {
    let AppState {
        db, scratch, wizard, ..
    } = state;
    match wizard.go_back(store(db, scratch)) {
        Ok(plan) => ok(&req.id, view_result(wizard, Some(plan))),
        Err(e) => wizard_err(&req.id, &e),
    }
}

fn handle_slider(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(value) = req.params.get("value").and_then(|v| v.as_i64()) else {
        return err(&req.id, "bad_params", "value must be integer", None);
    };
    let AppState {
        db, scratch, wizard, ..
    } = state;
    match wizard.set_slider(value, store(db, scratch)) {
        Ok(applied) => ok(
            &req.id,
            json!({
                "value": applied,
                "sliderValue": wizard.state().slider_value,
            }),
        ),
        Err(e) => wizard_err(&req.id, &e),
    }
}

fn handle_transition_done(state: &mut AppState, req: &Request) -> serde_json::Value {
    state.wizard.finish_transition();
    ok(&req.id, json!({ "ok": true }))
}

fn handle_restart(state: &mut AppState, req: &Request) -> serde_json::Value {
    let AppState {
        db, scratch, wizard, ..
    } = state;
    let plan = wizard.restart(store(db, scratch));
    ok(&req.id, view_result(wizard, Some(plan)))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Reply> {
    let resp = match req.method.as_str() {
        "wizard.forward" => return Some(handle_forward(state, req)),
        "wizard.state" => handle_state(state, req),
        "wizard.session" => handle_session(state, req),
        "wizard.continue" => handle_continue(state, req),
        "wizard.open" => handle_open(state, req),
        "wizard.back" => handle_back(state, req),
        "wizard.slider" => handle_slider(state, req),
        "wizard.transitionDone" => handle_transition_done(state, req),
        "wizard.restart" => handle_restart(state, req),
        _ => return None,
    };
    Some(Reply::Ready(resp))
}
