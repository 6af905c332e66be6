use serde::Deserialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::VerificationSettings;
use crate::wizard::steps::{step_def, CODE};
use crate::wizard::{Answer, Gate, Ticket, WizardState};

#[derive(Debug, Clone, thiserror::Error)]
pub enum VerifyError {
    #[error("server rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    BadResponse(String),
}

/// The two calls gating the email and code steps. One attempt per call.
pub trait VerificationApi: Send + Sync {
    fn request_code(&self, lead: &Map<String, Value>) -> Result<(), VerifyError>;
    fn confirm_code(&self, code: &str, lead: &Map<String, Value>) -> Result<(), VerifyError>;
}

#[derive(Debug, Default, Deserialize)]
struct ApiReply {
    ok: Option<bool>,
    success: Option<bool>,
    message: Option<String>,
    error: Option<String>,
}

impl ApiReply {
    fn accepted(&self) -> bool {
        self.ok.or(self.success).unwrap_or(true)
    }

    fn reason(&self) -> Option<String> {
        self.message.clone().or_else(|| self.error.clone())
    }
}

pub struct HttpVerifier {
    agent: ureq::Agent,
    settings: VerificationSettings,
}

impl HttpVerifier {
    pub fn new(settings: VerificationSettings) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build();
        Self { agent, settings }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.settings.base_url.trim_end_matches('/'), path)
    }

    fn post(&self, path: &str, body: &Value) -> Result<(), VerifyError> {
        let url = self.url(path);
        let mut req = self
            .agent
            .post(&url)
            .set("content-type", "application/json")
            .set("accept", "application/json");
        if let Some(token) = self.settings.csrf_token.as_deref() {
            req = req.set("x-csrf-token", token);
        }
        debug!(%url, "posting verification request");

        match req.send_json(body) {
            Ok(resp) => {
                let status = resp.status();
                let text = resp
                    .into_string()
                    .map_err(|e| VerifyError::BadResponse(e.to_string()))?;
                let reply = parse_reply(&text)?;
                if reply.accepted() {
                    Ok(())
                } else {
                    Err(VerifyError::Rejected {
                        status,
                        message: reply
                            .reason()
                            .unwrap_or_else(|| "request was not accepted".to_string()),
                    })
                }
            }
            Err(ureq::Error::Status(status, resp)) => {
                let reason = resp
                    .into_string()
                    .ok()
                    .and_then(|t| parse_reply(&t).ok())
                    .and_then(|r| r.reason())
                    .unwrap_or_else(|| format!("HTTP {}", status));
                Err(VerifyError::Rejected {
                    status,
                    message: reason,
                })
            }
            Err(e) => Err(VerifyError::Transport(e.to_string())),
        }
    }
}

fn parse_reply(text: &str) -> Result<ApiReply, VerifyError> {
    if text.trim().is_empty() {
        return Ok(ApiReply::default());
    }
    serde_json::from_str(text).map_err(|e| VerifyError::BadResponse(e.to_string()))
}

impl VerificationApi for HttpVerifier {
    fn request_code(&self, lead: &Map<String, Value>) -> Result<(), VerifyError> {
        self.post(&self.settings.request_code_path, &Value::Object(lead.clone()))
    }

    fn confirm_code(&self, code: &str, lead: &Map<String, Value>) -> Result<(), VerifyError> {
        let mut body = lead.clone();
        body.insert("code".to_string(), Value::String(code.to_string()));
        self.post(&self.settings.confirm_code_path, &Value::Object(body))
    }
}

/// Lead fields keyed by step id. Names expand to `firstName`/`lastName`.
pub fn lead_payload(state: &WizardState) -> Map<String, Value> {
    let mut out = Map::new();
    for (i, slot) in state.answers.iter().enumerate().take(CODE) {
        let Some(answer) = slot else {
            continue;
        };
        if state.is_skipped(i) {
            continue;
        }
        let key = step_def(i).id.to_string();
        match answer {
            Answer::Location { value } | Answer::Choice { value } | Answer::Email { value } => {
                out.insert(key, Value::String(value.clone()));
            }
            Answer::Amount { value } => {
                out.insert(key, Value::from(*value));
            }
            Answer::Name { first, last } => {
                out.insert("firstName".into(), Value::String(first.clone()));
                out.insert("lastName".into(), Value::String(last.clone()));
            }
            Answer::Code { .. } => {}
        }
    }
    out
}

/// Short SHA-256 digest so logs can correlate a lead without the address.
pub fn email_digest(email: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(email.trim().to_ascii_lowercase().as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone)]
pub struct Job {
    pub ticket: Ticket,
    pub lead: Map<String, Value>,
    pub code: Option<String>,
}

impl Job {
    pub fn new(ticket: Ticket, state: &WizardState) -> Self {
        let code = match state.answer(CODE) {
            Some(Answer::Code { value }) => Some(value.clone()),
            _ => None,
        };
        Self {
            ticket,
            lead: lead_payload(state),
            code,
        }
    }

    pub fn run(&self, api: &dyn VerificationApi) -> Result<(), VerifyError> {
        match self.ticket.gate {
            Gate::RequestCode => api.request_code(&self.lead),
            Gate::ConfirmCode => {
                let code = self.code.as_deref().ok_or_else(|| {
                    VerifyError::BadResponse("no verification code captured".to_string())
                })?;
                api.confirm_code(code, &self.lead)
            }
        }
    }
}

/// Runs `job` on a worker thread and hands the outcome to `done`.
pub fn spawn<F>(api: Arc<dyn VerificationApi>, job: Job, done: F)
where
    F: FnOnce(Ticket, Result<(), VerifyError>) + Send + 'static,
{
    thread::spawn(move || {
        let outcome = job.run(api.as_ref());
        let who = job
            .lead
            .get("email")
            .and_then(Value::as_str)
            .map(email_digest)
            .unwrap_or_default();
        info!(
            gate = ?job.ticket.gate,
            generation = job.ticket.generation,
            email_sha256 = %who.get(..12).unwrap_or(""),
            ok = outcome.is_ok(),
            "verification call finished"
        );
        done(job.ticket, outcome);
    });
}
