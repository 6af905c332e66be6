use serde_json::json;

use crate::verify::VerifyError;
use crate::wizard::WizardError;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

pub fn wizard_err(id: &str, e: &WizardError) -> serde_json::Value {
    let details = match e {
        WizardError::Validation { field, .. } => Some(json!({ "field": field })),
        WizardError::NotSlider(step) => Some(json!({ "stepIndex": step })),
        WizardError::Verification(VerifyError::Rejected { status, .. }) => {
            Some(json!({ "status": status }))
        }
        _ => None,
    };
    err(id, e.code(), e.to_string(), details)
}
