use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use super::steps::{step_def, InputKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Answer {
    Location { value: String },
    Amount { value: i64 },
    Choice { value: String },
    Name { first: String, last: String },
    Email { value: String },
    Code { value: String },
}

impl Answer {
    pub fn choice(&self) -> Option<&str> {
        match self {
            Answer::Choice { value } => Some(value),
            _ => None,
        }
    }

    pub fn amount(&self) -> Option<i64> {
        match self {
            Answer::Amount { value } => Some(*value),
            _ => None,
        }
    }

    pub fn email(&self) -> Option<&str> {
        match self {
            Answer::Email { value } => Some(value),
            _ => None,
        }
    }

    /// Whether this variant is the shape the step at `index` captures.
    pub fn fits_step(&self, index: usize) -> bool {
        matches!(
            (&step_def(index).input, self),
            (InputKind::Text { .. }, Answer::Location { .. })
                | (InputKind::Slider { .. }, Answer::Amount { .. })
                | (InputKind::Choice { .. }, Answer::Choice { .. })
                | (InputKind::Name, Answer::Name { .. })
                | (InputKind::Email, Answer::Email { .. })
                | (InputKind::Code, Answer::Code { .. })
        )
    }
}

/// Raw field values posted by the UI for the visible step.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepInput {
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub first: Option<String>,
    #[serde(default)]
    pub last: Option<String>,
}

#[cfg(test)]
impl StepInput {
    pub fn value(v: impl Into<String>) -> Self {
        Self {
            value: Some(v.into()),
            ..Self::default()
        }
    }

    pub fn name(first: impl Into<String>, last: impl Into<String>) -> Self {
        Self {
            value: None,
            first: Some(first.into()),
            last: Some(last.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern"))
}

fn code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9]{4,8}$").expect("code pattern"))
}

fn required(raw: Option<&str>, field: &'static str, max_len: usize) -> Result<String, FieldError> {
    let s = raw.map(str::trim).unwrap_or_default();
    if s.is_empty() {
        return Err(FieldError::new(field, format!("{} is required", field)));
    }
    if s.chars().count() > max_len {
        return Err(FieldError::new(
            field,
            format!("{} must be at most {} characters", field, max_len),
        ));
    }
    Ok(s.to_string())
}

/// Validates the input for the step at `index` and builds its answer.
///
/// Returns `Ok(None)` for steps that capture nothing (welcome, sliders,
/// results); slider values are written through a separate path.
pub fn capture(index: usize, input: &StepInput) -> Result<Option<Answer>, FieldError> {
    let def = step_def(index);
    let answer = match def.input {
        InputKind::None | InputKind::Slider { .. } | InputKind::Terminal => return Ok(None),
        InputKind::Text { max_len } => Answer::Location {
            value: required(input.value.as_deref(), def.id, max_len)?,
        },
        InputKind::Choice { options } => {
            let picked = required(input.value.as_deref(), def.id, 120)?;
            if !options.contains(&picked.as_str()) {
                return Err(FieldError::new(def.id, "select one of the listed options"));
            }
            Answer::Choice { value: picked }
        }
        InputKind::Name => Answer::Name {
            first: required(input.first.as_deref(), "firstName", 80)?,
            last: required(input.last.as_deref(), "lastName", 80)?,
        },
        InputKind::Email => {
            let email = required(input.value.as_deref(), "email", 254)?;
            if !email_pattern().is_match(&email) {
                return Err(FieldError::new("email", "enter a valid email address"));
            }
            Answer::Email { value: email }
        }
        InputKind::Code => {
            let code = required(input.value.as_deref(), "code", 8)?;
            if !code_pattern().is_match(&code) {
                return Err(FieldError::new("code", "code must be 4 to 8 digits"));
            }
            Answer::Code { value: code }
        }
    };
    Ok(Some(answer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::steps::{CODE, EMAIL, HOMEOWNERSHIP, LOCATION, NAME, PRICE_RANGE};

    #[test]
    fn location_is_trimmed_and_required() {
        let a = capture(LOCATION, &StepInput::value("  Austin, TX ")).expect("valid");
        assert_eq!(
            a,
            Some(Answer::Location {
                value: "Austin, TX".into()
            })
        );
        let e = capture(LOCATION, &StepInput::value("   ")).expect_err("blank");
        assert_eq!(e.field, "location");
    }

    #[test]
    fn choice_must_be_listed() {
        assert!(capture(HOMEOWNERSHIP, &StepInput::value("Maybe")).is_err());
        let a = capture(HOMEOWNERSHIP, &StepInput::value("No, I don't own a home"))
            .expect("valid")
            .expect("answer");
        assert_eq!(a.choice(), Some("No, I don't own a home"));
    }

    #[test]
    fn name_needs_both_parts() {
        let e = capture(NAME, &StepInput::name("Ada", " ")).expect_err("missing last");
        assert_eq!(e.field, "lastName");
        let a = capture(NAME, &StepInput::name("Ada", "Lovelace")).expect("valid");
        assert_eq!(
            a,
            Some(Answer::Name {
                first: "Ada".into(),
                last: "Lovelace".into()
            })
        );
    }

    #[test]
    fn email_and_code_formats() {
        assert!(capture(EMAIL, &StepInput::value("not-an-email")).is_err());
        assert!(capture(EMAIL, &StepInput::value("a b@x.io")).is_err());
        assert!(capture(EMAIL, &StepInput::value("ada@example.com")).is_ok());
        assert!(capture(CODE, &StepInput::value("12ab")).is_err());
        assert!(capture(CODE, &StepInput::value("123")).is_err());
        assert!(capture(CODE, &StepInput::value("482913")).is_ok());
    }

    #[test]
    fn sliders_capture_nothing() {
        assert_eq!(capture(PRICE_RANGE, &StepInput::default()), Ok(None));
    }

    #[test]
    fn answers_serialize_with_kind_tag() {
        let v = serde_json::to_value(Answer::Name {
            first: "Ada".into(),
            last: "Lovelace".into(),
        })
        .expect("serialize");
        assert_eq!(v["kind"], "name");
        assert_eq!(v["first"], "Ada");
    }
}
