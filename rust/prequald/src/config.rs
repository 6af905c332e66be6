use rusqlite::Connection;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

use crate::db;

pub const ENV_API_BASE: &str = "PREQUALD_API_BASE";
pub const ENV_ANIMATION_MS: &str = "PREQUALD_ANIMATION_MS";
pub const ENV_CSRF_TOKEN: &str = "PREQUALD_CSRF_TOKEN";
pub const ENV_WORKSPACE: &str = "PREQUALD_WORKSPACE";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetupSection {
    Verification,
    Wizard,
}

impl SetupSection {
    pub const ALL: [SetupSection; 2] = [Self::Verification, Self::Wizard];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "verification" => Some(Self::Verification),
            "wizard" => Some(Self::Wizard),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Verification => "verification",
            Self::Wizard => "wizard",
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::Verification => "setup.verification",
            Self::Wizard => "setup.wizard",
        }
    }

    pub fn defaults(self) -> Value {
        match self {
            Self::Verification => json!({
                "baseUrl": "http://127.0.0.1:3000",
                "requestCodePath": "/api/preapproval/send-code",
                "confirmCodePath": "/api/preapproval/verify-code",
                "timeoutSecs": 15,
                "csrfToken": null
            }),
            Self::Wizard => json!({
                "animationMs": 400
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationSettings {
    pub base_url: String,
    pub request_code_path: String,
    pub confirm_code_path: String,
    pub timeout_secs: u64,
    pub csrf_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardSettings {
    pub animation_ms: u64,
}

impl WizardSettings {
    pub fn animation(&self) -> Duration {
        Duration::from_millis(self.animation_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub verification: VerificationSettings,
    pub wizard: WizardSettings,
}

fn as_object_mut(value: &mut Value) -> Result<&mut Map<String, Value>, String> {
    value
        .as_object_mut()
        .ok_or_else(|| "internal setup object must be a JSON object".to_string())
}

fn parse_i64_range(v: &Value, key: &str, min: i64, max: i64) -> Result<i64, String> {
    let n = v
        .as_i64()
        .ok_or_else(|| format!("{} must be integer", key))?;
    if !(min..=max).contains(&n) {
        return Err(format!("{} must be in {}..={}", key, min, max));
    }
    Ok(n)
}

fn parse_string_max(v: &Value, key: &str, max_len: usize) -> Result<String, String> {
    let s = v.as_str().ok_or_else(|| format!("{} must be string", key))?;
    let s = s.trim();
    if s.len() > max_len {
        return Err(format!("{} length must be <= {}", key, max_len));
    }
    Ok(s.to_string())
}

fn parse_path(v: &Value, key: &str) -> Result<String, String> {
    let s = parse_string_max(v, key, 200)?;
    if !s.starts_with('/') {
        return Err(format!("{} must start with '/'", key));
    }
    Ok(s)
}

/// Applies a validated patch onto `current`. Unknown fields are rejected.
pub fn merge_section_patch(
    section: SetupSection,
    current: &mut Value,
    patch: &Map<String, Value>,
) -> Result<(), String> {
    let obj = as_object_mut(current)?;
    for (k, v) in patch {
        match section {
            SetupSection::Verification => match k.as_str() {
                "baseUrl" => {
                    let s = parse_string_max(v, k, 300)?;
                    if !s.starts_with("http://") && !s.starts_with("https://") {
                        return Err("baseUrl must start with http:// or https://".into());
                    }
                    obj.insert(k.clone(), Value::String(s));
                }
                "requestCodePath" | "confirmCodePath" => {
                    obj.insert(k.clone(), Value::String(parse_path(v, k)?));
                }
                "timeoutSecs" => {
                    obj.insert(k.clone(), Value::from(parse_i64_range(v, k, 1, 120)?));
                }
                "csrfToken" => {
                    if v.is_null() {
                        obj.insert(k.clone(), Value::Null);
                    } else {
                        obj.insert(k.clone(), Value::String(parse_string_max(v, k, 256)?));
                    }
                }
                _ => return Err(format!("unknown verification field: {}", k)),
            },
            SetupSection::Wizard => match k.as_str() {
                "animationMs" => {
                    obj.insert(k.clone(), Value::from(parse_i64_range(v, k, 0, 5000)?));
                }
                _ => return Err(format!("unknown wizard field: {}", k)),
            },
        }
    }
    Ok(())
}

/// Defaults with any saved workspace values merged on top.
pub fn load_section(conn: Option<&Connection>, section: SetupSection) -> anyhow::Result<Value> {
    let mut current = section.defaults();
    let Some(conn) = conn else {
        return Ok(current);
    };
    if let Some(saved) = db::settings_get_json(conn, section.key())? {
        if let Some(saved_obj) = saved.as_object() {
            // Best-effort apply: a stale saved value must not block startup.
            if let Err(e) = merge_section_patch(section, &mut current, saved_obj) {
                warn!(section = section.name(), error = %e, "ignoring saved settings");
                current = section.defaults();
            }
        }
    }
    Ok(current)
}

impl Settings {
    /// Defaults, then workspace settings, then environment overrides.
    pub fn resolve(conn: Option<&Connection>) -> anyhow::Result<Self> {
        let verification: VerificationSettings =
            serde_json::from_value(load_section(conn, SetupSection::Verification)?)?;
        let wizard: WizardSettings =
            serde_json::from_value(load_section(conn, SetupSection::Wizard)?)?;
        let mut settings = Self {
            verification,
            wizard,
        };
        settings.apply_env(|k| std::env::var(k).ok());
        Ok(settings)
    }

    fn apply_env<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base) = var(ENV_API_BASE).filter(|s| !s.trim().is_empty()) {
            self.verification.base_url = base.trim().to_string();
        }
        if let Some(token) = var(ENV_CSRF_TOKEN).filter(|s| !s.trim().is_empty()) {
            self.verification.csrf_token = Some(token.trim().to_string());
        }
        if let Some(raw) = var(ENV_ANIMATION_MS) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => self.wizard.animation_ms = ms,
                Err(e) => warn!(value = %raw, error = %e, "ignoring {}", ENV_ANIMATION_MS),
            }
        }
    }
}

pub fn workspace_from_env() -> Option<PathBuf> {
    std::env::var_os(ENV_WORKSPACE)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}
