use anyhow::Context;
use std::collections::HashMap;
use tracing::warn;

use super::answer::Answer;
use super::state::WizardState;

pub const STEP_KEY: &str = "wizard.step";
pub const ANSWERS_KEY: &str = "wizard.answers";
pub const SLIDER_KEY: &str = "wizard.slider";

/// Synchronous key/value storage backing the wizard snapshot.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()>;
    fn remove(&mut self, key: &str) -> anyhow::Result<()>;
}

/// Used until a workspace is selected, and in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> anyhow::Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Writes the three keys one after another; a failure part-way leaves the
/// earlier writes in place.
pub fn save(store: &mut dyn KeyValueStore, state: &WizardState) -> anyhow::Result<()> {
    store
        .set(STEP_KEY, &state.step_index.to_string())
        .context("failed to write wizard step")?;
    let answers =
        serde_json::to_string(&state.answers).context("failed to serialize wizard answers")?;
    store
        .set(ANSWERS_KEY, &answers)
        .context("failed to write wizard answers")?;
    store
        .set(SLIDER_KEY, &state.slider_value.to_string())
        .context("failed to write slider value")?;
    Ok(())
}

/// Reads the snapshot. Each key falls back to its default on its own, so a
/// missing or corrupt key never discards the others.
pub fn load(store: &dyn KeyValueStore) -> WizardState {
    let mut state = WizardState::default();

    match store.get(STEP_KEY) {
        Ok(Some(raw)) => match raw.trim().parse::<usize>() {
            Ok(v) => state.step_index = v,
            Err(e) => warn!(error = %e, "ignoring malformed saved step"),
        },
        Ok(None) => {}
        Err(e) => warn!(error = %e, "failed to read saved step"),
    }

    match store.get(ANSWERS_KEY) {
        Ok(Some(raw)) => match serde_json::from_str::<Vec<Option<Answer>>>(&raw) {
            Ok(v) => state.answers = v,
            Err(e) => warn!(error = %e, "ignoring malformed saved answers"),
        },
        Ok(None) => {}
        Err(e) => warn!(error = %e, "failed to read saved answers"),
    }

    match store.get(SLIDER_KEY) {
        Ok(Some(raw)) => match raw.trim().parse::<i64>() {
            Ok(v) => state.slider_value = v,
            Err(e) => warn!(error = %e, "ignoring malformed saved slider value"),
        },
        Ok(None) => {}
        Err(e) => warn!(error = %e, "failed to read saved slider value"),
    }

    state.normalize();
    state
}

pub fn clear(store: &mut dyn KeyValueStore) -> anyhow::Result<()> {
    for key in [STEP_KEY, ANSWERS_KEY, SLIDER_KEY] {
        store
            .remove(key)
            .with_context(|| format!("failed to remove {}", key))?;
    }
    Ok(())
}

/// True when any of the three keys is present.
pub fn has_saved(store: &dyn KeyValueStore) -> bool {
    [STEP_KEY, ANSWERS_KEY, SLIDER_KEY]
        .iter()
        .any(|k| matches!(store.get(k), Ok(Some(_))))
}
