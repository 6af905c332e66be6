use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use super::answer::Answer;
use super::steps::{clamp_slider, step_def, DEFAULT_SLIDER_VALUE, PRICE_RANGE, RESULTS};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardState {
    pub step_index: usize,
    pub answers: Vec<Option<Answer>>,
    pub slider_value: i64,
}

impl Default for WizardState {
    fn default() -> Self {
        Self {
            step_index: 0,
            answers: Vec::new(),
            slider_value: DEFAULT_SLIDER_VALUE,
        }
    }
}

impl WizardState {
    pub fn answer(&self, index: usize) -> Option<&Answer> {
        self.answers.get(index).and_then(|a| a.as_ref())
    }

    pub fn set_answer(&mut self, index: usize, answer: Answer) {
        if self.answers.len() <= index {
            self.answers.resize(index + 1, None);
        }
        self.answers[index] = Some(answer);
    }

    /// Whether the step at `index` is hidden by its skip rule given the
    /// answers recorded so far.
    pub fn is_skipped(&self, index: usize) -> bool {
        let Some(rule) = step_def(index).skip_unless else {
            return false;
        };
        self.answer(rule.depends_on).and_then(|a| a.choice()) != Some(rule.equals)
    }

    /// Drops answers whose shape no longer matches their step and pulls
    /// slider amounts back into range. Used after loading a snapshot written
    /// by another build.
    pub fn normalize(&mut self) {
        self.step_index = self.step_index.min(RESULTS);
        self.answers.truncate(RESULTS);
        for (i, slot) in self.answers.iter_mut().enumerate() {
            if slot.as_ref().is_some_and(|a| !a.fits_step(i)) {
                *slot = None;
            }
            if let Some(Answer::Amount { value }) = slot {
                *value = clamp_slider(i, *value).unwrap_or(*value);
            }
        }
        self.slider_value =
            clamp_slider(PRICE_RANGE, self.slider_value).unwrap_or(DEFAULT_SLIDER_VALUE);
    }
}

/// Blocks navigation while the UI runs an enter/exit animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnimationLock {
    #[default]
    Idle,
    Running {
        until: Instant,
    },
}

impl AnimationLock {
    pub fn start(duration: Duration) -> Self {
        if duration.is_zero() {
            return Self::Idle;
        }
        Self::Running {
            until: Instant::now() + duration,
        }
    }

    pub fn is_held(&self, now: Instant) -> bool {
        match self {
            Self::Idle => false,
            Self::Running { until } => now < *until,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::steps::{HOMEOWNERSHIP, LOCATION, OWNS_HOME, PLAN_TO_SELL};

    #[test]
    fn plan_to_sell_is_skipped_until_owner_answers_yes() {
        let mut s = WizardState::default();
        assert!(s.is_skipped(PLAN_TO_SELL));
        s.set_answer(
            HOMEOWNERSHIP,
            Answer::Choice {
                value: "No, I don't own a home".into(),
            },
        );
        assert!(s.is_skipped(PLAN_TO_SELL));
        s.set_answer(
            HOMEOWNERSHIP,
            Answer::Choice {
                value: OWNS_HOME.into(),
            },
        );
        assert!(!s.is_skipped(PLAN_TO_SELL));
        assert!(!s.is_skipped(LOCATION));
    }

    #[test]
    fn normalize_drops_mismatched_slots_and_clamps() {
        let mut s = WizardState {
            step_index: 99,
            answers: vec![None, Some(Answer::Amount { value: 5 })],
            slider_value: 1,
        };
        s.normalize();
        assert_eq!(s.step_index, RESULTS);
        assert_eq!(s.answers, vec![None, None]);
        assert_eq!(s.slider_value, 50_000);
    }

    #[test]
    fn normalize_pulls_amounts_into_slider_bounds() {
        let mut s = WizardState {
            step_index: 3,
            answers: vec![
                None,
                None,
                Some(Answer::Amount { value: 9_000_000 }),
                Some(Answer::Amount { value: i64::MIN }),
            ],
            slider_value: i64::MAX,
        };
        s.normalize();
        assert_eq!(s.answer(PRICE_RANGE), Some(&Answer::Amount { value: 3_000_000 }));
        assert_eq!(s.answer(3), Some(&Answer::Amount { value: 0 }));
        assert_eq!(s.slider_value, 3_000_000);
    }

    #[test]
    fn zero_duration_lock_is_never_held() {
        let lock = AnimationLock::start(Duration::ZERO);
        assert_eq!(lock, AnimationLock::Idle);
        let running = AnimationLock::start(Duration::from_secs(60));
        assert!(running.is_held(Instant::now()));
    }
}
