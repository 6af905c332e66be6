use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::verify::VerifyError;

use super::answer::{capture, Answer, StepInput};
use super::error::WizardError;
use super::persist::{self, KeyValueStore};
use super::render::{parse_query_step, plan, Direction, QueryStep, RenderPlan};
use super::state::{AnimationLock, WizardState};
use super::steps::{clamp_slider, slider_default, step_def, InputKind, CODE, EMAIL, PRICE_RANGE, RESULTS};
use super::view::{self, ResultsSummary, WizardView};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Gate {
    RequestCode,
    ConfirmCode,
}

/// Handle for one in-flight verification call. Only the ticket matching the
/// controller's current generation may complete a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub generation: u64,
    pub gate: Gate,
    pub step: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Forward {
    Moved(RenderPlan),
    Verify(Ticket),
}

#[derive(Debug)]
pub struct Wizard {
    state: WizardState,
    lock: AnimationLock,
    animation: Duration,
    generation: u64,
    pending: Option<Ticket>,
    results: Option<ResultsSummary>,
}

impl Wizard {
    pub fn new(animation: Duration) -> Self {
        Self {
            state: WizardState::default(),
            lock: AnimationLock::Idle,
            animation,
            generation: 0,
            pending: None,
            results: None,
        }
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    #[cfg(test)]
    pub fn pending(&self) -> Option<Ticket> {
        self.pending
    }

    pub fn set_animation(&mut self, animation: Duration) {
        self.animation = animation;
    }

    pub fn view(&self) -> WizardView {
        view::build(&self.state, self.pending.is_some(), self.results.as_ref())
    }

    pub fn attach_reference(&mut self, reference_id: String) {
        if let Some(r) = self.results.as_mut() {
            r.reference_id = Some(reference_id);
        }
    }

    /// Releases the animation lock once the UI has finished the transition.
    pub fn finish_transition(&mut self) {
        self.lock = AnimationLock::Idle;
    }

    fn ensure_idle(&self) -> Result<(), WizardError> {
        if self.lock.is_held(Instant::now()) {
            return Err(WizardError::Busy);
        }
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), WizardError> {
        if self.state.step_index >= RESULTS {
            return Err(WizardError::Complete);
        }
        Ok(())
    }

    /// Validates and captures the visible step, then advances. The email and
    /// code steps return a ticket instead; the move happens in
    /// [`Wizard::complete_verification`].
    pub fn go_forward(
        &mut self,
        input: &StepInput,
        store: &mut dyn KeyValueStore,
    ) -> Result<Forward, WizardError> {
        self.ensure_idle()?;
        self.ensure_open()?;
        let index = self.state.step_index;
        let def = step_def(index);

        if def.is_slider() {
            if self.state.answer(index).is_none() {
                let value = slider_default(index, self.state.slider_value);
                self.state.set_answer(index, Answer::Amount { value });
            }
        } else if let Some(answer) = capture(index, input)? {
            self.state.set_answer(index, answer);
        }

        let gate = match def.input {
            InputKind::Email => Gate::RequestCode,
            InputKind::Code => Gate::ConfirmCode,
            _ => return Ok(Forward::Moved(self.advance(store))),
        };
        self.save(store);
        let ticket = self.issue_ticket(gate);
        debug!(step = index, generation = ticket.generation, ?gate, "verification started");
        Ok(Forward::Verify(ticket))
    }

    pub fn go_back(&mut self, store: &mut dyn KeyValueStore) -> Result<RenderPlan, WizardError> {
        self.ensure_idle()?;
        self.ensure_open()?;
        self.cancel_pending();
        let from = self.state.step_index;
        let mut to = from.saturating_sub(1);
        while to > 0 && self.state.is_skipped(to) {
            to -= 1;
        }
        if to != from {
            self.state.step_index = to;
            self.save(store);
            self.lock = AnimationLock::start(self.animation);
            info!(from, to, "wizard moved back");
        }
        Ok(plan(from, to, Direction::Back, self.animation))
    }

    /// Where a jump to `index` actually lands for `state`. The code step is
    /// never resumed since its code may have expired; the email step is shown
    /// instead so a fresh code can be requested. Skipped steps walk back.
    pub fn landing_step(state: &WizardState, index: usize) -> usize {
        let mut to = index.min(RESULTS);
        if to >= CODE {
            to = EMAIL;
        }
        while to > 0 && state.is_skipped(to) {
            to -= 1;
        }
        to
    }

    /// Moves straight to `index` when resuming a session.
    pub fn jump_to(&mut self, index: usize, store: &mut dyn KeyValueStore) -> RenderPlan {
        self.cancel_pending();
        let from = self.state.step_index;
        let to = Self::landing_step(&self.state, index);
        self.state.step_index = to;
        self.results = None;
        self.save(store);
        self.lock = AnimationLock::Idle;
        info!(from, to, requested = index, "wizard jumped");
        plan(from, to, Direction::Jump, self.animation)
    }

    /// Loads the saved snapshot and resumes at its step.
    pub fn continue_session(&mut self, store: &mut dyn KeyValueStore) -> RenderPlan {
        let saved = persist::load(store);
        let target = saved.step_index;
        self.state = saved;
        self.jump_to(target, store)
    }

    /// Restores a bookmarked `?step=` position. Never lands past the first
    /// required step that has no saved answer.
    pub fn open_query(&mut self, query: &str, store: &mut dyn KeyValueStore) -> RenderPlan {
        match parse_query_step(query) {
            Some(QueryStep::Index(n)) => {
                self.state = persist::load(store);
                let target = n.min(self.furthest_reachable());
                self.jump_to(target, store)
            }
            // A finished flow cannot be resumed; start over.
            Some(QueryStep::Results) | None => self.restart(store),
        }
    }

    /// Writes a slider value straight into the answer for the visible step.
    /// Sliders have no invalid state, so this skips validation and runs on
    /// every input event.
    pub fn set_slider(
        &mut self,
        value: i64,
        store: &mut dyn KeyValueStore,
    ) -> Result<i64, WizardError> {
        self.ensure_open()?;
        let index = self.state.step_index;
        let value = clamp_slider(index, value).ok_or(WizardError::NotSlider(index))?;
        self.state.set_answer(index, Answer::Amount { value });
        if index == PRICE_RANGE {
            self.state.slider_value = value;
        }
        self.save(store);
        Ok(value)
    }

    /// Applies the outcome of a verification call. Results for tickets that
    /// navigation has invalidated are dropped.
    pub fn complete_verification(
        &mut self,
        ticket: Ticket,
        outcome: Result<(), VerifyError>,
        store: &mut dyn KeyValueStore,
    ) -> Result<RenderPlan, WizardError> {
        if self.pending != Some(ticket) {
            debug!(generation = ticket.generation, "dropping stale verification result");
            return Err(WizardError::Stale);
        }
        self.pending = None;
        if let Err(e) = outcome {
            info!(step = ticket.step, gate = ?ticket.gate, error = %e, "verification failed");
            return Err(e.into());
        }
        Ok(self.advance(store))
    }

    pub fn restart(&mut self, store: &mut dyn KeyValueStore) -> RenderPlan {
        self.cancel_pending();
        let from = self.state.step_index;
        self.state = WizardState::default();
        self.results = None;
        self.lock = AnimationLock::Idle;
        if let Err(e) = persist::clear(store) {
            warn!(error = %e, "failed to clear saved wizard state");
        }
        info!(from, "wizard restarted");
        plan(from, 0, Direction::Jump, self.animation)
    }

    fn advance(&mut self, store: &mut dyn KeyValueStore) -> RenderPlan {
        let from = self.state.step_index;
        let mut to = from + 1;
        while to < RESULTS && self.state.is_skipped(to) {
            to += 1;
        }
        let to = to.min(RESULTS);
        self.state.step_index = to;
        if to == RESULTS {
            self.results = Some(ResultsSummary::from_state(&self.state));
            if let Err(e) = persist::clear(store) {
                warn!(error = %e, "failed to clear saved wizard state");
            }
        } else {
            self.save(store);
        }
        self.lock = AnimationLock::start(self.animation);
        info!(from, to, "wizard advanced");
        plan(from, to, Direction::Forward, self.animation)
    }

    fn furthest_reachable(&self) -> usize {
        (0..RESULTS)
            .find(|&i| {
                step_def(i).requires_answer()
                    && !self.state.is_skipped(i)
                    && self.state.answer(i).is_none()
            })
            .unwrap_or(CODE)
    }

    fn issue_ticket(&mut self, gate: Gate) -> Ticket {
        self.generation += 1;
        let ticket = Ticket {
            generation: self.generation,
            gate,
            step: self.state.step_index,
        };
        self.pending = Some(ticket);
        ticket
    }

    fn cancel_pending(&mut self) {
        if let Some(t) = self.pending.take() {
            debug!(generation = t.generation, "verification cancelled by navigation");
        }
        self.generation += 1;
    }

    fn save(&self, store: &mut dyn KeyValueStore) {
        if let Err(e) = persist::save(store, &self.state) {
            warn!(error = %e, "failed to save wizard state");
        }
    }
}
