use serde::Serialize;

use super::answer::Answer;
use super::render::{history_query, progress_percent, progress_visible};
use super::state::WizardState;
use super::steps::{step_def, slider_default, InputKind, DOWN_PAYMENT, PRICE_RANGE, RESULTS};

/// Figures shown on the results screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsSummary {
    pub price_range: i64,
    pub down_payment: i64,
    pub loan_amount: i64,
    pub down_payment_percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
}

impl ResultsSummary {
    pub fn from_state(state: &WizardState) -> Self {
        let price_range = state
            .answer(PRICE_RANGE)
            .and_then(Answer::amount)
            .unwrap_or(state.slider_value);
        let down_payment = state
            .answer(DOWN_PAYMENT)
            .and_then(Answer::amount)
            .unwrap_or_else(|| slider_default(DOWN_PAYMENT, price_range))
            .min(price_range);
        let down_payment_percent = if price_range > 0 {
            ((down_payment as f64) * 1000.0 / (price_range as f64)).round() / 10.0
        } else {
            0.0
        };
        Self {
            price_range,
            down_payment,
            loan_amount: price_range.saturating_sub(down_payment),
            down_payment_percent,
            reference_id: None,
        }
    }
}

/// Everything the UI shell needs to draw the visible step. Carries no
/// toolkit-specific detail.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardView {
    pub step_index: usize,
    pub step_id: &'static str,
    pub title: &'static str,
    pub input: InputKind,
    pub prefill: Option<Answer>,
    pub slider_value: i64,
    pub progress_visible: bool,
    pub progress_percent: u8,
    pub history_query: String,
    pub can_go_back: bool,
    pub complete: bool,
    pub verification_pending: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<ResultsSummary>,
}

pub fn build(
    state: &WizardState,
    verification_pending: bool,
    results: Option<&ResultsSummary>,
) -> WizardView {
    let index = state.step_index.min(RESULTS);
    let def = step_def(index);
    let prefill = match state.answer(index) {
        Some(a) => Some(a.clone()),
        None if def.is_slider() => Some(Answer::Amount {
            value: slider_default(index, state.slider_value),
        }),
        None => None,
    };
    WizardView {
        step_index: index,
        step_id: def.id,
        title: def.title,
        input: def.input,
        prefill,
        slider_value: state.slider_value,
        progress_visible: progress_visible(index),
        progress_percent: progress_percent(index),
        history_query: history_query(index),
        can_go_back: index > 0 && index < RESULTS,
        complete: index >= RESULTS,
        verification_pending,
        results: results.cloned(),
    }
}
