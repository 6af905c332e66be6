use serde::Serialize;
use std::time::Duration;

use super::steps::RESULTS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    Forward,
    Back,
    /// Restoring a session or query position; no slide.
    Jump,
}

/// What the UI shell applies to move from one step element to the next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderPlan {
    pub from: usize,
    pub to: usize,
    pub direction: Direction,
    pub exit_class: &'static str,
    pub enter_class: &'static str,
    pub duration_ms: u64,
    pub progress_visible: bool,
    pub progress_percent: u8,
    pub history_query: String,
}

pub fn plan(from: usize, to: usize, direction: Direction, duration: Duration) -> RenderPlan {
    let (exit_class, enter_class) = match direction {
        Direction::Forward => ("step-exit-left", "step-enter-right"),
        Direction::Back => ("step-exit-right", "step-enter-left"),
        Direction::Jump => ("step-fade-out", "step-fade-in"),
    };
    RenderPlan {
        from,
        to,
        direction,
        exit_class,
        enter_class,
        duration_ms: duration.as_millis() as u64,
        progress_visible: progress_visible(to),
        progress_percent: progress_percent(to),
        history_query: history_query(to),
    }
}

/// The progress strip is hidden on the welcome and results screens.
pub fn progress_visible(index: usize) -> bool {
    index != 0 && index < RESULTS
}

pub fn progress_percent(index: usize) -> u8 {
    ((index.min(RESULTS) * 100) / RESULTS) as u8
}

pub fn history_query(index: usize) -> String {
    if index >= RESULTS {
        "?step=results".to_string()
    } else {
        format!("?step={}", index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStep {
    Index(usize),
    Results,
}

/// Reads `step` from a query string such as `?step=4&utm=x`.
pub fn parse_query_step(query: &str) -> Option<QueryStep> {
    let query = query.trim().trim_start_matches('?');
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == "step")
        .and_then(|(_, v)| match v {
            "results" => Some(QueryStep::Results),
            n => n.parse::<usize>().ok().map(QueryStep::Index),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_hidden_on_first_and_terminal() {
        assert!(!progress_visible(0));
        assert!(progress_visible(1));
        assert!(progress_visible(RESULTS - 1));
        assert!(!progress_visible(RESULTS));
    }

    #[test]
    fn plan_uses_direction_classes() {
        let p = plan(4, 5, Direction::Forward, Duration::from_millis(400));
        assert_eq!(p.exit_class, "step-exit-left");
        assert_eq!(p.enter_class, "step-enter-right");
        assert_eq!(p.duration_ms, 400);
        assert_eq!(p.history_query, "?step=5");

        let back = plan(7, 5, Direction::Back, Duration::ZERO);
        assert_eq!(back.enter_class, "step-enter-left");
        assert_eq!(plan(17, RESULTS, Direction::Forward, Duration::ZERO).history_query, "?step=results");
    }

    #[test]
    fn query_parsing() {
        assert_eq!(parse_query_step("?step=4"), Some(QueryStep::Index(4)));
        assert_eq!(parse_query_step("utm=a&step=12"), Some(QueryStep::Index(12)));
        assert_eq!(parse_query_step("?step=results"), Some(QueryStep::Results));
        assert_eq!(parse_query_step("?step=abc"), None);
        assert_eq!(parse_query_step(""), None);
    }
}
