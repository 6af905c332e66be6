use serde::Serialize;

pub const LOCATION: usize = 1;
pub const PRICE_RANGE: usize = 2;
pub const DOWN_PAYMENT: usize = 3;
pub const HOMEOWNERSHIP: usize = 5;
pub const PLAN_TO_SELL: usize = 6;
pub const NAME: usize = 15;
pub const EMAIL: usize = 16;
pub const CODE: usize = 17;
/// Terminal pseudo-step. Never persisted.
pub const RESULTS: usize = 18;

pub const OWNS_HOME: &str = "Yes, I currently own a home";
pub const DEFAULT_SLIDER_VALUE: i64 = 300_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InputKind {
    None,
    #[serde(rename_all = "camelCase")]
    Text {
        max_len: usize,
    },
    #[serde(rename_all = "camelCase")]
    Slider {
        min: i64,
        max: i64,
        step: i64,
    },
    Choice {
        options: &'static [&'static str],
    },
    Name,
    Email,
    Code,
    Terminal,
}

/// A step is omitted from the visible sequence unless the answer at
/// `depends_on` is exactly `equals`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkipRule {
    pub depends_on: usize,
    pub equals: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct StepDef {
    pub id: &'static str,
    pub title: &'static str,
    pub input: InputKind,
    pub skip_unless: Option<SkipRule>,
}

impl StepDef {
    pub fn is_slider(&self) -> bool {
        matches!(self.input, InputKind::Slider { .. })
    }

    /// Steps whose answer must exist before a later step can be reached.
    pub fn requires_answer(&self) -> bool {
        matches!(
            self.input,
            InputKind::Text { .. }
                | InputKind::Choice { .. }
                | InputKind::Name
                | InputKind::Email
                | InputKind::Code
        )
    }
}

const fn step(id: &'static str, title: &'static str, input: InputKind) -> StepDef {
    StepDef {
        id,
        title,
        input,
        skip_unless: None,
    }
}

const YES_NO: &[&str] = &["Yes", "No"];

pub static STEPS: [StepDef; RESULTS + 1] = [
    step("welcome", "Get pre-approved in minutes", InputKind::None),
    step(
        "location",
        "Where are you looking to buy?",
        InputKind::Text { max_len: 200 },
    ),
    step(
        "priceRange",
        "What price range are you considering?",
        InputKind::Slider {
            min: 50_000,
            max: 3_000_000,
            step: 5_000,
        },
    ),
    step(
        "downPayment",
        "How much do you plan to put down?",
        InputKind::Slider {
            min: 0,
            max: 1_500_000,
            step: 1_000,
        },
    ),
    step(
        "propertyUse",
        "How will you use this property?",
        InputKind::Choice {
            options: &["Primary residence", "Second home", "Investment property"],
        },
    ),
    step(
        "homeownership",
        "Do you currently own a home?",
        InputKind::Choice {
            options: &[OWNS_HOME, "No, I don't own a home"],
        },
    ),
    StepDef {
        id: "planToSell",
        title: "Do you plan to sell your current home?",
        input: InputKind::Choice {
            options: &[
                "Yes, before buying",
                "Yes, after buying",
                "No, I plan to keep it",
                "Not sure yet",
            ],
        },
        skip_unless: Some(SkipRule {
            depends_on: HOMEOWNERSHIP,
            equals: OWNS_HOME,
        }),
    },
    step(
        "timeline",
        "When are you planning to buy?",
        InputKind::Choice {
            options: &[
                "Within 30 days",
                "1-3 months",
                "3-6 months",
                "6+ months",
                "Just researching",
            ],
        },
    ),
    step(
        "creditScore",
        "What's your estimated credit score?",
        InputKind::Choice {
            options: &[
                "Excellent (740+)",
                "Good (680-739)",
                "Fair (620-679)",
                "Below 620",
                "I don't know",
            ],
        },
    ),
    step(
        "employment",
        "What's your employment status?",
        InputKind::Choice {
            options: &["Employed", "Self-employed", "Retired", "Other"],
        },
    ),
    step(
        "annualIncome",
        "What's your annual household income?",
        InputKind::Choice {
            options: &[
                "Under $50,000",
                "$50,000 - $100,000",
                "$100,000 - $150,000",
                "$150,000 - $250,000",
                "Over $250,000",
            ],
        },
    ),
    step(
        "monthlyDebts",
        "What are your total monthly debt payments?",
        InputKind::Choice {
            options: &[
                "Under $500",
                "$500 - $1,000",
                "$1,000 - $2,000",
                "Over $2,000",
            ],
        },
    ),
    step(
        "firstTimeBuyer",
        "Is this your first home purchase?",
        InputKind::Choice { options: YES_NO },
    ),
    step(
        "militaryService",
        "Have you or your spouse served in the military?",
        InputKind::Choice { options: YES_NO },
    ),
    step(
        "realtor",
        "Are you working with a real estate agent?",
        InputKind::Choice {
            options: &["Yes", "No", "Not yet, but I'd like one"],
        },
    ),
    step("name", "What's your name?", InputKind::Name),
    step("email", "Where should we send your results?", InputKind::Email),
    step("code", "Enter the code we emailed you", InputKind::Code),
    step("results", "You're pre-qualified", InputKind::Terminal),
];

pub fn step_def(index: usize) -> &'static StepDef {
    &STEPS[index.min(RESULTS)]
}

/// Slider default for a step given the current price-range value.
pub fn slider_default(index: usize, slider_value: i64) -> i64 {
    match index {
        PRICE_RANGE => slider_value,
        // 20% of the price range, rounded to the slider step.
        DOWN_PAYMENT => (slider_value / 5 / 1_000) * 1_000,
        _ => 0,
    }
}

pub fn clamp_slider(index: usize, value: i64) -> Option<i64> {
    match step_def(index).input {
        InputKind::Slider { min, max, .. } => Some(value.clamp(min, max)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_has_fixed_gates() {
        assert_eq!(STEPS[EMAIL].input, InputKind::Email);
        assert_eq!(STEPS[CODE].input, InputKind::Code);
        assert_eq!(STEPS[RESULTS].input, InputKind::Terminal);
        assert_eq!(
            STEPS[PLAN_TO_SELL].skip_unless.map(|r| r.depends_on),
            Some(HOMEOWNERSHIP)
        );
    }

    #[test]
    fn step_ids_are_unique() {
        let mut ids: Vec<&str> = STEPS.iter().map(|s| s.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), STEPS.len());
    }

    #[test]
    fn down_payment_defaults_to_a_fifth_of_price() {
        assert_eq!(slider_default(DOWN_PAYMENT, 300_000), 60_000);
        assert_eq!(slider_default(DOWN_PAYMENT, 312_500), 62_000);
        assert_eq!(slider_default(PRICE_RANGE, 450_000), 450_000);
    }

    #[test]
    fn clamp_slider_rejects_non_slider_steps() {
        assert_eq!(clamp_slider(PRICE_RANGE, 10), Some(50_000));
        assert_eq!(clamp_slider(LOCATION, 10), None);
    }
}
