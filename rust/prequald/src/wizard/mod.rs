//! Pre-approval wizard: step table, answers, controller, persistence and
//! the presentation plan handed to the UI shell.

mod answer;
mod controller;
mod error;
pub mod persist;
mod render;
mod state;
pub mod steps;
mod view;

pub use answer::{Answer, StepInput};
pub use controller::{Forward, Gate, Ticket, Wizard};
pub use error::WizardError;
pub use persist::{KeyValueStore, MemoryStore};
pub use render::RenderPlan;
pub use state::WizardState;
