use crate::verify::VerifyError;

use super::answer::FieldError;

#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    #[error("{message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("a step transition is still running")]
    Busy,

    #[error("the wizard is already complete")]
    Complete,

    #[error("step {0} has no slider")]
    NotSlider(usize),

    #[error("verification result is no longer current")]
    Stale,

    #[error("verification failed: {0}")]
    Verification(#[from] VerifyError),
}

impl WizardError {
    /// Stable wire code for the IPC error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation_failed",
            Self::Busy => "transition_in_progress",
            Self::Complete => "wizard_complete",
            Self::NotSlider(_) => "bad_params",
            Self::Stale => "cancelled",
            Self::Verification(_) => "verification_failed",
        }
    }
}

impl From<FieldError> for WizardError {
    fn from(e: FieldError) -> Self {
        Self::Validation {
            field: e.field,
            message: e.message,
        }
    }
}
