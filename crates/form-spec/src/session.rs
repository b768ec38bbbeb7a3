use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::engine::{FormEngine, FormEvaluation, SubmitReport, Submission};
use crate::value::ValueSnapshot;
use crate::wizard::{NavigationError, WizardState};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("a submission is already in flight")]
    AlreadySubmitting,
    #[error("submit is only available on the last step (at {current} of {last})")]
    NotOnLastStep { current: usize, last: usize },
    #[error("submission rejected: {} field error(s), {} form error(s)", .0.field_errors.len(), .0.cross_field_errors.len())]
    Rejected(SubmitReport),
}

/// How the host's send of a [`Submission`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Succeeded,
    Failed,
}

/// Host-side state around an engine: the live values, wizard position and
/// the in-flight submit flag.
#[derive(Debug, Clone)]
pub struct FormSession {
    engine: FormEngine,
    values: ValueSnapshot,
    wizard: WizardState,
    evaluation: FormEvaluation,
    submitting: bool,
    last_report: Option<SubmitReport>,
}

impl FormSession {
    /// Starts with every `defaultValue` filled in.
    pub fn new(engine: FormEngine) -> Self {
        let values = ValueSnapshot::from_defaults(engine.schema());
        Self::with_values(engine, values)
    }

    pub fn with_values(engine: FormEngine, values: ValueSnapshot) -> Self {
        let wizard = WizardState::new(engine.schema());
        let evaluation = engine.evaluate(&values);
        Self {
            engine,
            values,
            wizard,
            evaluation,
            submitting: false,
            last_report: None,
        }
    }

    pub fn engine(&self) -> &FormEngine {
        &self.engine
    }

    pub fn values(&self) -> &ValueSnapshot {
        &self.values
    }

    pub fn wizard(&self) -> &WizardState {
        &self.wizard
    }

    pub fn evaluation(&self) -> &FormEvaluation {
        &self.evaluation
    }

    pub fn last_report(&self) -> Option<&SubmitReport> {
        self.last_report.as_ref()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Commits a value and recomputes all derived state.
    pub fn set_value(&mut self, name: &str, value: Value) -> &FormEvaluation {
        self.values.set(name, value);
        self.evaluation = self.engine.on_value_change(&self.values, name);
        &self.evaluation
    }

    pub fn clear_value(&mut self, name: &str) -> &FormEvaluation {
        self.values.remove(name);
        self.evaluation = self.engine.on_value_change(&self.values, name);
        &self.evaluation
    }

    pub fn next_step(&mut self) -> Result<usize, NavigationError> {
        self.wizard.next(&self.engine, &self.values)
    }

    pub fn previous_step(&mut self) -> Result<usize, NavigationError> {
        self.wizard.previous()
    }

    /// Validates the whole form and, when clean, hands back the payload to send.
    ///
    /// The previous report is replaced on every attempt. On success the session
    /// stays in the submitting state until [`FormSession::finish_submit`].
    pub fn begin_submit(&mut self) -> Result<Submission, SubmitError> {
        if self.submitting {
            return Err(SubmitError::AlreadySubmitting);
        }
        if !self.wizard.is_last() {
            return Err(SubmitError::NotOnLastStep {
                current: self.wizard.current(),
                last: self.wizard.step_count() - 1,
            });
        }
        let report = self.engine.validate_submission(&self.values);
        self.last_report = Some(report.clone());
        if !report.is_valid() {
            info!(form = %self.engine.schema().id, "submission rejected");
            return Err(SubmitError::Rejected(report));
        }
        self.submitting = true;
        info!(form = %self.engine.schema().id, "submission started");
        Ok(self.engine.submission(&self.values))
    }

    /// Clears the in-flight flag and returns the schema's message for the outcome.
    pub fn finish_submit(&mut self, outcome: SubmitOutcome) -> Option<&str> {
        if !self.submitting {
            debug!("finish_submit called without a submission in flight");
            return None;
        }
        self.submitting = false;
        let schema = self.engine.schema();
        match outcome {
            SubmitOutcome::Succeeded => schema.success_message.as_deref(),
            SubmitOutcome::Failed => schema.error_message.as_deref(),
        }
    }
}
