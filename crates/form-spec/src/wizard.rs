use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::engine::{FieldError, FormEngine};
use crate::spec::FormSchema;
use crate::value::ValueSnapshot;

/// Fields sharing one `wizardStep` value, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardStep {
    /// The raw `wizardStep` value; positions are the index into the step list.
    pub step: u32,
    pub field_ids: Vec<String>,
}

/// Groups fields by ascending distinct step value.
///
/// Always yields at least one step so the state machine has a valid position.
pub fn group_steps(schema: &FormSchema) -> Vec<WizardStep> {
    let mut groups: BTreeMap<u32, Vec<String>> = BTreeMap::new();
    for field in &schema.fields {
        groups.entry(field.step()).or_default().push(field.id.clone());
    }
    if groups.is_empty() {
        groups.insert(0, Vec::new());
    }
    groups
        .into_iter()
        .map(|(step, field_ids)| WizardStep { step, field_ids })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    #[error("already on the first step")]
    AtFirstStep,
    #[error("already on the last step")]
    AtLastStep,
    #[error("step {step} has {} field(s) that still need attention", .fields.len())]
    Blocked { step: usize, fields: Vec<FieldError> },
}

/// Position within a multi-page form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WizardState {
    steps: Vec<WizardStep>,
    current: usize,
}

impl WizardState {
    pub fn new(schema: &FormSchema) -> Self {
        Self {
            steps: group_steps(schema),
            current: 0,
        }
    }

    /// Resumes at a host-tracked position, clamped to the last step.
    pub fn at(schema: &FormSchema, position: usize) -> Self {
        let steps = group_steps(schema);
        let current = position.min(steps.len() - 1);
        Self { steps, current }
    }

    pub fn steps(&self) -> &[WizardStep] {
        &self.steps
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn current_step(&self) -> &WizardStep {
        &self.steps[self.current]
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn is_first(&self) -> bool {
        self.current == 0
    }

    pub fn is_last(&self) -> bool {
        self.current + 1 == self.steps.len()
    }

    /// A single step renders as a plain form, without stepper chrome.
    pub fn shows_stepper(&self) -> bool {
        self.steps.len() > 1
    }

    /// Advances when every active required field on the current step passes.
    pub fn next(&mut self, engine: &FormEngine, snapshot: &ValueSnapshot) -> Result<usize, NavigationError> {
        if self.is_last() {
            return Err(NavigationError::AtLastStep);
        }
        let blockers = engine.blocking_fields(&self.current_step().field_ids, snapshot);
        if !blockers.is_empty() {
            debug!(step = self.current, blocked = blockers.len(), "step transition rejected");
            return Err(NavigationError::Blocked {
                step: self.current,
                fields: blockers,
            });
        }
        self.current += 1;
        Ok(self.current)
    }

    /// Going back is never validated.
    pub fn previous(&mut self) -> Result<usize, NavigationError> {
        if self.is_first() {
            return Err(NavigationError::AtFirstStep);
        }
        self.current -= 1;
        Ok(self.current)
    }

    /// Jumps straight to `position` when moving backwards; forward jumps go
    /// through [`WizardState::next`] one step at a time.
    pub fn go_to(
        &mut self,
        position: usize,
        engine: &FormEngine,
        snapshot: &ValueSnapshot,
    ) -> Result<usize, NavigationError> {
        if position >= self.steps.len() {
            return Err(NavigationError::AtLastStep);
        }
        while self.current > position {
            self.previous()?;
        }
        while self.current < position {
            self.next(engine, snapshot)?;
        }
        Ok(self.current)
    }
}
