use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::spec::{DependencyAction, FieldDependency, FormSchema};
use crate::value::{ValueSnapshot, strict_equals};

/// Resolved presentation flags for one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldState {
    pub visible: bool,
    pub enabled: bool,
    pub required: bool,
}

impl FieldState {
    /// Visible and enabled: the user can actually edit the field.
    pub fn is_active(&self) -> bool {
        self.visible && self.enabled
    }

    /// Only active required fields may block navigation or submission.
    pub fn gates_progress(&self) -> bool {
        self.is_active() && self.required
    }
}

/// Field states keyed by field id.
pub type FieldStateMap = BTreeMap<String, FieldState>;

/// How dependency chains are settled after a value change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum ResolutionMode {
    /// One pass over the raw snapshot; chains through hidden fields are not followed.
    #[default]
    SinglePass,
    /// Re-run with hidden fields' values masked until nothing changes.
    Settled {
        #[serde(rename = "maxPasses")]
        max_passes: usize,
    },
}

/// A rule or conditional that points at a field the schema does not have.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DanglingReference {
    pub owner: String,
    pub reference: String,
    pub role: &'static str,
}

/// Lists every reference that will resolve to a no-op.
pub fn audit_references(schema: &FormSchema, dependencies: &[FieldDependency]) -> Vec<DanglingReference> {
    let mut issues = Vec::new();
    for field in &schema.fields {
        if let Some(conditional) = &field.conditional
            && schema.find_field(&conditional.field).is_none()
        {
            issues.push(DanglingReference {
                owner: field.id.clone(),
                reference: conditional.field.clone(),
                role: "conditional",
            });
        }
    }
    for dependency in dependencies {
        for (reference, role) in [
            (&dependency.source_field, "sourceField"),
            (&dependency.target_field, "targetField"),
        ] {
            if schema.find_field(reference).is_none() {
                issues.push(DanglingReference {
                    owner: dependency.id.clone(),
                    reference: reference.clone(),
                    role,
                });
            }
        }
    }
    issues
}

#[derive(Clone, Copy)]
struct RawState {
    visible: bool,
    enabled: bool,
    required: bool,
}

/// Resolves visibility, enablement and requiredness for every field.
pub fn resolve_field_states(
    schema: &FormSchema,
    dependencies: &[FieldDependency],
    snapshot: &ValueSnapshot,
    mode: ResolutionMode,
) -> FieldStateMap {
    let first = single_pass(schema, dependencies, snapshot);
    let ResolutionMode::Settled { max_passes } = mode else {
        return first;
    };
    let (states, settled) = settle(schema, dependencies, snapshot, first, max_passes);
    if !settled {
        warn!(
            form = %schema.id,
            max_passes,
            "field dependencies did not settle; using the last pass"
        );
    }
    states
}

/// Re-resolves with hidden values masked until two passes agree.
///
/// `max_passes` counts the first pass; a budget of one or less is a single pass and is
/// always considered settled.
fn settle(
    schema: &FormSchema,
    dependencies: &[FieldDependency],
    snapshot: &ValueSnapshot,
    first: FieldStateMap,
    max_passes: usize,
) -> (FieldStateMap, bool) {
    if max_passes <= 1 {
        return (first, true);
    }
    let mut states = first;
    for _ in 1..max_passes {
        let hidden = schema
            .fields
            .iter()
            .filter(|field| states.get(&field.id).is_some_and(|state| !state.visible))
            .map(|field| field.name.as_str());
        let masked = snapshot.without(hidden);
        let next = single_pass(schema, dependencies, &masked);
        if next == states {
            return (states, true);
        }
        states = next;
    }
    (states, false)
}

fn single_pass(
    schema: &FormSchema,
    dependencies: &[FieldDependency],
    snapshot: &ValueSnapshot,
) -> FieldStateMap {
    let mut raw: BTreeMap<&str, RawState> = schema
        .fields
        .iter()
        .map(|field| {
            let state = RawState {
                visible: true,
                enabled: true,
                required: field.declares_required(),
            };
            (field.id.as_str(), state)
        })
        .collect();

    // A field only revealed or enabled by a rule starts out hidden or disabled.
    for dependency in dependencies {
        let (Some(_), Some(target)) = (
            schema.find_field(&dependency.source_field),
            schema.find_field(&dependency.target_field),
        ) else {
            continue;
        };
        if let Some(state) = raw.get_mut(target.id.as_str()) {
            match dependency.action {
                DependencyAction::Show => state.visible = false,
                DependencyAction::Enable => state.enabled = false,
                _ => {}
            }
        }
    }

    for field in &schema.fields {
        let Some(conditional) = &field.conditional else {
            continue;
        };
        let Some(source) = schema.find_field(&conditional.field) else {
            continue;
        };
        if !strict_equals(snapshot.get(&source.name), &conditional.value)
            && let Some(state) = raw.get_mut(field.id.as_str())
        {
            state.visible = false;
        }
    }

    for dependency in dependencies {
        let (Some(source), Some(target)) = (
            schema.find_field(&dependency.source_field),
            schema.find_field(&dependency.target_field),
        ) else {
            continue;
        };
        if !strict_equals(snapshot.get(&source.name), &dependency.source_value) {
            continue;
        }
        if let Some(state) = raw.get_mut(target.id.as_str()) {
            match dependency.action {
                DependencyAction::Show => state.visible = true,
                DependencyAction::Hide => state.visible = false,
                DependencyAction::Enable => state.enabled = true,
                DependencyAction::Disable => state.enabled = false,
                DependencyAction::Require => state.required = true,
                DependencyAction::Unrequire => state.required = false,
            }
        }
    }

    schema
        .fields
        .iter()
        .filter_map(|field| {
            let state = raw.get(field.id.as_str())?;
            let resolved = FieldState {
                visible: state.visible,
                enabled: state.visible && state.enabled,
                required: state.visible && state.required && field.kind.is_input(),
            };
            Some((field.id.clone(), resolved))
        })
        .collect()
}
