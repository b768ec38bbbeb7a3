#![allow(missing_docs)]

pub mod compile;
pub mod cross_field;
pub mod dependency;
pub mod engine;
pub mod error;
pub mod render;
pub mod schema;
pub mod session;
pub mod spec;
pub mod template;
pub mod value;
pub mod wizard;

pub use compile::{CompiledSchema, CustomChecks, FieldCheck, FieldValidator};
pub use cross_field::evaluate_rules;
pub use dependency::{FieldState, FieldStateMap, ResolutionMode, resolve_field_states};
pub use engine::{
    EngineConfig, FieldError, FieldOutput, FormEngine, FormEvaluation, SubmitReport, Submission,
};
pub use error::SchemaError;
pub use render::{RenderPayload, RenderStatus, build_render_payload, render_json_ui, render_text};
pub use schema::form_json_schema;
pub use session::{FormSession, SubmitError, SubmitOutcome};
pub use spec::{
    ComparisonOperator, CustomValidationRule, DependencyAction, FieldDependency, FieldSchema,
    FieldType, FormSchema, RuleKind, RuleSet, ValidationRule,
};
pub use value::ValueSnapshot;
pub use wizard::{NavigationError, WizardState, WizardStep, group_steps};
