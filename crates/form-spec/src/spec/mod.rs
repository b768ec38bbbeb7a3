pub mod field;
pub mod form;
pub mod rules;

pub use field::{Conditional, FieldOption, FieldSchema, FieldType, ValueKind};
pub use form::{FormLayout, FormMetadata, FormSchema};
pub use rules::{
    ComparisonOperator, CustomValidationRule, DependencyAction, FieldDependency, RuleKind,
    RuleSet, ValidationRule,
};
