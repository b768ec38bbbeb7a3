use thiserror::Error;

/// Authoring mistakes detected while compiling a schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("field id '{0}' is declared more than once")]
    DuplicateFieldId(String),
    #[error("field '{0}' does not exist")]
    UnknownField(String),
    #[error("field '{field}' has an invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        field: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("field '{field}': rule '{rule}' needs {expected} value")]
    InvalidRuleValue {
        field: String,
        rule: &'static str,
        expected: &'static str,
    },
    #[error("field '{field}' of type '{kind}' must declare options")]
    MissingOptions { field: String, kind: &'static str },
    #[error("field '{field}': rule '{rule}' has an empty message")]
    EmptyMessage { field: String, rule: &'static str },
    #[error("message template for '{owner}' is malformed: {reason}")]
    Template { owner: String, reason: String },
}
