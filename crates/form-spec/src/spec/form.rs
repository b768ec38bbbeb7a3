use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::spec::field::{FieldSchema, FieldType};

/// Page arrangement requested by the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "kebab-case")]
pub enum FormLayout {
    #[default]
    Single,
    Wizard,
    TwoColumn,
}

/// Provenance recorded by the schema generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FormMetadata {
    pub created_at: String,
    pub user_story: String,
}

/// Top-level form definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FormSchema {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub fields: Vec<FieldSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submit_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default)]
    pub layout: FormLayout,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<FormMetadata>,
}

impl FormSchema {
    /// Creates an empty single-page form.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            fields: Vec::new(),
            submit_url: None,
            success_message: None,
            error_message: None,
            layout: FormLayout::Single,
            metadata: None,
        }
    }

    /// Looks a field up by `name` first, then by `id`.
    ///
    /// Conditionals and dependency rules may reference either key.
    pub fn find_field(&self, reference: &str) -> Option<&FieldSchema> {
        self.fields
            .iter()
            .find(|field| field.name == reference)
            .or_else(|| self.fields.iter().find(|field| field.id == reference))
    }

    pub fn field_by_id(&self, id: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|field| field.id == id)
    }

    /// Fails on the first id that appears twice.
    pub fn ensure_unique_ids(&self) -> Result<(), SchemaError> {
        let mut seen = BTreeSet::new();
        for field in &self.fields {
            if !seen.insert(field.id.as_str()) {
                return Err(SchemaError::DuplicateFieldId(field.id.clone()));
            }
        }
        Ok(())
    }

    /// Appends a field, rejecting an id that is already taken.
    pub fn add_field(&mut self, field: FieldSchema) -> Result<(), SchemaError> {
        if self.field_by_id(&field.id).is_some() {
            return Err(SchemaError::DuplicateFieldId(field.id));
        }
        self.fields.push(field);
        Ok(())
    }

    pub fn remove_field(&mut self, id: &str) -> Option<FieldSchema> {
        let index = self.fields.iter().position(|field| field.id == id)?;
        Some(self.fields.remove(index))
    }

    /// Moves the field with `id` to `index`, clamped to the end of the list.
    pub fn move_field(&mut self, id: &str, index: usize) -> Result<(), SchemaError> {
        let from = self
            .fields
            .iter()
            .position(|field| field.id == id)
            .ok_or_else(|| SchemaError::UnknownField(id.to_string()))?;
        let field = self.fields.remove(from);
        let to = index.min(self.fields.len());
        self.fields.insert(to, field);
        Ok(())
    }

    /// Changes a field's type. Options are dropped when the new type has no use for them.
    pub fn set_field_type(&mut self, id: &str, kind: FieldType) -> Result<(), SchemaError> {
        let field = self
            .fields
            .iter_mut()
            .find(|field| field.id == id)
            .ok_or_else(|| SchemaError::UnknownField(id.to_string()))?;
        field.kind = kind;
        if !kind.needs_options() {
            field.options = None;
        }
        Ok(())
    }
}
