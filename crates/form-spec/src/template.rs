use handlebars::Handlebars;
use serde::Serialize;
use serde_json::Value;

use crate::error::SchemaError;

/// Values exposed to `{{...}}` placeholders inside rule messages.
#[derive(Debug, Serialize)]
pub struct MessageContext<'a> {
    pub label: &'a str,
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<&'a Value>,
}

/// Renders rule messages once, when a schema is compiled.
pub struct MessageTemplates {
    registry: Handlebars<'static>,
}

impl MessageTemplates {
    pub fn new() -> Self {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);
        Self { registry }
    }

    /// Messages without placeholders come back verbatim.
    pub fn render(
        &self,
        owner: &str,
        message: &str,
        ctx: &MessageContext<'_>,
    ) -> Result<String, SchemaError> {
        if !message.contains("{{") {
            return Ok(message.to_string());
        }
        self.registry
            .render_template(message, ctx)
            .map_err(|err| SchemaError::Template {
                owner: owner.to_string(),
                reason: err.to_string(),
            })
    }
}

impl Default for MessageTemplates {
    fn default() -> Self {
        Self::new()
    }
}
