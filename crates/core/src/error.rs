use serde_json::{json, Value};

/// A synthesis-time error. Raised while the stack is being built, validated
/// or parsed back from a template, always before any provisioning call.
#[derive(Debug, thiserror::Error)]
pub enum SynthError {
    /// A required input is missing or malformed (unreadable code bundle,
    /// bad version token, invalid capacity).
    #[error("configuration error in '{input}': {message}")]
    Configuration { input: String, message: String },

    /// A symbolic reference names a resource that was never added to the graph.
    #[error("resource '{resource}' references '{target}', which is not part of the stack")]
    DependencyResolution { resource: String, target: String },

    /// The dependency edges contain at least one cycle.
    #[error("dependency cycle among resources: {}", members.join(", "))]
    Cycle { members: Vec<String> },

    /// Two resources were registered under the same logical id.
    #[error("duplicate resource id '{id}'")]
    DuplicateResource { id: String },

    /// A template document could not be interpreted.
    #[error("invalid template: {0}")]
    InvalidTemplate(String),
}

impl SynthError {
    pub fn configuration(input: &str, message: impl Into<String>) -> Self {
        SynthError::Configuration {
            input: input.to_owned(),
            message: message.into(),
        }
    }

    /// Short machine-readable name of the error variant.
    pub fn kind(&self) -> &'static str {
        match self {
            SynthError::Configuration { .. } => "ConfigurationError",
            SynthError::DependencyResolution { .. } => "DependencyResolutionError",
            SynthError::Cycle { .. } => "CycleError",
            SynthError::DuplicateResource { .. } => "DuplicateResourceError",
            SynthError::InvalidTemplate(_) => "InvalidTemplateError",
        }
    }

    /// Serialize to the structured form printed by `--output json`.
    pub fn to_json_value(&self) -> Value {
        let mut value = json!({
            "error": self.kind(),
            "message": self.to_string(),
        });
        let extra = match self {
            SynthError::Configuration { input, .. } => Some(("input", json!(input))),
            SynthError::DependencyResolution { resource, target } => {
                value["target"] = json!(target);
                Some(("resource", json!(resource)))
            }
            SynthError::Cycle { members } => Some(("members", json!(members))),
            SynthError::DuplicateResource { id } => Some(("resource", json!(id))),
            SynthError::InvalidTemplate(_) => None,
        };
        if let Some((key, v)) = extra {
            value[key] = v;
        }
        value
    }
}
