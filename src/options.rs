use serde::{Deserialize, Serialize};

/// Runtime expression kinds. Serialized as the `expressionTypes.<KIND>` member name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpressionType {
    Attribute,
    Value,
    Event,
    Text,
}

impl ExpressionType {
    pub fn as_str(self) -> &'static str {
        match self {
            ExpressionType::Attribute => "ATTRIBUTE",
            ExpressionType::Value => "VALUE",
            ExpressionType::Event => "EVENT",
            ExpressionType::Text => "TEXT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileOptions {
    /// Reported in every error raised while compiling.
    pub file_path: String,
    pub marker_prefix: String,
    pub event_prefix: String,
    pub value_attributes: Vec<String>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            file_path: String::new(),
            marker_prefix: "expr".to_string(),
            event_prefix: "on".to_string(),
            value_attributes: vec!["value".to_string()],
        }
    }
}

impl CompileOptions {
    pub fn with_file(file_path: &str) -> Self {
        CompileOptions {
            file_path: file_path.to_string(),
            ..Default::default()
        }
    }
}

/// Decides which runtime expression kind a dynamic attribute compiles to.
pub trait ExpressionPolicy: Send + Sync {
    fn attribute_kind(&self, name: &str) -> ExpressionType;

    /// Identifies the policy in compile cache keys. Policies carrying runtime
    /// configuration must include it here.
    fn cache_key(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }
}

/// Name based policy: event prefix, then the value attribute list, then plain attribute.
#[derive(Debug, Clone)]
pub struct NamingPolicy {
    event_prefix: String,
    value_attributes: Vec<String>,
}

impl NamingPolicy {
    pub fn from_options(options: &CompileOptions) -> Self {
        NamingPolicy {
            event_prefix: options.event_prefix.clone(),
            value_attributes: options.value_attributes.clone(),
        }
    }
}

impl Default for NamingPolicy {
    fn default() -> Self {
        NamingPolicy::from_options(&CompileOptions::default())
    }
}

impl ExpressionPolicy for NamingPolicy {
    fn attribute_kind(&self, name: &str) -> ExpressionType {
        if !self.event_prefix.is_empty() && name.starts_with(&self.event_prefix) {
            ExpressionType::Event
        } else if self.value_attributes.iter().any(|attr| attr == name) {
            ExpressionType::Value
        } else {
            ExpressionType::Attribute
        }
    }

    fn cache_key(&self) -> String {
        format!(
            "naming:{}:{}",
            self.event_prefix,
            self.value_attributes.join(",")
        )
    }
}
