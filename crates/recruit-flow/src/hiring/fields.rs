use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ids::{CustomFieldId, StageId, WorkflowId};

/// Per-application custom field values keyed by `field_key`.
pub type FieldValues = BTreeMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
    Text,
    Textarea,
    Number,
    Currency,
    Date,
    Select,
    MultiSelect,
    Boolean,
    Url,
}

/// Effective visibility of a custom field at a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldVisibility {
    Visible,
    Hidden,
    ReadOnly,
    Required,
}

impl FieldVisibility {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Visible => "visible",
            Self::Hidden => "hidden",
            Self::ReadOnly => "read_only",
            Self::Required => "required",
        }
    }

    /// Accepts the labels above case-insensitively, with `-` or `_` separators.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "visible" => Some(Self::Visible),
            "hidden" => Some(Self::Hidden),
            "read_only" | "readonly" => Some(Self::ReadOnly),
            "required" => Some(Self::Required),
            _ => None,
        }
    }

    pub const fn is_writable(self) -> bool {
        matches!(self, Self::Visible | Self::Required)
    }
}

/// Type-specific settings stored alongside a custom field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomField {
    pub id: CustomFieldId,
    pub workflow_id: WorkflowId,
    pub field_key: String,
    pub field_name: String,
    pub field_type: FieldType,
    pub order_index: u32,
    #[serde(default)]
    pub field_config: FieldConfig,
}

/// Inbound payload for adding a custom field to a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomFieldDraft {
    pub workflow_id: WorkflowId,
    pub field_key: String,
    pub field_name: String,
    pub field_type: FieldType,
    #[serde(default)]
    pub order_index: u32,
    #[serde(default)]
    pub field_config: FieldConfig,
}

impl CustomField {
    pub fn create(id: CustomFieldId, draft: CustomFieldDraft) -> Result<Self, FieldError> {
        let field_key = draft.field_key.trim().to_string();
        if field_key.is_empty() {
            return Err(FieldError::EmptyFieldKey);
        }

        Ok(Self {
            id,
            workflow_id: draft.workflow_id,
            field_key,
            field_name: draft.field_name,
            field_type: draft.field_type,
            order_index: draft.order_index,
            field_config: draft.field_config,
        })
    }

    /// Check a candidate value against the field type and its config.
    ///
    /// JSON null always passes; it clears the value.
    pub fn validate_value(&self, value: &Value) -> Result<(), FieldError> {
        if value.is_null() {
            return Ok(());
        }

        let invalid = |reason: String| FieldError::InvalidValue {
            field_key: self.field_key.clone(),
            reason,
        };
        let config = &self.field_config;

        match self.field_type {
            FieldType::Text | FieldType::Textarea => {
                let text = value
                    .as_str()
                    .ok_or_else(|| invalid("expected a string".to_string()))?;
                if let Some(max) = config.max {
                    if text.chars().count() as f64 > max {
                        return Err(invalid(format!("longer than {max} characters")));
                    }
                }
            }
            FieldType::Url => {
                let text = value
                    .as_str()
                    .ok_or_else(|| invalid("expected a string".to_string()))?;
                if !(text.starts_with("http://") || text.starts_with("https://")) {
                    return Err(invalid("expected an http(s) url".to_string()));
                }
            }
            FieldType::Number | FieldType::Currency => {
                let number = value
                    .as_f64()
                    .ok_or_else(|| invalid("expected a number".to_string()))?;
                if let Some(min) = config.min {
                    if number < min {
                        return Err(invalid(format!("below minimum {min}")));
                    }
                }
                if let Some(max) = config.max {
                    if number > max {
                        return Err(invalid(format!("above maximum {max}")));
                    }
                }
            }
            FieldType::Date => {
                let text = value
                    .as_str()
                    .ok_or_else(|| invalid("expected a YYYY-MM-DD string".to_string()))?;
                NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
                    .map_err(|err| invalid(format!("invalid date '{text}' ({err})")))?;
            }
            FieldType::Select => {
                let choice = value
                    .as_str()
                    .ok_or_else(|| invalid("expected a string option".to_string()))?;
                if !config.options.iter().any(|option| option == choice) {
                    return Err(invalid(format!("'{choice}' is not an allowed option")));
                }
            }
            FieldType::MultiSelect => {
                let choices = value
                    .as_array()
                    .ok_or_else(|| invalid("expected an array of options".to_string()))?;
                for choice in choices {
                    let choice = choice
                        .as_str()
                        .ok_or_else(|| invalid("expected string options".to_string()))?;
                    if !config.options.iter().any(|option| option == choice) {
                        return Err(invalid(format!("'{choice}' is not an allowed option")));
                    }
                }
            }
            FieldType::Boolean => {
                if !value.is_boolean() {
                    return Err(invalid("expected true or false".to_string()));
                }
            }
        }

        Ok(())
    }
}

/// Visibility policy for one custom field at one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldConfiguration {
    pub stage_id: StageId,
    pub custom_field_id: CustomFieldId,
    pub visibility: FieldVisibility,
}

/// Whether a stored value counts as filled in.
pub fn is_value_set(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(text)) => !text.trim().is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(_) => true,
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FieldError {
    #[error("field key '{field_key}' already exists in workflow {workflow_id}")]
    DuplicateFieldKey {
        workflow_id: WorkflowId,
        field_key: String,
    },
    #[error("field key must not be empty")]
    EmptyFieldKey,
    #[error("unknown custom field '{field_key}'")]
    UnknownField { field_key: String },
    #[error("invalid value for '{field_key}': {reason}")]
    InvalidValue { field_key: String, reason: String },
    #[error("field '{field_key}' is {} at the current stage", .visibility.label())]
    NotWritable {
        field_key: String,
        visibility: FieldVisibility,
    },
}
