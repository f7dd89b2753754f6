use std::collections::HashMap;

use serde::Serialize;

use super::fields::{is_value_set, CustomField, FieldConfiguration, FieldValues, FieldVisibility};
use super::ids::{CustomFieldId, StageId};

/// Field with the visibility that applies at one stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedField {
    pub field: CustomField,
    pub visibility: FieldVisibility,
    /// `true` when no configuration row exists and the default applied.
    pub defaulted: bool,
}

/// Resolves per-stage visibility for a workflow's custom fields.
///
/// A (stage, field) pair without a configuration row falls back to
/// `default_visibility`, which is `VISIBLE` unless configured otherwise.
#[derive(Debug, Clone)]
pub struct VisibilityResolver {
    default_visibility: FieldVisibility,
    configured: HashMap<(StageId, CustomFieldId), FieldVisibility>,
}

impl VisibilityResolver {
    pub fn new(
        default_visibility: FieldVisibility,
        configurations: impl IntoIterator<Item = FieldConfiguration>,
    ) -> Self {
        let configured = configurations
            .into_iter()
            .map(|config| ((config.stage_id, config.custom_field_id), config.visibility))
            .collect();

        Self {
            default_visibility,
            configured,
        }
    }

    pub fn default_visibility(&self) -> FieldVisibility {
        self.default_visibility
    }

    pub fn visibility_of(&self, stage_id: &StageId, field: &CustomField) -> FieldVisibility {
        self.lookup(stage_id, &field.id)
            .unwrap_or(self.default_visibility)
    }

    fn lookup(&self, stage_id: &StageId, field_id: &CustomFieldId) -> Option<FieldVisibility> {
        self.configured
            .get(&(stage_id.clone(), field_id.clone()))
            .copied()
    }

    /// Resolve every field for the stage, ordered by `order_index` then `field_key`.
    pub fn resolve(&self, stage_id: &StageId, fields: &[CustomField]) -> Vec<ResolvedField> {
        let mut resolved: Vec<ResolvedField> = fields
            .iter()
            .map(|field| {
                let configured = self.lookup(stage_id, &field.id);
                ResolvedField {
                    field: field.clone(),
                    visibility: configured.unwrap_or(self.default_visibility),
                    defaulted: configured.is_none(),
                }
            })
            .collect();

        resolved.sort_by(|a, b| {
            a.field
                .order_index
                .cmp(&b.field.order_index)
                .then_with(|| a.field.field_key.cmp(&b.field.field_key))
        });
        resolved
    }

    /// Keys of fields that are REQUIRED at the stage but not set in `values`.
    pub fn missing_required(
        &self,
        stage_id: &StageId,
        fields: &[CustomField],
        values: &FieldValues,
    ) -> Vec<String> {
        self.resolve(stage_id, fields)
            .into_iter()
            .filter(|resolved| resolved.visibility == FieldVisibility::Required)
            .filter(|resolved| !is_value_set(values.get(&resolved.field.field_key)))
            .map(|resolved| resolved.field.field_key)
            .collect()
    }
}
