//! Tiered field-to-donor-data matching with confidence scores.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::adapters::FormFieldDescriptor;
use crate::donor::DonorDataRecord;

use super::aliases::AliasTable;

/// Confidence assigned by each tier, highest first.
const CONFIDENCE_EXACT: f64 = 1.0;
const CONFIDENCE_ALIAS: f64 = 0.9;
const CONFIDENCE_REVERSE_ALIAS: f64 = 0.85;
const CONFIDENCE_DESCRIPTION: f64 = 0.8;
const CONFIDENCE_PREFIX: f64 = 0.7;

/// Characters compared by the weak prefix tier.
const PREFIX_LEN: usize = 4;

/// One form field matched to a donor-data value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingResult {
    pub field_name: String,
    pub value: Value,
    /// Heuristic certainty in [0, 1]; exactly the tier that produced it.
    pub confidence: f64,
    /// Donor-data key the value came from.
    pub source_key: String,
}

/// Maps form-field descriptors onto donor data.
///
/// Pure: no I/O, no shared mutable state, deterministic for identical
/// inputs and a fixed alias table. Unmapped input is never an error.
pub struct FieldMapper {
    aliases: AliasTable,
}

impl FieldMapper {
    pub fn new(aliases: AliasTable) -> Self {
        Self { aliases }
    }

    /// Matches each form field against the donor record and drops results
    /// below `threshold`. Tiers are tried in order; the first tier that
    /// matches wins for that field.
    pub fn map(
        &self,
        form_fields: &[FormFieldDescriptor],
        donor_data: &DonorDataRecord,
        threshold: f64,
    ) -> Vec<MappingResult> {
        form_fields
            .iter()
            .filter_map(|field| self.match_field(field, donor_data))
            .filter(|result| result.confidence >= threshold)
            .collect()
    }

    fn match_field(
        &self,
        field: &FormFieldDescriptor,
        donor_data: &DonorDataRecord,
    ) -> Option<MappingResult> {
        self.exact_match(field, donor_data)
            .or_else(|| self.alias_match(field, donor_data))
            .or_else(|| self.reverse_alias_match(field, donor_data))
            .or_else(|| self.description_match(field, donor_data))
            .or_else(|| self.prefix_match(field, donor_data))
    }

    /// Tier 1: field name is character-identical to a donor key.
    fn exact_match(
        &self,
        field: &FormFieldDescriptor,
        donor_data: &DonorDataRecord,
    ) -> Option<MappingResult> {
        donor_data.get(&field.name).map(|value| MappingResult {
            field_name: field.name.clone(),
            value: value.clone(),
            confidence: CONFIDENCE_EXACT,
            source_key: field.name.clone(),
        })
    }

    /// Tier 2: the field name contains an alias (or the canonical key
    /// itself) of a canonical key present in the donor data.
    fn alias_match(
        &self,
        field: &FormFieldDescriptor,
        donor_data: &DonorDataRecord,
    ) -> Option<MappingResult> {
        self.aliases
            .canonicals_for(&field.name)
            .into_iter()
            .find_map(|canonical| {
                donor_data.get(canonical).map(|value| MappingResult {
                    field_name: field.name.clone(),
                    value: value.clone(),
                    confidence: CONFIDENCE_ALIAS,
                    source_key: canonical.to_string(),
                })
            })
    }

    /// Tier 3: a donor key and the field name both refer to the same
    /// canonical key.
    fn reverse_alias_match(
        &self,
        field: &FormFieldDescriptor,
        donor_data: &DonorDataRecord,
    ) -> Option<MappingResult> {
        let field_canonicals: HashSet<&str> =
            self.aliases.canonicals_for(&field.name).into_iter().collect();
        if field_canonicals.is_empty() {
            return None;
        }

        donor_data.iter().find_map(|(key, value)| {
            let shared = self
                .aliases
                .canonicals_for(key)
                .into_iter()
                .any(|canonical| field_canonicals.contains(canonical));
            shared.then(|| MappingResult {
                field_name: field.name.clone(),
                value: value.clone(),
                confidence: CONFIDENCE_REVERSE_ALIAS,
                source_key: key.clone(),
            })
        })
    }

    /// Tier 4: the field description contains a donor key verbatim.
    fn description_match(
        &self,
        field: &FormFieldDescriptor,
        donor_data: &DonorDataRecord,
    ) -> Option<MappingResult> {
        if field.description.is_empty() {
            return None;
        }
        let description = field.description.to_ascii_lowercase();

        donor_data.iter().find_map(|(key, value)| {
            if key.is_empty() {
                return None;
            }
            description
                .contains(&key.to_ascii_lowercase())
                .then(|| MappingResult {
                    field_name: field.name.clone(),
                    value: value.clone(),
                    confidence: CONFIDENCE_DESCRIPTION,
                    source_key: key.clone(),
                })
        })
    }

    /// Tier 5: first four characters of field name and donor key agree,
    /// both being at least four characters long.
    fn prefix_match(
        &self,
        field: &FormFieldDescriptor,
        donor_data: &DonorDataRecord,
    ) -> Option<MappingResult> {
        let field_prefix = prefix(&field.name)?;

        donor_data.iter().find_map(|(key, value)| {
            let key_prefix = prefix(key)?;
            (field_prefix == key_prefix).then(|| MappingResult {
                field_name: field.name.clone(),
                value: value.clone(),
                confidence: CONFIDENCE_PREFIX,
                source_key: key.clone(),
            })
        })
    }
}

impl Default for FieldMapper {
    fn default() -> Self {
        Self::new(AliasTable::builtin())
    }
}

/// Lower-cased prefix of `PREFIX_LEN` characters, or `None` when the
/// string is shorter.
fn prefix(s: &str) -> Option<String> {
    let lower = s.to_ascii_lowercase();
    if lower.chars().count() < PREFIX_LEN {
        return None;
    }
    Some(lower.chars().take(PREFIX_LEN).collect())
}

/// Form fields with no retained mapping, by set-difference.
pub fn unmapped_fields<'a>(
    form_fields: &'a [FormFieldDescriptor],
    mappings: &[MappingResult],
) -> Vec<&'a str> {
    let mapped: HashSet<&str> = mappings.iter().map(|m| m.field_name.as_str()).collect();
    form_fields
        .iter()
        .map(|f| f.name.as_str())
        .filter(|name| !mapped.contains(name))
        .collect()
}

/// Donor keys no retained mapping drew from, by set-difference.
pub fn unused_donor_keys<'a>(
    donor_data: &'a DonorDataRecord,
    mappings: &[MappingResult],
) -> Vec<&'a str> {
    let used: HashSet<&str> = mappings.iter().map(|m| m.source_key.as_str()).collect();
    donor_data
        .keys()
        .map(|k| k.as_str())
        .filter(|key| !used.contains(key))
        .collect()
}
