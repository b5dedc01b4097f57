//! The denormalized-metadata transformer: flattens collection-valued fields
//! into sentinel-valued keys for adapters that can't query list membership
//! natively. A configurable delimiter and sentinel value, with
//! `denormalize`/`revert` round-tripping scalar and list-valued fields alike.

use graphrag_core::{GraphRetrieverError, Metadata, Result};
use serde_json::Value;

/// Flattens `{field: [v1, v2]}` into `{"field<delim>v1": sentinel,
/// "field<delim>v2": sentinel}` so stores without list-membership queries
/// can still answer edge-matching predicates; `revert` undoes the
/// transform.
#[derive(Debug, Clone)]
pub struct MetadataDenormalizer {
    delimiter: String,
    sentinel: Value,
}

impl MetadataDenormalizer {
    /// `delimiter` must be nonempty; collisions with field names are
    /// checked at transform time, not here, since field names aren't known
    /// until a document is seen.
    pub fn new(delimiter: impl Into<String>) -> Result<Self> {
        let delimiter = delimiter.into();
        if delimiter.is_empty() {
            return Err(GraphRetrieverError::Configuration(
                "denormalizer delimiter must not be empty".to_string(),
            ));
        }
        Ok(Self {
            delimiter,
            sentinel: Value::Bool(true),
        })
    }

    pub fn with_sentinel(mut self, sentinel: Value) -> Self {
        self.sentinel = sentinel;
        self
    }

    /// Flatten collection-valued fields of `metadata`, leaving scalar
    /// fields untouched. Fails loudly if any field name already contains
    /// the delimiter, since that would make `revert` ambiguous.
    pub fn denormalize(&self, metadata: &Metadata) -> Result<Metadata> {
        let mut out = Metadata::new();
        for (field, value) in metadata {
            if field.contains(&self.delimiter) {
                return Err(GraphRetrieverError::Configuration(format!(
                    "field {field:?} contains the denormalization delimiter {:?}",
                    self.delimiter
                )));
            }
            match value {
                Value::Array(items) => {
                    for item in items {
                        let encoded = format!("{field}{delim}{value}", delim = self.delimiter, value = scalar_key(item));
                        out.insert(encoded, self.sentinel.clone());
                    }
                }
                other => {
                    out.insert(field.clone(), other.clone());
                }
            }
        }
        Ok(out)
    }

    /// Reverse `denormalize`: regroup `field<delim>value` sentinel keys back
    /// into `{field: [values...]}`, passing non-matching keys through
    /// unchanged. Each encoded value carries a one-character type tag (see
    /// `scalar_key`) so the original scalar variant — not just its string
    /// form — round-trips.
    pub fn revert(&self, metadata: &Metadata) -> Metadata {
        let mut grouped: Metadata = Metadata::new();
        let mut lists: std::collections::HashMap<String, Vec<(String, Value)>> = std::collections::HashMap::new();

        for (key, value) in metadata {
            if let Some((field, encoded_value)) = key.split_once(&self.delimiter) {
                if *value == self.sentinel {
                    lists
                        .entry(field.to_string())
                        .or_default()
                        .push((encoded_value.to_string(), decode_scalar_key(encoded_value)));
                    continue;
                }
            }
            grouped.insert(key.clone(), value.clone());
        }

        for (field, mut values) in lists {
            // Sort by the raw encoded form, not the decoded `Value` (which
            // has no total order across variants), to keep output order
            // deterministic.
            values.sort_by(|a, b| a.0.cmp(&b.0));
            grouped.insert(field, Value::Array(values.into_iter().map(|(_, v)| v).collect()));
        }
        grouped
    }
}

/// Encodes a scalar as `{tag}{value}`, where `tag` is one of `s`/`b`/`i`/`f`
/// identifying the original `Value` variant, so `decode_scalar_key` can
/// reconstruct it exactly rather than always producing a string.
fn scalar_key(value: &Value) -> String {
    match value {
        Value::String(s) => format!("s{s}"),
        Value::Bool(b) => format!("b{b}"),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                format!("i{i}")
            } else if let Some(f) = n.as_f64() {
                format!("f{f}")
            } else {
                format!("s{n}")
            }
        }
        other => format!("s{other}"),
    }
}

fn decode_scalar_key(encoded: &str) -> Value {
    let mut chars = encoded.chars();
    match chars.next() {
        Some('s') => Value::String(chars.as_str().to_string()),
        Some('b') => match chars.as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            other => Value::String(other.to_string()),
        },
        Some('i') => chars
            .as_str()
            .parse::<i64>()
            .map(|v| Value::Number(v.into()))
            .unwrap_or_else(|_| Value::String(chars.as_str().to_string())),
        Some('f') => chars
            .as_str()
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(chars.as_str().to_string())),
        _ => Value::String(encoded.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_list_valued_field() {
        let denorm = MetadataDenormalizer::new(".").unwrap();
        let mut metadata = Metadata::new();
        metadata.insert("keywords".to_string(), serde_json::json!(["agile", "small"]));
        metadata.insert("name".to_string(), serde_json::json!("fox"));

        let flattened = denorm.denormalize(&metadata).unwrap();
        assert_eq!(flattened.get("keywords.sagile"), Some(&Value::Bool(true)));
        assert_eq!(flattened.get("name"), Some(&serde_json::json!("fox")));

        let reverted = denorm.revert(&flattened);
        let mut keywords = reverted
            .get("keywords")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect::<Vec<_>>();
        keywords.sort();
        assert_eq!(keywords, vec!["agile", "small"]);
        assert_eq!(reverted.get("name"), Some(&serde_json::json!("fox")));
    }

    #[test]
    fn round_trips_non_string_list_elements_preserving_their_type() {
        let denorm = MetadataDenormalizer::new("::").unwrap();
        let mut metadata = Metadata::new();
        metadata.insert("weights".to_string(), serde_json::json!([1, 2, 3]));
        metadata.insert("flags".to_string(), serde_json::json!([true, false]));
        metadata.insert("scores".to_string(), serde_json::json!([1.5, 2.5]));

        let flattened = denorm.denormalize(&metadata).unwrap();
        let reverted = denorm.revert(&flattened);

        let weights = reverted.get("weights").unwrap().as_array().unwrap();
        assert!(weights.iter().all(|v| v.is_i64()));
        let mut weight_values: Vec<i64> = weights.iter().map(|v| v.as_i64().unwrap()).collect();
        weight_values.sort();
        assert_eq!(weight_values, vec![1, 2, 3]);

        let flags = reverted.get("flags").unwrap().as_array().unwrap();
        let mut flag_values: Vec<bool> = flags.iter().map(|v| v.as_bool().unwrap()).collect();
        flag_values.sort();
        assert_eq!(flag_values, vec![false, true]);

        let scores = reverted.get("scores").unwrap().as_array().unwrap();
        let mut score_values: Vec<f64> = scores.iter().map(|v| v.as_f64().unwrap()).collect();
        score_values.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(score_values, vec![1.5, 2.5]);
    }

    #[test]
    fn rejects_field_names_containing_the_delimiter() {
        let denorm = MetadataDenormalizer::new(".").unwrap();
        let mut metadata = Metadata::new();
        metadata.insert("a.b".to_string(), serde_json::json!(["x"]));
        let err = denorm.denormalize(&metadata).unwrap_err();
        assert!(matches!(err, GraphRetrieverError::Configuration(_)));
    }

    #[test]
    fn empty_delimiter_rejected_at_construction() {
        assert!(MetadataDenormalizer::new("").is_err());
    }
}
