//! Feature values.
//!
//! Every extracted feature, context field and rule prediction is a
//! [`FeatureValue`]. A missing value is the dedicated [`FeatureValue::Absent`]
//! variant rather than a magic string, so it can never collide with a real
//! categorical value that happens to be spelled `ABSENT`.
//!
//! ```text
//! Absent          "no extractable value" (displays as ABSENT)
//! Categorical(s)  a named value: "Past", "Def", "NOUN", ...
//! Numeric(n)      a count or depth: punctuation count, tree depth, ...
//! ```
//!
//! The derived ordering (`Absent < Categorical < Numeric`, then by payload) is
//! what aggregation uses for deterministic tie-breaking.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    #[default]
    Absent,
    Categorical(String),
    Numeric(i64),
}

impl FeatureValue {
    pub fn categorical(value: impl Into<String>) -> Self {
        FeatureValue::Categorical(value.into())
    }

    /// Build a value from a raw annotation field.
    ///
    /// Empty strings and the CoNLL-U placeholder `_` are treated as absent.
    pub fn from_field(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == "_" { FeatureValue::Absent } else { FeatureValue::categorical(trimmed) }
    }

    pub fn from_option(raw: Option<&str>) -> Self {
        raw.map(FeatureValue::from_field).unwrap_or(FeatureValue::Absent)
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, FeatureValue::Absent)
    }

    /// The categorical payload, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FeatureValue::Categorical(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FeatureValue::Numeric(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Absent => f.write_str("ABSENT"),
            FeatureValue::Categorical(s) => f.write_str(s),
            FeatureValue::Numeric(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for FeatureValue {
    fn from(raw: &str) -> Self {
        FeatureValue::from_field(raw)
    }
}

impl From<i64> for FeatureValue {
    fn from(n: i64) -> Self {
        FeatureValue::Numeric(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_fields_are_absent() {
        assert_eq!(FeatureValue::from_field("_"), FeatureValue::Absent);
        assert_eq!(FeatureValue::from_field("  "), FeatureValue::Absent);
        assert_eq!(FeatureValue::from_field("Past"), FeatureValue::categorical("Past"));
    }

    #[test]
    fn literal_absent_string_is_not_the_absent_variant() {
        let spelled = FeatureValue::categorical("ABSENT");
        assert!(!spelled.is_absent());
        assert_ne!(spelled, FeatureValue::Absent);
        assert_eq!(spelled.to_string(), FeatureValue::Absent.to_string());
    }

    #[test]
    fn json_shape_is_untagged() {
        let values = vec![FeatureValue::Absent, FeatureValue::categorical("Fin"), FeatureValue::Numeric(3)];
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"[null,"Fin",3]"#);
        let back: Vec<FeatureValue> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, values);
    }

    #[test]
    fn absent_sorts_first() {
        let mut values = vec![FeatureValue::Numeric(1), FeatureValue::categorical("a"), FeatureValue::Absent];
        values.sort();
        assert_eq!(values[0], FeatureValue::Absent);
        assert_eq!(values[2], FeatureValue::Numeric(1));
    }
}
