use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single survey cell: a number, a category label, or nothing.
///
/// Deserializes untagged, so JSON `12.5` becomes [`Number`](Self::Number),
/// `"yes"` becomes [`Category`](Self::Category) and `null` becomes
/// [`Missing`](Self::Missing).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Number(f64),
    Category(String),
    Missing,
}

impl FeatureValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, FeatureValue::Missing)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FeatureValue::Number(value) => Some(*value),
            _ => None,
        }
    }

    /// Text used to look the value up in a category table.
    ///
    /// Numbers that land in a categorical column are keyed by their shortest
    /// round-trip formatting (`1.0` → `"1"`).
    pub(crate) fn category_key(&self) -> Option<String> {
        match self {
            FeatureValue::Number(value) => Some(value.to_string()),
            FeatureValue::Category(label) => Some(label.clone()),
            FeatureValue::Missing => None,
        }
    }
}

impl From<f64> for FeatureValue {
    fn from(value: f64) -> Self {
        FeatureValue::Number(value)
    }
}

impl From<&str> for FeatureValue {
    fn from(value: &str) -> Self {
        FeatureValue::Category(value.to_string())
    }
}

impl From<String> for FeatureValue {
    fn from(value: String) -> Self {
        FeatureValue::Category(value)
    }
}

/// One survey answer set keyed by feature name. Immutable once read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord {
    values: BTreeMap<String, FeatureValue>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FeatureValue>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>> FromIterator<(K, FeatureValue)> for RawRecord {
    fn from_iter<T: IntoIterator<Item = (K, FeatureValue)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// A record after categorical substitution: one number per fitted column,
/// in fitted column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedRecord(Vec<f64>);

impl EncodedRecord {
    pub(crate) fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

/// Encoded values standardized with the frozen fit-time statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardizedVector(Vec<f64>);

impl StandardizedVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

impl AsRef<[f64]> for StandardizedVector {
    fn as_ref(&self) -> &[f64] {
        &self.0
    }
}

impl From<Vec<f64>> for StandardizedVector {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

/// How a column is treated by the normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_value_deserializes_untagged() {
        let values: Vec<FeatureValue> = serde_json::from_str(r#"[1.5, "x", null]"#).unwrap();
        assert_eq!(
            values,
            vec![
                FeatureValue::Number(1.5),
                FeatureValue::Category("x".into()),
                FeatureValue::Missing,
            ]
        );
    }

    #[test]
    fn integral_numbers_key_without_fraction() {
        assert_eq!(FeatureValue::Number(1.0).category_key().as_deref(), Some("1"));
        assert_eq!(FeatureValue::Number(2.5).category_key().as_deref(), Some("2.5"));
        assert_eq!(FeatureValue::Missing.category_key(), None);
    }

    #[test]
    fn raw_record_from_json_object() {
        let record: RawRecord = serde_json::from_str(r#"{"Age": 31, "Flag": "y"}"#).unwrap();
        assert_eq!(record.len(), 2);
        assert_eq!(record.get("Age"), Some(&FeatureValue::Number(31.0)));
        assert_eq!(
            record.column_names().collect::<Vec<_>>(),
            vec!["Age", "Flag"]
        );
    }
}
