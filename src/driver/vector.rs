use std::collections::BTreeMap;
use std::path::Path;

use geo::Point;

use crate::error::Result;

/// Attribute value carried by a vector feature.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(i) => Some(*i as f64),
            FieldValue::Real(r) => Some(*r),
            FieldValue::Text(s) => s.trim().parse().ok(),
            FieldValue::Null => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            FieldValue::Real(r) => Some(r.round() as i64),
            FieldValue::Text(s) => s.trim().parse().ok(),
            FieldValue::Null => None,
        }
    }

    /// Text form, trimmed; numbers are printed without a fractional part when integral.
    pub fn to_text(&self) -> String {
        match self {
            FieldValue::Null => String::new(),
            FieldValue::Integer(i) => i.to_string(),
            FieldValue::Real(r) if r.fract() == 0.0 => format!("{}", *r as i64),
            FieldValue::Real(r) => r.to_string(),
            FieldValue::Text(s) => s.trim().to_string(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self { FieldValue::Text(s.to_string()) }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self { FieldValue::Integer(i) }
}

impl From<f64> for FieldValue {
    fn from(r: f64) -> Self { FieldValue::Real(r) }
}

/// Point geometry with optional height and measure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureGeometry {
    pub point: Point<f64>,
    pub z: f64,
    pub m: Option<f64>,
}

impl FeatureGeometry {
    pub fn new(x: f64, y: f64) -> Self {
        Self { point: Point::new(x, y), z: 0.0, m: None }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureRecord {
    pub fid: u64,
    pub geometry: Option<FeatureGeometry>,
    pub attributes: BTreeMap<String, FieldValue>,
}

impl FeatureRecord {
    pub fn get(&self, name: &str) -> Option<&FieldValue> { self.attributes.get(name) }

    /// Trimmed text of an attribute, empty when absent.
    pub fn text(&self, name: &str) -> String {
        self.get(name).map(FieldValue::to_text).unwrap_or_default()
    }

    pub fn set(&mut self, name: &str, value: impl Into<FieldValue>) {
        self.attributes.insert(name.to_string(), value.into());
    }
}

/// Sequential reader over one layer of a vector dataset.
pub trait VectorLayer: Send {
    fn field_names(&self) -> Vec<String>;
    fn next_feature(&mut self) -> Option<FeatureRecord>;
    fn reset(&mut self);
}

/// Vector codec capability, selected by file extension.
pub trait VectorDriver: Send + Sync {
    fn name(&self) -> &'static str;

    fn open_vector_layer(&self, path: &Path, layer: &str) -> Result<Box<dyn VectorLayer>>;

    /// Whether feature records carry their class attributes directly, making a
    /// separate class layer unnecessary.
    fn inline_classes(&self) -> bool { false }
}

/// Fully materialised layer, shared by the eager backends.
#[derive(Debug, Clone, Default)]
pub struct RecordLayer {
    fields: Vec<String>,
    features: Vec<FeatureRecord>,
    cursor: usize,
}

impl RecordLayer {
    pub fn new(fields: Vec<String>, features: Vec<FeatureRecord>) -> Self {
        Self { fields, features, cursor: 0 }
    }

    /// Field names collected from the records themselves.
    pub fn from_records(features: Vec<FeatureRecord>) -> Self {
        let mut fields: Vec<String> = Vec::new();
        for f in &features {
            for name in f.attributes.keys() {
                if !fields.contains(name) {
                    fields.push(name.clone());
                }
            }
        }
        Self::new(fields, features)
    }

    pub fn len(&self) -> usize { self.features.len() }

    pub fn is_empty(&self) -> bool { self.features.is_empty() }
}

impl VectorLayer for RecordLayer {
    fn field_names(&self) -> Vec<String> { self.fields.clone() }

    fn next_feature(&mut self) -> Option<FeatureRecord> {
        let f = self.features.get(self.cursor).cloned();
        if f.is_some() {
            self.cursor += 1;
        }
        f
    }

    fn reset(&mut self) { self.cursor = 0; }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_value_text() {
        assert_eq!(FieldValue::Real(12.0).to_text(), "12");
        assert_eq!(FieldValue::Real(1.5).to_text(), "1.5");
        assert_eq!(FieldValue::from("  AL015 ").to_text(), "AL015");
        assert_eq!(FieldValue::Text("7".into()).as_i64(), Some(7));
        assert_eq!(FieldValue::Null.as_f64(), None);
    }

    #[test]
    fn record_layer_iterates_and_resets() {
        let mut a = FeatureRecord { fid: 1, ..Default::default() };
        a.set("CNAM", "house");
        let b = FeatureRecord { fid: 2, ..Default::default() };
        let mut layer = RecordLayer::from_records(vec![a, b]);

        assert_eq!(layer.field_names(), vec!["CNAM".to_string()]);
        assert_eq!(layer.next_feature().map(|f| f.fid), Some(1));
        assert_eq!(layer.next_feature().map(|f| f.fid), Some(2));
        assert!(layer.next_feature().is_none());
        layer.reset();
        assert_eq!(layer.next_feature().map(|f| f.fid), Some(1));
    }
}
