use std::path::Path;

use ahash::AHashMap;

use crate::driver::{FeatureRecord, FieldValue, VectorLayer};
use crate::error::{CdbError, Result};

/// Attributes a class layer must carry.
pub const REQUIRED_CLASS_FIELDS: [&str; 7] = ["MODL", "CNAM", "FACC", "BSR", "BBW", "BBL", "BBH"];

/// Model class attributes, shared by every feature with the same CNAM.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelClass {
    pub cnam: String,
    pub model: String,  // MODL
    pub facc: String,
    pub fsc: String,    // zero padded to three digits
    pub bsr: f64,
    pub bbw: f64,
    pub bbl: f64,
    pub bbh: f64,
    pub ahgt: bool,
}

fn fsc_text(value: Option<&FieldValue>) -> String {
    match value {
        Some(v) => match v.as_i64() {
            Some(n) => format!("{n:03}"),
            None if !v.to_text().is_empty() => v.to_text(),
            None => "000".to_string(),
        },
        None => "000".to_string(),
    }
}

fn truthy(value: Option<&FieldValue>) -> bool {
    match value {
        Some(FieldValue::Integer(i)) => *i != 0,
        Some(FieldValue::Real(r)) => *r != 0.0,
        Some(FieldValue::Text(s)) => matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "t" | "true" | "y" | "yes"),
        _ => false,
    }
}

impl ModelClass {
    /// Read class attributes from a class-layer row or an inline feature record.
    pub fn from_record(record: &FeatureRecord) -> Self {
        let number = |name: &str| record.get(name).and_then(FieldValue::as_f64).unwrap_or(0.0);
        Self {
            cnam: record.text("CNAM"),
            model: record.text("MODL"),
            facc: record.text("FACC"),
            fsc: fsc_text(record.get("FSC")),
            bsr: number("BSR"),
            bbw: number("BBW"),
            bbl: number("BBL"),
            bbh: number("BBH"),
            ahgt: truthy(record.get("AHGT")),
        }
    }

    /// Ledger key, `FACC_FSC_MODL.flt`.
    pub fn key_name(&self) -> String {
        super::names::model_key(&self.facc, &self.fsc, &self.model)
    }
}

/// Class table of one feature selection, keyed by CNAM.
#[derive(Debug, Clone, Default)]
pub struct ClassMap {
    classes: AHashMap<String, ModelClass>,
}

impl ClassMap {
    /// Read every row of `layer`. Fails when a required attribute is absent.
    pub fn load(layer: &mut dyn VectorLayer, path: &Path) -> Result<Self> {
        let fields = layer.field_names();
        if let Some(missing) = REQUIRED_CLASS_FIELDS.iter().find(|f| !fields.iter().any(|n| n.as_str() == **f)) {
            return Err(CdbError::class_map(path, format!("missing field {missing}")));
        }
        let mut classes = AHashMap::new();
        layer.reset();
        while let Some(record) = layer.next_feature() {
            let class = ModelClass::from_record(&record);
            if !class.cnam.is_empty() {
                classes.insert(class.cnam.clone(), class);
            }
        }
        Ok(Self { classes })
    }

    pub fn get(&self, cnam: &str) -> Option<&ModelClass> { self.classes.get(cnam) }

    pub fn len(&self) -> usize { self.classes.len() }

    pub fn is_empty(&self) -> bool { self.classes.is_empty() }
}

impl FromIterator<ModelClass> for ClassMap {
    fn from_iter<I: IntoIterator<Item = ModelClass>>(iter: I) -> Self {
        Self { classes: iter.into_iter().map(|c| (c.cnam.clone(), c)).collect() }
    }
}

/// Open handles of one feature selection.
pub struct OpenModelSet {
    pub(crate) layer: Box<dyn VectorLayer>,
    pub(crate) classes: Option<ClassMap>,  // None when classes are inline
    pub(crate) archive: Vec<String>,       // geometry archive listing
}

impl std::fmt::Debug for OpenModelSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenModelSet")
            .field("classes", &self.classes.as_ref().map(ClassMap::len))
            .field("archive", &self.archive.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::RecordLayer;

    fn class_row(cnam: &str, modl: &str, fsc: Option<i64>) -> FeatureRecord {
        let mut r = FeatureRecord::default();
        r.set("CNAM", cnam);
        r.set("MODL", modl);
        r.set("FACC", "AL015");
        r.set("BSR", 12.5);
        r.set("BBW", 10.0);
        r.set("BBL", 20.0);
        r.set("BBH", 8.0);
        if let Some(fsc) = fsc {
            r.set("FSC", fsc);
        }
        r
    }

    #[test]
    fn loads_and_pads_fsc() {
        let mut layer = RecordLayer::from_records(vec![class_row("c1", "house", Some(2)), class_row("c2", "barn", Some(17))]);
        let map = ClassMap::load(&mut layer, Path::new("cls.dbf")).unwrap();
        assert_eq!(map.len(), 2);
        let c1 = map.get("c1").unwrap();
        assert_eq!(c1.fsc, "002");
        assert_eq!(c1.key_name(), "AL015_002_house.flt");
        assert_eq!(c1.bsr, 12.5);
        assert!(!c1.ahgt);
    }

    #[test]
    fn missing_required_field() {
        let mut row = class_row("c1", "house", None);
        row.attributes.remove("BBH");
        let mut layer = RecordLayer::from_records(vec![row]);
        let err = ClassMap::load(&mut layer, Path::new("cls.dbf")).unwrap_err();
        assert!(matches!(err, CdbError::ClassMapMissing { .. }));
    }

    #[test]
    fn fsc_defaults_and_ahgt() {
        let mut row = class_row("c1", "house", None);
        row.set("AHGT", "T");
        let class = ModelClass::from_record(&row);
        assert_eq!(class.fsc, "000");
        assert!(class.ahgt);
    }
}
