use std::path::Path;

use geo::Point;
use shapefile::dbase;
use shapefile::{Reader, Shape};

use super::vector::{FeatureGeometry, FeatureRecord, FieldValue, RecordLayer, VectorDriver, VectorLayer};
use crate::error::{CdbError, Result};

/// ESRI shapefile backend: `.shp` feature layers and bare `.dbf` class tables.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShapefileDriver;

fn field_value(value: dbase::FieldValue) -> FieldValue {
    match value {
        dbase::FieldValue::Character(Some(s)) => FieldValue::Text(s.trim().to_string()),
        dbase::FieldValue::Memo(s) => FieldValue::Text(s),
        dbase::FieldValue::Numeric(Some(n)) => FieldValue::Real(n),
        dbase::FieldValue::Float(Some(f)) => FieldValue::Real(f64::from(f)),
        dbase::FieldValue::Double(d) => FieldValue::Real(d),
        dbase::FieldValue::Currency(c) => FieldValue::Real(c),
        dbase::FieldValue::Integer(i) => FieldValue::Integer(i64::from(i)),
        dbase::FieldValue::Logical(Some(b)) => FieldValue::Integer(i64::from(b)),
        _ => FieldValue::Null,
    }
}

fn geometry(shape: &Shape) -> Option<FeatureGeometry> {
    match shape {
        Shape::Point(p) => Some(FeatureGeometry::new(p.x, p.y)),
        Shape::PointM(p) => Some(FeatureGeometry { point: Point::new(p.x, p.y), z: 0.0, m: Some(p.m) }),
        Shape::PointZ(p) => Some(FeatureGeometry { point: Point::new(p.x, p.y), z: p.z, m: Some(p.m) }),
        _ => None,
    }
}

fn read_table(path: &Path) -> Result<RecordLayer> {
    let mut reader = dbase::Reader::from_path(path).map_err(|e| CdbError::driver(path, e))?;
    let fields: Vec<String> = reader.fields().iter().map(|f| f.name().to_string()).collect();
    let records = reader.read().map_err(|e| CdbError::driver(path, e))?;

    let features = records
        .into_iter()
        .enumerate()
        .map(|(fid, record)| FeatureRecord {
            fid: fid as u64,
            geometry: None,
            attributes: record.into_iter().map(|(name, value)| (name, field_value(value))).collect(),
        })
        .collect();
    Ok(RecordLayer::new(fields, features))
}

fn read_points(path: &Path) -> Result<RecordLayer> {
    let mut reader = Reader::from_path(path).map_err(|e| CdbError::driver(path, e))?;
    let mut features = Vec::new();
    for (fid, result) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) = result.map_err(|e| CdbError::driver(path, e))?;
        features.push(FeatureRecord {
            fid: fid as u64,
            geometry: geometry(&shape),
            attributes: record.into_iter().map(|(name, value)| (name, field_value(value))).collect(),
        });
    }
    Ok(RecordLayer::from_records(features))
}

impl VectorDriver for ShapefileDriver {
    fn name(&self) -> &'static str { "ESRI Shapefile" }

    fn open_vector_layer(&self, path: &Path, _layer: &str) -> Result<Box<dyn VectorLayer>> {
        let is_table = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("dbf"));
        let layer = if is_table { read_table(path)? } else { read_points(path)? };
        Ok(Box::new(layer))
    }
}
