use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use cdbtiles::{
    CdbError, Extent, FeatureConfig, FeatureGeometry, FeatureRecord, FeatureSource, MemVectorDriver, ModelSet,
    SessionContext, TileDescriptor, TileKind, TileOptions, VectorDriver,
};

fn touch(path: &Path) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, b"x").unwrap();
}

fn write_zip(path: &Path, members: &[String]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
    for m in members {
        zip.start_file(m.as_str(), zip::write::SimpleFileOptions::default()).unwrap();
        zip.write_all(b"flt").unwrap();
    }
    zip.finish().unwrap();
}

fn point(x: f64, y: f64, cnam: &str) -> FeatureRecord {
    let mut r = FeatureRecord { geometry: Some(FeatureGeometry::new(x, y)), ..Default::default() };
    r.set("CNAM", cnam);
    r
}

fn class(cnam: &str, modl: &str) -> FeatureRecord {
    let mut r = FeatureRecord::default();
    for (k, v) in [("CNAM", cnam), ("MODL", modl), ("FACC", "AL015")] {
        r.set(k, v);
    }
    for k in ["BSR", "BBW", "BBL", "BBH"] {
        r.set(k, 2.0);
    }
    r.set("FSC", 2i64);
    r
}

/// Lay out one geospecific tile and return its model set and archive header.
fn geospecific_tile(root: &Path, extent: Extent, models: &[&str]) -> (ModelSet, String) {
    let probe = TileDescriptor::new(Arc::new(TileOptions::new(root)), TileKind::GeoSpecific, extent, 0);
    let set = probe.model_sets()[0].clone();
    touch(&set.primary.path);
    touch(&set.class_table.path);
    let header = set.model_header(probe.address());
    let members: Vec<String> = models.iter().map(|m| format!("{header}AL015_002_{m}.flt")).collect();
    write_zip(&set.geometry.as_ref().unwrap().path, &members);
    (set, header)
}

fn source(root: &Path, driver: MemVectorDriver) -> FeatureSource {
    let session = Arc::new(SessionContext::new());
    let driver: Arc<dyn VectorDriver> = Arc::new(driver);
    session.drivers_mut().register_vector("shp", driver.clone());
    session.drivers_mut().register_vector("dbf", driver);
    FeatureSource::new(FeatureConfig::new(root, 0, 4), session).unwrap()
}

#[test]
fn finer_lod_reuses_and_replaces_coarser_models() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let cell = Extent::new(1.0, 0.0, 1.0, 0.0);
    let quarter = Extent::new(0.5, 0.0, 0.5, 0.0);

    let (l0, h0) = geospecific_tile(root, cell, &["house", "barn"]);
    let (l1, h1) = geospecific_tile(root, quarter, &["house", "shed"]);
    let classes = vec![class("c1", "house"), class("c2", "barn"), class("c3", "silo")];
    let driver = MemVectorDriver::new()
        .with_layer(&l0.primary.path, vec![point(0.2, 0.2, "c1"), point(0.3, 0.3, "c2"), point(0.4, 0.4, "c3")])
        .with_layer(&l0.class_table.path, classes.clone())
        .with_layer(&l1.primary.path, vec![point(0.2, 0.2, "c1"), point(0.3, 0.3, "c2")])
        .with_layer(&l1.class_table.path, classes);
    let source = source(root, driver);

    let coarse: Vec<_> = source.read_features(&cell).unwrap().collect();
    assert_eq!(coarse.len(), 2, "the silo model is in no archive or ledger");
    let house0 = coarse[0].model.clone().unwrap();
    assert_eq!(house0.name, format!("{h0}AL015_002_house.flt"));
    assert!(house0.referenced_name.is_none());

    let fine: Vec<_> = source.read_features(&quarter).unwrap().collect();
    assert_eq!(fine.len(), 2);
    let house1 = fine[0].model.clone().unwrap();
    assert_eq!(house1.name, format!("{h1}AL015_002_house.flt"));
    assert_eq!(house1.referenced_name.as_deref(), Some(house0.name.as_str()));
    let barn = fine[1].model.clone().unwrap();
    assert_eq!(barn.name, format!("{h0}AL015_002_barn.flt"));

    let batch = source.session().replacements().pop().unwrap();
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].retired_name, house0.name);
    assert_eq!(batch[0].replacement_name, house1.name);

    // The shed is in the finer archive but referenced by no feature.
    assert_eq!(source.session().unreferenced().len(), 1);
}

#[test]
fn unreferenced_archive_member_serves_a_finer_tile() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let quarter = Extent::new(0.5, 0.0, 0.5, 0.0);
    let eighth = Extent::new(0.25, 0.0, 0.25, 0.0);

    let (l1, h1) = geospecific_tile(root, quarter, &["house", "shed"]);
    let (l2, _) = geospecific_tile(root, eighth, &["house"]);
    let classes = vec![class("c1", "house"), class("c4", "shed")];
    let driver = MemVectorDriver::new()
        .with_layer(&l1.primary.path, vec![point(0.2, 0.2, "c1")])
        .with_layer(&l1.class_table.path, classes.clone())
        .with_layer(&l2.primary.path, vec![point(0.1, 0.1, "c4")])
        .with_layer(&l2.class_table.path, classes);
    let source = source(root, driver);

    assert_eq!(source.read_features(&quarter).unwrap().count(), 1);
    assert_eq!(source.session().unreferenced().len(), 1);

    // The finer archive lacks the shed, so the coarser unclaimed member is used.
    let fine: Vec<_> = source.read_features(&eighth).unwrap().collect();
    assert_eq!(fine.len(), 1);
    let shed = fine[0].model.clone().unwrap();
    assert_eq!(shed.name, format!("{h1}AL015_002_shed.flt"));
    assert_eq!(shed.model_zip.as_deref(), Some(l1.geometry.as_ref().unwrap().path.as_path()));
    assert!(shed.referenced_name.is_none());
    assert!(source.session().models().contains_key("AL015_002_shed.flt"));
}

#[test]
fn geopackage_features_need_a_driver() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = FeatureConfig::new(dir.path(), 0, 4);
    config.use_gpkg_for_features = true;

    let session = Arc::new(SessionContext::new());
    let err = FeatureSource::new(config.clone(), session.clone()).unwrap_err();
    assert!(matches!(err, CdbError::Configuration(_)));

    session.drivers_mut().register_vector("gpkg", Arc::new(MemVectorDriver::new().with_inline_classes(true)));
    assert!(FeatureSource::new(config, session).is_ok());
}

#[test]
fn tile_without_features_yields_placeholder() {
    let dir = tempfile::tempdir().unwrap();
    let cell = Extent::new(1.0, 0.0, 1.0, 0.0);
    let (set, _) = geospecific_tile(dir.path(), cell, &[]);
    let driver = MemVectorDriver::new()
        .with_layer(&set.primary.path, Vec::new())
        .with_layer(&set.class_table.path, vec![class("c1", "house")]);
    let source = source(dir.path(), driver);

    let features: Vec<_> = source.read_features(&cell).unwrap().collect();
    assert_eq!(features.len(), 1);
    assert!(features[0].ignore);
    assert_eq!(features[0].geometry.point.x_y(), (0.5, 0.5));
}

#[test]
fn missing_tile_is_blacklisted() {
    let dir = tempfile::tempdir().unwrap();
    let source = source(dir.path(), MemVectorDriver::new());
    let err = source.read_features(&Extent::new(1.0, 0.0, 1.0, 0.0)).unwrap_err();
    assert!(matches!(err, CdbError::NotFound(_)));
    assert_eq!(source.session().blacklist_len(), 1);
}
