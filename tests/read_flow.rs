use std::path::Path;
use std::sync::Arc;

use cdbtiles::{
    BandView, CdbError, CdbLayer, Extent, GeoTransform, LayerConfig, RasterDriver, SessionContext, TiffDriver,
    TileDescriptor, TileKind,
};
use ndarray::Array2;

fn layer(root: &Path, cache: bool) -> CdbLayer {
    let mut config = LayerConfig::new(root);
    config.tile_size = 4;
    if cache {
        config.cache_dir = Some(root.join("cache"));
    }
    let session = Arc::new(SessionContext::new());
    session.drivers_mut().register_raster("jp2", Arc::new(TiffDriver));
    CdbLayer::new(config, session).unwrap()
}

fn write_rgb(path: &Path, extent: Extent, size: usize) {
    let r = Array2::from_shape_fn((size, size), |(y, x)| (y * size + x) as u8);
    let g = Array2::from_elem((size, size), 100u8);
    let b = Array2::from_shape_fn((size, size), |(y, _)| 200 - y as u8);
    let res = extent.width() / size as f64;
    let t = GeoTransform::north_up(extent.west, extent.north, res, res);
    TiffDriver
        .create_raster(path, &[BandView::U8(r.view()), BandView::U8(g.view()), BandView::U8(b.view())], &t)
        .unwrap();
}

fn write_height(path: &Path, extent: Extent, size: usize, value: f32) {
    let band = Array2::from_elem((size, size), value);
    let res = extent.height() / size as f64;
    let t = GeoTransform::north_up(extent.west, extent.north, res, res);
    TiffDriver.create_raster(path, &[BandView::F32(band.view())], &t).unwrap();
}

#[test]
fn native_imagery_is_returned_unmodified() {
    let dir = tempfile::tempdir().unwrap();
    let layer = layer(dir.path(), false);
    let extent = Extent::new(1.0, 0.0, 1.0, 0.0);

    let probe = TileDescriptor::new(Arc::new(layer.options().clone()), TileKind::Imagery, extent, 0);
    assert!(probe.file_name().to_string_lossy().ends_with("N00E000_D004_S001_T001_L00_U0_R0.jp2"));
    write_rgb(probe.file_name(), extent, 4);

    let image = layer.read_image(&extent).unwrap();
    assert_eq!((image.width(), image.height()), (4, 4));
    for y in 0..4u32 {
        for x in 0..4u32 {
            assert_eq!(image.pixel(x, y), [(y * 4 + x) as u8, 100, 200 - y as u8, 255]);
        }
    }
}

#[test]
fn elevation_composite_with_absent_half() {
    let dir = tempfile::tempdir().unwrap();
    let layer = layer(dir.path(), true);
    let opts = Arc::new(layer.options().clone());

    // One of four native geocells under a LOD -1 composite.
    let sw = Extent::new(1.0, 0.0, 1.0, 0.0);
    let native = TileDescriptor::new(opts.clone(), TileKind::Elevation, sw, 0);
    assert!(native.file_name().ends_with("001_Elevation/L00/U0/N00E000_D001_S001_T001_L00_U0_R0.tif"));
    write_height(native.file_name(), sw, 4, 7.0);

    let extent = Extent::new(2.0, 0.0, 2.0, 0.0);
    let field = layer.read_elevation(&extent).unwrap();
    assert_eq!(field.size(), (4, 4));
    for row in 0..4 {
        for col in 0..4 {
            let expected = if row < 2 && col < 2 { 7.0 } else { 0.0 };
            assert_eq!(field.height(col, row), Some(expected), "row {row} col {col}");
        }
    }

    // The composite was cached and is served from disk next time.
    let cached = TileDescriptor::new(opts, TileKind::Elevation, extent, 0);
    assert!(cached.is_cache());
    assert!(cached.exists());
    assert_eq!(layer.read_elevation(&extent).unwrap(), field);
}

#[test]
fn bathymetry_is_subtracted_from_heights() {
    let dir = tempfile::tempdir().unwrap();
    let layer = layer(dir.path(), false);
    let extent = Extent::new(1.0, 0.0, 1.0, 0.0);

    let native = TileDescriptor::new(Arc::new(layer.options().clone()), TileKind::Elevation, extent, 0);
    write_height(native.file_name(), extent, 4, 10.0);
    write_height(native.subordinate_path().unwrap(), extent, 4, 2.0);

    let field = layer.read_elevation(&extent).unwrap();
    assert_eq!(field.size(), (4, 4));
    for row in 0..4 {
        for col in 0..4 {
            assert_eq!(field.height(col, row), Some(8.0));
        }
    }
    assert_eq!(field.range(), Some((8.0, 8.0)));
}

#[test]
fn empty_composite_is_insufficient_data() {
    let dir = tempfile::tempdir().unwrap();
    let layer = layer(dir.path(), false);
    let err = layer.read_elevation(&Extent::new(2.0, 0.0, 2.0, 0.0)).unwrap_err();
    assert!(matches!(err, CdbError::CompositeInsufficientData { .. }));
    assert_eq!(layer.session().blacklist_len(), 0);
}

#[test]
fn missing_native_tile_short_circuits_after_blacklisting() {
    let dir = tempfile::tempdir().unwrap();
    let layer = layer(dir.path(), false);
    let extent = Extent::new(1.0, 0.0, 1.0, 0.0);
    assert!(matches!(layer.read_image(&extent), Err(CdbError::NotFound(_))));
    assert_eq!(layer.session().blacklist_len(), 1);

    // Appearing later does not help: the name stays blacklisted for the session.
    let probe = TileDescriptor::new(Arc::new(layer.options().clone()), TileKind::Imagery, extent, 0);
    write_rgb(probe.file_name(), extent, 4);
    assert!(matches!(layer.read_image(&extent), Err(CdbError::NotFound(_))));
}
