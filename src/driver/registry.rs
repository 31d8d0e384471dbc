use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use super::image::ImageDriver;
use super::raster::{RasterDataset, RasterDriver};
use super::shapefile::ShapefileDriver;
use super::tiff::TiffDriver;
use super::vector::{VectorDriver, VectorLayer};
use crate::error::{CdbError, Result};

/// Raster and vector backends keyed by lower-case file extension.
#[derive(Clone, Default)]
pub struct DriverRegistry {
    raster: HashMap<String, Arc<dyn RasterDriver>>,
    vector: HashMap<String, Arc<dyn VectorDriver>>,
}

fn extension(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default()
}

impl DriverRegistry {
    /// Empty registry.
    pub fn new() -> Self { Self::default() }

    /// GeoTIFF for `.tif`/`.tiff`/`.img`, image codecs for `.png`/`.jpg`,
    /// shapefiles for `.shp`/`.dbf`. JPEG 2000 has no bundled backend.
    pub fn with_defaults() -> Self {
        let mut reg = Self::new();
        let tiff: Arc<dyn RasterDriver> = Arc::new(TiffDriver);
        let image: Arc<dyn RasterDriver> = Arc::new(ImageDriver);
        let shp: Arc<dyn VectorDriver> = Arc::new(ShapefileDriver);
        for ext in ["tif", "tiff", "img"] {
            reg.raster.insert(ext.to_string(), tiff.clone());
        }
        for ext in ["png", "jpg", "jpeg"] {
            reg.raster.insert(ext.to_string(), image.clone());
        }
        for ext in ["shp", "dbf"] {
            reg.vector.insert(ext.to_string(), shp.clone());
        }
        reg
    }

    pub fn register_raster(&mut self, ext: &str, driver: Arc<dyn RasterDriver>) {
        self.raster.insert(ext.to_ascii_lowercase(), driver);
    }

    pub fn register_vector(&mut self, ext: &str, driver: Arc<dyn VectorDriver>) {
        self.vector.insert(ext.to_ascii_lowercase(), driver);
    }

    pub fn raster_driver(&self, path: &Path) -> Result<&Arc<dyn RasterDriver>> {
        self.raster
            .get(&extension(path))
            .ok_or_else(|| CdbError::driver(path, "no raster driver for extension"))
    }

    pub fn vector_driver(&self, path: &Path) -> Result<&Arc<dyn VectorDriver>> {
        self.vector
            .get(&extension(path))
            .ok_or_else(|| CdbError::driver(path, "no vector driver for extension"))
    }

    pub fn open_raster(&self, path: &Path) -> Result<Box<dyn RasterDataset>> {
        self.raster_driver(path)?.open_raster(path)
    }

    pub fn open_vector_layer(&self, path: &Path, layer: &str) -> Result<Box<dyn VectorLayer>> {
        self.vector_driver(path)?.open_vector_layer(path, layer)
    }
}

impl std::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut raster: Vec<_> = self.raster.iter().map(|(k, d)| format!("{k}:{}", d.name())).collect();
        let mut vector: Vec<_> = self.vector.iter().map(|(k, d)| format!("{k}:{}", d.name())).collect();
        raster.sort();
        vector.sort();
        f.debug_struct("DriverRegistry").field("raster", &raster).field("vector", &vector).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_tiff_and_shapefile() {
        let reg = DriverRegistry::with_defaults();
        assert_eq!(reg.raster_driver(Path::new("a/b.TIF")).unwrap().name(), "GTiff");
        assert_eq!(reg.raster_driver(Path::new("cache.img")).unwrap().name(), "GTiff");
        assert_eq!(reg.vector_driver(Path::new("x.dbf")).unwrap().name(), "ESRI Shapefile");
        assert!(reg.raster_driver(Path::new("tile.jp2")).is_err());
    }

    #[test]
    fn registration_overrides() {
        let mut reg = DriverRegistry::with_defaults();
        reg.register_raster("JP2", Arc::new(TiffDriver));
        assert!(reg.raster_driver(Path::new("tile.jp2")).is_ok());
    }
}
