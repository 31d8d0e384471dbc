use ndarray::Axis;
use tracing::info;

use crate::driver::{BandView, DriverRegistry, GeoTransform};
use crate::error::{CdbError, Result};
use crate::tile::{RasterBuffers, RasterProduct, TileDescriptor};

impl TileDescriptor {
    /// Write a built cache tile: RGB imagery as three byte bands, elevation
    /// as float32 plus the subordinate file when one is carried. Lightmap and
    /// material composites stay in memory.
    pub fn save(&self, drivers: &DriverRegistry) -> Result<()> {
        let path = self.file_name();
        if !self.is_cache() {
            return Err(CdbError::driver(path, "only cache tiles are written"));
        }
        let Some(buffers) = self.buffers() else {
            return Err(CdbError::driver(path, "no buffers to save"));
        };
        let (xres, yres) = self.resolution();
        let transform = GeoTransform::north_up(self.extent().west, self.extent().north, xres, yres);

        match (self.product(), buffers) {
            (Some(RasterProduct::Rgb), RasterBuffers::Rgb(rgb)) => {
                let bands: Vec<BandView<'_>> = rgb.axis_iter(Axis(0)).map(BandView::U8).collect();
                drivers.raster_driver(path)?.create_raster(path, &bands, &transform)?;
            }
            (Some(RasterProduct::Elevation), RasterBuffers::Elevation { height, subordinate }) => {
                drivers.raster_driver(path)?.create_raster(path, &[BandView::F32(height.view())], &transform)?;
                if let (true, Some(sub), Some(sub_path)) = (self.carries_subordinate(), subordinate, self.subordinate_path()) {
                    drivers
                        .raster_driver(sub_path)?
                        .create_raster(sub_path, &[BandView::F32(sub.view())], &transform)?;
                }
            }
            (product, _) => {
                return Err(CdbError::driver(path, format!("{product:?} composites are not cached")));
            }
        }
        if self.opts.verbose {
            info!(file = %path.display(), "saved cache tile");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use crate::driver::{DriverRegistry, read_tiff_bands};
    use crate::geocell::Extent;
    use crate::tile::{TileDescriptor, TileKind, TileOptions};

    fn options(root: &Path) -> Arc<TileOptions> {
        let mut o = TileOptions::new(root);
        o.cache_dir = root.join("cache");
        o.tile_size = 4;
        Arc::new(o)
    }

    #[test]
    fn elevation_cache_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let extent = Extent::new(2.0, 0.0, 2.0, 0.0);
        let mut t = TileDescriptor::new(options(dir.path()), TileKind::Elevation, extent, 0);
        t.set_carries_subordinate(true);
        t.allocate();
        t.fill();
        t.save(&DriverRegistry::with_defaults()).unwrap();

        let bands = read_tiff_bands(t.file_name()).unwrap();
        assert_eq!(bands[0].dim(), (4, 4));
        assert!(t.subordinate_path().unwrap().is_file());
    }

    #[test]
    fn native_tiles_are_never_written() {
        let dir = tempfile::tempdir().unwrap();
        let mut t = TileDescriptor::new(options(dir.path()), TileKind::Imagery, Extent::new(1.0, 0.0, 1.0, 0.0), 0);
        t.allocate();
        assert!(t.save(&DriverRegistry::with_defaults()).is_err());
        assert!(!t.file_name().exists());
    }
}
