use tracing::{debug, info};

use super::buffers::{RasterBuffers, RasterProduct, fit};
use super::descriptor::{RasterPayload, TileDescriptor, TilePayload, TileStatus};
use super::kind::TileKind;
use super::sample::{bilinear_f32, bilinear_u8, nearest, neighbours};
use crate::driver::{BandData, DriverRegistry};
use crate::error::{CdbError, Result};

impl TileDescriptor {
    fn raster(&self) -> Option<&RasterPayload> {
        match &self.payload {
            TilePayload::Raster(r) => Some(r),
            _ => None,
        }
    }

    fn raster_mut(&mut self) -> Result<&mut RasterPayload> {
        match &mut self.payload {
            TilePayload::Raster(r) => Ok(r),
            _ => Err(CdbError::driver(&self.file.path, format!("{} tile has no raster data", self.kind))),
        }
    }

    /// Which planes this tile carries, decided by its kind and subordinates.
    pub fn product(&self) -> Option<RasterProduct> {
        let r = self.raster()?;
        Some(match self.kind {
            TileKind::Elevation => RasterProduct::Elevation,
            _ if r.subordinate_exists => RasterProduct::Lightmap,
            _ if r.material_exists => RasterProduct::Material,
            _ => RasterProduct::Rgb,
        })
    }

    pub fn buffers(&self) -> Option<&RasterBuffers> { self.raster()?.buffers.as_ref() }

    pub(crate) fn buffers_mut(&mut self) -> Option<&mut RasterBuffers> {
        match &mut self.payload {
            TilePayload::Raster(r) => r.buffers.as_mut(),
            _ => None,
        }
    }

    pub fn has_material_data(&self) -> bool { self.raster().is_some_and(|r| r.have_material) }

    pub fn has_mask_data(&self) -> bool { self.raster().is_some_and(|r| r.have_mask) }

    /// Whether a composite carries a subordinate elevation plane.
    pub fn carries_subordinate(&self) -> bool { self.raster().is_some_and(|r| r.carries_subordinate) }

    pub(crate) fn set_carries_subordinate(&mut self, value: bool) {
        if let TilePayload::Raster(r) = &mut self.payload {
            r.carries_subordinate = value;
            if value {
                r.subordinate_exists = true;
            }
        }
    }

    /// Switch an imagery composite to the material product.
    pub(crate) fn set_material_product(&mut self) {
        if let TilePayload::Raster(r) = &mut self.payload {
            r.material_exists = true;
            r.have_material = true;
        }
    }

    pub(crate) fn set_has_mask(&mut self) {
        if let TilePayload::Raster(r) = &mut self.payload {
            r.have_mask = true;
        }
    }

    /// Allocate buffers for the current product; existing planes of the right
    /// shape are kept.
    pub fn allocate(&mut self) {
        let Some(product) = self.product() else { return };
        let (cols, rows) = (self.cols, self.rows);
        let mask_enabled = self.opts.material_mask;
        let Ok(r) = self.raster_mut() else { return };
        let subordinate = r.subordinate_exists || r.carries_subordinate;
        let reuse = match (&r.buffers, product) {
            (Some(RasterBuffers::Rgb(_)), RasterProduct::Rgb | RasterProduct::Lightmap) => true,
            (Some(RasterBuffers::Material { mask, .. }), RasterProduct::Material) => mask.is_some() == mask_enabled,
            (Some(RasterBuffers::Elevation { subordinate: s, .. }), RasterProduct::Elevation) => s.is_some() == subordinate,
            _ => false,
        };
        let same_size = r.buffers.as_ref().is_some_and(|b| b.size() == (cols, rows));
        if !(reuse && same_size) {
            r.buffers = Some(RasterBuffers::allocate(product, cols, rows, mask_enabled, subordinate));
        }
    }

    /// No-data value: native imagery material fills with mid grey, everything else zero.
    pub(crate) fn fill_value(&self) -> u8 {
        let native_material = self.kind == TileKind::Imagery
            && !self.cache
            && self.product() == Some(RasterProduct::Material);
        if native_material { 127 } else { 0 }
    }

    /// Reset every allocated plane to the no-data sentinel.
    pub fn fill(&mut self) {
        let value = self.fill_value();
        if let Some(b) = self.buffers_mut() {
            b.fill(value);
        }
    }

    /// Open the datasets backing the current product.
    pub fn open(&mut self, drivers: &DriverRegistry) -> Result<()> {
        if !self.kind.is_raster() {
            return self.open_features(drivers);
        }
        let product = self.product();
        let primary = self.file.path.clone();
        let r = self.raster_mut()?;
        if r.main.is_some() {
            return Ok(());
        }
        let source = match product {
            Some(RasterProduct::Lightmap) => r.subordinate_path.clone(),
            Some(RasterProduct::Material) => r.material_path.clone(),
            _ => Some(primary.clone()),
        }
        .unwrap_or(primary);

        r.main = Some(drivers.open_raster(&source)?);
        if product == Some(RasterProduct::Elevation) && r.subordinate_exists {
            if let Some(sub) = r.subordinate_path.clone() {
                r.secondary = Some(drivers.open_raster(&sub)?);
            }
        }
        self.status = TileStatus::Opened;
        Ok(())
    }

    /// Read the open datasets into the allocated buffers.
    pub fn read(&mut self) -> Result<()> {
        if self.status == TileStatus::Loaded {
            return Ok(());
        }
        let product = self.product();
        let (cols, rows) = (self.cols, self.rows);
        let mask_enabled = self.opts.material_mask;
        let path = self.file.path.clone();
        let r = self.raster_mut()?;
        let Some(main) = r.main.as_mut() else {
            return Err(CdbError::driver(&path, "dataset not open"));
        };

        match (product, r.buffers.as_mut()) {
            (Some(RasterProduct::Rgb | RasterProduct::Lightmap), Some(RasterBuffers::Rgb(rgb))) => {
                if main.band_count() < 3 {
                    return Err(CdbError::driver(&path, "imagery needs three bands"));
                }
                for band in 0..3 {
                    let data = fit(main.read_band(band + 1)?.into_u8(), rows, cols);
                    rgb.index_axis_mut(ndarray::Axis(0), band).assign(&data);
                }
            }
            (Some(RasterProduct::Material), Some(RasterBuffers::Material { material, mask })) => {
                *material = fit(main.read_band(1)?.into_u8(), rows, cols);
                r.have_material = true;
                r.have_mask = false;
                let count = main.band_count();
                if mask_enabled && count > 1 {
                    if let Some(mask) = mask {
                        *mask = fit(main.read_band(count)?.into_u8(), rows, cols);
                        r.have_mask = true;
                    }
                }
            }
            (Some(RasterProduct::Elevation), Some(RasterBuffers::Elevation { height, subordinate })) => {
                *height = fit(main.read_band(1)?.into_f32(), rows, cols);
                if r.subordinate_exists {
                    let (Some(secondary), Some(sub)) = (r.secondary.as_mut(), subordinate.as_mut()) else {
                        return Err(CdbError::driver(&path, "subordinate dataset not open"));
                    };
                    *sub = fit(secondary.read_band(1).map(BandData::into_f32)?, rows, cols);
                }
            }
            _ => return Err(CdbError::driver(&path, "buffers not allocated")),
        }
        self.status = TileStatus::Loaded;
        Ok(())
    }

    /// Allocate, open and read. Already loaded tiles succeed immediately; a
    /// failed open or read leaves the tile closed with no buffers.
    pub fn load(&mut self, drivers: &DriverRegistry) -> Result<()> {
        if self.status == TileStatus::Loaded {
            return Ok(());
        }
        if !self.file.exists {
            return Err(CdbError::NotFound(self.file.path.clone()));
        }
        self.allocate();
        if let Err(e) = self.open(drivers).and_then(|_| self.read()) {
            self.release();
            return Err(e);
        }
        if self.opts.verbose {
            info!(file = %self.file.path.display(), "loaded tile");
        } else {
            debug!(file = %self.file.path.display(), "loaded tile");
        }
        Ok(())
    }

    /// Geographic position to fractional pixel coordinates.
    pub fn ll_to_pix(&self, lon: f64, lat: f64) -> (f64, f64) {
        let (xres, yres) = self.resolution();
        ((lon - self.extent.west) / xres, (self.extent.north - lat) / yres)
    }

    /// Bilinear RGB sample; lightmap tiles answer from their lightmap plane.
    pub fn image_pixel(&self, x: f64, y: f64) -> Option<[u8; 3]> {
        let b = self.buffers()?;
        let n = neighbours(x, y, self.cols, self.rows)?;
        Some([
            bilinear_u8(b.rgb_band(0)?, &n),
            bilinear_u8(b.rgb_band(1)?, &n),
            bilinear_u8(b.rgb_band(2)?, &n),
        ])
    }

    pub fn material_pixel(&self, x: f64, y: f64) -> Option<u8> {
        let (r, c) = nearest(x, y, self.cols, self.rows)?;
        self.buffers()?.material().map(|m| m[[r, c]])
    }

    pub fn mask_pixel(&self, x: f64, y: f64) -> Option<u8> {
        let (r, c) = nearest(x, y, self.cols, self.rows)?;
        self.buffers()?.mask().map(|m| m[[r, c]])
    }

    pub fn elevation_pixel(&self, x: f64, y: f64) -> Option<f32> {
        let n = neighbours(x, y, self.cols, self.rows)?;
        self.buffers()?.height().map(|h| bilinear_f32(h, &n))
    }

    pub fn subordinate_elevation_pixel(&self, x: f64, y: f64) -> Option<f32> {
        let n = neighbours(x, y, self.cols, self.rows)?;
        self.buffers()?.subordinate().map(|s| bilinear_f32(s, &n))
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use ndarray::Array2;

    use crate::driver::{BandView, DriverRegistry, GeoTransform, RasterDriver, TiffDriver};
    use crate::error::CdbError;
    use crate::geocell::Extent;
    use crate::tile::{RasterProduct, TileDescriptor, TileKind, TileOptions, TileStatus};

    fn write_f32(path: &Path, v: f32, size: usize) {
        let band = Array2::from_elem((size, size), v);
        let t = GeoTransform::north_up(0.0, 1.0, 1.0 / size as f64, 1.0 / size as f64);
        TiffDriver.create_raster(path, &[BandView::F32(band.view())], &t).unwrap();
    }

    fn options(root: &Path) -> Arc<TileOptions> {
        let mut o = TileOptions::new(root);
        o.tile_size = 8;
        Arc::new(o)
    }

    #[test]
    fn bathymetry_subtracts_in_buffers() {
        let dir = tempfile::tempdir().unwrap();
        let o = options(dir.path());
        let probe = TileDescriptor::new(o.clone(), TileKind::Elevation, Extent::new(1.0, 0.0, 1.0, 0.0), 0);
        write_f32(probe.file_name(), 10.0, 8);
        write_f32(probe.subordinate_path().unwrap(), 2.0, 8);

        let mut t = TileDescriptor::new(o, TileKind::Elevation, Extent::new(1.0, 0.0, 1.0, 0.0), 0);
        assert!(t.subordinate_exists());
        t.load(&DriverRegistry::with_defaults()).unwrap();
        assert_eq!(t.status(), TileStatus::Loaded);

        let (x, y) = t.ll_to_pix(0.5, 0.5);
        let h = t.elevation_pixel(x, y).unwrap() - t.subordinate_elevation_pixel(x, y).unwrap();
        assert_eq!(h, 8.0);

        t.free();
        assert_eq!(t.status(), TileStatus::Opened);
        t.close();
        assert_eq!(t.status(), TileStatus::Created);
        assert!(t.buffers().is_none());
    }

    #[test]
    fn missing_tile_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut t = TileDescriptor::new(options(dir.path()), TileKind::Elevation, Extent::new(1.0, 0.0, 1.0, 0.0), 0);
        let err = t.load(&DriverRegistry::with_defaults()).unwrap_err();
        assert!(matches!(err, CdbError::NotFound(_)));
    }

    #[test]
    fn failed_read_closes_datasets() {
        let dir = tempfile::tempdir().unwrap();
        let o = options(dir.path());
        let extent = Extent::new(1.0, 0.0, 1.0, 0.0);
        let probe = TileDescriptor::new(o.clone(), TileKind::Imagery, extent, 0);
        // A single band opens fine but is not imagery.
        write_f32(probe.file_name(), 1.0, 8);

        let mut drivers = DriverRegistry::with_defaults();
        drivers.register_raster("jp2", Arc::new(TiffDriver));
        let mut t = TileDescriptor::new(o, TileKind::Imagery, extent, 0);
        assert!(matches!(t.load(&drivers), Err(CdbError::Driver { .. })));
        assert_eq!(t.status(), TileStatus::Created);
        assert!(t.buffers().is_none());
        assert!(t.raster().is_some_and(|r| r.main.is_none() && r.secondary.is_none()));
    }

    #[test]
    fn material_fill_is_mid_grey_for_native_imagery() {
        let dir = tempfile::tempdir().unwrap();
        let mut o = TileOptions::new(dir.path());
        o.tile_size = 4;
        o.materials = true;
        let o = Arc::new(o);
        let probe = TileDescriptor::new(o.clone(), TileKind::Imagery, Extent::new(1.0, 0.0, 1.0, 0.0), 0);
        let material = probe.material_path().unwrap().to_path_buf();
        std::fs::create_dir_all(material.parent().unwrap()).unwrap();
        std::fs::write(&material, b"x").unwrap();

        let mut t = TileDescriptor::new(o, TileKind::Imagery, Extent::new(1.0, 0.0, 1.0, 0.0), 0);
        assert_eq!(t.product(), Some(RasterProduct::Material));
        t.allocate();
        t.fill();
        assert!(t.buffers().unwrap().material().unwrap().iter().all(|&v| v == 127));
    }
}
