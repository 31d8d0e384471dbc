use std::path::{Path, PathBuf};

use super::raster::{BandData, RasterDataset, RasterDriver, deinterleave};
use crate::error::{CdbError, Result};

/// PNG/JPEG backend built on the `image` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageDriver;

struct DecodedDataset {
    path: PathBuf,
    cols: usize,
    rows: usize,
    bands: Vec<BandData>,
}

impl RasterDataset for DecodedDataset {
    fn size(&self) -> (usize, usize) { (self.cols, self.rows) }

    fn band_count(&self) -> usize { self.bands.len() }

    fn read_band(&mut self, band: usize) -> Result<BandData> {
        band.checked_sub(1)
            .and_then(|i| self.bands.get(i).cloned())
            .ok_or_else(|| CdbError::driver(&self.path, format!("band {band} out of range")))
    }
}

impl RasterDriver for ImageDriver {
    fn name(&self) -> &'static str { "image" }

    fn open_raster(&self, path: &Path) -> Result<Box<dyn RasterDataset>> {
        let img = image::open(path).map_err(|e| CdbError::driver(path, e))?;
        let (cols, rows) = (img.width() as usize, img.height() as usize);
        let samples = img.color().channel_count() as usize;
        let raw = match samples {
            1 => img.to_luma8().into_raw(),
            2 => img.to_luma_alpha8().into_raw(),
            3 => img.to_rgb8().into_raw(),
            _ => img.to_rgba8().into_raw(),
        };
        let samples = samples.clamp(1, 4);
        let bands = deinterleave(&raw, cols, rows, samples)
            .ok_or_else(|| CdbError::driver(path, "truncated image data"))?
            .into_iter()
            .map(BandData::U8)
            .collect();
        Ok(Box::new(DecodedDataset { path: path.to_path_buf(), cols, rows, bands }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_png_channels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tile.png");
        let mut img = image::RgbImage::new(2, 2);
        img.put_pixel(1, 0, image::Rgb([9, 8, 7]));
        img.save(&path).unwrap();

        let mut ds = ImageDriver.open_raster(&path).unwrap();
        assert_eq!(ds.size(), (2, 2));
        assert_eq!(ds.band_count(), 3);
        let BandData::U8(red) = ds.read_band(1).unwrap() else { panic!("expected u8 band") };
        assert_eq!(red[[0, 1]], 9);
        assert!(ds.read_band(0).is_err());
    }
}
