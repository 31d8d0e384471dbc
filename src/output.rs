use std::path::Path;

use image::{Rgba, RgbaImage};
use ndarray::{Array2, s};

use crate::driver::{BandView, GeoTransform, RasterDriver, TiffDriver};
use crate::error::{CdbError, Result};
use crate::geocell::Extent;
use crate::tile::{RasterBuffers, TileDescriptor, TileStatus};

/// RGBA image of a tile, north row first.
#[derive(Debug, Clone, PartialEq)]
pub struct TileImage {
    pub extent: Extent,
    pub image: RgbaImage,
}

impl TileImage {
    /// Convert a loaded imagery tile. RGB and lightmap pixels are opaque;
    /// material is written as gray with the mask as alpha, opaque without one.
    pub fn from_tile(tile: &TileDescriptor) -> Option<Self> {
        if tile.status() != TileStatus::Loaded {
            return None;
        }
        let (cols, rows) = tile.pixel_size();
        let image = match tile.buffers()? {
            RasterBuffers::Rgb(rgb) => RgbaImage::from_fn(cols as u32, rows as u32, |x, y| {
                let (r, c) = (y as usize, x as usize);
                Rgba([rgb[[0, r, c]], rgb[[1, r, c]], rgb[[2, r, c]], 255])
            }),
            RasterBuffers::Material { material, mask } => {
                let mask = mask.as_ref().filter(|_| tile.has_mask_data());
                RgbaImage::from_fn(cols as u32, rows as u32, |x, y| {
                    let (r, c) = (y as usize, x as usize);
                    let v = material[[r, c]];
                    Rgba([v, v, v, mask.map_or(255, |m| m[[r, c]])])
                })
            }
            RasterBuffers::Elevation { .. } => return None,
        };
        Some(Self { extent: *tile.extent(), image })
    }

    pub fn width(&self) -> u32 { self.image.width() }

    pub fn height(&self) -> u32 { self.image.height() }

    /// RGBA at (`col`, `row`), row 0 north.
    pub fn pixel(&self, col: u32, row: u32) -> [u8; 4] { self.image.get_pixel(col, row).0 }

    /// Encode by file extension (PNG or JPEG).
    pub fn save(&self, path: &Path) -> Result<()> {
        self.image.save(path).map_err(|e| CdbError::driver(path, e))
    }
}

/// Terrain heights of a tile in metres, row 0 at the south edge.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightField {
    pub extent: Extent,
    pub heights: Array2<f32>,
}

impl HeightField {
    /// Convert a loaded elevation tile, subtracting the bathymetry subordinate
    /// when present and flipping rows so the south edge comes first.
    pub fn from_tile(tile: &TileDescriptor) -> Option<Self> {
        if tile.status() != TileStatus::Loaded {
            return None;
        }
        let RasterBuffers::Elevation { height, subordinate } = tile.buffers()? else {
            return None;
        };
        let rows = height.nrows();
        let heights = Array2::from_shape_fn(height.dim(), |(r, c)| {
            let src = rows - r - 1;
            let sub = subordinate.as_ref().map_or(0.0, |s| s[[src, c]]);
            height[[src, c]] - sub
        });
        Some(Self { extent: *tile.extent(), heights })
    }

    /// (cols, rows)
    pub fn size(&self) -> (usize, usize) { (self.heights.ncols(), self.heights.nrows()) }

    /// Height at (`col`, `row`), row 0 south.
    pub fn height(&self, col: usize, row: usize) -> Option<f32> { self.heights.get([row, col]).copied() }

    /// Write a north-up float32 GeoTIFF.
    pub fn save(&self, path: &Path) -> Result<()> {
        let north_up = self.heights.slice(s![..;-1, ..]);
        let (rows, cols) = north_up.dim();
        let transform = GeoTransform::north_up(
            self.extent.west,
            self.extent.north,
            self.extent.width() / cols.max(1) as f64,
            self.extent.height() / rows.max(1) as f64,
        );
        TiffDriver.create_raster(path, &[BandView::F32(north_up)], &transform)
    }

    /// (min, max) over every cell.
    pub fn range(&self) -> Option<(f32, f32)> {
        self.heights.iter().fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::driver::read_tiff_bands;

    #[test]
    fn heightfield_saves_north_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("h.tif");
        let hf = HeightField { extent: Extent::new(1.0, 0.0, 1.0, 0.0), heights: array![[1.0f32, 2.0], [3.0, 4.0]] };
        assert_eq!(hf.range(), Some((1.0, 4.0)));
        hf.save(&path).unwrap();
        let bands = read_tiff_bands(&path).unwrap();
        assert_eq!(bands[0], array![[3.0f32, 4.0], [1.0, 2.0]]);
    }
}
