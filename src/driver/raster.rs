use std::path::Path;

use ndarray::{Array2, ArrayView2};

use crate::error::{CdbError, Result};

/// One band of raster samples, indexed `[row, col]` with row 0 at the north edge.
#[derive(Debug, Clone, PartialEq)]
pub enum BandData {
    U8(Array2<u8>),
    F32(Array2<f32>),
}

impl BandData {
    /// (rows, cols)
    pub fn dim(&self) -> (usize, usize) {
        match self {
            BandData::U8(a) => a.dim(),
            BandData::F32(a) => a.dim(),
        }
    }

    pub fn into_u8(self) -> Array2<u8> {
        match self {
            BandData::U8(a) => a,
            BandData::F32(a) => a.mapv(|v| v.round().clamp(0.0, 255.0) as u8),
        }
    }

    pub fn into_f32(self) -> Array2<f32> {
        match self {
            BandData::U8(a) => a.mapv(f32::from),
            BandData::F32(a) => a,
        }
    }
}

/// Borrowed band handed to a writer.
#[derive(Debug, Clone, Copy)]
pub enum BandView<'a> {
    U8(ArrayView2<'a, u8>),
    F32(ArrayView2<'a, f32>),
}

/// Affine geotransform `[west, xres, 0, north, 0, -yres]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform(pub [f64; 6]);

impl GeoTransform {
    pub fn north_up(west: f64, north: f64, xres: f64, yres: f64) -> Self {
        Self([west, xres, 0.0, north, 0.0, -yres])
    }

    pub fn west(&self) -> f64 { self.0[0] }
    pub fn north(&self) -> f64 { self.0[3] }
    pub fn xres(&self) -> f64 { self.0[1] }
    pub fn yres(&self) -> f64 { -self.0[5] }
}

/// An open raster file. Owned by exactly one tile descriptor.
pub trait RasterDataset: Send {
    /// (cols, rows)
    fn size(&self) -> (usize, usize);
    fn band_count(&self) -> usize;
    /// Read band `band` (1-based).
    fn read_band(&mut self, band: usize) -> Result<BandData>;
}

/// Raster codec capability, selected by file extension.
pub trait RasterDriver: Send + Sync {
    fn name(&self) -> &'static str;

    fn open_raster(&self, path: &Path) -> Result<Box<dyn RasterDataset>>;

    fn create_raster(&self, path: &Path, _bands: &[BandView<'_>], _transform: &GeoTransform) -> Result<()> {
        Err(CdbError::driver(path, format!("{} driver cannot create rasters", self.name())))
    }
}

/// Split interleaved samples into per-band arrays.
pub(crate) fn deinterleave<T: Copy>(data: &[T], cols: usize, rows: usize, samples: usize) -> Option<Vec<Array2<T>>> {
    if samples == 0 || data.len() < cols * rows * samples {
        return None;
    }
    Some((0..samples)
        .map(|b| Array2::from_shape_fn((rows, cols), |(r, c)| data[(r * cols + c) * samples + b]))
        .collect())
}

/// Interleave equally sized bands into one sample vector.
pub(crate) fn interleave<T: Copy>(bands: &[ArrayView2<'_, T>]) -> Vec<T> {
    let Some(first) = bands.first() else { return Vec::new() };
    let (rows, cols) = first.dim();
    let mut out = Vec::with_capacity(rows * cols * bands.len());
    for r in 0..rows {
        for c in 0..cols {
            for band in bands {
                out.push(band[[r, c]]);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn interleave_round_trip() {
        let r = array![[1u8, 2], [3, 4]];
        let g = array![[5u8, 6], [7, 8]];
        let data = interleave(&[r.view(), g.view()]);
        assert_eq!(data, vec![1, 5, 2, 6, 3, 7, 4, 8]);

        let bands = deinterleave(&data, 2, 2, 2).unwrap();
        assert_eq!(bands[0], r);
        assert_eq!(bands[1], g);
        assert!(deinterleave(&data, 3, 2, 2).is_none());
    }

    #[test]
    fn band_conversions() {
        let f = BandData::F32(array![[-3.0f32, 12.6], [300.0, 0.4]]);
        assert_eq!(f.into_u8(), array![[0u8, 13], [255, 0]]);
        assert_eq!(BandData::U8(array![[7u8]]).into_f32(), array![[7.0f32]]);
    }
}
