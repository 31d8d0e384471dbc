use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use ndarray::Array2;
use tiff::ColorType;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::{TiffEncoder, colortype};
use tiff::tags::Tag;

use super::raster::{BandData, BandView, GeoTransform, RasterDataset, RasterDriver, deinterleave, interleave};
use crate::error::{CdbError, Result};

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;

/// GeoTIFF backend for elevation tiles, material rasters and cache files.
#[derive(Debug, Default, Clone, Copy)]
pub struct TiffDriver;

struct TiffDataset {
    path: PathBuf,
    cols: usize,
    rows: usize,
    samples: usize,
    decoder: Decoder<BufReader<File>>,
    bands: Option<Vec<BandData>>,  // decoded lazily on first read
}

impl TiffDataset {
    fn decode(&mut self) -> Result<Vec<BandData>> {
        let image = self.decoder.read_image().map_err(|e| CdbError::driver(&self.path, e))?;
        let (cols, rows, samples) = (self.cols, self.rows, self.samples);
        let split = match image {
            DecodingResult::U8(data) => deinterleave(&data, cols, rows, samples)
                .map(|bands| bands.into_iter().map(BandData::U8).collect::<Vec<_>>()),
            DecodingResult::F32(data) => deinterleave(&data, cols, rows, samples)
                .map(|bands| bands.into_iter().map(BandData::F32).collect()),
            DecodingResult::F64(data) => {
                let data: Vec<f32> = data.into_iter().map(|v| v as f32).collect();
                deinterleave(&data, cols, rows, samples).map(|bands| bands.into_iter().map(BandData::F32).collect())
            }
            DecodingResult::I16(data) => {
                let data: Vec<f32> = data.into_iter().map(f32::from).collect();
                deinterleave(&data, cols, rows, samples).map(|bands| bands.into_iter().map(BandData::F32).collect())
            }
            DecodingResult::U16(data) => {
                let data: Vec<f32> = data.into_iter().map(f32::from).collect();
                deinterleave(&data, cols, rows, samples).map(|bands| bands.into_iter().map(BandData::F32).collect())
            }
            DecodingResult::I32(data) => {
                let data: Vec<f32> = data.into_iter().map(|v| v as f32).collect();
                deinterleave(&data, cols, rows, samples).map(|bands| bands.into_iter().map(BandData::F32).collect())
            }
            _ => return Err(CdbError::driver(&self.path, "unsupported sample format")),
        };
        split.ok_or_else(|| CdbError::driver(&self.path, "truncated image data"))
    }
}

impl RasterDataset for TiffDataset {
    fn size(&self) -> (usize, usize) { (self.cols, self.rows) }

    fn band_count(&self) -> usize { self.samples }

    fn read_band(&mut self, band: usize) -> Result<BandData> {
        if band == 0 || band > self.samples {
            return Err(CdbError::driver(&self.path, format!("band {band} out of range")));
        }
        if self.bands.is_none() {
            self.bands = Some(self.decode()?);
        }
        self.bands
            .as_ref()
            .and_then(|bands| bands.get(band - 1).cloned())
            .ok_or_else(|| CdbError::driver(&self.path, format!("band {band} missing")))
    }
}

macro_rules! write_geotiff {
    ($encoder:expr, $color:ty, $cols:expr, $rows:expr, $data:expr, $transform:expr) => {{
        let mut image = $encoder.new_image::<$color>($cols, $rows)?;
        let t = $transform;
        let pixel_scale = [t.xres(), t.yres(), 0.0];
        let tiepoint = [0.0, 0.0, 0.0, t.west(), t.north(), 0.0];
        image.encoder().write_tag(Tag::Unknown(MODEL_PIXEL_SCALE), &pixel_scale[..])?;
        image.encoder().write_tag(Tag::Unknown(MODEL_TIEPOINT), &tiepoint[..])?;
        image.write_data($data)?;
    }};
}

fn encode(path: &Path, bands: &[BandView<'_>], transform: &GeoTransform) -> tiff::TiffResult<bool> {
    let file = File::create(path)?;
    let mut encoder = TiffEncoder::new(BufWriter::new(file))?;
    match bands {
        [BandView::F32(band)] => {
            let (rows, cols) = band.dim();
            let data = interleave(&[*band]);
            write_geotiff!(encoder, colortype::Gray32Float, cols as u32, rows as u32, &data[..], transform);
        }
        [BandView::U8(band)] => {
            let (rows, cols) = band.dim();
            let data = interleave(&[*band]);
            write_geotiff!(encoder, colortype::Gray8, cols as u32, rows as u32, &data[..], transform);
        }
        [BandView::U8(r), BandView::U8(g), BandView::U8(b)] => {
            let (rows, cols) = r.dim();
            let data = interleave(&[*r, *g, *b]);
            write_geotiff!(encoder, colortype::RGB8, cols as u32, rows as u32, &data[..], transform);
        }
        [BandView::U8(r), BandView::U8(g), BandView::U8(b), BandView::U8(a)] => {
            let (rows, cols) = r.dim();
            let data = interleave(&[*r, *g, *b, *a]);
            write_geotiff!(encoder, colortype::RGBA8, cols as u32, rows as u32, &data[..], transform);
        }
        _ => return Ok(false),
    }
    Ok(true)
}

impl RasterDriver for TiffDriver {
    fn name(&self) -> &'static str { "GTiff" }

    fn open_raster(&self, path: &Path) -> Result<Box<dyn RasterDataset>> {
        let file = File::open(path).map_err(|e| CdbError::driver(path, e))?;
        let mut decoder = Decoder::new(BufReader::new(file)).map_err(|e| CdbError::driver(path, e))?;
        let (cols, rows) = decoder.dimensions().map_err(|e| CdbError::driver(path, e))?;
        let samples = match decoder.colortype().map_err(|e| CdbError::driver(path, e))? {
            ColorType::Gray(_) => 1,
            ColorType::GrayA(_) => 2,
            ColorType::RGB(_) => 3,
            ColorType::RGBA(_) => 4,
            other => return Err(CdbError::driver(path, format!("unsupported color type {other:?}"))),
        };
        Ok(Box::new(TiffDataset {
            path: path.to_path_buf(),
            cols: cols as usize,
            rows: rows as usize,
            samples,
            decoder,
            bands: None,
        }))
    }

    fn create_raster(&self, path: &Path, bands: &[BandView<'_>], transform: &GeoTransform) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        match encode(path, bands, transform) {
            Ok(true) => Ok(()),
            Ok(false) => Err(CdbError::driver(path, "unsupported band layout")),
            Err(e) => Err(CdbError::driver(path, e)),
        }
    }
}

/// Read every band of a TIFF as `f32`, for callers outside the tile lifecycle.
pub fn read_tiff_bands(path: &Path) -> Result<Vec<Array2<f32>>> {
    let mut dataset = TiffDriver.open_raster(path)?;
    (1..=dataset.band_count())
        .map(|b| dataset.read_band(b).map(BandData::into_f32))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn float_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("elev.tif");
        let band = array![[1.5f32, 2.5, 3.5], [4.0, 5.0, 6.0]];
        let t = GeoTransform::north_up(10.0, 21.0, 1.0 / 3.0, 0.5);

        TiffDriver.create_raster(&path, &[BandView::F32(band.view())], &t).unwrap();

        let mut ds = TiffDriver.open_raster(&path).unwrap();
        assert_eq!(ds.size(), (3, 2));
        assert_eq!(ds.band_count(), 1);
        assert_eq!(ds.read_band(1).unwrap(), BandData::F32(band));
        assert!(ds.read_band(2).is_err());
    }

    #[test]
    fn rgb_bands() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rgb.tif");
        let r = array![[10u8, 20], [30, 40]];
        let g = array![[11u8, 21], [31, 41]];
        let b = array![[12u8, 22], [32, 42]];
        let t = GeoTransform::north_up(0.0, 1.0, 0.5, 0.5);
        TiffDriver
            .create_raster(&path, &[BandView::U8(r.view()), BandView::U8(g.view()), BandView::U8(b.view())], &t)
            .unwrap();

        let mut ds = TiffDriver.open_raster(&path).unwrap();
        assert_eq!(ds.band_count(), 3);
        assert_eq!(ds.read_band(2).unwrap(), BandData::U8(g));
        assert_eq!(ds.read_band(3).unwrap(), BandData::U8(b));
    }

    #[test]
    fn garbage_is_a_driver_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.tif");
        std::fs::write(&path, b"not a tiff").unwrap();
        let err = TiffDriver.open_raster(&path).err().unwrap();
        assert!(matches!(err, CdbError::Driver { .. }));
    }
}
