use ndarray::{Array2, Array3, s};

/// What a raster tile's buffers hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterProduct {
    Rgb,
    Lightmap,
    Material,
    Elevation,
}

/// Pixel planes of a raster tile, row 0 at the north edge.
#[derive(Debug, Clone, PartialEq)]
pub enum RasterBuffers {
    /// `[band, row, col]` with three bands; lightmaps use the same layout.
    Rgb(Array3<u8>),
    Material { material: Array2<u8>, mask: Option<Array2<u8>> },
    Elevation { height: Array2<f32>, subordinate: Option<Array2<f32>> },
}

impl RasterBuffers {
    pub(crate) fn allocate(product: RasterProduct, cols: usize, rows: usize, mask: bool, subordinate: bool) -> Self {
        match product {
            RasterProduct::Rgb | RasterProduct::Lightmap => RasterBuffers::Rgb(Array3::zeros((3, rows, cols))),
            RasterProduct::Material => RasterBuffers::Material {
                material: Array2::zeros((rows, cols)),
                mask: mask.then(|| Array2::zeros((rows, cols))),
            },
            RasterProduct::Elevation => RasterBuffers::Elevation {
                height: Array2::zeros((rows, cols)),
                subordinate: subordinate.then(|| Array2::zeros((rows, cols))),
            },
        }
    }

    /// Overwrite every plane with the no-data sentinel.
    pub(crate) fn fill(&mut self, value: u8) {
        match self {
            RasterBuffers::Rgb(rgb) => rgb.fill(value),
            RasterBuffers::Material { material, mask } => {
                material.fill(value);
                if let Some(mask) = mask {
                    mask.fill(0);
                }
            }
            RasterBuffers::Elevation { height, subordinate } => {
                height.fill(0.0);
                if let Some(sub) = subordinate {
                    sub.fill(0.0);
                }
            }
        }
    }

    /// (cols, rows)
    pub fn size(&self) -> (usize, usize) {
        let (rows, cols) = match self {
            RasterBuffers::Rgb(rgb) => {
                let (_, r, c) = rgb.dim();
                (r, c)
            }
            RasterBuffers::Material { material, .. } => material.dim(),
            RasterBuffers::Elevation { height, .. } => height.dim(),
        };
        (cols, rows)
    }

    pub fn rgb_band(&self, band: usize) -> Option<ndarray::ArrayView2<'_, u8>> {
        match self {
            RasterBuffers::Rgb(rgb) if band < 3 => Some(rgb.slice(s![band, .., ..])),
            _ => None,
        }
    }

    pub fn height(&self) -> Option<&Array2<f32>> {
        match self {
            RasterBuffers::Elevation { height, .. } => Some(height),
            _ => None,
        }
    }

    pub fn subordinate(&self) -> Option<&Array2<f32>> {
        match self {
            RasterBuffers::Elevation { subordinate, .. } => subordinate.as_ref(),
            _ => None,
        }
    }

    pub fn material(&self) -> Option<&Array2<u8>> {
        match self {
            RasterBuffers::Material { material, .. } => Some(material),
            _ => None,
        }
    }

    pub fn mask(&self) -> Option<&Array2<u8>> {
        match self {
            RasterBuffers::Material { mask, .. } => mask.as_ref(),
            _ => None,
        }
    }
}

/// Nearest-neighbour resize, used when a file's raster size differs from the tile's pixel class.
pub(crate) fn fit<T: Copy>(band: Array2<T>, rows: usize, cols: usize) -> Array2<T> {
    let (src_rows, src_cols) = band.dim();
    if (src_rows, src_cols) == (rows, cols) || src_rows == 0 || src_cols == 0 {
        return band;
    }
    Array2::from_shape_fn((rows, cols), |(r, c)| band[[r * src_rows / rows, c * src_cols / cols]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn allocation_shapes() {
        let b = RasterBuffers::allocate(RasterProduct::Lightmap, 4, 2, false, false);
        assert_eq!(b.size(), (4, 2));
        assert!(b.rgb_band(2).is_some());
        assert!(b.rgb_band(3).is_none());

        let m = RasterBuffers::allocate(RasterProduct::Material, 2, 2, true, false);
        assert!(m.mask().is_some());

        let e = RasterBuffers::allocate(RasterProduct::Elevation, 2, 2, false, true);
        assert!(e.subordinate().is_some());
        assert!(e.material().is_none());
    }

    #[test]
    fn fill_resets_in_place() {
        let mut m = RasterBuffers::allocate(RasterProduct::Material, 2, 2, true, false);
        m.fill(127);
        assert!(m.material().unwrap().iter().all(|&v| v == 127));
        assert!(m.mask().unwrap().iter().all(|&v| v == 0));
    }

    #[test]
    fn fit_resizes_nearest() {
        let a = array![[1u8, 2], [3, 4]];
        let big = fit(a.clone(), 4, 4);
        assert_eq!(big[[0, 0]], 1);
        assert_eq!(big[[3, 3]], 4);
        assert_eq!(big[[1, 2]], 2);
        assert_eq!(fit(a.clone(), 2, 2), a);
    }
}
