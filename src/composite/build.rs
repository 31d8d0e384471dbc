use ndarray::{Array2, Array3};
use tracing::{debug, info, warn};

use crate::driver::DriverRegistry;
use crate::geocell::{Contribution, ContributionPolicy, Extent};
use crate::tile::{RasterBuffers, RasterProduct, TileDescriptor, TileStatus};

/// Inclusive destination window of one contributor inside a composite buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub sx: usize,
    pub ex: usize,
    pub sy: usize,
    pub ey: usize,
}

impl PixelRect {
    /// Window covered by `tile` in a `cols` × `rows` buffer spanning `target`.
    /// `None` when the clamped window is empty.
    pub fn covering(target: &Extent, tile: &Extent, cols: usize, rows: usize) -> Option<Self> {
        if cols == 0 || rows == 0 {
            return None;
        }
        let xres = target.width() / cols as f64;
        let yres = target.height() / rows as f64;
        let sy = (((target.north - tile.north) / yres) as i64).max(0);
        let ey = (((target.north - tile.south) / yres) as i64).min(rows as i64 - 1);
        let sx = (((tile.west - target.west) / xres) as i64).max(0);
        let ex = (((tile.east - target.west) / xres) as i64).min(cols as i64 - 1);
        (sy <= ey && sx <= ex).then(|| Self { sx: sx as usize, ex: ex as usize, sy: sy as usize, ey: ey as usize })
    }

    /// Every (row, col) in the window, north-west first.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (self.sy..=self.ey).flat_map(move |r| (self.sx..=self.ex).map(move |c| (r, c)))
    }
}

fn sample_rgb(rgb: &mut Array3<u8>, tile: &TileDescriptor, rect: &PixelRect, origin: (f64, f64), res: (f64, f64)) {
    for (r, c) in rect.cells() {
        let (x, y) = tile.ll_to_pix(origin.0 + c as f64 * res.0, origin.1 - r as f64 * res.1);
        if let Some(px) = tile.image_pixel(x, y) {
            for (band, v) in px.into_iter().enumerate() {
                rgb[[band, r, c]] = v;
            }
        }
    }
}

fn sample_material(
    material: &mut Array2<u8>,
    mask: Option<&mut Array2<u8>>,
    tile: &TileDescriptor,
    rect: &PixelRect,
    origin: (f64, f64),
    res: (f64, f64),
) {
    let have_material = tile.has_material_data();
    let mut mask = mask.filter(|_| tile.has_mask_data());
    for (r, c) in rect.cells() {
        let (x, y) = tile.ll_to_pix(origin.0 + c as f64 * res.0, origin.1 - r as f64 * res.1);
        if have_material {
            if let Some(v) = tile.material_pixel(x, y) {
                material[[r, c]] = v;
            }
        }
        if let Some(mask) = mask.as_deref_mut() {
            if let Some(v) = tile.mask_pixel(x, y) {
                mask[[r, c]] = v;
            }
        }
    }
}

fn sample_elevation(
    height: &mut Array2<f32>,
    subordinate: Option<&mut Array2<f32>>,
    tile: &TileDescriptor,
    rect: &PixelRect,
    origin: (f64, f64),
    res: (f64, f64),
) {
    let mut subordinate = subordinate.filter(|_| tile.subordinate_exists());
    for (r, c) in rect.cells() {
        let (x, y) = tile.ll_to_pix(origin.0 + c as f64 * res.0, origin.1 - r as f64 * res.1);
        if let Some(v) = tile.elevation_pixel(x, y) {
            height[[r, c]] = v;
        }
        if let Some(sub) = subordinate.as_deref_mut() {
            if let Some(v) = tile.subordinate_elevation_pixel(x, y) {
                sub[[r, c]] = v;
            }
        }
    }
}

impl TileDescriptor {
    /// Stitch `tiles` into this composite and return how many contributed.
    ///
    /// Unless `from_scratch`, an existing file for this tile seeds the buffers;
    /// otherwise they start at the no-data fill. Contributors classified
    /// `None` under `policy` are never read, and each contributor is released
    /// as soon as it has been sampled. The tile is `Loaded` when at least one
    /// contributor loaded.
    pub fn build_from_tiles(
        &mut self,
        tiles: &mut [TileDescriptor],
        from_scratch: bool,
        policy: ContributionPolicy,
        drivers: &DriverRegistry,
    ) -> usize {
        if tiles.iter().any(|t| t.subordinate_exists()) {
            self.set_carries_subordinate(true);
        } else if tiles.iter().any(|t| t.product() == Some(RasterProduct::Material)) {
            self.set_material_product();
        }
        self.allocate();

        let mut seeded = false;
        if !from_scratch && self.exists() {
            match self.open(drivers).and_then(|_| self.read()) {
                Ok(()) => seeded = true,
                Err(e) => debug!(file = %self.file_name().display(), error = %e, "composite base unreadable"),
            }
            self.close();
        }
        if !seeded {
            self.fill();
        }

        let product = self.product();
        let target = *self.extent();
        let (cols, rows) = self.pixel_size();
        let res = self.resolution();
        let origin = (target.west, target.north);

        let mut contributed = 0;
        for tile in tiles.iter_mut() {
            if tile.extent().contribution_to(&target, policy) == Contribution::None {
                continue;
            }
            if tile.product() != product {
                debug!(file = %tile.file_name().display(), "contributor product differs from composite");
                continue;
            }
            if let Err(e) = tile.load(drivers) {
                warn!(file = %tile.file_name().display(), error = %e, "contributor failed to load");
                tile.release();
                continue;
            }
            contributed += 1;

            if let Some(rect) = PixelRect::covering(&target, tile.extent(), cols, rows) {
                if product == Some(RasterProduct::Material) && tile.has_mask_data() {
                    self.set_has_mask();
                }
                let carry = self.carries_subordinate();
                match self.buffers_mut() {
                    Some(RasterBuffers::Rgb(rgb)) => sample_rgb(rgb, tile, &rect, origin, res),
                    Some(RasterBuffers::Material { material, mask }) => {
                        sample_material(material, mask.as_mut(), tile, &rect, origin, res)
                    }
                    Some(RasterBuffers::Elevation { height, subordinate }) => {
                        let sub = if carry { subordinate.as_mut() } else { None };
                        sample_elevation(height, sub, tile, &rect, origin, res)
                    }
                    None => {}
                }
            }
            tile.release();
        }

        if contributed > 0 {
            self.status = TileStatus::Loaded;
        }
        if self.opts.verbose {
            info!(file = %self.file_name().display(), contributed, candidates = tiles.len(), "built composite");
        }
        contributed
    }
}
