use std::path::{Path, PathBuf};

use crate::geocell::{Extent, geocell_index, lod_for_height, lon_step, snap_lon};

/// Directory used for explicit sub-LOD (`LCnn`) tiles inside a geocell.
pub(crate) const LC_DIR: &str = "LC";

/// Path tokens identifying one tile within the CDB tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileAddress {
    pub lod: i32,
    pub lat: String,  // N12, S03
    pub lon: String,  // E045, W120
    pub lod_token: String,  // L02, LC03
    pub uref: String,
    pub rref: String,
}

impl TileAddress {
    /// Resolve an extent. A positive `nlod` pins the tile to the `LCnn`
    /// class regardless of its height.
    pub fn resolve(extent: &Extent, nlod: u32) -> Self {
        let height = extent.height();
        let width = extent.width();

        let lod = if 1.0 / height < 0.99 || nlod == 0 {
            lod_for_height(height)
        } else {
            -(nlod as i32)
        };

        let mut base_lon = extent.west;
        let (mut tile_x, mut tile_y) = (0i64, 0i64);
        if lod > 0 {
            let mut base_lat = extent.south.trunc();
            if extent.south < base_lat {
                base_lat -= 1.0;
            }
            tile_y = ((extent.south - base_lat) / height).round() as i64;

            base_lon = snap_lon(extent.west, lon_step(extent.south));
            tile_x = ((extent.west - base_lon) / width).round() as i64;
        }

        let lon_cell = geocell_index(base_lon);
        let lat_cell = geocell_index(extent.south);
        let lod_token = if lod < 0 { format!("LC{:02}", lod.abs()) } else { format!("L{lod:02}") };

        Self {
            lod,
            lat: format!("{}{:02}", if lat_cell < 0 { 'S' } else { 'N' }, lat_cell.abs()),
            lon: format!("{}{:03}", if lon_cell < 0 { 'W' } else { 'E' }, lon_cell.abs()),
            lod_token,
            uref: format!("U{}", if lod > 0 { tile_y } else { 0 }),
            rref: format!("R{}", if lod > 0 { tile_x } else { 0 }),
        }
    }

    /// `<lat><lon><dataset><lod>_<U>_<R><ext>`
    pub fn file_name(&self, dataset: &str, ext: &str) -> String {
        self.file_name_at(dataset, &self.lod_token, ext)
    }

    pub(crate) fn file_name_at(&self, dataset: &str, lod_token: &str, ext: &str) -> String {
        format!("{}{}{dataset}{lod_token}_{}_{}{ext}", self.lat, self.lon, self.uref, self.rref)
    }

    /// `<root>/Tiles/<lat>/<lon>/<layer>/<lod_dir>/<U>`
    pub fn tile_dir(&self, root: &Path, layer: &str, lod_dir: &str) -> PathBuf {
        root.join("Tiles")
            .join(&self.lat)
            .join(&self.lon)
            .join(layer)
            .join(lod_dir)
            .join(&self.uref)
    }

    /// Full native path of a dataset file in `layer`.
    pub fn tile_path(&self, root: &Path, layer: &str, lod_dir: &str, dataset: &str, ext: &str) -> PathBuf {
        self.tile_dir(root, layer, lod_dir).join(self.file_name(dataset, ext))
    }

    /// Prefix shared by every model archive member of this tile.
    pub fn model_header(&self) -> String {
        format!("{}{}_D300_S001_T001_{}_{}_{}_", self.lat, self.lon, self.lod_token, self.uref, self.rref)
    }
}
