use std::path::{Path, PathBuf};

use super::kind::*;
use super::options::TileOptions;
use super::path::{LC_DIR, TileAddress};

/// A resolved file and whether it was found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileFile {
    pub path: PathBuf,
    pub exists: bool,
}

impl TileFile {
    pub fn probe(path: PathBuf) -> Self {
        let exists = path.is_file();
        Self { path, exists }
    }

    pub fn missing(path: PathBuf) -> Self { Self { path, exists: false } }
}

/// One feature selection within a feature tile: a geospecific model set, or
/// one of the geotypical selectors.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSet {
    pub primary: TileFile,
    pub class_table: TileFile,
    pub geometry: Option<TileFile>,  // geospecific only
    pub texture: Option<TileFile>,   // geospecific only
    pub primary_layer: String,
    pub class_layer: String,
    pub lod_token: String,  // L03 or LC02
    pub lod_dir: String,    // lod_token, or LC for the LOD 0 stack
    pub lod: i32,
    pub real_sel: usize,    // geotypical selector index
}

impl ModelSet {
    /// Usable for feature reads.
    pub fn is_valid(&self, use_gpkg: bool) -> bool {
        let class_ok = self.class_table.exists || use_gpkg;
        match &self.geometry {
            Some(geometry) => self.primary.exists && class_ok && geometry.exists,
            None => self.primary.exists && self.class_table.exists,
        }
    }

    pub fn is_geospecific(&self) -> bool { self.geometry.is_some() }

    pub fn geometry_dir(&self, root: &Path, address: &TileAddress) -> PathBuf {
        address.tile_dir(root, GS_GEOMETRY_LAYER, &self.lod_dir)
    }

    pub fn texture_dir(&self, root: &Path, address: &TileAddress) -> PathBuf {
        address.tile_dir(root, GS_TEXTURE_LAYER, &self.lod_dir)
    }

    /// Prefix of every archive member of this set's geometry archive.
    pub fn model_header(&self, address: &TileAddress) -> String {
        format!(
            "{}{}{GS_GEOMETRY_DATASET}{}_{}_{}_",
            address.lat, address.lon, self.lod_token, address.uref, address.rref
        )
    }
}

fn gs_set(opts: &TileOptions, address: &TileAddress, lod_token: &str, lod_dir: &str, lod: i32) -> ModelSet {
    let root = &opts.root;
    let layer = TileKind::GeoSpecific.layer();
    let ext = opts.feature_ext();
    let dir = address.tile_dir(root, layer, lod_dir);
    let dataset = format!("{}{}", TileKind::GeoSpecific.dataset_code(), opts.dataset);

    let primary = TileFile::probe(dir.join(address.file_name_at(&dataset, lod_token, ext)));
    let class_path = dir.join(address.file_name_at(GS_CLASS_DATASET, lod_token, ".dbf"));
    let class_table = if opts.use_gpkg { TileFile::missing(class_path) } else { TileFile::probe(class_path) };
    let geometry = address
        .tile_dir(root, GS_GEOMETRY_LAYER, lod_dir)
        .join(address.file_name_at(GS_GEOMETRY_DATASET, lod_token, ".zip"));
    let texture = address
        .tile_dir(root, GS_TEXTURE_LAYER, lod_dir)
        .join(address.file_name_at(GS_TEXTURE_DATASET, lod_token, ".zip"));

    ModelSet {
        primary,
        class_table,
        geometry: Some(TileFile::probe(geometry)),
        texture: Some(TileFile::probe(texture)),
        primary_layer: "100_GSFeature_S001_T001_Pnt".to_string(),
        class_layer: "100_GTFeature_S001_T002_Cls".to_string(),
        lod_token: lod_token.to_string(),
        lod_dir: lod_dir.to_string(),
        lod,
        real_sel: 0,
    }
}

fn gt_selector(opts: &TileOptions, address: &TileAddress, i: usize, lod_token: &str, lod_dir: &str, lod: i32) -> ModelSet {
    let dir = address.tile_dir(&opts.root, TileKind::GeoTypical.layer(), lod_dir);
    let primary = dir.join(address.file_name_at(&format!("_D101_S{i:03}_T001_"), lod_token, opts.feature_ext()));
    let class_table = dir.join(address.file_name_at(&format!("_D101_S{i:03}_T002_"), lod_token, ".dbf"));
    ModelSet {
        primary: TileFile::probe(primary),
        class_table: TileFile::probe(class_table),
        geometry: None,
        texture: None,
        primary_layer: format!("101_GTFeature_S{i:03}_T001_Pnt"),
        class_layer: format!("101_GTFeature_S{i:03}_T002_Cls"),
        lod_token: lod_token.to_string(),
        lod_dir: lod_dir.to_string(),
        lod,
        real_sel: i - 1,
    }
}

/// The geospecific set of a tile at its own LOD, preceded by the `LC01..LC10`
/// sets when the LOD 0 stack is enabled.
pub(crate) fn geospecific_sets(opts: &TileOptions, address: &TileAddress) -> Vec<ModelSet> {
    let mut sets = vec![gs_set(opts, address, &address.lod_token, &address.lod_token, address.lod)];
    if address.lod == 0 && opts.gs_lod0_full_stack {
        for nlod in 1..=10i32 {
            let token = format!("LC{nlod:02}");
            let set = gs_set(opts, address, &token, LC_DIR, -nlod);
            if !(set.primary.exists && (set.class_table.exists || opts.use_gpkg)) {
                break;
            }
            sets.insert(0, set);
        }
    }
    sets
}

/// Geotypical selectors with both primary and class files present.
pub(crate) fn geotypical_sets(opts: &TileOptions, address: &TileAddress) -> Vec<ModelSet> {
    let mut sets: Vec<ModelSet> = (1..=3)
        .map(|i| gt_selector(opts, address, i, &address.lod_token, &address.lod_token, address.lod))
        .filter(|s| s.primary.exists && s.class_table.exists)
        .collect();
    if address.lod == 0 && opts.gt_lod0_full_stack {
        for nlod in 1..=10i32 {
            let token = format!("LC{nlod:02}");
            let found: Vec<ModelSet> = (1..=3)
                .map(|i| gt_selector(opts, address, i, &token, LC_DIR, -nlod))
                .filter(|s| s.primary.exists && s.class_table.exists)
                .collect();
            if found.is_empty() {
                break;
            }
            sets.splice(0..0, found);
        }
    }
    sets
}
