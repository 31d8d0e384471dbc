use std::path::PathBuf;

/// Per-layer settings every descriptor is resolved against.
#[derive(Debug, Clone)]
pub struct TileOptions {
    pub root: PathBuf,
    pub cache_dir: PathBuf,
    pub dataset: String,       // component selectors, e.g. "_S001_T001_"
    pub tile_size: usize,      // native pixel class
    pub lightmap: bool,
    pub materials: bool,
    pub material_mask: bool,
    pub bathymetry: bool,
    pub use_gpkg: bool,        // feature tiles stored as GeoPackage
    pub gs_lod0_full_stack: bool,
    pub gt_lod0_full_stack: bool,
    pub basemap_lod: i32,      // basemaps below this LOD are XML descriptors
    pub verbose: bool,
}

pub const DEFAULT_DATASET: &str = "_S001_T001_";
pub const NATIVE_TILE_SIZE: usize = 1024;

impl Default for TileOptions {
    fn default() -> Self {
        Self {
            root: PathBuf::new(),
            cache_dir: PathBuf::new(),
            dataset: DEFAULT_DATASET.to_string(),
            tile_size: NATIVE_TILE_SIZE,
            lightmap: false,
            materials: false,
            material_mask: false,
            bathymetry: true,
            use_gpkg: false,
            gs_lod0_full_stack: false,
            gt_lod0_full_stack: false,
            basemap_lod: 0,
            verbose: false,
        }
    }
}

impl TileOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), ..Self::default() }
    }

    /// Pixel edge for the `LCnn` class `nlod` (0 is native).
    pub fn pixels_for(&self, nlod: u32) -> usize {
        (self.tile_size >> nlod.min(usize::BITS - 1)).max(1)
    }

    pub(crate) fn feature_ext(&self) -> &'static str {
        if self.use_gpkg { ".gpkg" } else { ".shp" }
    }
}
