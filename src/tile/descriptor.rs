use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::buffers::RasterBuffers;
use super::kind::*;
use super::model_set::{ModelSet, TileFile, geospecific_sets, geotypical_sets};
use super::options::TileOptions;
use super::path::{LC_DIR, TileAddress};
use crate::driver::RasterDataset;
use crate::feature::OpenModelSet;
use crate::geocell::Extent;

/// Lifecycle of a descriptor's datasets and buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileStatus {
    Created,
    Opened,
    Loaded,
}

/// Raster state: subordinate layers, open datasets and pixel planes.
#[derive(Default)]
pub struct RasterPayload {
    pub(crate) subordinate_path: Option<PathBuf>,  // bathymetry or lightmap
    pub(crate) subordinate_exists: bool,
    pub(crate) material_path: Option<PathBuf>,
    pub(crate) material_exists: bool,
    pub(crate) carries_subordinate: bool,  // composite keeps a subordinate plane
    pub(crate) have_material: bool,
    pub(crate) have_mask: bool,
    pub(crate) buffers: Option<RasterBuffers>,
    pub(crate) main: Option<Box<dyn RasterDataset>>,
    pub(crate) secondary: Option<Box<dyn RasterDataset>>,
}

/// Feature state: model sets and, once opened, their layers.
#[derive(Default)]
pub struct FeaturePayload {
    pub(crate) sets: Vec<ModelSet>,
    pub(crate) open: Vec<Option<OpenModelSet>>,
    pub(crate) spatial_filter: Option<Extent>,
}

pub enum TilePayload {
    Raster(RasterPayload),
    Features(FeaturePayload),
    Basemap,
    Unknown,
}

/// One addressable CDB tile.
pub struct TileDescriptor {
    pub(crate) opts: Arc<TileOptions>,
    pub(crate) kind: TileKind,
    pub(crate) extent: Extent,
    pub(crate) address: TileAddress,
    pub(crate) nlod: u32,
    pub(crate) cache: bool,
    pub(crate) file: TileFile,
    pub(crate) status: TileStatus,
    pub(crate) cols: usize,
    pub(crate) rows: usize,
    pub(crate) payload: TilePayload,
}

impl TileDescriptor {
    /// Resolve paths for `extent` and probe the filesystem. `nlod > 0` selects
    /// the explicit `LCnn` class of a native geocell.
    pub fn new(opts: Arc<TileOptions>, kind: TileKind, extent: Extent, nlod: u32) -> Self {
        let address = TileAddress::resolve(&extent, nlod);
        let cache = address.lod < 0 && nlod == 0;
        let lod_dir = if address.lod < 0 && nlod > 0 { LC_DIR.to_string() } else { address.lod_token.clone() };
        let size = opts.pixels_for(nlod);
        let dataset = format!("{}{}", kind.dataset_code(), opts.dataset);

        // Native files live in the geocell tree, caches under the cache directory.
        let locate = |layer: &str, dataset: &str, ext: &str| -> PathBuf {
            if cache {
                opts.cache_dir.join(layer).join(address.file_name(dataset, ext))
            } else {
                address.tile_path(&opts.root, layer, &lod_dir, dataset, ext)
            }
        };

        let (file, payload) = match kind {
            TileKind::Elevation => {
                let ext = if cache { ".img" } else { ".tif" };
                let file = TileFile::probe(locate(kind.layer(), &dataset, ext));
                let sub = locate(kind.layer(), ELEVATION_SUBORDINATE, ext);
                let raster = RasterPayload {
                    subordinate_exists: opts.bathymetry && sub.is_file(),
                    subordinate_path: Some(sub),
                    ..RasterPayload::default()
                };
                (file, TilePayload::Raster(raster))
            }
            TileKind::Imagery => {
                let ext = if cache { ".tif" } else { ".jp2" };
                let file = TileFile::probe(locate(kind.layer(), &dataset, ext));
                let mut raster = RasterPayload::default();
                if !cache {
                    let lightmap = locate(kind.layer(), IMAGERY_LIGHTMAP, ext);
                    let material = locate(MATERIAL_LAYER, MATERIAL_DATASET, ".tif");
                    raster.subordinate_exists = opts.lightmap && lightmap.is_file();
                    raster.material_exists = opts.materials && material.is_file();
                    raster.subordinate_path = Some(lightmap);
                    raster.material_path = Some(material);
                }
                (file, TilePayload::Raster(raster))
            }
            TileKind::VectorBasemap => {
                let ext = if address.lod < opts.basemap_lod { ".xml" } else { ".gpkg" };
                let mut file = TileFile::probe(locate(kind.layer(), &dataset, ext));
                if !file.exists && ext == ".gpkg" {
                    let xml = TileFile::probe(file.path.with_extension("xml"));
                    if xml.exists {
                        file = xml;
                    }
                }
                (file, TilePayload::Basemap)
            }
            TileKind::GeoSpecific => {
                let sets = geospecific_sets(&opts, &address);
                let file = sets
                    .last()
                    .map(|s| s.primary.clone())
                    .unwrap_or_else(|| TileFile::missing(locate(kind.layer(), &dataset, opts.feature_ext())));
                let open = sets.iter().map(|_| None).collect();
                (file, TilePayload::Features(FeaturePayload { sets, open, spatial_filter: None }))
            }
            TileKind::GeoTypical => {
                let sets = geotypical_sets(&opts, &address);
                let path = locate(kind.layer(), &dataset, opts.feature_ext());
                let file = TileFile { path, exists: sets.iter().any(|s| s.primary.exists) };
                let open = sets.iter().map(|_| None).collect();
                (file, TilePayload::Features(FeaturePayload { sets, open, spatial_filter: None }))
            }
            TileKind::Unknown => (TileFile::missing(locate(kind.layer(), &dataset, ".unk")), TilePayload::Unknown),
        };

        Self {
            opts,
            kind,
            extent,
            address,
            nlod,
            cache,
            file,
            status: TileStatus::Created,
            cols: size,
            rows: size,
            payload,
        }
    }

    pub fn kind(&self) -> TileKind { self.kind }
    pub fn extent(&self) -> &Extent { &self.extent }
    pub fn address(&self) -> &TileAddress { &self.address }
    pub fn lod(&self) -> i32 { self.address.lod }
    pub fn status(&self) -> TileStatus { self.status }
    pub fn is_cache(&self) -> bool { self.cache }
    pub fn options(&self) -> &TileOptions { &self.opts }

    /// Primary file path.
    pub fn file_name(&self) -> &Path { &self.file.path }

    /// Primary file name without directories, used as the blacklist key.
    pub fn base_name(&self) -> String {
        self.file.path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
    }

    /// Whether the primary layer is on disk.
    pub fn exists(&self) -> bool { self.file.exists }

    /// Existence of selection `sel`; geospecific sets also need their class
    /// table and geometry archive, geotypical selectors their class table.
    pub fn selection_exists(&self, sel: usize) -> bool {
        match &self.payload {
            TilePayload::Features(f) => f
                .sets
                .get(sel)
                .is_some_and(|s| s.is_valid(self.opts.use_gpkg)),
            _ => self.file.exists,
        }
    }

    /// (cols, rows)
    pub fn pixel_size(&self) -> (usize, usize) { (self.cols, self.rows) }

    /// Degrees per pixel (x, y).
    pub fn resolution(&self) -> (f64, f64) {
        (self.extent.width() / self.cols as f64, self.extent.height() / self.rows as f64)
    }

    pub fn subordinate_exists(&self) -> bool {
        matches!(&self.payload, TilePayload::Raster(r) if r.subordinate_exists)
    }

    pub fn material_exists(&self) -> bool {
        matches!(&self.payload, TilePayload::Raster(r) if r.material_exists)
    }

    pub fn subordinate_path(&self) -> Option<&Path> {
        match &self.payload {
            TilePayload::Raster(r) => r.subordinate_path.as_deref(),
            _ => None,
        }
    }

    pub fn material_path(&self) -> Option<&Path> {
        match &self.payload {
            TilePayload::Raster(r) => r.material_path.as_deref(),
            _ => None,
        }
    }

    /// Model sets of a feature tile (empty for other kinds).
    pub fn model_sets(&self) -> &[ModelSet] {
        match &self.payload {
            TilePayload::Features(f) => &f.sets,
            _ => &[],
        }
    }

    /// Release pixel buffers. A loaded tile drops back to `Opened` when a
    /// dataset is still open, else to `Created`.
    pub fn free(&mut self) {
        let still_open = match &mut self.payload {
            TilePayload::Raster(r) => {
                r.buffers = None;
                r.main.is_some() || r.secondary.is_some()
            }
            TilePayload::Features(f) => f.open.iter().any(Option::is_some),
            _ => false,
        };
        if self.status == TileStatus::Loaded {
            self.status = if still_open { TileStatus::Opened } else { TileStatus::Created };
        }
    }

    /// Close every dataset handle.
    pub fn close(&mut self) {
        match &mut self.payload {
            TilePayload::Raster(r) => {
                r.main = None;
                r.secondary = None;
            }
            TilePayload::Features(f) => f.open.iter_mut().for_each(|o| *o = None),
            _ => {}
        }
        self.status = TileStatus::Created;
    }

    /// Close then free.
    pub fn release(&mut self) {
        self.close();
        self.free();
    }
}

impl std::fmt::Debug for TileDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileDescriptor")
            .field("kind", &self.kind)
            .field("extent", &self.extent)
            .field("lod", &self.address.lod)
            .field("file", &self.file)
            .field("status", &self.status)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(root: &Path) -> Arc<TileOptions> {
        let mut o = TileOptions::new(root);
        o.cache_dir = root.join("cache");
        o.lightmap = true;
        o.materials = true;
        Arc::new(o)
    }

    #[test]
    fn native_imagery_paths() {
        let root = Path::new("/cdb");
        let t = TileDescriptor::new(opts(root), TileKind::Imagery, Extent::new(1.0, 0.0, 1.0, 0.0), 0);
        assert_eq!(
            t.file_name(),
            Path::new("/cdb/Tiles/N00/E000/004_Imagery/L00/U0/N00E000_D004_S001_T001_L00_U0_R0.jp2")
        );
        assert_eq!(
            t.subordinate_path().unwrap(),
            Path::new("/cdb/Tiles/N00/E000/004_Imagery/L00/U0/N00E000_D004_S005_T001_L00_U0_R0.jp2")
        );
        assert_eq!(
            t.material_path().unwrap(),
            Path::new("/cdb/Tiles/N00/E000/005_RMTexture/L00/U0/N00E000_D005_S001_T001_L00_U0_R0.tif")
        );
        assert!(!t.exists());
        assert_eq!(t.pixel_size(), (1024, 1024));
    }

    #[test]
    fn cache_paths_live_in_cache_dir() {
        let root = Path::new("/cdb");
        let e = TileDescriptor::new(opts(root), TileKind::Elevation, Extent::new(2.0, 0.0, 2.0, 0.0), 0);
        assert!(e.is_cache());
        assert_eq!(e.file_name(), Path::new("/cdb/cache/001_Elevation/N00E000_D001_S001_T001_LC01_U0_R0.img"));
        assert_eq!(
            e.subordinate_path().unwrap(),
            Path::new("/cdb/cache/001_Elevation/N00E000_D001_S100_T001_LC01_U0_R0.img")
        );

        let i = TileDescriptor::new(opts(root), TileKind::Imagery, Extent::new(2.0, 0.0, 2.0, 0.0), 0);
        assert_eq!(i.file_name(), Path::new("/cdb/cache/004_Imagery/N00E000_D004_S001_T001_LC01_U0_R0.tif"));
        assert!(i.subordinate_path().is_none());
    }

    #[test]
    fn sub_lod_paths_use_lc_directory() {
        let root = Path::new("/cdb");
        let t = TileDescriptor::new(opts(root), TileKind::Elevation, Extent::new(1.0, 0.0, 1.0, 0.0), 2);
        assert_eq!(t.lod(), -2);
        assert!(!t.is_cache());
        assert_eq!(
            t.file_name(),
            Path::new("/cdb/Tiles/N00/E000/001_Elevation/LC/U0/N00E000_D001_S001_T001_LC02_U0_R0.tif")
        );
        assert_eq!(t.pixel_size(), (256, 256));
    }

    #[test]
    fn basemap_falls_back_to_xml() {
        let dir = tempfile::tempdir().unwrap();
        let o = opts(dir.path());
        let probe = TileDescriptor::new(o.clone(), TileKind::VectorBasemap, Extent::new(1.0, 0.0, 1.0, 0.0), 0);
        assert!(probe.file_name().extension().is_some_and(|e| e == "gpkg"));

        let xml = probe.file_name().with_extension("xml");
        std::fs::create_dir_all(xml.parent().unwrap()).unwrap();
        std::fs::write(&xml, "<CDB_Map_Lod>2</CDB_Map_Lod>").unwrap();

        let t = TileDescriptor::new(o, TileKind::VectorBasemap, Extent::new(1.0, 0.0, 1.0, 0.0), 0);
        assert!(t.exists());
        assert_eq!(t.file_name(), xml.as_path());
    }

    #[test]
    fn close_and_free_are_idempotent() {
        let mut t = TileDescriptor::new(opts(Path::new("/cdb")), TileKind::Elevation, Extent::new(1.0, 0.0, 1.0, 0.0), 0);
        t.free();
        t.close();
        t.close();
        t.free();
        assert_eq!(t.status(), TileStatus::Created);
    }
}
