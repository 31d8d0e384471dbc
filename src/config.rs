use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::error::{CdbError, Result};
use crate::geocell::{ContributionPolicy, Extent, lon_step};
use crate::tile::{DEFAULT_DATASET, NATIVE_TILE_SIZE, TileOptions};

/// Tiling profile handed to the host: the covered extent split into
/// `tiles_x` by `tiles_y` root tiles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Profile {
    pub extent: Extent,
    pub tiles_x: u32,
    pub tiles_y: u32,
    pub num_neg_lods: u32,
    pub max_level: u32,
}

impl Profile {
    /// Root tile extent in degrees (width, height).
    pub fn root_tile_size(&self) -> (f64, f64) {
        (self.extent.width() / self.tiles_x as f64, self.extent.height() / self.tiles_y as f64)
    }
}

/// Parse `"minLon,minLat,maxLon,maxLat"`.
pub fn parse_limits(limits: &str) -> Option<Extent> {
    let values: Vec<f64> = limits
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .ok()?;
    match values[..] {
        [min_lon, min_lat, max_lon, max_lat] => Some(Extent::from_bounds(min_lon, min_lat, max_lon, max_lat)),
        _ => None,
    }
}

fn default_dataset() -> String { DEFAULT_DATASET.to_string() }
fn default_tile_size() -> usize { NATIVE_TILE_SIZE }
fn default_max_level() -> u32 { 14 }

/// Settings of an imagery or elevation layer.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LayerConfig {
    pub root_dir: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub limits: Option<String>,
    pub max_cdb_level: u32,
    pub num_neg_lods: u32,
    pub verbose: bool,
    pub disable_bathymetry: bool,
    pub lightmap: bool,
    pub materials: bool,
    pub material_mask: bool,
    pub dataset: String,
    pub tile_size: usize,
    pub contribution_policy: ContributionPolicy,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            root_dir: None,
            cache_dir: None,
            limits: None,
            max_cdb_level: default_max_level(),
            num_neg_lods: 0,
            verbose: false,
            disable_bathymetry: false,
            lightmap: false,
            materials: false,
            material_mask: false,
            dataset: default_dataset(),
            tile_size: default_tile_size(),
            contribution_policy: ContributionPolicy::default(),
        }
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> anyhow::Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse config {}", path.display()))
}

impl LayerConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root_dir: Some(root.into()), ..Self::default() }
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> { read_json(path) }

    pub fn root(&self) -> Result<&Path> {
        self.root_dir
            .as_deref()
            .ok_or_else(|| CdbError::Configuration("CDB root directory not set".into()))
    }

    /// Profile from the limits, or the world profile when there are none or
    /// they are unusable.
    pub fn profile(&self) -> Profile {
        self.limits
            .as_deref()
            .and_then(parse_limits)
            .and_then(|l| limited_profile(l, self.num_neg_lods, self.max_cdb_level))
            .unwrap_or_else(|| world_profile(self.max_cdb_level))
    }

    /// Cache directory in use: the configured one, else the conventional
    /// `<root>/osgEarth/CDB_Cache` for world profiles when it exists.
    pub fn effective_cache_dir(&self) -> Option<PathBuf> {
        if let Some(dir) = &self.cache_dir {
            return Some(dir.clone());
        }
        let limited = self.limits.as_deref().and_then(parse_limits).is_some();
        let root = self.root_dir.as_ref()?;
        let default = root.join("osgEarth").join("CDB_Cache");
        (!limited && default.is_dir()).then_some(default)
    }

    pub fn tile_options(&self) -> Result<TileOptions> {
        let root = self.root()?;
        if self.tile_size == 0 {
            return Err(CdbError::Configuration("tile_size must be positive".into()));
        }
        Ok(TileOptions {
            root: root.to_path_buf(),
            cache_dir: self.effective_cache_dir().unwrap_or_default(),
            dataset: self.dataset.clone(),
            tile_size: self.tile_size,
            lightmap: self.lightmap,
            materials: self.materials,
            material_mask: self.material_mask,
            bathymetry: !self.disable_bathymetry,
            verbose: self.verbose,
            ..TileOptions::default()
        })
    }
}

/// Profile over geocell-aligned limits. Longitudes are widened to the
/// coarsest step grid the limits touch; tile counts grow to a multiple of
/// `2 << num_neg_lods` so every negative LOD tiles evenly.
pub fn limited_profile(limits: Extent, num_neg_lods: u32, max_level: u32) -> Option<Profile> {
    let (mut min_lon, min_lat) = (limits.west.round(), limits.south.round());
    let (mut max_lon, mut max_lat) = (limits.east.round(), limits.north.round());

    let step = lon_step(min_lat).max(lon_step(max_lat)) as f64;
    if step > 1.0 {
        min_lon = (min_lon / step).floor() * step;
        max_lon = (max_lon / step).ceil() * step;
    }
    if max_lon <= min_lon || max_lat <= min_lat {
        return None;
    }

    let subfact: u32 = if num_neg_lods > 0 { 2 << num_neg_lods.min(30) } else { 1 };
    let expand = |span: f64| -> u32 {
        let tiles = span as u32;
        if tiles % subfact != 0 { (tiles + subfact) / subfact * subfact } else { tiles }
    };
    let tiles_x = expand(max_lon - min_lon);
    let tiles_y = expand(max_lat - min_lat);
    max_lon = min_lon + tiles_x as f64;
    max_lat = min_lat + tiles_y as f64;

    Some(Profile {
        extent: Extent::from_bounds(min_lon, min_lat, max_lon, max_lat),
        tiles_x: tiles_x / subfact,
        tiles_y: tiles_y / subfact,
        num_neg_lods,
        max_level: max_level + num_neg_lods + 1,
    })
}

/// Whole-earth profile of 32 degree root tiles with five negative LODs.
pub fn world_profile(max_level: u32) -> Profile {
    Profile {
        extent: Extent::from_bounds(-180.0, -102.0, 204.0, 90.0),
        tiles_x: 12,
        tiles_y: 6,
        num_neg_lods: 5,
        max_level: max_level + 5,
    }
}

/// Settings of a geospecific or geotypical feature layer.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub root_dir: Option<PathBuf>,
    pub min_level: Option<u32>,
    pub max_level: Option<u32>,
    pub limits: Option<String>,
    pub edit_limits: Option<String>,
    pub inflated: bool,
    pub geotypical: bool,
    pub gs_uses_gt_textures: bool,
    pub edit_support: bool,
    pub no_second_ref: bool,
    pub gt_lod0_full_stack: bool,
    pub gs_lod0_full_stack: bool,
    pub verbose: bool,
    pub abs_z_in_m: bool,
    pub use_gpkg_for_features: bool,
    pub materials: bool,
    pub dataset: Option<String>,
}

impl FeatureConfig {
    pub fn new(root: impl Into<PathBuf>, min_level: u32, max_level: u32) -> Self {
        Self {
            root_dir: Some(root.into()),
            min_level: Some(min_level),
            max_level: Some(max_level),
            ..Self::default()
        }
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> { read_json(path) }

    /// Root directory and level range are mandatory.
    pub fn validate(&self) -> Result<()> {
        if self.root_dir.is_none() {
            return Err(CdbError::Configuration("CDB root directory not set".into()));
        }
        match (self.min_level, self.max_level) {
            (Some(min), Some(max)) if min <= max => Ok(()),
            (Some(_), Some(_)) => Err(CdbError::Configuration("min_level exceeds max_level".into())),
            _ => Err(CdbError::Configuration("feature layers require a min and max level".into())),
        }
    }

    /// Geotypical models are always read from the inflated tree.
    pub fn is_inflated(&self) -> bool { self.inflated || self.geotypical }

    pub fn edit_extent(&self) -> Option<Extent> { self.edit_limits.as_deref().and_then(parse_limits) }

    /// One root tile per geocell across the rounded limits.
    pub fn profile(&self) -> Option<Profile> {
        let l = self.limits.as_deref().and_then(parse_limits)?;
        let (min_lon, min_lat, max_lon, max_lat) = (l.west.round(), l.south.round(), l.east.round(), l.north.round());
        if max_lon <= min_lon || max_lat <= min_lat {
            return None;
        }
        Some(Profile {
            extent: Extent::from_bounds(min_lon, min_lat, max_lon, max_lat),
            tiles_x: (max_lon - min_lon) as u32,
            tiles_y: (max_lat - min_lat) as u32,
            num_neg_lods: 0,
            max_level: self.max_level.unwrap_or(0),
        })
    }

    pub fn tile_options(&self) -> Result<TileOptions> {
        self.validate()?;
        let root = self.root_dir.clone().unwrap_or_default();
        Ok(TileOptions {
            root,
            dataset: self.dataset.clone().unwrap_or_else(default_dataset),
            use_gpkg: self.use_gpkg_for_features,
            gs_lod0_full_stack: self.gs_lod0_full_stack,
            gt_lod0_full_stack: self.gt_lod0_full_stack,
            materials: self.materials,
            verbose: self.verbose,
            ..TileOptions::default()
        })
    }
}
