use std::sync::Arc;

use tracing::{debug, info};

use crate::composite::{basemap_files, build_cache_tile, build_earth_tile};
use crate::config::{LayerConfig, Profile};
use crate::error::{CdbError, Result};
use crate::geocell::{ContributionPolicy, Extent, lon_step};
use crate::output::{HeightField, TileImage};
use crate::session::SessionContext;
use crate::tile::{TileDescriptor, TileKind, TileOptions};

/// Imagery and elevation of one CDB, served per requested extent.
#[derive(Debug, Clone)]
pub struct CdbLayer {
    config: LayerConfig,
    opts: Arc<TileOptions>,
    session: Arc<SessionContext>,
    policy: ContributionPolicy,
    save_cache: bool,
}

impl CdbLayer {
    /// Fails with `Configuration` when the root directory is missing.
    pub fn new(config: LayerConfig, session: Arc<SessionContext>) -> Result<Self> {
        let opts = config.tile_options()?;
        let save_cache = !opts.cache_dir.as_os_str().is_empty();
        if config.verbose {
            info!(root = %opts.root.display(), cache = %opts.cache_dir.display(), "opened CDB layer");
        }
        Ok(Self { policy: config.contribution_policy, config, opts: Arc::new(opts), session, save_cache })
    }

    pub fn config(&self) -> &LayerConfig { &self.config }

    pub fn options(&self) -> &TileOptions { &self.opts }

    pub fn session(&self) -> &Arc<SessionContext> { &self.session }

    pub fn profile(&self) -> Profile { self.config.profile() }

    /// Keep built cache tiles in memory only.
    pub fn without_cache_writes(mut self) -> Self {
        self.save_cache = false;
        self
    }

    /// Resolve and load the tile for `extent`, building a composite when the
    /// extent is not a native tile.
    pub fn read_tile(&self, kind: TileKind, extent: &Extent) -> Result<TileDescriptor> {
        let mut tile = TileDescriptor::new(self.opts.clone(), kind, *extent, 0);
        let name = tile.base_name();
        if self.session.is_blacklisted(&name) {
            return Err(CdbError::NotFound(tile.file_name().to_path_buf()));
        }

        let drivers = self.session.driver_snapshot();
        let result = if tile.lod() >= 0 {
            if lon_step(extent.south) == 1 {
                tile.load(&drivers)
            } else {
                build_earth_tile(&mut tile, &drivers)
            }
        } else if tile.exists() && !self.derived_imagery(kind) {
            tile.load(&drivers)
        } else {
            let save = self.save_cache && !self.derived_imagery(kind);
            build_cache_tile(&mut tile, self.policy, &drivers, save)
        };

        match result {
            Ok(()) => Ok(tile),
            Err(e) => {
                if e.is_blacklistable() {
                    self.session.blacklist(&name);
                }
                if self.config.verbose {
                    info!(file = %tile.file_name().display(), error = %e, "tile unavailable");
                } else {
                    debug!(file = %tile.file_name().display(), error = %e, "tile unavailable");
                }
                Err(e)
            }
        }
    }

    pub fn read_image(&self, extent: &Extent) -> Result<TileImage> {
        let tile = self.read_tile(TileKind::Imagery, extent)?;
        TileImage::from_tile(&tile).ok_or_else(|| CdbError::driver(tile.file_name(), "tile holds no imagery"))
    }

    pub fn read_elevation(&self, extent: &Extent) -> Result<HeightField> {
        let tile = self.read_tile(TileKind::Elevation, extent)?;
        HeightField::from_tile(&tile).ok_or_else(|| CdbError::driver(tile.file_name(), "tile holds no elevation"))
    }

    /// Basemap files covering `extent`.
    pub fn basemap_files(&self, extent: &Extent) -> Result<Vec<std::path::PathBuf>> {
        basemap_files(&self.opts, &self.session, extent)
    }

    // Lightmap and material composites share the RGB cache file name, so
    // they are never read from or written to the cache.
    fn derived_imagery(&self, kind: TileKind) -> bool {
        kind == TileKind::Imagery && (self.opts.lightmap || self.opts.materials)
    }
}
