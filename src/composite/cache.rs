use tracing::{info, warn};

use crate::driver::DriverRegistry;
use crate::error::{CdbError, Result};
use crate::geocell::{ContributionPolicy, Extent, lon_step, snap_lon};
use crate::tile::{TileDescriptor, TileStatus};

/// Existing native `L00` geocells under a negative-LOD composite, walked west
/// to east along each one-degree row from the south edge.
pub fn cache_candidates(target: &TileDescriptor) -> Vec<TileDescriptor> {
    let extent = *target.extent();
    let mut tiles = Vec::new();

    let mut south = extent.south;
    while south < extent.north {
        let step = lon_step(south);
        let mut west = extent.west;
        while west < extent.east {
            let snapped = snap_lon(west, step);
            let east = snapped + f64::from(step);
            let cand = Extent::new(south + 1.0, south, east, snapped);
            let tile = TileDescriptor::new(target.opts.clone(), target.kind(), cand, 0);
            if tile.exists() {
                tiles.push(tile);
            }
            west = east;
        }
        south += 1.0;
    }
    tiles
}

/// Build a cache tile from the native tiles it covers, saving it when `save`
/// is set. A failed save only warns; the built tile is still returned.
pub fn build_cache_tile(
    target: &mut TileDescriptor,
    policy: ContributionPolicy,
    drivers: &DriverRegistry,
    save: bool,
) -> Result<()> {
    let mut tiles = cache_candidates(target);
    if tiles.is_empty() {
        return Err(CdbError::CompositeInsufficientData { name: target.base_name() });
    }
    if target.opts.verbose {
        info!(file = %target.file_name().display(), candidates = tiles.len(), "building cache tile");
    }

    target.build_from_tiles(&mut tiles, false, policy, drivers);
    if target.status() != TileStatus::Loaded {
        return Err(CdbError::CompositeInsufficientData { name: target.base_name() });
    }
    if save {
        if let Err(e) = target.save(drivers) {
            warn!(file = %target.file_name().display(), error = %e, "cache tile not saved");
        }
    }
    Ok(())
}
