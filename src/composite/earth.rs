use crate::driver::DriverRegistry;
use crate::error::{CdbError, Result};
use crate::geocell::{ContributionPolicy, Extent};
use crate::tile::{TileDescriptor, TileStatus};

/// Extent of the native tile covering `extent` where geocells are wider
/// than one degree.
pub fn actual_extent_for_tile(extent: &Extent) -> Extent { extent.actual_extent() }

/// Resample the single wider native tile covering `target` into it.
pub fn build_earth_tile(target: &mut TileDescriptor, drivers: &DriverRegistry) -> Result<()> {
    let source = TileDescriptor::new(target.opts.clone(), target.kind(), actual_extent_for_tile(target.extent()), 0);
    if !source.exists() {
        return Err(CdbError::NotFound(source.file_name().to_path_buf()));
    }
    let mut tiles = [source];
    target.build_from_tiles(&mut tiles, true, ContributionPolicy::Interval, drivers);
    if target.status() != TileStatus::Loaded {
        return Err(CdbError::CompositeInsufficientData { name: tiles[0].base_name() });
    }
    Ok(())
}
