//! Composite tiles: caches stitched from finer native tiles, earth tiles
//! resampled out of a wider native geocell, and basemap enumeration.

mod basemap;
mod build;
mod cache;
mod earth;
mod save;

pub use basemap::{MAP_LOD_PROBE, basemap_files, read_map_lod};
pub use build::PixelRect;
pub use cache::{build_cache_tile, cache_candidates};
pub use earth::{actual_extent_for_tile, build_earth_tile};
