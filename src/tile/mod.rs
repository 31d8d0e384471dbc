mod buffers;
mod descriptor;
mod features;
mod kind;
mod model_set;
mod options;
mod path;
mod raster;
mod sample;

pub use buffers::{RasterBuffers, RasterProduct};
pub use descriptor::{TileDescriptor, TileStatus};
pub use features::{FeatureCandidate, archive_listing};
pub use kind::*;
pub use model_set::{ModelSet, TileFile};
pub use options::{DEFAULT_DATASET, NATIVE_TILE_SIZE, TileOptions};
pub use path::TileAddress;
