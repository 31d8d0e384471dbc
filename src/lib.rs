#![doc = "CDB tile resolution, compositing and caching"]
mod composite;
mod config;
mod driver;
mod error;
mod feature;
mod geocell;
mod inventory;
mod layer;
mod output;
mod session;
mod tile;

#[doc(inline)]
pub use error::{CdbError, Result};

#[doc(inline)]
pub use config::{FeatureConfig, LayerConfig, Profile, limited_profile, parse_limits, world_profile};

#[doc(inline)]
pub use geocell::{
    Contribution, ContributionPolicy, Extent, geocell_index, lod_for_height, lon_step, snap_lon, tiles_per_lod,
};

#[doc(inline)]
pub use tile::{
    DEFAULT_DATASET, FeatureCandidate, ModelSet, NATIVE_TILE_SIZE, RasterBuffers, RasterProduct, TileAddress,
    TileDescriptor, TileFile, TileKind, TileOptions, TileStatus, archive_listing,
};

#[doc(inline)]
pub use composite::{MAP_LOD_PROBE, PixelRect, actual_extent_for_tile, basemap_files, build_cache_tile,
    build_earth_tile, cache_candidates, read_map_lod};

#[doc(inline)]
pub use driver::{
    BandData, BandView, DriverRegistry, FeatureGeometry, FeatureRecord, FieldValue, GeoTransform, ImageDriver,
    MemVectorDriver, RasterDataset, RasterDriver, RecordLayer, ShapefileDriver, TiffDriver, VectorDriver, VectorLayer,
};

#[doc(inline)]
pub use feature::{
    ClassMap, DictionaryEntry, FeatureCursor, FeatureDictionary, FeatureSource, ModelClass, ModelReference,
    ResolvedFeature, archive_model_name, builtin_directories, dictionary_path, geotypical_model_path, model_key,
};

#[doc(inline)]
pub use session::{
    Ledger, LoadStatus, LodEntry, Lookup, ModelEntry, ModelLedger, Replacement, ReplacementBatch, ReplacementStack, RetiredModel, SessionContext,
    UnrefEntry, UnrefLedger,
};

#[doc(inline)]
pub use layer::CdbLayer;

#[doc(inline)]
pub use output::{HeightField, TileImage};

#[doc(inline)]
pub use inventory::{CacheEntry, LayerUsage, cache_inventory, layer_usage};
