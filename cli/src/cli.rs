use std::path::PathBuf;

/// CDB tile inspection CLI
#[derive(clap::Parser, Debug)]
#[command(name = "cdbtiles", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Render the imagery for an extent to PNG
    Image(RasterArgs),

    /// Read terrain heights for an extent, optionally writing a GeoTIFF
    Elevation(RasterArgs),

    /// List resolved model features of the tile covering an extent
    Features(FeatureArgs),

    /// Print the files a tile resolves to
    Path(PathArgs),

    /// Summarise a composite cache directory
    Cache(CacheArgs),
}

/// Where the CDB lives: a JSON layer config or a bare root directory.
#[derive(clap::Args, Debug)]
pub struct Source {
    /// CDB root directory
    #[arg(short, long, value_hint = clap::ValueHint::DirPath, required_unless_present = "config")]
    pub root: Option<PathBuf>,

    /// JSON layer configuration
    #[arg(short, long, value_hint = clap::ValueHint::FilePath, conflicts_with = "root")]
    pub config: Option<PathBuf>,

    /// Composite cache directory
    #[arg(long, value_hint = clap::ValueHint::DirPath)]
    pub cache_dir: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct RasterArgs {
    #[command(flatten)]
    pub source: Source,

    /// Extent as "minLon,minLat,maxLon,maxLat"
    #[arg(short, long)]
    pub bounds: String,

    /// Output file
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct FeatureArgs {
    /// CDB root directory
    #[arg(value_hint = clap::ValueHint::DirPath)]
    pub root: PathBuf,

    /// Extent as "minLon,minLat,maxLon,maxLat"
    #[arg(short, long)]
    pub bounds: String,

    #[arg(long, default_value_t = 0)]
    pub min_level: u32,

    #[arg(long, default_value_t = 14)]
    pub max_level: u32,

    /// Read geotypical instead of geospecific features
    #[arg(long)]
    pub geotypical: bool,

    /// Models are unpacked on disk rather than in archives
    #[arg(long)]
    pub inflated: bool,
}

#[derive(clap::Args, Debug)]
pub struct PathArgs {
    /// CDB root directory
    #[arg(value_hint = clap::ValueHint::DirPath)]
    pub root: PathBuf,

    /// elevation, imagery, basemap, gsfeature or gtfeature
    pub kind: String,

    /// Extent as "minLon,minLat,maxLon,maxLat"
    #[arg(short, long)]
    pub bounds: String,

    /// Explicit sub-LOD class (LCnn)
    #[arg(long, default_value_t = 0)]
    pub nlod: u32,
}

#[derive(clap::Args, Debug)]
pub struct CacheArgs {
    /// Cache directory
    #[arg(value_hint = clap::ValueHint::DirPath)]
    pub dir: PathBuf,

    /// List every file, not only per-layer totals
    #[arg(short, long)]
    pub list: bool,
}
