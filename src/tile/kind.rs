/// CDB dataset kinds the engine resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileKind {
    Elevation,      // 001_Elevation, float32 heights
    Imagery,        // 004_Imagery, RGB with lightmap/material subordinates
    VectorBasemap,  // 901_VectorBase
    GeoSpecific,    // 100_GSFeature point features with model archives
    GeoTypical,     // 101_GTFeature point features with shared models
    Unknown,
}

impl TileKind {
    /// CDB layer directory name.
    pub fn layer(&self) -> &'static str {
        match self {
            TileKind::Elevation     => "001_Elevation",
            TileKind::Imagery       => "004_Imagery",
            TileKind::VectorBasemap => "901_VectorBase",
            TileKind::GeoSpecific   => "100_GSFeature",
            TileKind::GeoTypical    => "101_GTFeature",
            TileKind::Unknown       => "",
        }
    }

    /// Dataset code prefix placed before the component selectors.
    pub(crate) fn dataset_code(&self) -> &'static str {
        match self {
            TileKind::Elevation     => "_D001",
            TileKind::Imagery       => "_D004",
            TileKind::VectorBasemap => "_D901",
            TileKind::GeoSpecific   => "_D100",
            TileKind::GeoTypical    => "_D101",
            TileKind::Unknown       => "_DUNK_SUNK_TUNK_",
        }
    }

    pub fn is_raster(&self) -> bool {
        matches!(self, TileKind::Elevation | TileKind::Imagery)
    }

    pub fn is_feature(&self) -> bool {
        matches!(self, TileKind::GeoSpecific | TileKind::GeoTypical)
    }
}

impl std::fmt::Display for TileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TileKind::Elevation     => "elevation",
            TileKind::Imagery       => "imagery",
            TileKind::VectorBasemap => "basemap",
            TileKind::GeoSpecific   => "geospecific",
            TileKind::GeoTypical    => "geotypical",
            TileKind::Unknown       => "unknown",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for TileKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "elevation" => Ok(TileKind::Elevation),
            "imagery" => Ok(TileKind::Imagery),
            "basemap" => Ok(TileKind::VectorBasemap),
            "geospecific" | "gs" => Ok(TileKind::GeoSpecific),
            "geotypical" | "gt" => Ok(TileKind::GeoTypical),
            other => Err(format!("unknown tile kind: {other}")),
        }
    }
}

// Subordinate and companion dataset codes.
pub(crate) const ELEVATION_SUBORDINATE: &str = "_D001_S100_T001_";
pub(crate) const IMAGERY_LIGHTMAP: &str = "_D004_S005_T001_";
pub(crate) const MATERIAL_LAYER: &str = "005_RMTexture";
pub(crate) const MATERIAL_DATASET: &str = "_D005_S001_T001_";
pub(crate) const GS_CLASS_DATASET: &str = "_D100_S001_T002_";
pub(crate) const GS_GEOMETRY_LAYER: &str = "300_GSModelGeometry";
pub(crate) const GS_GEOMETRY_DATASET: &str = "_D300_S001_T001_";
pub(crate) const GS_TEXTURE_LAYER: &str = "301_GSModelTexture";
pub(crate) const GS_TEXTURE_DATASET: &str = "_D301_S001_T001_";
