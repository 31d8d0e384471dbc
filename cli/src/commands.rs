pub mod cache;
pub mod elevation;
pub mod features;
pub mod image;
pub mod path;

use std::sync::Arc;

use anyhow::{Context, Result};
use cdbtiles::{CdbLayer, Extent, LayerConfig, SessionContext, parse_limits};

use crate::cli::Source;

/// Open a layer from a config file or a root directory.
pub(crate) fn open_layer(cli: &crate::cli::Cli, source: &Source) -> Result<CdbLayer> {
    let mut config = match (&source.config, &source.root) {
        (Some(path), _) => LayerConfig::from_path(path)?,
        (None, Some(root)) => LayerConfig::new(root),
        (None, None) => anyhow::bail!("either --root or --config is required"),
    };
    if let Some(dir) = &source.cache_dir {
        config.cache_dir = Some(dir.clone());
    }
    config.verbose |= cli.verbose > 0;
    tracing::debug!(root = ?config.root_dir, cache = ?config.cache_dir, limits = ?config.limits, "layer config");
    CdbLayer::new(config, Arc::new(SessionContext::new())).context("Failed to open CDB layer")
}

pub(crate) fn parse_bounds(bounds: &str) -> Result<Extent> {
    parse_limits(bounds).with_context(|| format!("Invalid bounds {bounds:?}, expected minLon,minLat,maxLon,maxLat"))
}
