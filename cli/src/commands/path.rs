use std::sync::Arc;

use anyhow::{Result, bail};
use cdbtiles::{TileDescriptor, TileKind, TileOptions};

use super::parse_bounds;

fn parse_kind(kind: &str) -> Result<TileKind> {
    Ok(match kind.to_ascii_lowercase().as_str() {
        "elevation" => TileKind::Elevation,
        "imagery" => TileKind::Imagery,
        "basemap" => TileKind::VectorBasemap,
        "gsfeature" => TileKind::GeoSpecific,
        "gtfeature" => TileKind::GeoTypical,
        other => bail!("Unknown tile kind {other:?}"),
    })
}

pub fn run(_cli: &crate::cli::Cli, args: &crate::cli::PathArgs) -> Result<()> {
    let kind = parse_kind(&args.kind)?;
    let extent = parse_bounds(&args.bounds)?;

    let mut opts = TileOptions::new(&args.root);
    opts.lightmap = true;
    opts.materials = true;
    let tile = TileDescriptor::new(Arc::new(opts), kind, extent, args.nlod);

    let mark = |exists: bool| if exists { "present" } else { "missing" };
    println!("lod {} {}", tile.lod(), tile.address().lod_token);
    println!("{} ({})", tile.file_name().display(), mark(tile.exists()));
    if let Some(sub) = tile.subordinate_path() {
        println!("{} ({})", sub.display(), mark(sub.is_file()));
    }
    if let Some(material) = tile.material_path() {
        println!("{} ({})", material.display(), mark(material.is_file()));
    }
    for (i, set) in tile.model_sets().iter().enumerate() {
        println!("selection {i}: {} ({})", set.primary.path.display(), mark(tile.selection_exists(i)));
    }

    Ok(())
}
