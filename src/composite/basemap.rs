use std::path::{Path, PathBuf};
use std::sync::Arc;

use regex::Regex;
use tracing::{debug, info};

use crate::error::{CdbError, Result};
use crate::geocell::{Extent, lon_step, tiles_per_lod};
use crate::session::SessionContext;
use crate::tile::{DEFAULT_DATASET, TileDescriptor, TileKind, TileOptions};

/// Basemap LOD assumed while probing the geocell's LOD 0 descriptor.
pub const MAP_LOD_PROBE: i32 = 3;

/// The `<CDB_Map_Lod>` value of a basemap XML descriptor.
pub fn read_map_lod(path: &Path) -> Result<Option<i32>> {
    let text = std::fs::read_to_string(path)?;
    let re = Regex::new(r"<CDB_Map_Lod>\s*(-?\d+)\s*</CDB_Map_Lod>").map_err(|e| CdbError::driver(path, e))?;
    Ok(re.captures(&text).and_then(|c| c[1].parse().ok()))
}

fn basemap_options(opts: &TileOptions, lod: i32) -> Arc<TileOptions> {
    let mut o = opts.clone();
    o.dataset = DEFAULT_DATASET.to_string();
    o.basemap_lod = lod;
    Arc::new(o)
}

/// Existing basemap files covering `extent`.
///
/// The geocell's LOD 0 XML descriptor names the basemap LOD, which is
/// recorded in the session; the extent is then walked in tiles of that LOD.
/// Fails with `NotFound` when the descriptor is absent.
pub fn basemap_files(opts: &TileOptions, session: &SessionContext, extent: &Extent) -> Result<Vec<PathBuf>> {
    let step = f64::from(lon_step(extent.south));
    let south = extent.south.round();
    let west = extent.west.round();
    let l0 = Extent::new(south + 1.0, south, west + step, west);

    let probe = TileDescriptor::new(basemap_options(opts, MAP_LOD_PROBE), TileKind::VectorBasemap, l0, 0);
    if !probe.exists() {
        return Err(CdbError::NotFound(probe.file_name().to_path_buf()));
    }
    let Some(lod) = read_map_lod(probe.file_name())? else {
        debug!(file = %probe.file_name().display(), "basemap descriptor has no map lod");
        return Ok(Vec::new());
    };
    session.set_basemap_lod(lod);

    let tile_opts = basemap_options(opts, lod);
    let dy = 1.0 / tiles_per_lod(lod);
    let dx = step / tiles_per_lod(lod);
    let mut files = Vec::new();
    let mut s = extent.south;
    loop {
        let mut w = extent.west;
        loop {
            let t = TileDescriptor::new(tile_opts.clone(), TileKind::VectorBasemap, Extent::new(s + dy, s, w + dx, w), 0);
            if t.exists() {
                files.push(t.file_name().to_path_buf());
            }
            w += dx;
            if w >= extent.east {
                break;
            }
        }
        s += dy;
        if s >= extent.north {
            break;
        }
    }
    if opts.verbose {
        info!(lod, files = files.len(), "basemap files");
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(path: &Path, text: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, text).unwrap();
    }

    #[test]
    fn walks_tiles_at_map_lod() {
        let dir = tempfile::tempdir().unwrap();
        let opts = TileOptions::new(dir.path());
        let session = SessionContext::new();
        let cell = Extent::new(1.0, 0.0, 1.0, 0.0);

        let probe = TileDescriptor::new(basemap_options(&opts, MAP_LOD_PROBE), TileKind::VectorBasemap, cell, 0);
        write(probe.file_name(), "<CDB><CDB_Map_Lod> 1 </CDB_Map_Lod></CDB>");

        let lod1 = basemap_options(&opts, 1);
        let sw = TileDescriptor::new(lod1.clone(), TileKind::VectorBasemap, Extent::new(0.5, 0.0, 0.5, 0.0), 0);
        let ne = TileDescriptor::new(lod1, TileKind::VectorBasemap, Extent::new(1.0, 0.5, 1.0, 0.5), 0);
        assert!(sw.file_name().extension().is_some_and(|e| e == "gpkg"));
        write(sw.file_name(), "");
        write(ne.file_name(), "");

        let files = basemap_files(&opts, &session, &cell).unwrap();
        assert_eq!(session.basemap_lod(), 1);
        assert_eq!(files, vec![sw.file_name().to_path_buf(), ne.file_name().to_path_buf()]);
    }

    #[test]
    fn missing_descriptor_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = basemap_files(&TileOptions::new(dir.path()), &SessionContext::new(), &Extent::new(1.0, 0.0, 1.0, 0.0))
            .unwrap_err();
        assert!(matches!(err, CdbError::NotFound(_)));
    }
}
