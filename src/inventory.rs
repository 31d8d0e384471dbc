use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{CdbError, Result};

/// One file in a cache directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub layer: String,
    pub path: PathBuf,
    pub bytes: u64,
}

/// Per-layer totals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerUsage {
    pub layer: String,
    pub files: usize,
    pub bytes: u64,
}

/// Every cache tile under `cache_dir`, sorted by path. The layer is the
/// first directory below the cache root.
pub fn cache_inventory(cache_dir: &Path) -> Result<Vec<CacheEntry>> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(cache_dir).min_depth(2).sort_by_file_name() {
        let entry = entry.map_err(|e| CdbError::driver(cache_dir, e))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let layer = entry
            .path()
            .strip_prefix(cache_dir)
            .ok()
            .and_then(|rel| rel.components().next())
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .unwrap_or_default();
        let bytes = entry.metadata().map_err(|e| CdbError::driver(entry.path(), e))?.len();
        entries.push(CacheEntry { layer, path: entry.into_path(), bytes });
    }
    Ok(entries)
}

/// Totals per layer, in layer order.
pub fn layer_usage(entries: &[CacheEntry]) -> Vec<LayerUsage> {
    let mut usage: Vec<LayerUsage> = Vec::new();
    for e in entries {
        match usage.iter_mut().find(|u| u.layer == e.layer) {
            Some(u) => {
                u.files += 1;
                u.bytes += e.bytes;
            }
            None => usage.push(LayerUsage { layer: e.layer.clone(), files: 1, bytes: e.bytes }),
        }
    }
    usage.sort_by(|a, b| a.layer.cmp(&b.layer));
    usage
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_by_layer() {
        let dir = tempfile::tempdir().unwrap();
        let elev = dir.path().join("001_Elevation");
        let img = dir.path().join("004_Imagery");
        std::fs::create_dir_all(&elev).unwrap();
        std::fs::create_dir_all(&img).unwrap();
        std::fs::write(elev.join("a.img"), [0u8; 10]).unwrap();
        std::fs::write(elev.join("b.img"), [0u8; 5]).unwrap();
        std::fs::write(img.join("c.tif"), [0u8; 7]).unwrap();
        std::fs::write(dir.path().join("stray.txt"), "x").unwrap();

        let entries = cache_inventory(dir.path()).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].layer, "001_Elevation");

        let usage = layer_usage(&entries);
        assert_eq!(usage[0], LayerUsage { layer: "001_Elevation".into(), files: 2, bytes: 15 });
        assert_eq!(usage[1], LayerUsage { layer: "004_Imagery".into(), files: 1, bytes: 7 });
    }
}
