use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use zip::ZipArchive;

use super::descriptor::{FeaturePayload, TileDescriptor, TilePayload, TileStatus};
use super::kind::TileKind;
use crate::driver::{DriverRegistry, FeatureRecord};
use crate::error::{CdbError, Result};
use crate::feature::{
    ClassMap, FeatureDictionary, ModelClass, OpenModelSet, find_in_archive, geotypical_model_path, model_key,
};
use crate::geocell::Extent;

/// A feature that passed class validation, with its model located.
#[derive(Debug, Clone)]
pub struct FeatureCandidate {
    pub record: FeatureRecord,
    pub class: ModelClass,
    pub key: String,
    /// Inflated path, geotypical path, or archive member name searched for.
    pub full_name: String,
    /// Matching archive member, when the model lives in a geometry archive.
    pub archive_name: Option<String>,
    pub in_archive: bool,
}

/// Names of every member of a zip archive.
pub fn archive_listing(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path).map_err(|e| CdbError::driver(path, e))?;
    let archive = ZipArchive::new(file).map_err(|e| CdbError::driver(path, e))?;
    Ok(archive.file_names().map(str::to_string).collect())
}

impl TileDescriptor {
    fn features(&self) -> Option<&FeaturePayload> {
        match &self.payload {
            TilePayload::Features(f) => Some(f),
            _ => None,
        }
    }

    fn features_mut(&mut self) -> Result<&mut FeaturePayload> {
        match &mut self.payload {
            TilePayload::Features(f) => Ok(f),
            _ => Err(CdbError::driver(&self.file.path, format!("{} tile has no feature data", self.kind))),
        }
    }

    /// Number of feature selections.
    pub fn selection_count(&self) -> usize { self.model_sets().len() }

    /// Primary file of selection `sel`, the blacklist key for that selection.
    pub fn selection_file(&self, sel: usize) -> Option<&Path> {
        self.model_sets().get(sel).map(|s| s.primary.path.as_path())
    }

    /// Geotypical selector index on disk, or `sel` for geospecific sets.
    pub fn real_selection(&self, sel: usize) -> usize {
        self.model_sets().get(sel).map_or(sel, |s| if s.is_geospecific() { sel } else { s.real_sel })
    }

    /// Restrict feature iteration to points inside `extent`.
    pub fn set_spatial_filter(&mut self, extent: Extent) {
        if let TilePayload::Features(f) = &mut self.payload {
            f.spatial_filter = Some(extent);
        }
    }

    pub fn spatial_filter(&self) -> Option<&Extent> { self.features()?.spatial_filter.as_ref() }

    pub fn geometry_archive(&self, sel: usize) -> Option<&Path> {
        let set = self.model_sets().get(sel)?;
        set.geometry.as_ref().filter(|g| g.exists).map(|g| g.path.as_path())
    }

    pub fn texture_archive(&self, sel: usize) -> Option<&Path> {
        let set = self.model_sets().get(sel)?;
        set.texture.as_ref().filter(|t| t.exists).map(|t| t.path.as_path())
    }

    /// Directory holding inflated geometry of selection `sel`.
    pub fn geometry_dir(&self, sel: usize) -> Option<PathBuf> {
        let set = self.model_sets().get(sel)?;
        Some(set.geometry_dir(&self.opts.root, &self.address))
    }

    pub fn texture_dir(&self, sel: usize) -> Option<PathBuf> {
        let set = self.model_sets().get(sel)?;
        Some(set.texture_dir(&self.opts.root, &self.address))
    }

    /// Archive header of selection `sel`.
    pub fn model_header(&self, sel: usize) -> Option<String> {
        self.model_sets().get(sel).map(|s| s.model_header(&self.address))
    }

    /// Geometry archive listing of an opened selection.
    pub fn archive_members(&self, sel: usize) -> &[String] {
        self.features()
            .and_then(|f| f.open.get(sel))
            .and_then(Option::as_ref)
            .map_or(&[], |o| o.archive.as_slice())
    }

    /// Open every usable selection.
    pub(crate) fn open_features(&mut self, drivers: &DriverRegistry) -> Result<()> {
        let mut opened = 0;
        for sel in 0..self.selection_count() {
            if self.selection_exists(sel) {
                self.open_selection(sel, drivers)?;
                opened += 1;
            }
        }
        if opened == 0 {
            return Err(CdbError::NotFound(self.file.path.clone()));
        }
        Ok(())
    }

    /// Open the primary layer, class map and archive listing of selection `sel`.
    pub fn open_selection(&mut self, sel: usize, drivers: &DriverRegistry) -> Result<()> {
        let Some(set) = self.model_sets().get(sel).cloned() else {
            return Err(CdbError::NotFound(self.file.path.clone()));
        };
        if !self.selection_exists(sel) {
            return Err(CdbError::NotFound(set.primary.path));
        }
        if self.features().and_then(|f| f.open.get(sel)).is_some_and(Option::is_some) {
            return Ok(());
        }

        let layer = drivers.open_vector_layer(&set.primary.path, &set.primary_layer)?;
        let inline = self.opts.use_gpkg || drivers.vector_driver(&set.primary.path)?.inline_classes();
        let classes = if inline {
            None
        } else {
            let mut class_layer = drivers.open_vector_layer(&set.class_table.path, &set.class_layer)?;
            Some(ClassMap::load(class_layer.as_mut(), &set.class_table.path)?)
        };
        let archive = match set.geometry.as_ref().filter(|g| g.exists) {
            Some(g) => archive_listing(&g.path)?,
            None => Vec::new(),
        };
        if self.opts.verbose {
            debug!(
                file = %set.primary.path.display(),
                classes = classes.as_ref().map_or(0, ClassMap::len),
                archive = archive.len(),
                "opened feature selection"
            );
        }

        let f = self.features_mut()?;
        if f.open.len() <= sel {
            f.open.resize_with(sel + 1, || None);
        }
        f.open[sel] = Some(OpenModelSet { layer, classes, archive });
        self.status = TileStatus::Opened;
        Ok(())
    }

    /// Close selection `sel`.
    pub fn close_selection(&mut self, sel: usize) {
        if let TilePayload::Features(f) = &mut self.payload {
            if let Some(slot) = f.open.get_mut(sel) {
                *slot = None;
            }
            if f.open.iter().all(Option::is_none) {
                self.status = TileStatus::Created;
            }
        }
    }

    /// Next feature of selection `sel` whose class resolves, with its model
    /// file located. `None` once the layer is exhausted.
    pub fn next_valid_feature(
        &mut self,
        sel: usize,
        inflated: bool,
        dictionary: Option<&FeatureDictionary>,
    ) -> Option<FeatureCandidate> {
        let use_gpkg = self.opts.use_gpkg;
        let geospecific = self.kind == TileKind::GeoSpecific;
        let set = self.model_sets().get(sel)?.clone();
        let header = set.model_header(&self.address);
        let geometry_dir = set.geometry_dir(&self.opts.root, &self.address);
        let root = self.opts.root.clone();
        let verbose = self.opts.verbose;
        let tile = self.base_name();

        let TilePayload::Features(payload) = &mut self.payload else { return None };
        let filter = payload.spatial_filter;
        let open = payload.open.get_mut(sel)?.as_mut()?;

        loop {
            let record = open.layer.next_feature()?;
            if let (Some(filter), Some(g)) = (&filter, &record.geometry) {
                if !filter.contains(g.point.x(), g.point.y()) {
                    continue;
                }
            }

            let cnam = record.text("CNAM");
            if cnam.is_empty() && !use_gpkg {
                continue;
            }
            let class = match &open.classes {
                Some(classes) => match classes.get(&cnam) {
                    Some(c) => c.clone(),
                    None => continue,
                },
                None => {
                    let c = ModelClass::from_record(&record);
                    if c.cnam.is_empty() && !use_gpkg {
                        continue;
                    }
                    c
                }
            };

            let key = model_key(&class.facc, &class.fsc, &class.model);
            let candidate = if geospecific {
                let file_name = format!("{header}{key}");
                if inflated {
                    let full = geometry_dir.join(&file_name);
                    let in_archive = full.is_file();
                    FeatureCandidate {
                        record,
                        class,
                        key,
                        full_name: full.to_string_lossy().into_owned(),
                        archive_name: None,
                        in_archive,
                    }
                } else {
                    let archive_name = find_in_archive(&open.archive, &file_name).cloned();
                    FeatureCandidate {
                        in_archive: archive_name.is_some(),
                        record,
                        class,
                        key,
                        full_name: file_name,
                        archive_name,
                    }
                }
            } else {
                let full = geotypical_model_path(&root, &key, dictionary);
                let in_archive = full.is_file();
                if !in_archive && verbose {
                    warn!(model = %full.display(), tile = %tile, "geotypical model not found");
                }
                FeatureCandidate {
                    record,
                    class,
                    key,
                    full_name: full.to_string_lossy().into_owned(),
                    archive_name: None,
                    in_archive,
                }
            };
            return Some(candidate);
        }
    }
}
