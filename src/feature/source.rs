use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use super::names::key_from_archive_name;
use super::resolved::{FeatureCursor, ModelReference, ResolvedFeature};
use crate::config::FeatureConfig;
use crate::driver::FieldValue;
use crate::error::{CdbError, Result};
use crate::geocell::{Extent, lon_step};
use crate::session::{Lookup, ModelEntry, Replacement, SessionContext, UnrefEntry};
use crate::tile::{FeatureCandidate, TileDescriptor, TileKind, TileOptions};

/// Geospecific or geotypical point features of a CDB, resolved to model files.
#[derive(Debug, Clone)]
pub struct FeatureSource {
    config: FeatureConfig,
    opts: Arc<TileOptions>,
    session: Arc<SessionContext>,
}

/// Per-selection archive context of a geospecific scan.
struct Archives {
    model_zip: Option<PathBuf>,
    texture_zip: Option<PathBuf>,
    texture_dir: Option<PathBuf>,
    geometry_dir: Option<PathBuf>,
}

impl FeatureSource {
    /// Fails with `Configuration` when GeoPackage tiles are requested but the
    /// session has no `.gpkg` vector driver.
    pub fn new(config: FeatureConfig, session: Arc<SessionContext>) -> Result<Self> {
        let opts = Arc::new(config.tile_options()?);
        if opts.use_gpkg && session.drivers().vector_driver(Path::new("tile.gpkg")).is_err() {
            return Err(CdbError::Configuration("GeoPackage features need a registered gpkg driver".into()));
        }
        Ok(Self { config, opts, session })
    }

    pub fn config(&self) -> &FeatureConfig { &self.config }

    pub fn session(&self) -> &Arc<SessionContext> { &self.session }

    pub fn kind(&self) -> TileKind {
        if self.config.geotypical { TileKind::GeoTypical } else { TileKind::GeoSpecific }
    }

    /// Features of every selection of the tile covering `extent`. Fails with
    /// `NotFound` when no selection could be read.
    pub fn read_features(&self, extent: &Extent) -> Result<FeatureCursor> {
        let kind = self.kind();
        let subtile = lon_step(extent.south) != 1;
        let tile_extent = if subtile { extent.actual_extent() } else { *extent };
        let mut tile = TileDescriptor::new(self.opts.clone(), kind, tile_extent, 0);
        if let Some(edit) = self.config.edit_extent() {
            tile.set_spatial_filter(edit);
        } else if subtile {
            tile.set_spatial_filter(*extent);
        }

        let lod = tile.lod();
        if self.config.verbose {
            info!(lod, extent = %tile_extent, %kind, "feature cursor");
        }

        let mut features = Vec::new();
        let mut have_a_file = false;
        let mut last_base = None;
        let mut counter = 0usize;

        for sel in 0..tile.selection_count() {
            let Some(base) = tile.selection_file(sel).and_then(|p| p.file_name()).map(|n| n.to_string_lossy().into_owned())
            else {
                continue;
            };
            last_base = Some(base.clone());
            if self.session.is_blacklisted(&base) {
                if self.config.verbose {
                    info!(tile = %base, "blacklisted");
                }
                continue;
            }

            let opened = {
                let drivers = self.session.drivers();
                tile.open_selection(sel, &drivers)
            };
            match opened {
                Ok(()) => {
                    let before = features.len();
                    let ok = self.scan_selection(&mut tile, sel, lod, &mut counter, &mut features);
                    if ok {
                        have_a_file = true;
                        if self.config.verbose {
                            info!(tile = %base, features = features.len() - before, "loaded feature tile");
                        }
                    } else {
                        self.session.blacklist(&base);
                    }
                }
                Err(e) => {
                    debug!(tile = %base, error = %e, "feature selection unavailable");
                    if e.is_blacklistable() {
                        self.session.blacklist(&base);
                    }
                }
            }
            tile.close_selection(sel);
        }

        if !have_a_file {
            if let Some(base) = last_base {
                self.session.blacklist(&base);
            }
            return Err(CdbError::NotFound(tile.file_name().to_path_buf()));
        }
        if features.is_empty() {
            let c = extent.center();
            features.push(ResolvedFeature::placeholder(self.session.next_feature_id(), c.x(), c.y()));
        }
        Ok(FeatureCursor::new(features))
    }

    fn archives(&self, tile: &TileDescriptor, sel: usize) -> Option<Archives> {
        if tile.kind() != TileKind::GeoSpecific {
            return Some(Archives { model_zip: None, texture_zip: None, texture_dir: None, geometry_dir: None });
        }
        let geometry_dir = tile.geometry_dir(sel);
        if self.config.is_inflated() {
            let texture_dir = tile.texture_dir(sel).filter(|d| d.is_dir())?;
            Some(Archives { model_zip: None, texture_zip: None, texture_dir: Some(texture_dir), geometry_dir })
        } else {
            let model_zip = tile.geometry_archive(sel)?.to_path_buf();
            let texture_zip = tile.texture_archive(sel).map(|p| p.to_path_buf());
            Some(Archives { model_zip: Some(model_zip), texture_zip, texture_dir: None, geometry_dir })
        }
    }

    /// Resolve every feature of an opened selection. False when the
    /// selection lacks the archives its models live in.
    fn scan_selection(
        &self,
        tile: &mut TileDescriptor,
        sel: usize,
        lod: i32,
        counter: &mut usize,
        out: &mut Vec<ResolvedFeature>,
    ) -> bool {
        let Some(archives) = self.archives(tile, sel) else {
            return false;
        };
        let geospecific = tile.kind() == TileKind::GeoSpecific;
        let have_archive = archives.model_zip.is_some();
        let dictionary = if geospecific { None } else { self.session.dictionary(&self.opts.root) };
        let tile_path = tile.selection_file(sel).map(|p| p.to_path_buf()).unwrap_or_default();
        let tile_name = tile_path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        let selection = tile.real_selection(sel);
        let mut batch = Vec::new();

        while let Some(candidate) = tile.next_valid_feature(sel, self.config.is_inflated(), dictionary.as_deref()) {
            let FeatureCandidate { mut record, class, key, full_name, archive_name, in_archive } = candidate;

            let mut geometry = record.geometry.unwrap_or_else(|| crate::driver::FeatureGeometry::new(0.0, 0.0));
            let mut zoffset = 0.0;
            if !class.ahgt && self.config.abs_z_in_m {
                if let Some(m) = geometry.m {
                    zoffset = geometry.z;
                    geometry.z += m;
                }
            }

            if self.config.edit_support {
                record.set("name", key.as_str());
                record.set("transformname", format!("xform_{tile_name}_{:05}", *counter).as_str());
                record.set("modeltype", if geospecific { "geospecific" } else { "geotypical" });
                record.set("tilename", &*tile_path.to_string_lossy());
                record.set("selection", selection as i64);
                record.set("bsr", class.bsr);
                record.set("bbw", class.bbw);
                record.set("bbl", class.bbl);
                record.set("bbh", class.bbh);
                record.set("zoffset", zoffset);
            }
            *counter += 1;

            let mut valid = in_archive;
            if valid
                && !geospecific
                && self.config.no_second_ref
                && record.get("inst").and_then(FieldValue::as_i64) == Some(1)
            {
                valid = false;
            }

            let mut model = ModelReference { key: key.clone(), ..ModelReference::default() };
            let mut record_as: Option<String> = None;
            let mut models = self.session.models();

            if valid {
                if have_archive {
                    let name = archive_name.clone().unwrap_or_else(|| full_name.clone());
                    model.model_zip = archives.model_zip.clone();
                    model.texture_zip = archives.texture_zip.clone();
                    model.gs_uses_gt = archives.geometry_dir.clone();
                    if let Lookup::Found(prior) = models.find(&key, lod) {
                        if prior.lod < lod {
                            batch.push(Replacement {
                                key: key.clone(),
                                retired_name: prior.reference.clone(),
                                replacement_name: name.clone(),
                                lod,
                            });
                            model.referenced_name = Some(prior.reference);
                        }
                    }
                    model.name = name;
                } else {
                    model.name = full_name.clone();
                    model.texture_dir = archives.texture_dir.clone();
                }
                record_as = Some(model.name.clone());
            } else if geospecific {
                match models.find(&key, lod) {
                    Lookup::Found(prior) => {
                        model.name = prior.reference;
                        valid = !self.config.no_second_ref;
                    }
                    Lookup::Instanced => {}
                    Lookup::Absent if have_archive => {
                        if let Lookup::Found(u) = self.session.unreferenced().find(&key, lod) {
                            valid = u.model_zip.is_file();
                            model.model_zip = Some(u.model_zip);
                            model.name = u.archive_name;
                            if self.config.gs_uses_gt_textures {
                                model.gs_uses_gt = archives.geometry_dir.clone();
                            } else {
                                model.texture_zip = u.texture_zip.filter(|t| t.is_file());
                            }
                            record_as = Some(model.name.clone());
                        } else {
                            info!(model = %full_name, "model not found in archive");
                        }
                    }
                    Lookup::Absent => info!(model = %full_name, "geospecific model not found"),
                }
            }

            if valid && geospecific {
                if let Some(reference) = record_as {
                    models.insert(&key, ModelEntry { lod, reference });
                }
            }
            drop(models);

            if valid {
                out.push(ResolvedFeature {
                    fid: self.session.next_feature_id(),
                    geometry,
                    attributes: record.attributes,
                    class: Some(class),
                    model: Some(model),
                    ignore: false,
                });
            }
        }

        if !batch.is_empty() {
            self.session.replacements().push(batch);
        }

        if geospecific && have_archive {
            let Some(header) = tile.model_header(sel) else { return true };
            let models = self.session.models();
            let mut unreferenced = self.session.unreferenced();
            for member in tile.archive_members(sel) {
                let Some(key) = key_from_archive_name(member, &header) else { continue };
                if models.contains_key(&key) {
                    continue;
                }
                unreferenced.insert(&key, UnrefEntry {
                    lod,
                    archive_name: member.clone(),
                    model_zip: archives.model_zip.clone().unwrap_or_default(),
                    texture_zip: archives.texture_zip.clone(),
                });
            }
        }
        true
    }
}
