use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::driver::{FeatureGeometry, FieldValue};

use super::ModelClass;

/// Where the renderer finds the model for a feature.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelReference {
    /// `FACC_FSC_MODL.flt`
    pub key: String,
    /// Archive member, inflated file path, or the name a lower LOD loaded it under.
    pub name: String,
    pub model_zip: Option<PathBuf>,
    pub texture_zip: Option<PathBuf>,
    pub texture_dir: Option<PathBuf>,
    /// Geometry directory, set when textures come from the geotypical library.
    pub gs_uses_gt: Option<PathBuf>,
    /// Name of the same model at a lower LOD that this one replaces.
    pub referenced_name: Option<String>,
}

/// One feature handed to the host.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFeature {
    pub fid: u64,
    pub geometry: FeatureGeometry,
    pub attributes: BTreeMap<String, FieldValue>,
    pub class: Option<ModelClass>,
    pub model: Option<ModelReference>,
    /// Placeholder emitted for a tile that had files but no features.
    pub ignore: bool,
}

impl ResolvedFeature {
    pub(crate) fn placeholder(fid: u64, x: f64, y: f64) -> Self {
        Self {
            fid,
            geometry: FeatureGeometry::new(x, y),
            attributes: BTreeMap::new(),
            class: None,
            model: None,
            ignore: true,
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> { self.attributes.get(name) }
}

/// Features of one request, in tile order.
#[derive(Debug, Clone, Default)]
pub struct FeatureCursor {
    features: std::vec::IntoIter<ResolvedFeature>,
}

impl FeatureCursor {
    pub fn new(features: Vec<ResolvedFeature>) -> Self { Self { features: features.into_iter() } }

    /// Features not yet taken.
    pub fn remaining(&self) -> usize { self.features.len() }
}

impl Iterator for FeatureCursor {
    type Item = ResolvedFeature;

    fn next(&mut self) -> Option<Self::Item> { self.features.next() }

    fn size_hint(&self) -> (usize, Option<usize>) { self.features.size_hint() }
}

impl ExactSizeIterator for FeatureCursor {}
