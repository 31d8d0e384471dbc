use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::vector::{FeatureRecord, RecordLayer, VectorDriver, VectorLayer};
use crate::error::{CdbError, Result};

/// In-memory vector backend keyed by file path.
/// Existence probes still hit the filesystem, so callers place marker files
/// at the same paths.
#[derive(Debug, Default, Clone)]
pub struct MemVectorDriver {
    layers: HashMap<PathBuf, Vec<FeatureRecord>>,
    inline_classes: bool,
}

impl MemVectorDriver {
    pub fn new() -> Self { Self::default() }

    /// Treat records as carrying their own class attributes.
    pub fn with_inline_classes(mut self, inline: bool) -> Self {
        self.inline_classes = inline;
        self
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, records: Vec<FeatureRecord>) {
        self.layers.insert(path.into(), records);
    }

    pub fn with_layer(mut self, path: impl Into<PathBuf>, records: Vec<FeatureRecord>) -> Self {
        self.insert(path, records);
        self
    }
}

impl VectorDriver for MemVectorDriver {
    fn name(&self) -> &'static str { "Memory" }

    fn open_vector_layer(&self, path: &Path, _layer: &str) -> Result<Box<dyn VectorLayer>> {
        let records = self
            .layers
            .get(path)
            .ok_or_else(|| CdbError::driver(path, "no in-memory layer"))?;
        Ok(Box::new(RecordLayer::from_records(records.clone())))
    }

    fn inline_classes(&self) -> bool { self.inline_classes }
}
