mod ledger;
mod replace;

pub use ledger::*;
pub use replace::*;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use ahash::{AHashMap, AHashSet};
use tracing::debug;

use crate::driver::DriverRegistry;
use crate::feature::FeatureDictionary;

/// Progress of a model URI through the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Loading,
    Loaded,
    Failed,
}

/// A model swapped out by a replacement, kept until its node is released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetiredModel {
    pub transform: String,
    pub model: String,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Session-wide state shared by every layer: drivers, blacklist, model
/// ledgers and the replacement handoff. Each piece sits behind its own lock.
#[derive(Debug)]
pub struct SessionContext {
    drivers: RwLock<DriverRegistry>,
    blacklist: Mutex<AHashSet<String>>,
    loads: Mutex<AHashMap<String, LoadStatus>>,
    retired: Mutex<AHashMap<String, RetiredModel>>,
    models: Mutex<ModelLedger>,
    unreferenced: Mutex<UnrefLedger>,
    replacements: ReplacementStack<ReplacementBatch>,
    dictionaries: Mutex<AHashMap<PathBuf, Option<Arc<FeatureDictionary>>>>,
    basemap_lod: AtomicI32,
    next_fid: AtomicU64,
}

impl Default for SessionContext {
    fn default() -> Self { Self::with_drivers(DriverRegistry::with_defaults()) }
}

impl SessionContext {
    /// Session with the bundled drivers.
    pub fn new() -> Self { Self::default() }

    pub fn with_drivers(drivers: DriverRegistry) -> Self {
        Self {
            drivers: RwLock::new(drivers),
            blacklist: Mutex::default(),
            loads: Mutex::default(),
            retired: Mutex::default(),
            models: Mutex::default(),
            unreferenced: Mutex::default(),
            replacements: ReplacementStack::new(),
            dictionaries: Mutex::default(),
            basemap_lod: AtomicI32::new(0),
            next_fid: AtomicU64::new(0),
        }
    }

    pub fn drivers(&self) -> RwLockReadGuard<'_, DriverRegistry> {
        self.drivers.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn drivers_mut(&self) -> RwLockWriteGuard<'_, DriverRegistry> {
        self.drivers.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Copy of the registry for long-running work, so registrations are not
    /// blocked while tiles load.
    pub fn driver_snapshot(&self) -> DriverRegistry { self.drivers().clone() }

    pub fn is_blacklisted(&self, name: &str) -> bool { lock(&self.blacklist).contains(name) }

    pub fn blacklist(&self, name: &str) {
        if lock(&self.blacklist).insert(name.to_string()) {
            debug!(name, "blacklisted");
        }
    }

    pub fn blacklist_len(&self) -> usize { lock(&self.blacklist).len() }

    /// Claim `uri` for loading. False while it is already loading or loaded;
    /// failed URIs may be retried.
    pub fn model_not_loading(&self, uri: &str) -> bool {
        let mut loads = lock(&self.loads);
        match loads.get(uri) {
            Some(LoadStatus::Loading | LoadStatus::Loaded) => false,
            Some(LoadStatus::Failed) => {
                loads.insert(uri.to_string(), LoadStatus::Loading);
                true
            }
            None => {
                loads.insert(uri.to_string(), LoadStatus::Loading);
                true
            }
        }
    }

    pub fn mark_loaded(&self, uri: &str) { lock(&self.loads).insert(uri.to_string(), LoadStatus::Loaded); }

    pub fn mark_failed(&self, uri: &str) { lock(&self.loads).insert(uri.to_string(), LoadStatus::Failed); }

    pub fn load_status(&self, uri: &str) -> Option<LoadStatus> { lock(&self.loads).get(uri).copied() }

    pub fn retire(&self, name: &str, model: RetiredModel) { lock(&self.retired).insert(name.to_string(), model); }

    pub fn has_retired(&self, name: &str) -> bool { lock(&self.retired).contains_key(name) }

    pub fn take_retired(&self, name: &str) -> Option<RetiredModel> { lock(&self.retired).remove(name) }

    /// Exclusive access to the referenced-model ledger; hold the guard across
    /// a read-check-insert.
    pub fn models(&self) -> MutexGuard<'_, ModelLedger> { lock(&self.models) }

    pub fn unreferenced(&self) -> MutexGuard<'_, UnrefLedger> { lock(&self.unreferenced) }

    pub fn replacements(&self) -> &ReplacementStack<ReplacementBatch> { &self.replacements }

    /// The feature data dictionary of `root`, loaded once per session.
    pub fn dictionary(&self, root: &Path) -> Option<Arc<FeatureDictionary>> {
        lock(&self.dictionaries)
            .entry(root.to_path_buf())
            .or_insert_with(|| FeatureDictionary::load(root).map(Arc::new))
            .clone()
    }

    pub fn basemap_lod(&self) -> i32 { self.basemap_lod.load(Ordering::Relaxed) }

    pub fn set_basemap_lod(&self, lod: i32) { self.basemap_lod.store(lod, Ordering::Relaxed); }

    /// Session-unique feature id.
    pub fn next_feature_id(&self) -> u64 { self.next_fid.fetch_add(1, Ordering::Relaxed) }
}
