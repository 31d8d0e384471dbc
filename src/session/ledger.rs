use std::path::PathBuf;

use ahash::AHashMap;
use smallvec::SmallVec;

/// A ledger record tagged with the LOD it was seen at.
pub trait LodEntry: Clone {
    fn lod(&self) -> i32;
}

/// Exact name a model was loaded under at some LOD.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelEntry {
    pub lod: i32,
    pub reference: String,
}

/// Archive member that no feature claimed when its tile was scanned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnrefEntry {
    pub lod: i32,
    pub archive_name: String,
    pub model_zip: PathBuf,
    pub texture_zip: Option<PathBuf>,
}

impl LodEntry for ModelEntry {
    fn lod(&self) -> i32 { self.lod }
}

impl LodEntry for UnrefEntry {
    fn lod(&self) -> i32 { self.lod }
}

/// Outcome of a ledger query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    /// Closest entry at or below the requested LOD.
    Found(T),
    /// The key is known, but only above the requested LOD.
    Instanced,
    Absent,
}

/// Model key to the LODs it has been recorded at. Entries live for the
/// session; at most one per (key, LOD).
#[derive(Debug, Clone)]
pub struct Ledger<T> {
    entries: AHashMap<String, SmallVec<[T; 4]>>,
}

pub type ModelLedger = Ledger<ModelEntry>;
pub type UnrefLedger = Ledger<UnrefEntry>;

impl<T> Default for Ledger<T> {
    fn default() -> Self { Self { entries: AHashMap::new() } }
}

impl<T: LodEntry> Ledger<T> {
    pub fn new() -> Self { Self::default() }

    /// Record `entry` unless the key already has one at the same LOD.
    pub fn insert(&mut self, key: &str, entry: T) -> bool {
        let list = self.entries.entry(key.to_string()).or_default();
        if list.iter().any(|e| e.lod() == entry.lod()) {
            return false;
        }
        list.push(entry);
        true
    }

    /// Closest entry with `lod <= max_lod`.
    pub fn find(&self, key: &str, max_lod: i32) -> Lookup<T> {
        let Some(list) = self.entries.get(key) else {
            return Lookup::Absent;
        };
        list.iter()
            .filter(|e| e.lod() <= max_lod)
            .max_by_key(|e| e.lod())
            .map_or(Lookup::Instanced, |e| Lookup::Found(e.clone()))
    }

    pub fn contains_key(&self, key: &str) -> bool { self.entries.contains_key(key) }

    /// Number of distinct keys.
    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Entries recorded for `key`.
    pub fn entries(&self, key: &str) -> &[T] {
        self.entries.get(key).map(|l| l.as_slice()).unwrap_or(&[])
    }
}
