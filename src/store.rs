use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::model::{self, StudentRecord};
use crate::schema::{self, Sheet};

pub const DEFAULT_GROUP: &str = "Group 1";

/// The tabular-store seam: whole-workbook reads and writes, one named sheet
/// per group. The daemon never does partial-sheet I/O.
pub trait TabularStore {
    fn read_all(&self) -> anyhow::Result<BTreeMap<String, Sheet>>;
    fn write_all(&self, sheets: &BTreeMap<String, Sheet>) -> anyhow::Result<()>;
}

/// Workbook persisted as one JSON file. Saves go through a temp file and a
/// rename so a crashed write never leaves a half-written workbook behind.
pub struct JsonWorkbook {
    path: PathBuf,
}

impl JsonWorkbook {
    pub fn new(path: &Path) -> JsonWorkbook {
        JsonWorkbook {
            path: path.to_path_buf(),
        }
    }
}

impl TabularStore for JsonWorkbook {
    fn read_all(&self) -> anyhow::Result<BTreeMap<String, Sheet>> {
        let bytes = std::fs::read(&self.path)?;
        let sheets: BTreeMap<String, Sheet> = serde_json::from_slice(&bytes)?;
        Ok(sheets)
    }

    fn write_all(&self, sheets: &BTreeMap<String, Sheet>) -> anyhow::Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(sheets)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[derive(Debug)]
pub enum StoreError {
    DuplicateGroup(String),
    UnknownGroup(String),
    LastGroup,
    Save(anyhow::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::DuplicateGroup(n) => write!(f, "group {} already exists", n),
            StoreError::UnknownGroup(n) => write!(f, "group {} does not exist", n),
            StoreError::LastGroup => write!(f, "cannot delete the only remaining group"),
            StoreError::Save(e) => write!(f, "workbook save failed: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

/// All groups, held in memory between requests. Every mutating call persists
/// the full workbook; there is no incremental persistence model.
pub struct GroupStore {
    store: Box<dyn TabularStore>,
    pub groups: BTreeMap<String, Vec<StudentRecord>>,
    /// True when opening fell back to a fresh default group.
    pub recovered: bool,
}

impl GroupStore {
    /// Read every sheet and normalize each to the canonical schema. A
    /// missing or corrupt workbook is not fatal: fall back to one empty
    /// default group and persist it.
    pub fn open(store: Box<dyn TabularStore>) -> GroupStore {
        match store.read_all() {
            Ok(sheets) if !sheets.is_empty() => {
                let groups = sheets
                    .iter()
                    .map(|(name, sheet)| {
                        (
                            name.clone(),
                            model::records_from_sheet(&schema::normalize(sheet)),
                        )
                    })
                    .collect();
                GroupStore {
                    store,
                    groups,
                    recovered: false,
                }
            }
            _ => {
                let mut groups = BTreeMap::new();
                groups.insert(DEFAULT_GROUP.to_string(), Vec::new());
                let gs = GroupStore {
                    store,
                    groups,
                    recovered: true,
                };
                // Best effort; the in-memory fallback stands even if the
                // first persist fails.
                let _ = gs.save();
                gs
            }
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let sheets: BTreeMap<String, Sheet> = self
            .groups
            .iter()
            .map(|(name, records)| (name.clone(), model::records_to_sheet(records)))
            .collect();
        self.store.write_all(&sheets)
    }

    pub fn group_names(&self) -> Vec<String> {
        self.groups.keys().cloned().collect()
    }

    pub fn first_group(&self) -> String {
        self.groups
            .keys()
            .next()
            .cloned()
            .unwrap_or_else(|| DEFAULT_GROUP.to_string())
    }

    pub fn create_group(&mut self, name: &str) -> Result<(), StoreError> {
        if self.groups.contains_key(name) {
            return Err(StoreError::DuplicateGroup(name.to_string()));
        }
        self.groups.insert(name.to_string(), Vec::new());
        if let Err(e) = self.save() {
            // A failed persist must not leave a group that exists only in
            // memory; undo before reporting.
            self.groups.remove(name);
            return Err(StoreError::Save(e));
        }
        Ok(())
    }

    /// Remove a group and report the deterministic reselect target (first
    /// remaining group in iteration order). Deleting the last group fails.
    pub fn delete_group(&mut self, name: &str) -> Result<String, StoreError> {
        if self.groups.len() == 1 && self.groups.contains_key(name) {
            return Err(StoreError::LastGroup);
        }
        let removed = match self.groups.remove(name) {
            Some(records) => records,
            None => return Err(StoreError::UnknownGroup(name.to_string())),
        };
        if let Err(e) = self.save() {
            self.groups.insert(name.to_string(), removed);
            return Err(StoreError::Save(e));
        }
        Ok(self.first_group())
    }
}
