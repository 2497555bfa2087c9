use std::path::PathBuf;

use serde::Deserialize;

use crate::scan::ScanGuard;
use crate::store::GroupStore;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub workbook: Option<PathBuf>,
    pub book: Option<GroupStore>,
    /// Group that current operations target. Always names an existing group
    /// whenever `book` is loaded.
    pub selected: Option<String>,
    pub scan: ScanGuard,
}

impl AppState {
    pub fn new() -> AppState {
        AppState {
            workbook: None,
            book: None,
            selected: None,
            scan: ScanGuard::new(),
        }
    }
}
