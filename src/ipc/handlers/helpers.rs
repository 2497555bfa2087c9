use crate::ipc::error::err;
use crate::ipc::types::AppState;
use crate::model::StudentRecord;

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> HandlerErr {
        HandlerErr {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

pub fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr::new("bad_params", format!("missing {}", key)))
}

pub fn get_optional_str(params: &serde_json::Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

/// Name of the group current operations target, or `no_workbook` when no
/// workbook has been selected yet.
pub fn selected_group(state: &AppState) -> Result<String, HandlerErr> {
    match (&state.book, &state.selected) {
        (Some(_), Some(name)) => Ok(name.clone()),
        _ => Err(HandlerErr::new("no_workbook", "select a workbook first")),
    }
}

/// Persist the workbook after an in-memory record mutation. When the save
/// fails, `undo` reverses the mutation before the error goes out, so memory
/// never diverges from disk and a retry sees the pre-request state.
pub fn save_or_undo(
    state: &mut AppState,
    group: &str,
    undo: impl FnOnce(&mut Vec<StudentRecord>),
) -> Result<(), HandlerErr> {
    let book = match state.book.as_mut() {
        Some(book) => book,
        None => return Err(HandlerErr::new("no_workbook", "select a workbook first")),
    };
    if let Err(e) = book.save() {
        if let Some(records) = book.groups.get_mut(group) {
            undo(records);
        }
        return Err(HandlerErr::new("save_failed", e.to_string()));
    }
    Ok(())
}
