use crate::ipc::error::ok;
use crate::ipc::handlers::helpers::get_required_str;
use crate::ipc::types::{AppState, Request};
use crate::store::{GroupStore, JsonWorkbook};
use serde_json::json;
use std::path::PathBuf;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workbookPath": state.workbook.as_ref().map(|p| p.to_string_lossy().to_string())
        }),
    )
}

/// Open (or initialize) the workbook at the given path. A missing or corrupt
/// file is recovered by falling back to a single empty default group, so this
/// never fails outright; `recovered` tells the frontend to inform the
/// operator.
fn handle_workbook_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let path = match get_required_str(&req.params, "path") {
        Ok(p) => PathBuf::from(p),
        Err(e) => return e.response(&req.id),
    };

    let book = GroupStore::open(Box::new(JsonWorkbook::new(&path)));
    let selected = book.first_group();
    let groups = book.group_names();
    let recovered = book.recovered;

    state.workbook = Some(path.clone());
    state.book = Some(book);
    state.selected = Some(selected.clone());
    state.scan.clear();

    ok(
        &req.id,
        json!({
            "workbookPath": path.to_string_lossy(),
            "groups": groups,
            "selected": selected,
            "recovered": recovered,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workbook.select" => Some(handle_workbook_select(state, req)),
        _ => None,
    }
}
