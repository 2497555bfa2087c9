use crate::export::group_csv;
use crate::ipc::error::ok;
use crate::ipc::handlers::helpers::{
    get_optional_str, get_required_str, selected_group, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn export_group_csv(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let group = match get_optional_str(&req.params, "group") {
        Some(g) => g,
        None => selected_group(state)?,
    };
    let out_path = get_required_str(&req.params, "outPath")?;

    let book = state
        .book
        .as_ref()
        .ok_or_else(|| HandlerErr::new("no_workbook", "select a workbook first"))?;
    let records = book.groups.get(&group).ok_or_else(|| {
        HandlerErr::new("unknown_group", format!("group {} does not exist", group))
    })?;

    let csv = group_csv(records);
    std::fs::write(&out_path, csv.as_bytes())
        .map_err(|e| HandlerErr::new("export_failed", e.to_string()))?;

    Ok(json!({
        "group": group,
        "outPath": out_path,
        "rowsExported": records.len(),
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let resp = match req.method.as_str() {
        "export.groupCsv" => export_group_csv(state, req),
        _ => return None,
    };
    Some(match resp {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    })
}
