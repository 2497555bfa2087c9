use crate::ipc::error::ok;
use crate::ipc::handlers::helpers::{get_required_str, selected_group, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::store::StoreError;
use serde_json::json;

fn store_err(e: StoreError) -> HandlerErr {
    let code = match e {
        StoreError::DuplicateGroup(_) => "duplicate_group",
        StoreError::UnknownGroup(_) => "unknown_group",
        StoreError::LastGroup => "last_group",
        StoreError::Save(_) => "save_failed",
    };
    HandlerErr::new(code, e.to_string())
}

fn groups_list(state: &AppState) -> Result<serde_json::Value, HandlerErr> {
    let selected = selected_group(state)?;
    let book = state
        .book
        .as_ref()
        .ok_or_else(|| HandlerErr::new("no_workbook", "select a workbook first"))?;
    Ok(json!({ "groups": book.group_names(), "selected": selected }))
}

fn groups_select(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    selected_group(state)?;
    let name = get_required_str(&req.params, "name")?;
    let book = state
        .book
        .as_ref()
        .ok_or_else(|| HandlerErr::new("no_workbook", "select a workbook first"))?;
    if !book.groups.contains_key(&name) {
        return Err(HandlerErr::new(
            "unknown_group",
            format!("group {} does not exist", name),
        ));
    }
    state.selected = Some(name.clone());
    // Scan dedup is a per-session, per-group affair; codes may repeat across
    // groups, so the guard resets on a switch.
    state.scan.clear();
    Ok(json!({ "selected": name }))
}

fn groups_create(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let selected = selected_group(state)?;
    let name = get_required_str(&req.params, "name")?;
    let name = name.trim().to_string();
    if name.is_empty() {
        return Err(HandlerErr::new("bad_params", "group name must not be empty"));
    }
    let book = state
        .book
        .as_mut()
        .ok_or_else(|| HandlerErr::new("no_workbook", "select a workbook first"))?;
    book.create_group(&name).map_err(store_err)?;
    Ok(json!({ "groups": book.group_names(), "selected": selected }))
}

fn groups_delete(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let selected = selected_group(state)?;
    let name = get_required_str(&req.params, "name")?;
    let book = state
        .book
        .as_mut()
        .ok_or_else(|| HandlerErr::new("no_workbook", "select a workbook first"))?;
    let fallback = book.delete_group(&name).map_err(store_err)?;
    let now_selected = if selected == name { fallback } else { selected };
    state.selected = Some(now_selected.clone());
    state.scan.clear();
    let book = state
        .book
        .as_ref()
        .ok_or_else(|| HandlerErr::new("no_workbook", "select a workbook first"))?;
    Ok(json!({ "groups": book.group_names(), "selected": now_selected }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let resp = match req.method.as_str() {
        "groups.list" => groups_list(state),
        "groups.select" => groups_select(state, req),
        "groups.create" => groups_create(state, req),
        "groups.delete" => groups_delete(state, req),
        _ => return None,
    };
    Some(match resp {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    })
}
