use crate::ipc::error::ok;
use crate::ipc::handlers::helpers::{
    get_optional_str, get_required_str, save_or_undo, selected_group, HandlerErr,
};
use crate::ipc::handlers::students::{model_err, record_json};
use crate::ipc::types::{AppState, Request};
use crate::model::{self, ModelError};
use crate::scan;
use chrono::Local;
use serde_json::json;

/// One scan event: the capture frontend sends the opaque capture content
/// (`image`, e.g. the base64 the camera widget produced) together with the
/// payload its barcode reader decoded, or no payload when decoding failed.
/// The daemon owns only the idempotency guard, the increment, and the
/// response shape.
fn scan_submit(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let group = selected_group(state)?;
    let image = get_required_str(&req.params, "image")?;
    let digest = scan::frame_digest(&image);

    let payload = match get_optional_str(&req.params, "payload") {
        Some(p) if !p.trim().is_empty() => p.trim().to_string(),
        _ => {
            return Err(HandlerErr::new(
                "decode_failed",
                "no code found in capture, try again",
            ));
        }
    };

    let records = state
        .book
        .as_mut()
        .and_then(|b| b.groups.get_mut(&group))
        .ok_or_else(|| HandlerErr::new("no_workbook", "select a workbook first"))?;

    let Some(rec) = model::find_mut(records, &payload) else {
        return Err(model_err(ModelError::NotFound(payload)));
    };

    if state.scan.already_processed(&payload, &digest) {
        // Same physical frame re-presented (UI re-render): no mutation.
        return Ok(json!({
            "outcome": "duplicate",
            "record": record_json(rec),
        }));
    }

    let before = rec.clone();
    model::increment_attendance(rec, Local::now().date_naive());
    let result = json!({
        "outcome": "recorded",
        "record": record_json(rec),
    });
    save_or_undo(state, &group, move |records| {
        if let Some(r) = model::find_mut(records, &before.code) {
            *r = before;
        }
    })?;
    state.scan.mark_processed(&payload, &digest);
    Ok(result)
}

/// Explicit reset: forget remembered frame identities so the same physical
/// frame can be reprocessed if re-submitted.
fn scan_clear(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    state.scan.clear();
    Ok(json!({ "cleared": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let resp = match req.method.as_str() {
        "scan.submit" => scan_submit(state, req),
        "scan.clear" => scan_clear(state),
        _ => return None,
    };
    Some(match resp {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    })
}
