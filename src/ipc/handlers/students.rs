use crate::ipc::error::ok;
use crate::ipc::handlers::helpers::{
    get_optional_str, get_required_str, save_or_undo, selected_group, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{self, DecrementOutcome, ModelError, NewStudent, StudentRecord};
use crate::schema::{self, MONTH_LABELS};
use crate::store::GroupStore;
use chrono::{Local, NaiveDate};
use serde_json::json;

pub(super) fn model_err(e: ModelError) -> HandlerErr {
    let code = match e {
        ModelError::DuplicateCode(_) => "duplicate_code",
        ModelError::NotFound(_) => "not_found",
        ModelError::EmptyField(_) => "bad_params",
        ModelError::UnknownMonth(_) => "bad_params",
    };
    HandlerErr::new(code, e.to_string())
}

pub fn record_json(rec: &StudentRecord) -> serde_json::Value {
    let months: serde_json::Value = MONTH_LABELS
        .iter()
        .zip(rec.months_paid.iter())
        .map(|(label, paid)| (label.to_string(), json!(paid)))
        .collect::<serde_json::Map<String, serde_json::Value>>()
        .into();
    json!({
        "code": rec.code,
        "name": rec.name,
        "phone": rec.phone,
        "guardianPhone": rec.guardian_phone,
        "attendanceCount": rec.attendance_count,
        "attendanceDates": rec.attendance_dates,
        "monthsPaid": months,
        "registrationDate": rec.registration_date.map(|d| d.format("%Y-%m-%d").to_string()),
        "notes": rec.notes,
        "testResults": rec.test_results,
    })
}

fn records_mut<'a>(
    book: &'a mut Option<GroupStore>,
    group: &str,
) -> Result<&'a mut Vec<StudentRecord>, HandlerErr> {
    book.as_mut()
        .and_then(|b| b.groups.get_mut(group))
        .ok_or_else(|| HandlerErr::new("no_workbook", "select a workbook first"))
}

/// Exactly the one flag for the registration month goes true; the lookup is
/// total for months 1 to 12, and anything else marks nothing.
fn default_month_map(registration_date: NaiveDate) -> [bool; 12] {
    use chrono::Datelike;
    let mut months = [false; 12];
    if let Some(label) = schema::month_label_for(registration_date.month()) {
        if let Some(idx) = MONTH_LABELS.iter().position(|m| *m == label) {
            months[idx] = true;
        }
    }
    months
}

fn parse_registration_date(params: &serde_json::Value) -> Result<NaiveDate, HandlerErr> {
    match get_optional_str(params, "registrationDate") {
        None => Ok(Local::now().date_naive()),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            HandlerErr::new("bad_params", "registrationDate must be YYYY-MM-DD")
        }),
    }
}

fn students_register(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let group = selected_group(state)?;
    let code = get_required_str(&req.params, "code")?;
    let name = get_required_str(&req.params, "name")?;
    let registration_date = parse_registration_date(&req.params)?;

    let new = NewStudent {
        code,
        name,
        phone: get_optional_str(&req.params, "phone").unwrap_or_default(),
        guardian_phone: get_optional_str(&req.params, "guardianPhone").unwrap_or_default(),
        notes: get_optional_str(&req.params, "notes").unwrap_or_default(),
        registration_date,
        months_paid: default_month_map(registration_date),
    };

    let records = records_mut(&mut state.book, &group)?;
    let rec = model::register(records, new).map_err(model_err)?;
    save_or_undo(state, &group, |records| {
        records.retain(|r| r.code != rec.code);
    })?;
    // The barcode image itself is rendered by the frontend collaborator; the
    // payload contract is fixed here: exactly the code, nothing else.
    Ok(json!({
        "record": record_json(&rec),
        "barcodePayload": rec.code,
    }))
}

fn students_find(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let group = selected_group(state)?;
    let code = get_required_str(&req.params, "code")?;
    let records = records_mut(&mut state.book, &group)?;
    let rec =
        model::find(records, &code).ok_or_else(|| model_err(ModelError::NotFound(code.clone())))?;
    Ok(json!({ "record": record_json(rec) }))
}

fn students_list(state: &mut AppState, _req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let group = selected_group(state)?;
    let records = records_mut(&mut state.book, &group)?;
    let rows: Vec<serde_json::Value> = records.iter().map(record_json).collect();
    Ok(json!({ "group": group, "students": rows }))
}

fn attendance_increment(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let group = selected_group(state)?;
    let code = get_required_str(&req.params, "code")?;
    let today = Local::now().date_naive();
    let records = records_mut(&mut state.book, &group)?;
    let rec = model::find_mut(records, &code)
        .ok_or_else(|| model_err(ModelError::NotFound(code.clone())))?;
    let before = rec.clone();
    model::increment_attendance(rec, today);
    let result = json!({ "record": record_json(rec) });
    save_or_undo(state, &group, move |records| {
        if let Some(r) = model::find_mut(records, &before.code) {
            *r = before;
        }
    })?;
    Ok(result)
}

fn attendance_decrement(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let group = selected_group(state)?;
    let code = get_required_str(&req.params, "code")?;
    let records = records_mut(&mut state.book, &group)?;
    let rec = model::find_mut(records, &code)
        .ok_or_else(|| model_err(ModelError::NotFound(code.clone())))?;
    let before = rec.clone();
    match model::decrement_attendance(rec) {
        DecrementOutcome::AlreadyZero => Ok(json!({
            "applied": false,
            "warning": "attendance count is already zero",
            "record": record_json(rec),
        })),
        DecrementOutcome::Decremented => {
            let result = json!({ "applied": true, "record": record_json(rec) });
            save_or_undo(state, &group, move |records| {
                if let Some(r) = model::find_mut(records, &before.code) {
                    *r = before;
                }
            })?;
            Ok(result)
        }
    }
}

fn payments_set_month(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let group = selected_group(state)?;
    let code = get_required_str(&req.params, "code")?;
    let month = get_required_str(&req.params, "month")?;
    let paid = req
        .params
        .get("paid")
        .and_then(|v| v.as_bool())
        .ok_or_else(|| HandlerErr::new("bad_params", "missing paid"))?;
    let records = records_mut(&mut state.book, &group)?;
    let rec = model::find_mut(records, &code)
        .ok_or_else(|| model_err(ModelError::NotFound(code.clone())))?;
    let before = rec.clone();
    model::set_month_paid(rec, &month, paid).map_err(model_err)?;
    let result = json!({ "record": record_json(rec) });
    save_or_undo(state, &group, move |records| {
        if let Some(r) = model::find_mut(records, &before.code) {
            *r = before;
        }
    })?;
    Ok(result)
}

fn tests_append_result(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let group = selected_group(state)?;
    let code = get_required_str(&req.params, "code")?;
    let test_name = get_required_str(&req.params, "testName")?;
    let score = get_required_str(&req.params, "score")?;
    let records = records_mut(&mut state.book, &group)?;
    let rec = model::find_mut(records, &code)
        .ok_or_else(|| model_err(ModelError::NotFound(code.clone())))?;
    let before = rec.clone();
    model::append_test_result(rec, &test_name, &score).map_err(model_err)?;
    let result = json!({ "record": record_json(rec) });
    save_or_undo(state, &group, move |records| {
        if let Some(r) = model::find_mut(records, &before.code) {
            *r = before;
        }
    })?;
    Ok(result)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let resp = match req.method.as_str() {
        "students.register" => students_register(state, req),
        "students.find" => students_find(state, req),
        "students.list" => students_list(state, req),
        "attendance.increment" => attendance_increment(state, req),
        "attendance.decrement" => attendance_decrement(state, req),
        "payments.setMonth" => payments_set_month(state, req),
        "tests.appendResult" => tests_append_result(state, req),
        _ => return None,
    };
    Some(match resp {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    })
}
