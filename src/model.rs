use chrono::NaiveDate;
use serde_json::Value;
use std::fmt;

use crate::schema::{self, Sheet, MONTH_LABELS};

/// One student row, decoded from a normalized sheet. Joined-string fields
/// (`attendance_dates`, `test_results`) live as sequences in memory; joining
/// happens only at the storage and export boundaries.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentRecord {
    pub code: String,
    pub name: String,
    pub phone: String,
    pub guardian_phone: String,
    pub attendance_count: u32,
    pub attendance_dates: Vec<String>,
    pub months_paid: [bool; 12],
    pub registration_date: Option<NaiveDate>,
    pub notes: String,
    pub test_results: Vec<String>,
}

#[derive(Debug)]
pub enum ModelError {
    DuplicateCode(String),
    NotFound(String),
    EmptyField(&'static str),
    UnknownMonth(String),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::DuplicateCode(c) => write!(f, "code {} already registered", c),
            ModelError::NotFound(c) => write!(f, "code {} not registered", c),
            ModelError::EmptyField(name) => write!(f, "{} must not be empty", name),
            ModelError::UnknownMonth(m) => write!(f, "unknown month column: {}", m),
        }
    }
}

impl std::error::Error for ModelError {}

pub struct NewStudent {
    pub code: String,
    pub name: String,
    pub phone: String,
    pub guardian_phone: String,
    pub notes: String,
    pub registration_date: NaiveDate,
    pub months_paid: [bool; 12],
}

/// Split a semicolon-joined cell back into its entries.
pub fn split_joined(s: &str) -> Vec<String> {
    s.split(';')
        .map(|e| e.trim())
        .filter(|e| !e.is_empty())
        .map(|e| e.to_string())
        .collect()
}

pub fn join_entries(entries: &[String]) -> String {
    entries.join("; ")
}

// Positional layout of a canonical row (see CANONICAL_COLUMNS).
const COL_CODE: usize = 0;
const COL_NAME: usize = 1;
const COL_PHONE: usize = 2;
const COL_GUARDIAN_PHONE: usize = 3;
const COL_ATTENDANCE_COUNT: usize = 4;
const COL_ATTENDANCE_DATES: usize = 5;
const COL_MONTHS: usize = 6;
const COL_REGISTRATION_DATE: usize = COL_MONTHS + MONTH_LABELS.len();
const COL_NOTES: usize = COL_REGISTRATION_DATE + 1;
const COL_TEST_RESULTS: usize = COL_NOTES + 1;

/// Decode one normalized-sheet row. Rows must already be canonical; the
/// normalizer guarantees shape, so decoding is positional.
pub fn record_from_row(row: &[Value]) -> StudentRecord {
    let text = |idx: usize| row.get(idx).map(schema::coerce_text).unwrap_or_default();
    let mut months_paid = [false; 12];
    for (i, flag) in months_paid.iter_mut().enumerate() {
        *flag = row
            .get(COL_MONTHS + i)
            .map(schema::coerce_bool)
            .unwrap_or(false);
    }
    StudentRecord {
        code: text(COL_CODE),
        name: text(COL_NAME),
        phone: text(COL_PHONE),
        guardian_phone: text(COL_GUARDIAN_PHONE),
        attendance_count: row
            .get(COL_ATTENDANCE_COUNT)
            .map(schema::coerce_count)
            .unwrap_or(0),
        attendance_dates: split_joined(&text(COL_ATTENDANCE_DATES)),
        months_paid,
        registration_date: row.get(COL_REGISTRATION_DATE).and_then(schema::coerce_date),
        notes: text(COL_NOTES),
        test_results: split_joined(&text(COL_TEST_RESULTS)),
    }
}

pub fn record_to_row(rec: &StudentRecord) -> Vec<Value> {
    let mut row = vec![
        Value::String(rec.code.clone()),
        Value::String(rec.name.clone()),
        Value::String(rec.phone.clone()),
        Value::String(rec.guardian_phone.clone()),
        Value::from(rec.attendance_count),
        Value::String(join_entries(&rec.attendance_dates)),
    ];
    for paid in rec.months_paid {
        row.push(Value::Bool(paid));
    }
    row.push(Value::String(
        rec.registration_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
    ));
    row.push(Value::String(rec.notes.clone()));
    row.push(Value::String(join_entries(&rec.test_results)));
    row
}

pub fn records_from_sheet(sheet: &Sheet) -> Vec<StudentRecord> {
    sheet.rows.iter().map(|r| record_from_row(r)).collect()
}

pub fn records_to_sheet(records: &[StudentRecord]) -> Sheet {
    let mut sheet = Sheet::empty_canonical();
    sheet.rows = records.iter().map(record_to_row).collect();
    sheet
}

pub fn find<'a>(records: &'a [StudentRecord], code: &str) -> Option<&'a StudentRecord> {
    records.iter().find(|r| r.code == code)
}

pub fn find_mut<'a>(
    records: &'a mut [StudentRecord],
    code: &str,
) -> Option<&'a mut StudentRecord> {
    records.iter_mut().find(|r| r.code == code)
}

/// Insert a new record. Code uniqueness is enforced here and only here;
/// nothing else renames or merges codes.
pub fn register(
    records: &mut Vec<StudentRecord>,
    new: NewStudent,
) -> Result<StudentRecord, ModelError> {
    let code = new.code.trim().to_string();
    let name = new.name.trim().to_string();
    if code.is_empty() {
        return Err(ModelError::EmptyField("code"));
    }
    if name.is_empty() {
        return Err(ModelError::EmptyField("name"));
    }
    if find(records, &code).is_some() {
        return Err(ModelError::DuplicateCode(code));
    }
    let rec = StudentRecord {
        code,
        name,
        phone: new.phone,
        guardian_phone: new.guardian_phone,
        attendance_count: 0,
        attendance_dates: Vec::new(),
        months_paid: new.months_paid,
        registration_date: Some(new.registration_date),
        notes: new.notes,
        test_results: Vec::new(),
    };
    records.push(rec.clone());
    Ok(rec)
}

pub fn increment_attendance(rec: &mut StudentRecord, today: NaiveDate) {
    rec.attendance_count += 1;
    rec.attendance_dates.push(today.format("%Y-%m-%d").to_string());
}

#[derive(Debug, PartialEq, Eq)]
pub enum DecrementOutcome {
    Decremented,
    AlreadyZero,
}

/// Decrement pops the most recent date-stamp (LIFO); it does not try to match
/// a particular day. At zero this is a warned no-op, never an error.
pub fn decrement_attendance(rec: &mut StudentRecord) -> DecrementOutcome {
    if rec.attendance_count == 0 {
        return DecrementOutcome::AlreadyZero;
    }
    rec.attendance_count -= 1;
    rec.attendance_dates.pop();
    DecrementOutcome::Decremented
}

pub fn set_month_paid(
    rec: &mut StudentRecord,
    label: &str,
    paid: bool,
) -> Result<(), ModelError> {
    let idx = MONTH_LABELS
        .iter()
        .position(|m| *m == label)
        .ok_or_else(|| ModelError::UnknownMonth(label.to_string()))?;
    rec.months_paid[idx] = paid;
    Ok(())
}

pub fn append_test_result(
    rec: &mut StudentRecord,
    test_name: &str,
    score: &str,
) -> Result<(), ModelError> {
    let test_name = test_name.trim();
    let score = score.trim();
    if test_name.is_empty() {
        return Err(ModelError::EmptyField("testName"));
    }
    if score.is_empty() {
        return Err(ModelError::EmptyField("score"));
    }
    rec.test_results.push(format!("{}: {}", test_name, score));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_student(code: &str, name: &str) -> NewStudent {
        NewStudent {
            code: code.to_string(),
            name: name.to_string(),
            phone: "0100".to_string(),
            guardian_phone: "0111".to_string(),
            notes: String::new(),
            registration_date: NaiveDate::from_ymd_opt(2025, 9, 10).unwrap(),
            months_paid: [false; 12],
        }
    }

    #[test]
    fn register_then_find_returns_fresh_record() {
        let mut records = Vec::new();
        register(&mut records, new_student("S001", "Ahmed")).unwrap();
        let rec = find(&records, "S001").unwrap();
        assert_eq!(rec.attendance_count, 0);
        assert!(rec.attendance_dates.is_empty());
        assert!(rec.test_results.is_empty());
    }

    #[test]
    fn duplicate_code_is_rejected_without_mutation() {
        let mut records = Vec::new();
        register(&mut records, new_student("S001", "Ahmed")).unwrap();
        let err = register(&mut records, new_student("S001", "Sara")).unwrap_err();
        assert!(matches!(err, ModelError::DuplicateCode(_)));
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn empty_code_or_name_is_rejected() {
        let mut records = Vec::new();
        assert!(matches!(
            register(&mut records, new_student("  ", "Ahmed")),
            Err(ModelError::EmptyField("code"))
        ));
        assert!(matches!(
            register(&mut records, new_student("S001", "")),
            Err(ModelError::EmptyField("name"))
        ));
        assert!(records.is_empty());
    }

    #[test]
    fn increment_then_decrement_restores_count_and_dates() {
        let mut records = Vec::new();
        register(&mut records, new_student("S001", "Ahmed")).unwrap();
        let rec = find_mut(&mut records, "S001").unwrap();
        rec.attendance_dates.push("2025-09-01".to_string());
        rec.attendance_count = 1;

        increment_attendance(rec, NaiveDate::from_ymd_opt(2025, 9, 8).unwrap());
        assert_eq!(rec.attendance_count, 2);
        assert_eq!(rec.attendance_dates.last().unwrap(), "2025-09-08");

        // LIFO: exactly the stamp just appended comes back off.
        assert_eq!(decrement_attendance(rec), DecrementOutcome::Decremented);
        assert_eq!(rec.attendance_count, 1);
        assert_eq!(rec.attendance_dates, vec!["2025-09-01".to_string()]);
    }

    #[test]
    fn decrement_at_zero_is_a_warned_noop() {
        let mut records = Vec::new();
        register(&mut records, new_student("S001", "Ahmed")).unwrap();
        let rec = find_mut(&mut records, "S001").unwrap();
        assert_eq!(decrement_attendance(rec), DecrementOutcome::AlreadyZero);
        assert_eq!(rec.attendance_count, 0);
    }

    #[test]
    fn test_results_join_in_order() {
        let mut records = Vec::new();
        register(&mut records, new_student("S001", "Ahmed")).unwrap();
        let rec = find_mut(&mut records, "S001").unwrap();
        append_test_result(rec, "Quiz1", "9/10").unwrap();
        append_test_result(rec, "Quiz2", "10/10").unwrap();
        assert_eq!(join_entries(&rec.test_results), "Quiz1: 9/10; Quiz2: 10/10");
        assert!(append_test_result(rec, "", "5/10").is_err());
        assert!(append_test_result(rec, "Quiz3", "  ").is_err());
        assert_eq!(rec.test_results.len(), 2);
    }

    #[test]
    fn set_month_paid_is_independent_per_month() {
        let mut records = Vec::new();
        register(&mut records, new_student("S001", "Ahmed")).unwrap();
        let rec = find_mut(&mut records, "S001").unwrap();
        set_month_paid(rec, "September_2025", true).unwrap();
        set_month_paid(rec, "March_2026", true).unwrap();
        set_month_paid(rec, "September_2025", false).unwrap();
        assert!(!rec.months_paid[2]);
        assert!(rec.months_paid[8]);
        assert!(matches!(
            set_month_paid(rec, "July_2024", true),
            Err(ModelError::UnknownMonth(_))
        ));
    }

    #[test]
    fn row_codec_round_trips() {
        let rec = StudentRecord {
            code: "S001".to_string(),
            name: "Ahmed".to_string(),
            phone: "0100".to_string(),
            guardian_phone: "0111".to_string(),
            attendance_count: 2,
            attendance_dates: vec!["2025-09-01".to_string(), "2025-09-08".to_string()],
            months_paid: {
                let mut m = [false; 12];
                m[2] = true;
                m
            },
            registration_date: NaiveDate::from_ymd_opt(2025, 9, 1),
            notes: "notes".to_string(),
            test_results: vec!["Quiz1: 9/10".to_string()],
        };
        let back = record_from_row(&record_to_row(&rec));
        assert_eq!(back, rec);
    }
}
