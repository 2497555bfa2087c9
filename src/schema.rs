use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Month-paid columns for the tracked window, in calendar order. The window
/// starts in July, so the labels span two literal years.
pub const MONTH_LABELS: [&str; 12] = [
    "July_2025",
    "August_2025",
    "September_2025",
    "October_2025",
    "November_2025",
    "December_2025",
    "January_2026",
    "February_2026",
    "March_2026",
    "April_2026",
    "May_2026",
    "June_2026",
];

pub const CANONICAL_COLUMNS: [&str; 21] = [
    "code",
    "name",
    "phone",
    "guardian_phone",
    "attendance_count",
    "attendance_dates",
    "July_2025",
    "August_2025",
    "September_2025",
    "October_2025",
    "November_2025",
    "December_2025",
    "January_2026",
    "February_2026",
    "March_2026",
    "April_2026",
    "May_2026",
    "June_2026",
    "registration_date",
    "notes",
    "test_results",
];

/// Calendar month (1..=12) to the window's column label.
pub fn month_label_for(month: u32) -> Option<&'static str> {
    let idx = match month {
        7..=12 => month - 7,
        1..=6 => month + 5,
        _ => return None,
    };
    Some(MONTH_LABELS[idx as usize])
}

pub fn is_month_column(name: &str) -> bool {
    MONTH_LABELS.contains(&name)
}

/// One named sheet of the workbook: a header row plus cell rows. Cells stay
/// loosely typed until normalization pins them down.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sheet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Sheet {
    pub fn empty_canonical() -> Sheet {
        Sheet {
            columns: CANONICAL_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

/// Column renames applied in sequence before the positional copy. Each step
/// handles one historical shape change; adding a future rename is a pure
/// addition to this list.
const COLUMN_RENAMES: [(&str, &str); 6] = [
    // A long-lived misspelling of the guardian phone column.
    ("gaurdian_phone", "guardian_phone"),
    // The five generic month flags that predate the calendar-pinned window.
    ("month_1", "July_2025"),
    ("month_2", "August_2025"),
    ("month_3", "September_2025"),
    ("month_4", "October_2025"),
    ("month_5", "November_2025"),
];

fn migrated_columns(raw: &[String]) -> Vec<String> {
    let mut out: Vec<String> = raw.to_vec();
    for (from, to) in COLUMN_RENAMES {
        for col in out.iter_mut() {
            if col == from {
                *col = to.to_string();
            }
        }
    }
    out
}

/// Produce a sheet with exactly the canonical columns in canonical order.
/// Columns present by name copy through coercion; absent columns fill with
/// their type default. Unknown legacy columns drop. Normalizing an
/// already-canonical sheet is the identity.
pub fn normalize(raw: &Sheet) -> Sheet {
    let source = Sheet {
        columns: migrated_columns(&raw.columns),
        rows: raw.rows.clone(),
    };

    let mut out = Sheet::empty_canonical();
    for row in &source.rows {
        let mut cells: Vec<Value> = Vec::with_capacity(CANONICAL_COLUMNS.len());
        for col in CANONICAL_COLUMNS {
            let cell = source
                .column_index(col)
                .and_then(|i| row.get(i))
                .map(|v| coerce_cell(col, v))
                .unwrap_or_else(|| default_cell(col));
            cells.push(cell);
        }
        out.rows.push(cells);
    }
    out
}

pub fn default_cell(column: &str) -> Value {
    if is_month_column(column) {
        Value::Bool(false)
    } else if column == "attendance_count" {
        Value::from(0u32)
    } else {
        Value::String(String::new())
    }
}

fn coerce_cell(column: &str, cell: &Value) -> Value {
    if is_month_column(column) {
        Value::Bool(coerce_bool(cell))
    } else if column == "attendance_count" {
        Value::from(coerce_count(cell))
    } else if column == "registration_date" {
        match coerce_date(cell) {
            Some(d) => Value::String(d.format("%Y-%m-%d").to_string()),
            // Explicit unknown-date marker; never fails the whole load.
            None => Value::String(String::new()),
        }
    } else {
        Value::String(coerce_text(cell))
    }
}

/// Codes and phone numbers must stay strings even when a sheet stored them
/// as numbers.
pub fn coerce_text(cell: &Value) -> String {
    match cell {
        Value::String(s) => s.clone(),
        Value::Number(n) => {
            // A phone or code that round-tripped through a numeric cell.
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else {
                n.to_string()
            }
        }
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub fn coerce_bool(cell: &Value) -> bool {
    match cell {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => parse_boolish(s),
        _ => false,
    }
}

fn parse_boolish(s: &str) -> bool {
    let t = s.trim();
    // Locale tokens used in older sheets filled in by hand.
    if matches!(t, "✅" | "نعم" | "صح" | "مدفوع") {
        return true;
    }
    matches!(
        t.to_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "paid"
    )
}

pub fn coerce_count(cell: &Value) -> u32 {
    match cell {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.max(0) as u32
            } else {
                n.as_f64().map(|f| f.max(0.0) as u32).unwrap_or(0)
            }
        }
        Value::String(s) => s.trim().parse::<f64>().map(|f| f.max(0.0) as u32).unwrap_or(0),
        _ => 0,
    }
}

pub fn coerce_date(cell: &Value) -> Option<NaiveDate> {
    let s = match cell {
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    if s.is_empty() {
        return None;
    }
    if let Ok(d) = NaiveDate::parse_from_str(&s, "%Y-%m-%d") {
        return Some(d);
    }
    // Sheets exported with a time component keep the date prefix.
    if let Some(prefix) = s.get(..10) {
        if let Ok(d) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
            return Some(d);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn canonical_row(code: &str) -> Vec<Value> {
        let mut row = vec![
            json!(code),
            json!("Ahmed"),
            json!("01012345678"),
            json!("01087654321"),
            json!(3),
            json!("2025-07-01; 2025-07-03; 2025-07-08"),
        ];
        row.extend(MONTH_LABELS.iter().map(|_| json!(false)));
        row.push(json!("2025-07-01"));
        row.push(json!(""));
        row.push(json!("Quiz1: 9/10"));
        row
    }

    #[test]
    fn canonical_sheet_normalizes_to_itself() {
        let mut sheet = Sheet::empty_canonical();
        sheet.rows.push(canonical_row("S001"));
        let out = normalize(&sheet);
        assert_eq!(out.columns, sheet.columns);
        assert_eq!(out.rows, sheet.rows);
    }

    #[test]
    fn legacy_five_month_sheet_gains_all_twelve_flags() {
        let raw = Sheet {
            columns: vec![
                "code".into(),
                "name".into(),
                "phone".into(),
                "gaurdian_phone".into(),
                "attendance_count".into(),
                "month_1".into(),
                "month_2".into(),
                "month_3".into(),
                "month_4".into(),
                "month_5".into(),
                "registration_date".into(),
                "notes".into(),
                "test_results".into(),
            ],
            rows: vec![vec![
                json!(1001),
                json!("Sara"),
                json!("0100000000"),
                json!("0111111111"),
                json!(5),
                json!(true),
                json!("نعم"),
                json!(false),
                json!(""),
                json!("no"),
                json!("2025-08-15"),
                json!("sibling of S002"),
                json!(""),
            ]],
        };
        let out = normalize(&raw);
        assert_eq!(out.columns.len(), CANONICAL_COLUMNS.len());

        let idx = |c: &str| out.columns.iter().position(|x| x == c).unwrap();
        let row = &out.rows[0];
        // Numeric code coerced to string, misspelled column recognized.
        assert_eq!(row[idx("code")], json!("1001"));
        assert_eq!(row[idx("guardian_phone")], json!("0111111111"));
        assert_eq!(row[idx("attendance_count")], json!(5));
        // Legacy generic months land on the first five calendar labels.
        assert_eq!(row[idx("July_2025")], json!(true));
        assert_eq!(row[idx("August_2025")], json!(true));
        assert_eq!(row[idx("September_2025")], json!(false));
        assert_eq!(row[idx("October_2025")], json!(false));
        assert_eq!(row[idx("November_2025")], json!(false));
        // Columns the legacy shape never had default cleanly.
        for label in MONTH_LABELS[5..].iter() {
            assert_eq!(row[idx(label)], json!(false));
        }
        assert_eq!(row[idx("attendance_dates")], json!(""));
        assert_eq!(row[idx("registration_date")], json!("2025-08-15"));
        assert_eq!(row[idx("notes")], json!("sibling of S002"));
    }

    #[test]
    fn unknown_columns_drop_and_bad_dates_become_unknown() {
        let raw = Sheet {
            columns: vec![
                "code".into(),
                "name".into(),
                "favorite_color".into(),
                "registration_date".into(),
            ],
            rows: vec![vec![
                json!("S009"),
                json!("Omar"),
                json!("blue"),
                json!("not a date"),
            ]],
        };
        let out = normalize(&raw);
        assert!(!out.columns.iter().any(|c| c == "favorite_color"));
        let idx = |c: &str| out.columns.iter().position(|x| x == c).unwrap();
        assert_eq!(out.rows[0][idx("registration_date")], json!(""));
        assert_eq!(out.rows[0][idx("attendance_count")], json!(0));
    }

    #[test]
    fn month_label_mapping_spans_the_year_boundary() {
        assert_eq!(month_label_for(7), Some("July_2025"));
        assert_eq!(month_label_for(12), Some("December_2025"));
        assert_eq!(month_label_for(1), Some("January_2026"));
        assert_eq!(month_label_for(6), Some("June_2026"));
        assert_eq!(month_label_for(0), None);
        assert_eq!(month_label_for(13), None);
    }

    #[test]
    fn boolish_accepts_locale_tokens() {
        for t in ["true", "Yes", "1", "y", "paid", "✅", "نعم", "صح", "مدفوع"] {
            assert!(coerce_bool(&json!(t)), "expected true for {t}");
        }
        for t in ["", "no", "false", "0", "❌", "لا"] {
            assert!(!coerce_bool(&json!(t)), "expected false for {t}");
        }
        assert!(coerce_bool(&json!(1)));
        assert!(!coerce_bool(&json!(0)));
    }
}
