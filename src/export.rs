use crate::model::{self, StudentRecord};
use crate::schema::CANONICAL_COLUMNS;

/// Render a group as delimited text for spreadsheet tools. The byte-order
/// marker keeps Excel from mangling the UTF-8; month flags export as
/// human-readable paid/unpaid tokens rather than raw booleans.
pub fn group_csv(records: &[StudentRecord]) -> String {
    let mut csv = String::from("\u{feff}");
    csv.push_str(
        &CANONICAL_COLUMNS
            .iter()
            .map(|c| csv_quote(c))
            .collect::<Vec<_>>()
            .join(","),
    );
    csv.push('\n');

    for rec in records {
        let mut fields: Vec<String> = vec![
            csv_quote(&rec.code),
            csv_quote(&rec.name),
            csv_quote(&rec.phone),
            csv_quote(&rec.guardian_phone),
            rec.attendance_count.to_string(),
            csv_quote(&model::join_entries(&rec.attendance_dates)),
        ];
        for paid in rec.months_paid {
            fields.push(if paid { "paid" } else { "unpaid" }.to_string());
        }
        fields.push(
            rec.registration_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
        );
        fields.push(csv_quote(&rec.notes));
        fields.push(csv_quote(&model::join_entries(&rec.test_results)));
        csv.push_str(&fields.join(","));
        csv.push('\n');
    }
    csv
}

fn csv_quote(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
