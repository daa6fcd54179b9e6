//! Flat, row-oriented export of a submission collection.
//!
//! One header row, then one row per submission. [`to_csv`] renders rows as
//! RFC 4180 CSV with CRLF line endings.

use crate::types::SubmissionRef;
use std::borrow::Cow;

/// Column titles of the first row
pub const HEADER: [&str; 4] = ["Owner", "Identifier", "File Count", "Files"];

/// Separator between file names in the "Files" column
const FILE_NAME_SEPARATOR: &str = "; ";

/// Header row followed by one row per submission, in input order.
///
/// Submissions without files still get a row (count 0, empty file list).
pub fn rows(submissions: &[SubmissionRef]) -> Vec<Vec<String>> {
    std::iter::once(HEADER.iter().map(|h| h.to_string()).collect::<Vec<_>>())
        .chain(submissions.iter().map(|submission| {
            let file_names: Vec<&str> = submission
                .files
                .iter()
                .map(|f| f.display_name.as_str())
                .collect();
            vec![
                submission.owner_display_name.clone(),
                submission.owner_identifier.clone(),
                submission.files.len().to_string(),
                file_names.join(FILE_NAME_SEPARATOR),
            ]
        }))
        .collect()
}

/// Render rows as CSV
pub fn to_csv(rows: &[Vec<String>]) -> String {
    let mut out = String::new();
    for row in rows {
        let line: Vec<Cow<'_, str>> = row.iter().map(|field| escape_field(field)).collect();
        out.push_str(&line.join(","));
        out.push_str("\r\n");
    }
    out
}

fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\r', '\n']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}
