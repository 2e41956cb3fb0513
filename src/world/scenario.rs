//! Scenario text format
//!
//! ```text
//! rows cols
//! 0120...
//! ```
//! One header line, then `rows` lines of exactly `cols` cell digits.

use super::cell::CellKind;
use thiserror::Error;

/// Errors raised while reading a scenario.  No partial grid is ever returned.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("scenario I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("scenario is missing its `rows cols` header")]
    MissingHeader,

    #[error("invalid scenario header {line:?}: expected `rows cols`")]
    InvalidHeader { line: String },

    #[error("scenario grid must have at least one row and one column")]
    EmptyGrid,

    #[error("expected {expected} grid rows, found {found}")]
    RowCount { expected: usize, found: usize },

    #[error("row {row} has {found} cells, expected {expected}")]
    RowLength {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("invalid cell {found:?} at row {row}, column {col}")]
    InvalidCell { row: usize, col: usize, found: char },
}

/// Parsed scenario: dimensions plus row-major cells.
pub(crate) struct Scenario {
    pub rows: usize,
    pub cols: usize,
    pub cells: Vec<CellKind>,
}

pub(crate) fn parse(text: &str) -> Result<Scenario, ScenarioError> {
    let mut lines = text.lines();

    let header = lines.next().ok_or(ScenarioError::MissingHeader)?;
    if header.trim().is_empty() {
        return Err(ScenarioError::MissingHeader);
    }
    let invalid_header = || ScenarioError::InvalidHeader {
        line: header.to_string(),
    };
    let dims: Vec<&str> = header.split_whitespace().collect();
    let [rows, cols] = dims.as_slice() else {
        return Err(invalid_header());
    };
    let rows: usize = rows.parse().map_err(|_| invalid_header())?;
    let cols: usize = cols.parse().map_err(|_| invalid_header())?;
    if rows == 0 || cols == 0 {
        return Err(ScenarioError::EmptyGrid);
    }

    // Trailing blank lines are tolerated, interior ones are not.
    let body: Vec<&str> = lines.collect();
    let used = body
        .iter()
        .rposition(|line| !line.trim().is_empty())
        .map_or(0, |last| last + 1);
    if used != rows {
        return Err(ScenarioError::RowCount {
            expected: rows,
            found: used,
        });
    }

    // Header values are untrusted; the buffer only grows with validated rows.
    let mut cells = Vec::new();
    for (row, line) in body[..used].iter().enumerate() {
        let line = line.trim_end_matches('\r');
        let found = line.chars().count();
        if found != cols {
            return Err(ScenarioError::RowLength {
                row,
                expected: cols,
                found,
            });
        }
        for (col, c) in line.chars().enumerate() {
            let kind = CellKind::from_digit(c)
                .ok_or(ScenarioError::InvalidCell { row, col, found: c })?;
            cells.push(kind);
        }
    }

    Ok(Scenario { rows, cols, cells })
}

pub(crate) fn render(rows: usize, cols: usize, cells: &[CellKind]) -> String {
    let mut out = String::with_capacity(16 + rows * (cols + 1));
    out.push_str(&format!("{} {}\n", rows, cols));
    for row in cells.chunks(cols) {
        out.extend(row.iter().map(|c| c.to_digit()));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_grid() {
        let s = parse("2 3\n012\n330\n").unwrap();
        assert_eq!((s.rows, s.cols), (2, 3));
        assert_eq!(s.cells[1], CellKind::Fire);
        assert_eq!(s.cells[3], CellKind::Tree);
        assert_eq!(render(s.rows, s.cols, &s.cells), "2 3\n012\n330\n");
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(matches!(parse(""), Err(ScenarioError::MissingHeader)));
        assert!(matches!(
            parse("two 3\n012\n"),
            Err(ScenarioError::InvalidHeader { .. })
        ));
        assert!(matches!(parse("0 3\n"), Err(ScenarioError::EmptyGrid)));
        assert!(matches!(
            parse("2 3\n012\n"),
            Err(ScenarioError::RowCount { expected: 2, found: 1 })
        ));
        assert!(matches!(
            parse("2 3\n012\n33\n"),
            Err(ScenarioError::RowLength { row: 1, .. })
        ));
        assert!(matches!(
            parse("1 3\n092\n"),
            Err(ScenarioError::InvalidCell { row: 0, col: 1, found: '9' })
        ));
    }

    #[test]
    fn oversized_header_is_an_error() {
        assert!(matches!(
            parse("2 9223372036854775807\n0\n0\n"),
            Err(ScenarioError::RowLength { row: 0, found: 1, .. })
        ));
        assert!(matches!(
            parse("18446744073709551615 18446744073709551615\n0\n"),
            Err(ScenarioError::RowCount { found: 1, .. })
        ));
        assert!(matches!(
            parse("1 99999999999999999999999\n0\n"),
            Err(ScenarioError::InvalidHeader { .. })
        ));
    }

    #[test]
    fn tolerates_crlf_and_trailing_blank_lines() {
        let s = parse("1 2\r\n21\r\n\n").unwrap();
        assert_eq!(s.cells, vec![CellKind::Water, CellKind::Fire]);
    }
}
