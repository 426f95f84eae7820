//! Filesystem persistence for tables as plain CSV.
//!
//! Comma separated, first non-blank line is the header, no quoting. Cells are
//! trimmed on read.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::common::error::{PipelineError, PipelineResult};

use super::domain::Table;

fn split_line(line: &str) -> Vec<String> {
    line.split(',').map(|c| c.trim().to_string()).collect()
}

/// Read a CSV file into a [`Table`].
pub fn read_table(path: &Path) -> PipelineResult<Table> {
    if !path.exists() {
        return Err(PipelineError::MissingInput(path.to_path_buf()));
    }
    let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
    let reader = BufReader::new(file);

    let mut columns: Option<Vec<String>> = None;
    let mut rows = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| PipelineError::io(path, e))?;
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        let cells = split_line(line);
        match &columns {
            None => columns = Some(cells),
            Some(header) if header.len() != cells.len() => {
                return Err(PipelineError::invalid(format!(
                    "{}:{}: {} cells, header has {}",
                    path.display(),
                    lineno + 1,
                    cells.len(),
                    header.len()
                )));
            }
            Some(_) => rows.push(cells),
        }
    }

    let columns = columns
        .ok_or_else(|| PipelineError::invalid(format!("{}: no header row", path.display())))?;
    Table::new(columns, rows)
}

/// Write a [`Table`] as CSV, creating parent directories.
pub fn write_table(path: &Path, table: &Table) -> PipelineResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
    }
    let file = File::create(path).map_err(|e| PipelineError::io(path, e))?;
    let mut out = BufWriter::new(file);

    writeln!(out, "{}", table.columns.join(",")).map_err(|e| PipelineError::io(path, e))?;
    for row in &table.rows {
        writeln!(out, "{}", row.join(",")).map_err(|e| PipelineError::io(path, e))?;
    }
    out.flush().map_err(|e| PipelineError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::error::ErrorCode;

    #[test]
    fn reads_header_skips_blank_lines_and_crlf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        fs::write(&path, "a, b\r\n1,2\r\n\r\n3 ,na\r\n").unwrap();

        let t = read_table(&path).unwrap();
        assert_eq!(t.columns, vec!["a", "b"]);
        assert_eq!(t.rows, vec![vec!["1", "2"], vec!["3", "na"]]);
    }

    #[test]
    fn ragged_line_reports_position() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        fs::write(&path, "a,b\n1,2\n3\n").unwrap();

        let err = read_table(&path).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidData);
        assert!(err.to_string().contains(":3:"));
    }

    #[test]
    fn empty_file_has_no_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        fs::write(&path, "\n\n").unwrap();
        assert_eq!(read_table(&path).unwrap_err().code(), ErrorCode::InvalidData);
    }

    #[test]
    fn written_tables_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.csv");
        let t = Table::new(
            vec!["x".into(), "y".into()],
            vec![vec!["1".into(), "".into()]],
        )
        .unwrap();
        write_table(&path, &t).unwrap();
        assert_eq!(read_table(&path).unwrap(), t);
    }
}
