//! Per-scanner append-only result table (spec §4.2).
//!
//! Header layout: `PREFIX_HEADERS + scanner.headers + (meta? LOCAL_HEADERS +
//! (remote? REMOTE_HEADERS : []) : [])`. Writes are thread-safe: domain
//! tasks for the same scanner serialize on a per-table lock; tables for
//! different scanners never contend (scanners run sequentially anyway,
//! spec §5).

use crate::error::ScanResult;
use parking_lot::Mutex;
use std::fs::File;
use std::path::{Path, PathBuf};

pub const PREFIX_HEADERS: [&str; 2] = ["Domain", "Base Domain"];
pub const LOCAL_HEADERS: [&str; 4] = [
    "Local Errors",
    "Local Start Time",
    "Local End Time",
    "Local Duration",
];
pub const REMOTE_HEADERS: [&str; 7] = [
    "Request ID",
    "Log Group Name",
    "Log Stream Name",
    "Start Time",
    "End Time",
    "Memory Limit",
    "Measured Duration",
];

enum Sink {
    /// Streams rows straight to the CSV writer as they arrive.
    Streaming(csv::Writer<File>),
    /// Buffers rows in memory so they can be sorted by Domain before the
    /// table is closed (spec §4.2 "optional stable-order mode").
    Buffered {
        path: PathBuf,
        header: Vec<String>,
        rows: Vec<Vec<String>>,
    },
}

/// An open output table for one scanner.
pub struct RowWriter {
    sink: Mutex<Sink>,
}

impl RowWriter {
    /// Opens (truncating) `<results_dir>/<scanner_name>.csv` and writes the
    /// header immediately.
    pub fn open(
        results_dir: &Path,
        scanner_name: &str,
        scanner_headers: &[String],
        meta_enabled: bool,
        remote_enabled: bool,
        sort: bool,
    ) -> ScanResult<Self> {
        let header = build_header(scanner_headers, meta_enabled, remote_enabled);
        std::fs::create_dir_all(results_dir)?;
        let path = results_dir.join(format!("{scanner_name}.csv"));

        let sink = if sort {
            Sink::Buffered {
                path,
                header,
                rows: Vec::new(),
            }
        } else {
            let file = File::create(&path)?;
            let mut writer = csv::Writer::from_writer(file);
            writer.write_record(&header)?;
            writer.flush()?;
            Sink::Streaming(writer)
        };

        Ok(Self {
            sink: Mutex::new(sink),
        })
    }

    /// Appends one row. `cells` must already be `[domain, base_domain] +
    /// scanner row + meta cells`, matching the header this table was
    /// opened with.
    pub fn write_row(&self, cells: &[String]) -> ScanResult<()> {
        let mut guard = self.sink.lock();
        match &mut *guard {
            Sink::Streaming(writer) => {
                writer.write_record(cells)?;
                writer.flush()?;
            }
            Sink::Buffered { rows, .. } => {
                rows.push(cells.to_vec());
            }
        }
        Ok(())
    }

    /// Closes the table, sorting lexicographically by Domain first if this
    /// table was opened in sort mode.
    pub fn close(self) -> ScanResult<()> {
        match self.sink.into_inner() {
            Sink::Streaming(mut writer) => {
                writer.flush()?;
                Ok(())
            }
            Sink::Buffered { path, header, mut rows } => {
                rows.sort_by(|a, b| a[0].cmp(&b[0]));
                let file = File::create(&path)?;
                let mut writer = csv::Writer::from_writer(file);
                writer.write_record(&header)?;
                for row in rows {
                    writer.write_record(&row)?;
                }
                writer.flush()?;
                Ok(())
            }
        }
    }
}

fn build_header(scanner_headers: &[String], meta_enabled: bool, remote_enabled: bool) -> Vec<String> {
    let mut header: Vec<String> = PREFIX_HEADERS.iter().map(|s| s.to_string()).collect();
    header.extend(scanner_headers.iter().cloned());
    if meta_enabled {
        header.extend(LOCAL_HEADERS.iter().map(|s| s.to_string()));
        if remote_enabled {
            header.extend(REMOTE_HEADERS.iter().map(|s| s.to_string()));
        }
    }
    header
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_csv(path: &Path) -> Vec<Vec<String>> {
        let mut reader = csv::Reader::from_path(path).unwrap();
        let mut out = vec![reader.headers().unwrap().iter().map(|s| s.to_string()).collect()];
        for record in reader.records() {
            out.push(record.unwrap().iter().map(|s| s.to_string()).collect());
        }
        out
    }

    #[test]
    fn header_matches_spec_layout_with_meta_and_remote() {
        let dir = tempfile::tempdir().unwrap();
        let headers = vec!["OK".to_string()];
        let writer = RowWriter::open(dir.path(), "noop", &headers, true, true, false).unwrap();
        writer.close().unwrap();

        let rows = read_csv(&dir.path().join("noop.csv"));
        assert_eq!(
            rows[0],
            vec![
                "Domain",
                "Base Domain",
                "OK",
                "Local Errors",
                "Local Start Time",
                "Local End Time",
                "Local Duration",
                "Request ID",
                "Log Group Name",
                "Log Stream Name",
                "Start Time",
                "End Time",
                "Memory Limit",
                "Measured Duration",
            ]
        );
    }

    #[test]
    fn header_without_meta_is_just_prefix_plus_scanner_columns() {
        let dir = tempfile::tempdir().unwrap();
        let headers = vec!["OK".to_string()];
        let writer = RowWriter::open(dir.path(), "noop", &headers, false, false, false).unwrap();
        writer.close().unwrap();

        let rows = read_csv(&dir.path().join("noop.csv"));
        assert_eq!(rows[0], vec!["Domain", "Base Domain", "OK"]);
    }

    #[test]
    fn sort_mode_orders_rows_lexicographically_by_domain() {
        let dir = tempfile::tempdir().unwrap();
        let headers = vec!["OK".to_string()];
        let writer = RowWriter::open(dir.path(), "noop", &headers, false, false, true).unwrap();
        writer
            .write_row(&["zeta.com".to_string(), "zeta.com".to_string(), "true".to_string()])
            .unwrap();
        writer
            .write_row(&["alpha.com".to_string(), "alpha.com".to_string(), "true".to_string()])
            .unwrap();
        writer.close().unwrap();

        let rows = read_csv(&dir.path().join("noop.csv"));
        assert_eq!(rows[1][0], "alpha.com");
        assert_eq!(rows[2][0], "zeta.com");
    }

    #[test]
    fn opening_truncates_an_existing_table() {
        let dir = tempfile::tempdir().unwrap();
        let headers = vec!["OK".to_string()];
        let writer = RowWriter::open(dir.path(), "noop", &headers, false, false, false).unwrap();
        writer
            .write_row(&["a.com".to_string(), "a.com".to_string(), "true".to_string()])
            .unwrap();
        writer.close().unwrap();

        let writer2 = RowWriter::open(dir.path(), "noop", &headers, false, false, false).unwrap();
        writer2.close().unwrap();

        let rows = read_csv(&dir.path().join("noop.csv"));
        assert_eq!(rows.len(), 1);
    }
}
