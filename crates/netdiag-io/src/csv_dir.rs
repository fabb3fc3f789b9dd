//! CSV directory reader.
//!
//! One file per collection (`buses.csv`, `lines.csv`, ...). The optional
//! `loads-p_set.csv` is picked up when present.

use crate::loader::{LOAD_SERIES, REQUIRED};
use crate::series::FlowSeries;
use crate::table::{Table, TableSet};
use netdiag_core::{LoadDiagnostics, NetdiagError, NetdiagResult, Network};
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// Read a single CSV file into a table. The header row is required; rows
/// may be ragged.
pub fn read_table(path: &Path) -> NetdiagResult<Table> {
    let file = File::open(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| csv_error(path, e))?
        .iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
    let mut table = Table::new(headers);
    for record in reader.records() {
        let record = record.map_err(|e| csv_error(path, e))?;
        table.push_row(record.iter());
    }
    debug!(path = %path.display(), rows = table.len(), "csv table read");
    Ok(table)
}

/// Read every collection of a network from `dir`.
///
/// A missing required file is a schema error naming the collection.
pub fn read_table_dir(dir: &Path) -> NetdiagResult<TableSet> {
    if !dir.is_dir() {
        return Err(NetdiagError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("'{}' is not a directory", dir.display()),
        )));
    }

    let mut set = TableSet::new();
    for (name, _) in REQUIRED {
        let path = dir.join(format!("{name}.csv"));
        if !path.is_file() {
            return Err(NetdiagError::missing_table(name));
        }
        set.insert(name, read_table(&path)?);
    }

    let series = dir.join(format!("{LOAD_SERIES}.csv"));
    if series.is_file() {
        set.insert(LOAD_SERIES, read_table(&series)?);
    }
    Ok(set)
}

/// Read an observed-flow CSV for an already loaded network.
pub fn read_flow_series(
    path: &Path,
    network: &Network,
    diag: &mut LoadDiagnostics,
) -> NetdiagResult<FlowSeries> {
    let table = read_table(path)?;
    Ok(FlowSeries::from_table(&table, network, diag))
}

fn csv_error(path: &Path, err: csv::Error) -> NetdiagError {
    NetdiagError::Parse(format!("{}: {err}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{BUSES, STORES};
    use std::fs;
    use tempfile::tempdir;

    fn write_required(dir: &Path) {
        for (name, columns) in REQUIRED {
            fs::write(dir.join(format!("{name}.csv")), format!("{}\n", columns.join(","))).unwrap();
        }
    }

    #[test]
    fn test_read_table_trims_and_pads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("buses.csv");
        fs::write(&path, "name, carrier\nDE0 0 , AC\nFR0 0\n").unwrap();

        let table = read_table(&path).unwrap();
        assert_eq!(table.columns, vec!["name", "carrier"]);
        assert_eq!(table.rows[0], vec!["DE0 0", "AC"]);
        assert_eq!(table.rows[1], vec!["FR0 0", ""]);
    }

    #[test]
    fn test_read_dir_with_optional_series() {
        let dir = tempdir().unwrap();
        write_required(dir.path());
        fs::write(
            dir.path().join("loads-p_set.csv"),
            "snapshot,L\n2030-01-01,5\n",
        )
        .unwrap();

        let set = read_table_dir(dir.path()).unwrap();
        assert!(set.get(BUSES).unwrap().is_empty());
        assert_eq!(set.get(LOAD_SERIES).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_file_names_collection() {
        let dir = tempdir().unwrap();
        write_required(dir.path());
        fs::remove_file(dir.path().join("stores.csv")).unwrap();

        let err = read_table_dir(dir.path()).unwrap_err();
        assert!(matches!(err, NetdiagError::Schema { .. }));
        assert!(err.to_string().contains(STORES));
    }

    #[test]
    fn test_not_a_directory() {
        let dir = tempdir().unwrap();
        let err = read_table_dir(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, NetdiagError::Io(_)));
    }
}
