// Primitives for reading CSV files.

use std::fs::File;

use crate::election::{io_common::simplify_file_name, *};

/// Reads a ballot file in CSV format.
///
/// The first record holds the candidate names, every other record is a ballot.
/// Records may be shorter or longer than the header.
pub fn read_csv_source(path: &str) -> VoteSysResult<RawSource> {
    let mut records = get_records(path)?;
    let header: Vec<String> = match records.next() {
        Some(line_r) => line_r
            .context(SourceUnavailableSnafu { path })?
            .iter()
            .map(|s| s.trim().to_string())
            .collect(),
        None => return EmptySourceSnafu { path }.fail(),
    };
    debug!("read_csv_source: {:?}: header: {:?}", path, header);

    let source = simplify_file_name(path);
    let mut rows: Vec<RawRow> = Vec::new();
    for (idx, line_r) in records.enumerate() {
        // The header is on line 1.
        let lineno = idx + 2;
        let line = line_r.context(SourceUnavailableSnafu { path })?;
        let cells: Vec<String> = line.iter().map(|s| s.to_string()).collect();
        debug!("read_csv_source: {}:{}: {:?}", source, lineno, cells);
        rows.push(RawRow { lineno, cells });
    }
    info!(
        "read_csv_source: {:?}: {} candidates, {} ballots",
        path,
        header.len(),
        rows.len()
    );
    Ok(RawSource {
        path: path.to_string(),
        header,
        rows,
    })
}

fn get_records(path: &str) -> VoteSysResult<csv::StringRecordsIntoIter<File>> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(SourceUnavailableSnafu { path })?;
    Ok(rdr.into_records())
}
