// Primitives for reading Excel (.xlsx) files.

use calamine::{open_workbook, DataType, Range, Reader, Xlsx};

use crate::election::*;

/// Reads a ballot file in Excel format. The layout is the same as for CSV
/// files: candidate names on the first row, one ballot per row after that.
pub fn read_excel_source(path: &str, worksheet_name: Option<&str>) -> VoteSysResult<RawSource> {
    let wrange = get_range(path, worksheet_name)?;
    let mut iter = wrange.rows();
    let header: Vec<String> = iter
        .next()
        .context(EmptySourceSnafu { path })?
        .iter()
        .map(|c| cell_to_string(c).map(|s| s.trim().to_string()))
        .collect::<VoteSysResult<Vec<String>>>()?;
    debug!("read_excel_source: {:?}: header: {:?}", path, header);

    let mut rows: Vec<RawRow> = Vec::new();
    for (idx, row) in iter.enumerate() {
        let lineno = idx + 2;
        let cells: Vec<String> = row
            .iter()
            .map(cell_to_string)
            .collect::<VoteSysResult<Vec<String>>>()?;
        debug!("read_excel_source: {}: {:?}", lineno, cells);
        rows.push(RawRow { lineno, cells });
    }
    // Trailing cells of a sheet are empty when other rows are wider.
    let width = header.len();
    for row in rows.iter_mut() {
        while row.cells.len() > width && row.cells.last().map(|c| c.is_empty()) == Some(true) {
            row.cells.pop();
        }
    }
    Ok(RawSource {
        path: path.to_string(),
        header,
        rows,
    })
}

fn get_range(path: &str, worksheet_name: Option<&str>) -> VoteSysResult<Range<DataType>> {
    debug!("get_range: path: {:?} worksheet: {:?}", path, worksheet_name);
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;
    let wrange = match worksheet_name {
        Some(name) => workbook.worksheet_range(name),
        None => workbook.worksheet_range_at(0),
    };
    wrange
        .context(EmptySourceSnafu { path })?
        .context(OpeningExcelSnafu { path })
}

fn cell_to_string(cell: &DataType) -> VoteSysResult<String> {
    match cell {
        DataType::Empty => Ok("".to_string()),
        DataType::String(s) => Ok(s.clone()),
        DataType::Int(i) => Ok(i.to_string()),
        DataType::Float(f) if f.fract() == 0.0 => Ok(format!("{}", *f as i64)),
        DataType::Float(f) => Ok(f.to_string()),
        DataType::Bool(b) => Ok(b.to_string()),
        _ => whatever!("cell_to_string: could not understand cell {:?}", cell),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_as_text() {
        assert_eq!(cell_to_string(&DataType::Empty).unwrap(), "");
        assert_eq!(cell_to_string(&DataType::Float(1.0)).unwrap(), "1");
        assert_eq!(cell_to_string(&DataType::Float(2.5)).unwrap(), "2.5");
        assert_eq!(cell_to_string(&DataType::Int(3)).unwrap(), "3");
        assert_eq!(
            cell_to_string(&DataType::String("Anna".to_string())).unwrap(),
            "Anna"
        );
    }

    #[test]
    fn missing_workbook() {
        assert!(matches!(
            read_excel_source("/this/file/does/not/exist.xlsx", None),
            Err(VoteSysError::OpeningExcel { .. })
        ));
    }
}
