// Primitives shared by the readers: turning the cells of a row into a ballot.

use std::path::Path;

use crate::election::*;

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

/// The column marked with "1" on a plurality row, if any.
///
/// Only the first mark counts. A row with several marks is suspicious and is
/// reported.
pub fn plurality_choice(source: &str, lineno: usize, cells: &[String]) -> Option<u32> {
    let marked: Vec<u32> = cells
        .iter()
        .enumerate()
        .filter(|(_, c)| c.trim() == "1")
        .map(|(idx, _)| idx as u32)
        .collect();
    for (idx, cell) in cells.iter().enumerate() {
        let content = cell.trim();
        if !content.is_empty() && content != "1" {
            warn!(
                "plurality_choice: {}:{}: ignoring cell {:?} in column {}",
                source, lineno, content, idx
            );
        }
    }
    if marked.len() > 1 {
        warn!(
            "plurality_choice: {}:{}: {} columns are marked, only column {} is counted",
            source,
            lineno,
            marked.len(),
            marked[0]
        );
    }
    marked.first().cloned()
}

/// The (column, rank) pairs of a ranked row. Blank cells are skipped.
pub fn parse_ranks(
    source: &str,
    lineno: usize,
    cells: &[String],
) -> VoteSysResult<Vec<(u32, u32)>> {
    let mut res: Vec<(u32, u32)> = Vec::new();
    for (idx, cell) in cells.iter().enumerate() {
        let content = cell.trim();
        if content.is_empty() {
            continue;
        }
        let rank = content
            .parse::<u32>()
            .ok()
            .filter(|r| *r > 0)
            .context(InvalidRankSnafu {
                path: source.to_string(),
                lineno,
                column: idx,
                content: content.to_string(),
            })?;
        res.push((idx as u32, rank));
    }
    Ok(res)
}

/// The columns in order of preference. Equal ranks are kept in column order,
/// and gaps in the ranks are closed.
pub fn assemble_preferences(ranks: &[(u32, u32)]) -> Vec<u32> {
    let mut sorted: Vec<(u32, u32)> = ranks.to_vec();
    sorted.sort_by_key(|(column, rank)| (*rank, *column));
    sorted.iter().map(|(column, _)| *column).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn file_names() {
        assert_eq!(simplify_file_name("/tmp/data/ballots.csv"), "ballots.csv");
        assert_eq!(simplify_file_name("ballots.csv"), "ballots.csv");
    }

    #[test]
    fn plurality_marks() {
        assert_eq!(plurality_choice("f", 2, &row(&["", "", "1", ""])), Some(2));
        assert_eq!(plurality_choice("f", 2, &row(&[" 1 ", ""])), Some(0));
        assert_eq!(plurality_choice("f", 2, &row(&["", "1", "1"])), Some(1));
        assert_eq!(plurality_choice("f", 2, &row(&["", "", ""])), None);
        assert_eq!(plurality_choice("f", 2, &row(&[])), None);
        assert_eq!(plurality_choice("f", 2, &row(&["x", "2"])), None);
    }

    #[test]
    fn ranks_skip_blank_cells() {
        let ranks = parse_ranks("f", 3, &row(&["2", "", " 1", ""])).unwrap();
        assert_eq!(ranks, vec![(0, 2), (2, 1)]);
        assert_eq!(assemble_preferences(&ranks), vec![2, 0]);
    }

    #[test]
    fn ranks_must_be_positive_integers() {
        let err = parse_ranks("f", 3, &row(&["1", "0"])).unwrap_err();
        assert!(matches!(
            err,
            VoteSysError::InvalidRank {
                lineno: 3,
                column: 1,
                ..
            }
        ));
        assert!(parse_ranks("f", 4, &row(&["first"])).is_err());
        assert!(parse_ranks("f", 4, &row(&["-1"])).is_err());
    }

    #[test]
    fn preferences_with_gaps_and_equal_ranks() {
        // Ranks 1 and 3, no 2.
        assert_eq!(assemble_preferences(&[(0, 3), (1, 1)]), vec![1, 0]);
        // Two columns share rank 1.
        assert_eq!(assemble_preferences(&[(2, 1), (0, 1), (1, 2)]), vec![0, 2, 1]);
        assert!(assemble_preferences(&[]).is_empty());
    }
}
