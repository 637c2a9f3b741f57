//! Tabular layout reconstruction from recognized text.
//!
//! Two entry points: [`from_delimited`] for the engine's tab-separated layout
//! dump, and [`from_implicit`] for plain text whose columns survive only as
//! runs of aligned spaces. Both are total: malformed or too-short input
//! yields `None`, never an error, because the input is best-effort OCR text.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Output format for reconstructed tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableFormat {
    /// Cells joined by two spaces.
    Plain,
    /// Pipe-delimited with a dashed header separator.
    Markdown,
    /// RFC 4180 style quoting.
    Csv,
    /// Width-aligned columns joined with `" | "`, numbers right-aligned.
    #[default]
    Formatted,
}

static NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d+(\.\d+)?$").expect("number pattern should compile"));

/// Reconstruct a table from tab-separated rows.
///
/// Returns `None` when there are fewer than two non-blank rows. Rows without
/// any tab fall back to [`from_implicit`] on the whole text.
pub fn from_delimited(tsv: &str, format: TableFormat) -> Option<String> {
    let rows: Vec<&str> = tsv.lines().filter(|row| !row.trim().is_empty()).collect();
    if rows.len() <= 1 {
        return None;
    }

    if !rows.iter().any(|row| row.contains('\t')) {
        return from_implicit(&rows.join("\n"));
    }

    // Column count comes from the first row; extra cells in later rows are
    // carried through unpadded.
    let column_count = rows[0].split('\t').count();
    let mut widths = vec![0usize; column_count];
    for row in &rows {
        for (i, cell) in row.split('\t').enumerate().take(column_count) {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let clean_rows: Vec<&str> = rows
        .iter()
        .copied()
        .filter(|row| row.split('\t').any(|cell| !cell.trim().is_empty()))
        .collect();
    if clean_rows.len() <= 1 {
        return None;
    }

    let rendered = match format {
        TableFormat::Plain => clean_rows
            .iter()
            .map(|row| row.split('\t').collect::<Vec<_>>().join("  "))
            .collect::<Vec<_>>()
            .join("\n"),

        TableFormat::Markdown => {
            let mut out = String::new();
            out.push_str(&format!(
                "| {} |\n",
                clean_rows[0].split('\t').collect::<Vec<_>>().join(" | ")
            ));
            let separator: Vec<String> = widths.iter().map(|w| "-".repeat((*w).max(3))).collect();
            out.push_str(&format!("| {} |\n", separator.join(" | ")));
            for row in &clean_rows[1..] {
                out.push_str(&format!(
                    "| {} |\n",
                    row.split('\t').collect::<Vec<_>>().join(" | ")
                ));
            }
            out
        }

        TableFormat::Csv => clean_rows
            .iter()
            .map(|row| {
                row.split('\t')
                    .map(quote_csv_cell)
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .collect::<Vec<_>>()
            .join("\n"),

        TableFormat::Formatted => {
            let grid: Vec<Vec<String>> = clean_rows
                .iter()
                .map(|row| row.split('\t').map(str::to_string).collect())
                .collect();
            render_aligned(&grid, &widths)
        }
    };

    Some(rendered)
}

/// Reconstruct a table from text with no explicit delimiter.
///
/// Column boundaries are positions where content resumes after a run of
/// spaces, kept only when the same position recurs in at least 70% of the
/// lines. Returns `None` when no such position exists or there are fewer
/// than two non-blank lines.
pub fn from_implicit(text: &str) -> Option<String> {
    let lines: Vec<Vec<char>> = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.chars().collect())
        .collect();
    if lines.len() < 2 {
        return None;
    }

    let mut position_counts: std::collections::BTreeMap<usize, usize> = Default::default();
    for line in &lines {
        for (i, &ch) in line.iter().enumerate() {
            if ch != ' ' && i > 0 && line[i - 1] == ' ' {
                *position_counts.entry(i).or_insert(0) += 1;
            }
        }
    }

    let threshold = lines.len() as f32 * 0.7;
    let boundaries: Vec<usize> = position_counts
        .into_iter()
        .filter(|&(_, count)| count as f32 >= threshold)
        .map(|(pos, _)| pos)
        .collect();
    if boundaries.is_empty() {
        return None;
    }

    let mut grid: Vec<Vec<String>> = Vec::with_capacity(lines.len());
    for line in &lines {
        let mut row = Vec::new();
        let mut start = 0usize;
        for &pos in &boundaries {
            if pos > start {
                let cell: String = line[start.min(line.len())..pos.min(line.len())].iter().collect();
                row.push(cell.trim().to_string());
                start = pos;
            }
        }
        if start < line.len() {
            let cell: String = line[start..].iter().collect();
            row.push(cell.trim().to_string());
        }
        grid.push(row);
    }

    let column_count = grid.iter().map(Vec::len).max()?;
    let mut widths = vec![0usize; column_count];
    for row in &grid {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    Some(render_aligned(&grid, &widths))
}

fn quote_csv_cell(cell: &str) -> String {
    if cell.contains(',') || cell.contains('"') {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

/// Width-aligned rendering shared by the `formatted` and implicit paths:
/// numeric cells right-aligned, text left-aligned, a `-+-` separator line
/// directly under the header row.
fn render_aligned(grid: &[Vec<String>], widths: &[usize]) -> String {
    let mut out = String::new();
    for (row_index, row) in grid.iter().enumerate() {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let width = widths.get(i).copied().unwrap_or(0);
                let len = cell.chars().count();
                let pad = " ".repeat(width.saturating_sub(len));
                if NUMBER_RE.is_match(cell.trim()) {
                    format!("{}{}", pad, cell)
                } else {
                    format!("{}{}", cell, pad)
                }
            })
            .collect();
        out.push_str(&cells.join(" | "));
        out.push('\n');

        if row_index == 0 {
            let dashes: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
            out.push_str(&dashes.join("-+-"));
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const TSV: &str = "Name\tAge\tCity\nBob\t30\tParis\nAnn\t27\tOslo";

    #[test]
    fn test_delimited_too_few_rows() {
        assert!(from_delimited("only one row\t1", TableFormat::Plain).is_none());
        assert!(from_delimited("", TableFormat::Plain).is_none());
    }

    #[test]
    fn test_delimited_plain() {
        let out = from_delimited(TSV, TableFormat::Plain).unwrap();
        assert_eq!(out, "Name  Age  City\nBob  30  Paris\nAnn  27  Oslo");
    }

    #[test]
    fn test_delimited_markdown() {
        let out = from_delimited(TSV, TableFormat::Markdown).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "| Name | Age | City |");
        // Age column is 3 wide but the separator floor is 3 dashes.
        assert_eq!(lines[1], "| ---- | --- | ----- |");
        assert_eq!(lines[2], "| Bob | 30 | Paris |");
    }

    #[test]
    fn test_delimited_csv_quoting() {
        let tsv = "item\tnote\nbolt\tsmall, M4\nrod\tsays \"long\"";
        let out = from_delimited(tsv, TableFormat::Csv).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[1], "bolt,\"small, M4\"");
        assert_eq!(lines[2], "rod,\"says \"\"long\"\"\"");
    }

    #[test]
    fn test_delimited_csv_grid_roundtrip() {
        let out = from_delimited(TSV, TableFormat::Csv).unwrap();
        let grid: Vec<Vec<&str>> = out.lines().map(|l| l.split(',').collect()).collect();
        assert_eq!(grid[0], ["Name", "Age", "City"]);
        assert_eq!(grid[1], ["Bob", "30", "Paris"]);
        assert_eq!(grid[2], ["Ann", "27", "Oslo"]);
    }

    #[test]
    fn test_delimited_formatted_alignment() {
        let out = from_delimited(TSV, TableFormat::Formatted).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "Name | Age | City ");
        assert_eq!(lines[1], "-----+-----+------");
        // Numbers right-aligned within the 3-wide Age column.
        assert_eq!(lines[2], "Bob  |  30 | Paris");
    }

    #[test]
    fn test_delimited_no_tabs_falls_back_to_implicit() {
        let text = "Name   Age\nBob    30";
        let out = from_delimited(text, TableFormat::Formatted).unwrap();
        assert!(out.contains('|'));
    }

    #[test]
    fn test_implicit_aligned_columns() {
        let out = from_implicit("Name   Age\nBob    30").unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("Name"));
        assert!(lines[0].contains('|'));
        assert!(lines[1].contains("-+-"));
        assert!(lines[2].contains("Bob"));
        assert!(lines[2].contains("30"));
    }

    #[test]
    fn test_implicit_prose_is_not_a_table() {
        let text = "This is an ordinary sentence of prose.\nAnd another one follows it here.";
        assert!(from_implicit(text).is_none());
    }

    #[test]
    fn test_implicit_single_line() {
        assert!(from_implicit("Name   Age").is_none());
    }

    #[test]
    fn test_implicit_number_alignment() {
        let out = from_implicit("Item  Qty\nBolt  100\nNut   77").unwrap();
        // Numeric column is right-aligned: padded digits end the data lines.
        for line in out.lines().skip(2) {
            assert!(line.chars().last().unwrap().is_ascii_digit());
        }
    }
}
