//! Tab-separated solver tables with name-or-position column lookup.
//!
//! Solver headers drift with the requested output options, so semantic
//! columns are looked up by a list of candidate names first (case-insensitive)
//! and by position only as a fallback.

use std::fs;
use std::path::Path;

use sal_core::forward_fill;

use crate::{ResultsError, ResultsResult};

pub const TIME_COLUMNS: [&str; 2] = ["step", "time"];
/// `step` in the solver's default column order.
pub const TIME_FALLBACK: usize = 5;
pub const PH_COLUMNS: [&str; 1] = ["pH"];
pub const PH_FALLBACK: usize = 6;
pub const REACTION_COLUMNS: [&str; 1] = ["reaction"];
pub const REACTION_FALLBACK: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct ResultTable {
    id: String,
    headers: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl ResultTable {
    /// Parse a table. Non-numeric cells become NaN; a missing header is an error.
    pub fn parse(id: &str, content: &str) -> ResultsResult<Self> {
        let mut lines = content
            .lines()
            .enumerate()
            .filter(|(_, l)| !l.trim().is_empty());
        let Some((_, header_line)) = lines.next() else {
            return Err(ResultsError::EmptyTable { table: id.to_string() });
        };

        let mut headers: Vec<String> = header_line.split('\t').map(|h| h.trim().to_string()).collect();
        while headers.last().is_some_and(|h| h.is_empty()) {
            headers.pop();
        }
        let mut columns = vec![Vec::new(); headers.len()];

        for (idx, line) in lines {
            let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
            let used = fields.iter().rposition(|f| !f.is_empty()).map_or(0, |p| p + 1);
            if used > headers.len() {
                return Err(ResultsError::Parse {
                    table: id.to_string(),
                    line: idx + 1,
                    message: format!("{used} fields for {} columns", headers.len()),
                });
            }
            for (col, values) in columns.iter_mut().enumerate() {
                let value = fields
                    .get(col)
                    .and_then(|f| f.parse::<f64>().ok())
                    .unwrap_or(f64::NAN);
                values.push(value);
            }
        }

        Ok(Self {
            id: id.to_string(),
            headers,
            columns,
        })
    }

    /// Read a table from disk; its id is the file name.
    pub fn from_file(path: &Path) -> ResultsResult<Self> {
        let id = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let content = fs::read_to_string(path)?;
        Self::parse(&id, &content)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn column(&self, index: usize) -> Option<&[f64]> {
        self.columns.get(index).map(Vec::as_slice)
    }

    fn missing(&self, candidates: &[&str], fallback: Option<usize>) -> ResultsError {
        ResultsError::MissingColumn {
            table: self.id.clone(),
            candidates: candidates.iter().map(|c| c.to_string()).collect(),
            fallback,
        }
    }

    fn fallback(&self, fallback: Option<usize>) -> Option<usize> {
        fallback.filter(|&i| i < self.headers.len())
    }

    /// Index of the first column named like one of `candidates`, in candidate
    /// order, else `fallback` if it is in range.
    pub fn column_index(&self, candidates: &[&str], fallback: Option<usize>) -> ResultsResult<usize> {
        candidates
            .iter()
            .find_map(|c| self.headers.iter().position(|h| h.eq_ignore_ascii_case(c)))
            .or_else(|| self.fallback(fallback))
            .ok_or_else(|| self.missing(candidates, fallback))
    }

    pub fn get_column(&self, candidates: &[&str], fallback: Option<usize>) -> ResultsResult<&[f64]> {
        let index = self.column_index(candidates, fallback)?;
        Ok(&self.columns[index])
    }

    /// First column whose name contains `mineral` (case-insensitive).
    pub fn find_phase_column(&self, mineral: &str, fallback: Option<usize>) -> ResultsResult<&[f64]> {
        let needle = mineral.to_lowercase();
        let index = self
            .headers
            .iter()
            .position(|h| h.to_lowercase().contains(&needle))
            .or_else(|| self.fallback(fallback))
            .ok_or_else(|| self.missing(&[mineral], fallback))?;
        Ok(&self.columns[index])
    }

    /// Local time axis, forward-filled from 0.
    pub fn time_series(&self) -> ResultsResult<Vec<f64>> {
        let raw = self.get_column(&TIME_COLUMNS, Some(TIME_FALLBACK))?;
        Ok(forward_fill(raw, 0.0))
    }

    /// Cumulative water removed [mol], as a magnitude.
    pub fn reaction_series(&self) -> ResultsResult<Vec<f64>> {
        let raw = self.get_column(&REACTION_COLUMNS, Some(REACTION_FALLBACK))?;
        Ok(forward_fill(raw, 0.0).into_iter().map(f64::abs).collect())
    }

    pub fn ph_series(&self) -> ResultsResult<Vec<f64>> {
        let raw = self.get_column(&PH_COLUMNS, Some(PH_FALLBACK))?;
        Ok(forward_fill(raw, f64::NAN))
    }

    /// Cumulative moles of a precipitated phase, forward-filled from 0.
    pub fn phase_series(&self, mineral: &str, fallback: Option<usize>) -> ResultsResult<Vec<f64>> {
        let raw = self.find_phase_column(mineral, fallback)?;
        Ok(forward_fill(raw, 0.0))
    }

    /// Final value of a phase column, 0 when absent or empty.
    pub fn final_phase_moles(&self, mineral: &str) -> f64 {
        self.phase_series(mineral, None)
            .ok()
            .and_then(|s| s.last().copied())
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// Solver-shaped table: default leading columns, trailing tab, padded cells.
    pub fn phreeqc_table(rows: &[(u32, f64, f64, f64)]) -> String {
        let mut out = String::from(
            "         sim\t       state\t        soln\t      dist_x\t        time\t        step\t          pH\t          pe\t    reaction\t     Halite\t   d_Halite\t\n",
        );
        for (step, ph, reaction, halite) in rows {
            out.push_str(&format!(
                "{:>12}\t{:>12}\t{:>12}\t{:>12}\t{:>12}\t{:>12}\t{:>12}\t{:>12}\t{:>12}\t{:>12}\t{:>12}\t\n",
                1, "react", 1, -99, 0, step, ph, 4.0, -reaction, halite, 0.0
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::phreeqc_table;
    use super::*;

    #[test]
    fn parses_padded_solver_output() {
        let t = ResultTable::parse("results1.dat", &phreeqc_table(&[(1, 7.1, 0.273, 0.0), (2, 7.0, 0.546, 0.1)])).unwrap();
        assert_eq!(t.headers().len(), 11);
        assert_eq!(t.headers()[5], "step");
        assert_eq!(t.len(), 2);
        assert_eq!(t.time_series().unwrap(), vec![1.0, 2.0]);
        assert_eq!(t.reaction_series().unwrap(), vec![0.273, 0.546]);
    }

    #[test]
    fn candidates_are_case_insensitive_and_ordered() {
        let t = ResultTable::parse("t", "Time\tSTEP\tph\n0\t3\t7.2\n").unwrap();
        assert_eq!(t.get_column(&["step", "time"], None).unwrap(), &[3.0]);
        assert_eq!(t.get_column(&["pH"], None).unwrap(), &[7.2]);
    }

    #[test]
    fn falls_back_to_position() {
        let t = ResultTable::parse("t", "a\tb\tc\n1\t2\t3\n").unwrap();
        assert_eq!(t.get_column(&["step"], Some(2)).unwrap(), &[3.0]);
    }

    #[test]
    fn missing_column_when_fallback_out_of_range() {
        let t = ResultTable::parse("t", "a\tb\n1\t2\n").unwrap();
        let err = t.get_column(&["step", "time"], Some(5)).unwrap_err();
        match err {
            ResultsError::MissingColumn { table, candidates, fallback } => {
                assert_eq!(table, "t");
                assert_eq!(candidates, vec!["step", "time"]);
                assert_eq!(fallback, Some(5));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(t.get_column(&["step"], None).is_err());
    }

    #[test]
    fn phase_column_matches_substring() {
        let t = ResultTable::parse("t", "step\tHalite\td_Halite\n1\t0.5\t0.1\n").unwrap();
        assert_eq!(t.find_phase_column("halite", None).unwrap(), &[0.5]);
        assert!(t.find_phase_column("gypsum", None).is_err());
        assert_eq!(t.find_phase_column("gypsum", Some(0)).unwrap(), &[1.0]);
    }

    #[test]
    fn non_numeric_cells_become_nan_and_are_filled() {
        let t = ResultTable::parse("t", "step\tHalite\n1\t0\n2\tx\n3\t0.2\n").unwrap();
        assert!(t.column(1).unwrap()[1].is_nan());
        assert_eq!(t.phase_series("Halite", None).unwrap(), vec![0.0, 0.0, 0.2]);
        assert_eq!(t.final_phase_moles("Halite"), 0.2);
        assert_eq!(t.final_phase_moles("Gypsum"), 0.0);
    }

    #[test]
    fn empty_content_is_empty_table() {
        assert!(matches!(
            ResultTable::parse("t", "\n  \n"),
            Err(ResultsError::EmptyTable { .. })
        ));
        let header_only = ResultTable::parse("t", "step\tpH\n").unwrap();
        assert!(header_only.is_empty());
    }

    #[test]
    fn overlong_row_is_parse_error() {
        let err = ResultTable::parse("t", "a\tb\n1\t2\t3\n").unwrap_err();
        assert!(matches!(err, ResultsError::Parse { line: 2, .. }));
    }
}
