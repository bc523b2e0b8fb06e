//! Absolute-day timelines stitched from stage tables.

use std::fmt::Write as _;

use crate::table::ResultTable;
use crate::types::StageRecord;
use crate::ResultsResult;

/// `absolute = (local - local[0]) / steps_per_day + start_day` for every row.
pub fn absolute_days(table: &ResultTable, start_day: u32, steps_per_day: u32) -> ResultsResult<Vec<f64>> {
    let local = table.time_series()?;
    let origin = local.first().copied().unwrap_or(0.0);
    let per_day = f64::from(steps_per_day.max(1));
    Ok(local
        .iter()
        .map(|t| (t - origin) / per_day + f64::from(start_day))
        .collect())
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineRow {
    pub day: f64,
    pub ph: f64,
    pub reaction: f64,
    /// Cumulative moles, aligned with `PondTimeline::phases`.
    pub phases: Vec<f64>,
}

/// One pond's rows on the absolute day axis.
#[derive(Debug, Clone, PartialEq)]
pub struct PondTimeline {
    pub pond: String,
    pub phases: Vec<String>,
    pub rows: Vec<TimelineRow>,
}

impl PondTimeline {
    /// Stitch `stages` in start-day order. Rows of a stage that reach past the
    /// next stage's start are superseded by the later stage.
    pub fn build(
        pond: &str,
        stages: &[(&StageRecord, &ResultTable)],
        phases: &[String],
    ) -> ResultsResult<Self> {
        let mut ordered: Vec<&(&StageRecord, &ResultTable)> = stages.iter().collect();
        ordered.sort_by_key(|(record, _)| record.absolute_start_day);

        let mut rows = Vec::new();
        for (i, (record, table)) in ordered.iter().enumerate() {
            let cutoff = ordered
                .get(i + 1)
                .map(|(next, _)| f64::from(next.absolute_start_day));
            let days = absolute_days(table, record.absolute_start_day, record.steps_per_day)?;
            let ph = table.ph_series()?;
            let reaction = table.reaction_series()?;
            let phase_series = phases
                .iter()
                .map(|p| table.phase_series(p, None))
                .collect::<ResultsResult<Vec<_>>>()?;

            for (row, &day) in days.iter().enumerate() {
                if cutoff.is_some_and(|c| day >= c) {
                    break;
                }
                rows.push(TimelineRow {
                    day,
                    ph: ph[row],
                    reaction: reaction[row],
                    phases: phase_series.iter().map(|s| s[row]).collect(),
                });
            }
        }

        Ok(Self {
            pond: pond.to_string(),
            phases: phases.to_vec(),
            rows,
        })
    }

    pub fn day_range(&self) -> Option<(f64, f64)> {
        Some((self.rows.first()?.day, self.rows.last()?.day))
    }

    pub fn final_phase_moles(&self, phase: &str) -> Option<f64> {
        let idx = self.phases.iter().position(|p| p.eq_ignore_ascii_case(phase))?;
        self.rows.last().map(|r| r.phases[idx])
    }

    /// `day,pH,reaction,<phase...>`
    pub fn to_csv(&self) -> String {
        let mut out = String::from("day,pH,reaction");
        for p in &self.phases {
            out.push(',');
            out.push_str(p);
        }
        out.push('\n');
        for row in &self.rows {
            let _ = write!(out, "{},{},{}", row.day, row.ph, row.reaction);
            for v in &row.phases {
                let _ = write!(out, ",{v}");
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::fixtures::phreeqc_table;
    use crate::types::StageKind;

    fn record(table_id: &str, start: u32) -> StageRecord {
        StageRecord {
            table_id: table_id.to_string(),
            label: table_id.to_string(),
            kind: StageKind::PrimaryRun,
            pond: "Pond 1".to_string(),
            cascade_index: 0,
            reaction_id: 1,
            step_count: 3,
            steps_per_day: 1,
            absolute_start_day: start,
            padded_days: 0,
            truncated_from: None,
            resumed_solution: None,
            resumed_phases: None,
            saved_solution: None,
            saved_phases: None,
        }
    }

    #[test]
    fn absolute_days_offset_local_axis() {
        let t = ResultTable::parse("r", &phreeqc_table(&[(1, 7.0, 0.1, 0.0), (2, 7.0, 0.2, 0.0), (3, 7.0, 0.3, 0.0)])).unwrap();
        assert_eq!(absolute_days(&t, 30, 1).unwrap(), vec![30.0, 31.0, 32.0]);
    }

    #[test]
    fn micro_steps_compress_day_axis() {
        let t = ResultTable::parse("r", "step\n1\n2\n3\n4\n5\n").unwrap();
        assert_eq!(absolute_days(&t, 10, 4).unwrap(), vec![10.0, 10.25, 10.5, 10.75, 11.0]);
    }

    #[test]
    fn later_stage_supersedes_overlap() {
        let first = ResultTable::parse("results1.dat", &phreeqc_table(&[(1, 7.0, 0.1, 0.0), (2, 6.9, 0.2, 0.0), (3, 6.8, 0.3, 0.1)])).unwrap();
        let second = ResultTable::parse("results4.dat", &phreeqc_table(&[(1, 6.5, 0.1, 0.2), (2, 6.4, 0.2, 0.3)])).unwrap();
        let r1 = record("results1.dat", 0);
        let r2 = record("results4.dat", 2);
        let phases = vec!["Halite".to_string()];

        let tl = PondTimeline::build("Pond 1", &[(&r2, &second), (&r1, &first)], &phases).unwrap();
        let days: Vec<f64> = tl.rows.iter().map(|r| r.day).collect();
        assert_eq!(days, vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(tl.day_range(), Some((0.0, 3.0)));
        assert_eq!(tl.final_phase_moles("halite"), Some(0.3));

        let csv = tl.to_csv();
        assert!(csv.starts_with("day,pH,reaction,Halite\n0,7,0.1,0\n"));
        assert_eq!(csv.lines().count(), 5);
    }
}
