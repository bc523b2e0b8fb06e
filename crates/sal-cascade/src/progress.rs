//! Progress events emitted while the cascade runs.

use sal_results::{StageKind, Termination};

/// Reported by the orchestrator as the cascade advances.
#[derive(Debug, Clone, PartialEq)]
pub enum CascadeEvent {
    StageSubmitted {
        table_id: String,
        label: String,
        kind: StageKind,
        absolute_start_day: u32,
        step_count: u32,
    },
    TriggerDetected {
        index: u32,
        local_day: u32,
        absolute_day: u32,
    },
    TransferApplied {
        index: u32,
        source: String,
        destination: String,
        allowed_m3: f64,
        discarded_m3: f64,
    },
    Finished {
        termination: Termination,
        stages: usize,
    },
}
