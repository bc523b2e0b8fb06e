//! sal-cascade: halite-triggered transfer cascade across a pond train.
//!
//! The primary pond evaporates until the target mineral starts to
//! precipitate. At that day its brine is charged into the next receiving
//! pond, which evolves on its own, while the primary pond continues from the
//! same saved state to look for the next trigger.
//!
//! Provides:
//! - trigger detection on stage tables
//! - remaining-volume mass balance and the destination capacity cap
//! - the orchestrator state machine and its progress events
//! - pond level bookkeeping

pub mod error;
pub mod levels;
pub mod mass_balance;
pub mod orchestrator;
pub mod progress;
pub mod trigger;

pub use error::{CascadeError, CascadeResult, StageFailure};
pub use mass_balance::{TransferCap, cap_transfer, remaining_volume};
pub use orchestrator::{CascadeOutcome, CascadeRun, run_cascade};
pub use progress::CascadeEvent;
pub use trigger::{Trigger, detect_trigger};
