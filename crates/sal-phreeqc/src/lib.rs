//! sal-phreeqc: script generation for, and invocation of, the external
//! PHREEQC equilibrium solver.
//!
//! Provides:
//! - `ReactionStage` descriptions of one bounded evaporation stage
//! - evaporation source resolution and daily schedule slicing
//! - `ScriptBuilder`, which accumulates stages into one submittable script
//! - `SolverBackend` trait and the `PhreeqcProcess` subprocess backend
//!
//! # Architecture
//!
//! The rest of the cascade only sees the `SolverBackend` trait: a blocking
//! call that takes a `Script` and leaves one tab-separated table per stage in
//! `output_dir()`. Saved SOLUTION / EQUILIBRIUM_PHASES tags only live inside
//! one solver process, so callers resubmit the whole accumulated script each
//! time and read back only the tables they have not seen yet.
//!
//! # Example
//!
//! ```no_run
//! use sal_phreeqc::{PhreeqcProcess, ReactionStage, ScriptBuilder, SolverBackend};
//! use sal_plant::{Brine, SimulationParams};
//! use std::path::Path;
//!
//! let mut solver = PhreeqcProcess::new(
//!     Path::new("/opt/phreeqc/bin/phreeqc"),
//!     Path::new("/opt/phreeqc/database/phreeqc.dat"),
//!     Path::new("phreeqc_work"),
//! )
//! .unwrap();
//! let brine = Brine::from_lines(["temp 25", "pH 7.2", "Na 480", "Cl 560"]);
//! let params = SimulationParams::default();
//! let mut builder = ScriptBuilder::new(&brine, &params, solver.output_dir()).unwrap();
//! builder.push_stage(ReactionStage::new("pond 1 run 1", 1, 100, "results1.dat").anchored_at(0));
//! solver.run(&builder.build()).unwrap();
//! ```

pub mod backend;
pub mod error;
pub mod evaporation;
pub mod process;
pub mod script;
pub mod stage;

pub use backend::SolverBackend;
pub use error::{PhreeqcError, PhreeqcResult};
pub use evaporation::{EvaporationSource, Removal, RemovalPlan, plan_removal, slice_schedule};
pub use process::PhreeqcProcess;
pub use script::{Script, ScriptBuilder, ScriptStage};
pub use stage::ReactionStage;
