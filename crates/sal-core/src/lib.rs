//! sal-core: shared foundation for the salina pond cascade.
//!
//! Contains:
//! - units (uom SI volume type + constructors, water molar mass)
//! - numeric (Real + tolerances + float helpers)
//! - ids (saved-state tags handed to the equilibrium solver)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod units;

pub use error::{CoreError, CoreResult};
pub use ids::*;
pub use numeric::*;
pub use units::*;
