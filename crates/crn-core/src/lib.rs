//! crn-core: shared foundation for the reaction network crates.
//!
//! Contains:
//! - numeric (Real + population helpers)
//! - ids (compact reaction indices)
//! - timing (wall-clock timers and update throttling)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod timing;

pub use error::{CrnError, CrnResult};
pub use ids::*;
pub use numeric::*;
pub use timing::{AccumulatingTimer, Timer, UpdateThrottle};
