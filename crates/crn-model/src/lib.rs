//! crn-model: species, reactions and models.
//!
//! Provides:
//! - `Value` (literal number or rate expression)
//! - `Compartment`, `Species`, `Parameter`
//! - `Reaction` with stoichiometric participants, local parameters,
//!   multi-step count and delay
//! - `Model` aggregating all of the above (plus merged sub-models), and
//!   the flattened symbol lists a simulator binds against

pub mod compartment;
pub mod error;
pub mod model;
pub mod parameter;
pub mod reaction;
pub mod species;
pub mod value;

// Re-exports
pub use compartment::{Compartment, DEFAULT_COMPARTMENT};
pub use error::{ModelError, ModelResult};
pub use model::{FlatModel, Model, NamedValue, RESERVED_TIME_SYMBOL};
pub use parameter::Parameter;
pub use reaction::{ParticipantKind, Reaction, ReactionParticipant};
pub use species::Species;
pub use value::Value;
