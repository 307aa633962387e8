//! Serializable configuration operations.
//!
//! Every mutation of a core can be expressed as an [`Operation`] and a run
//! as a [`Schedule`]. This enables:
//! - Driving runs from JSON input files
//! - Logging and replaying a run
//! - Validating requests before touching the core

mod operations;
mod serialization;
mod validation;

pub use operations::{
    Operation, PerturbPayload, ReplaceAxialPayload, ReplacePayload, Schedule, TranslatePayload,
};

pub use serialization::{from_json, to_json_pretty};
