//! Configuration operation definitions and payloads.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::axial::ZRange;
use crate::lattice::Numbering;
use crate::material::Perturbation;

/// An ordered list of operations applied to a core.
///
/// Operations run in list order. Times need not increase, but composing
/// onto a snapshot that already has later snapshots is rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    /// Format version (e.g., "1.0").
    #[serde(default = "current_version")]
    pub version: String,

    /// Identifier of this schedule, echoed into the run manifest.
    #[serde(default = "Uuid::new_v4")]
    pub schedule_id: Uuid,

    /// Operations, applied in order.
    pub operations: Vec<Operation>,
}

impl Schedule {
    /// Current format version.
    pub const CURRENT_VERSION: &'static str = "1.0";

    /// Wraps `operations` with a fresh id.
    #[must_use]
    pub fn new(operations: Vec<Operation>) -> Self {
        Self {
            version: Self::CURRENT_VERSION.to_string(),
            schedule_id: Uuid::new_v4(),
            operations,
        }
    }

    /// Sets a custom schedule id (useful for correlation).
    #[must_use]
    pub fn with_schedule_id(mut self, schedule_id: Uuid) -> Self {
        self.schedule_id = schedule_id;
        self
    }
}

fn current_version() -> String {
    Schedule::CURRENT_VERSION.to_string()
}

/// All supported configuration operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "payload", rename_all = "snake_case")]
pub enum Operation {
    /// Put an assembly type at a set of positions.
    Replace(ReplacePayload),

    /// Substitute one axial slot of the targeted assemblies.
    ReplaceAxial(ReplaceAxialPayload),

    /// Clone and perturb the material found at an axial slot.
    Perturb(PerturbPayload),

    /// Shift the internal axial boundaries of the targeted assemblies.
    Translate(TranslatePayload),
}

impl Operation {
    /// Snapshot time the operation writes to.
    #[must_use]
    pub const fn at(&self) -> f64 {
        match self {
            Self::Replace(p) => p.at,
            Self::ReplaceAxial(p) => p.at,
            Self::Perturb(p) => p.at,
            Self::Translate(p) => p.at,
        }
    }

    /// Short name for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Replace(_) => "replace",
            Self::ReplaceAxial(_) => "replace_axial",
            Self::Perturb(_) => "perturb",
            Self::Translate(_) => "translate",
        }
    }
}

/// Payload for REPLACE operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplacePayload {
    /// Name of the assembly type to place.
    pub assembly_type: String,

    /// Target assemblies.
    pub assemblies: Vec<u32>,

    /// How `assemblies` are numbered.
    #[serde(default)]
    pub numbering: Numbering,

    /// Snapshot time.
    pub at: f64,
}

/// Payload for REPLACE_AXIAL operations.
///
/// `which`, `locations` and `with` are parallel lists: entry `i` replaces
/// whatever fills `locations[i]` in every assembly of `which[i]` with the
/// region `with[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplaceAxialPayload {
    /// Target assemblies, one list per location.
    pub which: Vec<Vec<u32>>,

    /// Axial locations.
    #[serde(rename = "where")]
    pub locations: Vec<ZRange>,

    /// Replacement region per location.
    pub with: Vec<String>,

    /// How `which` is numbered.
    #[serde(default)]
    pub numbering: Numbering,

    /// Snapshot time.
    pub at: f64,
}

/// Payload for PERTURB operations. Parallel lists like
/// [`ReplaceAxialPayload`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerturbPayload {
    /// Target assemblies, one list per location.
    pub which: Vec<Vec<u32>>,

    /// Axial locations.
    #[serde(rename = "where")]
    pub locations: Vec<ZRange>,

    /// Change applied per location.
    pub perturbations: Vec<Perturbation>,

    /// How `which` is numbered.
    #[serde(default)]
    pub numbering: Numbering,

    /// Snapshot time.
    pub at: f64,
}

/// Payload for TRANSLATE operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslatePayload {
    /// Target assemblies.
    pub which: Vec<u32>,

    /// Shift applied to every internal boundary.
    pub dz: f64,

    /// How `which` is numbered.
    #[serde(default)]
    pub numbering: Numbering,

    /// Snapshot time.
    pub at: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_replace() -> Operation {
        Operation::Replace(ReplacePayload {
            assembly_type: "CR".to_string(),
            assemblies: vec![1, 4],
            numbering: Numbering::Application,
            at: 1.0,
        })
    }

    #[test]
    fn test_operation_tagging() {
        let json = serde_json::to_string(&sample_replace()).unwrap();
        assert!(json.contains("\"op\":\"replace\""));
        assert!(json.contains("\"payload\""));
        assert!(json.contains("\"numbering\":\"application\""));
    }

    #[test]
    fn test_where_is_renamed() {
        let op = Operation::ReplaceAxial(ReplaceAxialPayload {
            which: vec![vec![2]],
            locations: vec![ZRange {
                lower: 0.0,
                upper: 10.0,
            }],
            with: vec!["refl".to_string()],
            numbering: Numbering::Library,
            at: 0.0,
        });
        let json = serde_json::to_string(&op).unwrap();
        assert!(json.contains("\"op\":\"replace_axial\""));
        assert!(json.contains("\"where\""));
        let back: Operation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, op);
    }

    #[test]
    fn test_numbering_defaults_to_library() {
        let json = r#"{"op":"translate","payload":{"which":[3],"dz":2.5,"at":0.0}}"#;
        let op: Operation = serde_json::from_str(json).unwrap();
        let Operation::Translate(p) = op else {
            panic!("expected translate");
        };
        assert_eq!(p.numbering, Numbering::Library);
        assert_eq!(p.dz, 2.5);
    }

    #[test]
    fn test_perturbation_payload_json() {
        let json = r#"{"op":"perturb","payload":{
            "which":[[1]],
            "where":[{"lower":0.0,"upper":10.0}],
            "perturbations":[{"kind":"density","factor":1.05}],
            "at":2.0}}"#;
        let op: Operation = serde_json::from_str(json).unwrap();
        assert_eq!(op.kind(), "perturb");
        assert_eq!(op.at(), 2.0);
    }

    #[test]
    fn test_schedule_creation() {
        let schedule = Schedule::new(vec![sample_replace()]);
        assert_eq!(schedule.version, Schedule::CURRENT_VERSION);
        let id = Uuid::new_v4();
        assert_eq!(schedule.with_schedule_id(id).schedule_id, id);
    }
}
