//! Lazy cut generation for the routing formulations.
//!
//! Every time the MIP solver finds an integer candidate, the callback driver
//! decodes the arc values into successors, splits them into tours, checks the
//! tours against the depot and the demands, and when the candidate is not a
//! valid set of routes, builds one inequality that cuts it off:
//!
//! - 3-index model (`x[i][j][k]`): capacity cut over the arcs leaving the
//!   served nodes towards the orphaned ones,
//! - 2-index model (`x[i][j]`, `u[i]`): load-strengthened subtour cut over the
//!   shortest cycle that misses part of the nodes.
//!
//! Nothing here is shared between invocations except the static instance data,
//! so a generator can be called from any solver thread.

pub mod snapshot;
pub mod decoder;
pub mod tours;
pub mod violation;
pub mod cut;
pub mod callback;

pub use snapshot::{EdgeSnapshot, Layout, SnapshotFile};
pub use decoder::{decode, ArcValues, Successors};
pub use tours::{Aggregated, CycleDecomposition, Decomposer, PerVehicle, Tour, VehicleTours};
pub use violation::{detect_orphans, detect_subtour, Violation};
pub use cut::{capacity_cut, subtour_cut, Cut, CutKind, Sense, Term, VarRef};
pub use callback::{
    CallbackDriver, CapacityCutGenerator, CutGenerator, CutSink, CutStats, Outcome,
    SubtourCutGenerator,
};

use serde::{Deserialize, Serialize};
use std::fmt;

/// An arc is part of the candidate when its value exceeds this threshold
pub const ARC_THRESHOLD: f64 = 0.5;

/// Right-hand side used by capacity cuts
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub enum CapacityRhs {
    /// `D / C`, the bound as stated by the model
    #[default]
    Fractional,
    /// `ceil(D / C)`, every crossing carries at most one vehicle load
    Ceiling,
}

/// Cut generation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CutConfig {
    /// Arc presence threshold
    pub threshold: f64,
    /// Capacity cut right-hand side
    pub capacity_rhs: CapacityRhs,
}

impl Default for CutConfig {
    fn default() -> Self {
        CutConfig {
            threshold: ARC_THRESHOLD,
            capacity_rhs: CapacityRhs::Fractional,
        }
    }
}

/// The candidate breaks the degree constraints the solver is supposed to enforce
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsistencyError {
    /// More than one outgoing arc above the threshold
    MultipleArcs { node: usize, vehicle: Option<usize>, arcs: usize },
    /// No outgoing arc where the route has to continue
    MissingArc { node: usize, vehicle: Option<usize> },
    /// Walk entered a node that already belongs to another tour
    Revisit { node: usize, vehicle: Option<usize> },
}

fn fmt_vehicle(vehicle: &Option<usize>) -> String {
    match vehicle {
        Some(k) => format!(" for vehicle {}", k),
        None => String::new(),
    }
}

impl fmt::Display for ConsistencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsistencyError::MultipleArcs { node, vehicle, arcs } => {
                write!(f, "node {} has {} outgoing arcs{}", node, arcs, fmt_vehicle(vehicle))
            }
            ConsistencyError::MissingArc { node, vehicle } => {
                write!(f, "node {} has no outgoing arc{}", node, fmt_vehicle(vehicle))
            }
            ConsistencyError::Revisit { node, vehicle } => {
                write!(f, "node {} is entered twice{}", node, fmt_vehicle(vehicle))
            }
        }
    }
}

impl std::error::Error for ConsistencyError {}

#[derive(Debug, Clone, PartialEq)]
pub enum CutError {
    /// The candidate violates the model's own degree constraints
    Consistency(ConsistencyError),
    /// The snapshot does not match the instance or the formulation
    Snapshot(String),
}

impl fmt::Display for CutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CutError::Consistency(e) => write!(f, "Inconsistent candidate: {}", e),
            CutError::Snapshot(s) => write!(f, "Invalid snapshot: {}", s),
        }
    }
}

impl std::error::Error for CutError {}

impl From<ConsistencyError> for CutError {
    fn from(e: ConsistencyError) -> Self {
        CutError::Consistency(e)
    }
}
