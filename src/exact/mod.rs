//! Exact solvers module.
//!
//! Both VRP formulations are solved by branch-and-cut: the compact model
//! goes to Gurobi and the cuts of [`crate::cuts`] are added lazily on
//! every integer solution.

use crate::cuts::{CutConfig, CutStats};
use crate::solution::RoutingSolution;
use serde::{Deserialize, Serialize};

// When built with the `gurobi` feature, expose the real implementation
#[cfg(feature = "gurobi")]
mod gurobi;
#[cfg(feature = "gurobi")]
pub use gurobi::*;

/// Which MIP model to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Formulation {
    /// `x[i][j][k]` per vehicle, lazy capacity cuts
    ThreeIndex,
    /// `x[i][j]` with load variables `u[i]`, lazy subtour cuts
    TwoIndex,
}

impl Formulation {
    pub fn name(&self) -> &'static str {
        match self {
            Formulation::ThreeIndex => "three-index",
            Formulation::TwoIndex => "two-index",
        }
    }
}

/// Gurobi solver configuration
#[derive(Debug, Clone)]
pub struct GurobiConfig {
    /// Time limit in seconds
    pub time_limit: f64,
    /// MIP gap tolerance
    pub mip_gap: f64,
    /// Number of threads (0 = automatic)
    pub threads: i32,
    /// Enable verbose output
    pub verbose: bool,
    /// Settings of the lazy cut callback
    pub cuts: CutConfig,
}

impl Default for GurobiConfig {
    fn default() -> Self {
        GurobiConfig {
            time_limit: 200.0,
            mip_gap: 1e-6,
            threads: 0,
            verbose: false,
            cuts: CutConfig::default(),
        }
    }
}

/// Result of exact solving
#[derive(Debug, Clone)]
pub struct ExactResult {
    /// Best solution found
    pub solution: RoutingSolution,
    /// Best bound
    pub lower_bound: f64,
    /// Upper bound (best integer solution)
    pub upper_bound: f64,
    /// Optimality gap
    pub gap: f64,
    /// Whether optimal solution was proven
    pub optimal: bool,
    /// Solver status
    pub status: String,
    /// Number of nodes explored
    pub nodes_explored: i64,
    /// Lazy callback counters
    pub cut_stats: CutStats,
}

// Otherwise provide a lightweight stub so the rest of the codebase can compile
#[cfg(not(feature = "gurobi"))]
mod gurobi_stub {
    use super::{ExactResult, Formulation, GurobiConfig};
    use crate::instance::VrpInstance;

    pub struct GurobiSolver {
        pub config: GurobiConfig,
    }

    impl GurobiSolver {
        pub fn new(config: GurobiConfig) -> Self {
            GurobiSolver { config }
        }

        pub fn solve(&self, _instance: &VrpInstance, _formulation: Formulation) -> Result<ExactResult, String> {
            Err("Gurobi feature not enabled in this build".to_string())
        }
    }
}

#[cfg(not(feature = "gurobi"))]
pub use gurobi_stub::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GurobiConfig::default();
        assert_eq!(config.time_limit, 200.0);
        assert_eq!(config.cuts.threshold, 0.5);
    }

    #[cfg(not(feature = "gurobi"))]
    #[test]
    fn test_stub_reports_missing_feature() {
        let instance = crate::instance::VrpInstance::random(1, 3, 1, 10.0).unwrap();
        let solver = GurobiSolver::new(GurobiConfig::default());
        assert!(solver.solve(&instance, Formulation::TwoIndex).is_err());
    }
}
