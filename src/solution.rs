//! Routes decoded from a solver solution.
//!
//! The final variable values go through the same decoder as the lazy
//! callback, so a solution always reads the arcs the way the cuts did.

use crate::cuts::{Aggregated, ArcValues, CutError, Decomposer, EdgeSnapshot, Layout, PerVehicle};
use crate::instance::{VrpInstance, DEPOT};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One vehicle route, starting and ending at the depot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    /// Vehicle index in the 3-index model, `None` for the 2-index model
    pub vehicle: Option<usize>,
    pub nodes: Vec<usize>,
    pub load: f64,
    pub length: f64,
}

impl Route {
    fn new(instance: &VrpInstance, vehicle: Option<usize>, nodes: Vec<usize>) -> Self {
        let load = nodes.iter().map(|&i| instance.demand(i)).sum();
        let length = instance.route_length(&nodes);
        Route { vehicle, nodes, load, length }
    }
}

/// Represents a routing solution read from the solver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingSolution {
    pub routes: Vec<Route>,
    /// Customers on no depot route
    pub unserved: Vec<usize>,
    /// Total route length
    pub cost: f64,
    /// Every customer served and no route over capacity
    pub feasible: bool,
    /// Model that produced this solution
    pub algorithm: String,
    /// Computation time in seconds
    pub computation_time: f64,
}

impl RoutingSolution {
    /// Create an empty solution
    pub fn new(algorithm: &str) -> Self {
        RoutingSolution {
            routes: Vec::new(),
            unserved: Vec::new(),
            cost: f64::INFINITY,
            feasible: false,
            algorithm: algorithm.to_string(),
            computation_time: 0.0,
        }
    }

    /// Decode the routes of a snapshot
    pub fn from_snapshot(
        instance: &VrpInstance,
        snapshot: &EdgeSnapshot,
        threshold: f64,
        algorithm: &str,
    ) -> Result<Self, CutError> {
        if snapshot.num_nodes() != instance.dimension {
            return Err(CutError::Snapshot(format!(
                "expected {} nodes, got {}", instance.dimension, snapshot.num_nodes()
            )));
        }

        let (routes, unserved) = match snapshot.layout() {
            Layout::PerVehicle(vehicles) => {
                let tours = PerVehicle { vehicles, depot: DEPOT, threshold }.decompose(snapshot)?;
                let unserved = tours.orphaned();
                let routes = tours.tours.into_iter()
                    .map(|(k, nodes)| Route::new(instance, Some(k), nodes))
                    .collect::<Vec<_>>();
                (routes, unserved)
            }
            Layout::Aggregated => {
                let decomposition = Aggregated { threshold }.decompose(snapshot)?;
                let mut routes = Vec::new();
                let mut unserved = Vec::new();
                for cycle in decomposition.cycles {
                    // cycles start at their lowest id, so the depot cycle starts at the depot
                    if cycle[0] == DEPOT {
                        if cycle.len() > 1 {
                            let mut nodes = cycle;
                            nodes.push(DEPOT);
                            routes.push(Route::new(instance, None, nodes));
                        }
                    } else {
                        unserved.extend(cycle);
                    }
                }
                unserved.sort_unstable();
                (routes, unserved)
            }
        };

        let capacity = instance.capacity();
        let feasible = unserved.is_empty() && routes.iter().all(|r| r.load <= capacity + 1e-9);
        let cost = routes.iter().map(|r| r.length).sum();

        Ok(RoutingSolution {
            routes,
            unserved,
            cost,
            feasible,
            algorithm: algorithm.to_string(),
            computation_time: 0.0,
        })
    }

    /// Number of vehicles leaving the depot
    pub fn vehicles_used(&self) -> usize {
        self.routes.len()
    }

    /// Write route coordinates, one row per visited node, for plotting
    /// (`plot "routes.txt" using 3:4 with linespoints` in gnuplot).
    pub fn write_coordinates<P: AsRef<Path>>(&self, instance: &VrpInstance, path: P) -> Result<(), String> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b' ')
            .from_path(path)
            .map_err(|e| format!("Cannot create coordinates file: {}", e))?;

        writer.write_record(["route", "node", "x", "y"])
            .map_err(|e| format!("Write error: {}", e))?;
        for (r, route) in self.routes.iter().enumerate() {
            for &node in &route.nodes {
                let n = &instance.nodes[node];
                writer.serialize((r, node, n.x, n.y))
                    .map_err(|e| format!("Write error: {}", e))?;
            }
        }
        writer.flush().map_err(|e| format!("Write error: {}", e))
    }
}

impl std::fmt::Display for RoutingSolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Solution ({})", self.algorithm)?;
        writeln!(f, "  Cost: {:.2}", self.cost)?;
        writeln!(f, "  Feasible: {}", self.feasible)?;
        writeln!(f, "  Vehicles used: {}", self.vehicles_used())?;
        writeln!(f, "  Time: {:.4}s", self.computation_time)?;
        for route in &self.routes {
            match route.vehicle {
                Some(k) => write!(f, "  Vehicle {}: ", k)?,
                None => write!(f, "  Route: ")?,
            }
            writeln!(f, "{:?} (load {}, length {:.2})", route.nodes, route.load, route.length)?;
        }
        if !self.unserved.is_empty() {
            writeln!(f, "  Unserved: {:?}", self.unserved)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance() -> VrpInstance {
        VrpInstance::parse("square", "4 2 10\n0 0 0\n4 3 0\n4 3 4\n4 0 4\n").unwrap()
    }

    #[test]
    fn test_solution_creation() {
        let sol = RoutingSolution::new("empty");
        assert!(sol.routes.is_empty());
        assert!(!sol.feasible);
        assert_eq!(sol.cost, f64::INFINITY);
    }

    #[test]
    fn test_routes_from_vehicle_snapshot() {
        let instance = instance();
        let mut x = vec![vec![vec![0.0; 2]; 4]; 4];
        for (i, j, k) in [(0, 1, 0), (1, 2, 0), (2, 0, 0), (0, 3, 1), (3, 0, 1)] {
            x[i][j][k] = 1.0;
        }
        let snapshot = EdgeSnapshot::from_tensor(&x).unwrap();
        let sol = RoutingSolution::from_snapshot(&instance, &snapshot, 0.5, "three-index").unwrap();

        assert_eq!(sol.vehicles_used(), 2);
        assert_eq!(sol.routes[0].nodes, vec![0, 1, 2, 0]);
        assert_eq!(sol.routes[0].load, 8.0);
        assert!((sol.routes[0].length - 12.0).abs() < 1e-9);
        assert!((sol.cost - 20.0).abs() < 1e-9);
        assert!(sol.feasible);
    }

    #[test]
    fn test_subtours_are_reported_unserved() {
        let instance = instance();
        let mut x = vec![vec![0.0; 4]; 4];
        for (i, j) in [(0, 1), (1, 0), (2, 3), (3, 2)] {
            x[i][j] = 1.0;
        }
        let snapshot = EdgeSnapshot::from_matrix(&x, vec![]).unwrap();
        let sol = RoutingSolution::from_snapshot(&instance, &snapshot, 0.5, "two-index").unwrap();

        assert_eq!(sol.routes.len(), 1);
        assert_eq!(sol.routes[0].nodes, vec![0, 1, 0]);
        assert_eq!(sol.unserved, vec![2, 3]);
        assert!(!sol.feasible);
    }

    #[test]
    fn test_overloaded_route_is_infeasible() {
        let instance = instance();
        let mut x = vec![vec![0.0; 4]; 4];
        for (i, j) in [(0, 1), (1, 2), (2, 3), (3, 0)] {
            x[i][j] = 1.0;
        }
        let snapshot = EdgeSnapshot::from_matrix(&x, vec![]).unwrap();
        let sol = RoutingSolution::from_snapshot(&instance, &snapshot, 0.5, "two-index").unwrap();

        assert!(sol.unserved.is_empty());
        assert_eq!(sol.routes[0].load, 12.0);
        assert!(!sol.feasible);
    }

    #[test]
    fn test_write_coordinates() {
        let instance = instance();
        let mut x = vec![vec![0.0; 4]; 4];
        for (i, j) in [(0, 1), (1, 2), (2, 3), (3, 0)] {
            x[i][j] = 1.0;
        }
        let snapshot = EdgeSnapshot::from_matrix(&x, vec![]).unwrap();
        let sol = RoutingSolution::from_snapshot(&instance, &snapshot, 0.5, "two-index").unwrap();

        let path = std::env::temp_dir().join(format!("vrp-mip-routes-{}.txt", std::process::id()));
        sol.write_coordinates(&instance, &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "route node x y");
        assert_eq!(lines.len(), 1 + 5);
        assert_eq!(lines[2], "0 1 3.0 0.0");
    }
}
