//! Module for parsing and representing CVRP instances.
//!
//! The text format is the one used by the course instances: a header line
//! `n m C` (number of locations including the depot, number of vehicles,
//! vehicle capacity) followed by one `demand x y` line per location, the
//! depot first. Distances are Euclidean 2D.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use serde::{Deserialize, Serialize};

/// Represents a location of the CVRP instance (depot or customer)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Node identifier, 0 is the depot
    pub id: usize,
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
    /// Demand to deliver, always 0 for the depot
    pub demand: f64,
}

impl Node {
    pub fn new(id: usize, x: f64, y: f64, demand: f64) -> Self {
        Node { id, x, y, demand }
    }

    /// Check if this node is the depot
    pub fn is_depot(&self) -> bool {
        self.id == 0
    }
}

/// A vehicle of the homogeneous fleet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: usize,
    pub capacity: f64,
}

impl Vehicle {
    pub fn new(id: usize, capacity: f64) -> Self {
        Vehicle { id, capacity }
    }
}

/// Represents a complete CVRP instance. Immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VrpInstance {
    /// Name of the instance (file stem when parsed)
    pub name: String,
    /// Number of nodes (including depot)
    pub dimension: usize,
    /// List of all nodes, indexed by id
    pub nodes: Vec<Node>,
    /// Available vehicles
    pub vehicles: Vec<Vehicle>,
    /// Precomputed distance matrix
    #[serde(skip)]
    pub distance_matrix: Vec<Vec<f64>>,
}

/// Identifier of the depot node
pub const DEPOT: usize = 0;

impl VrpInstance {
    /// Build an instance from nodes and vehicles.
    ///
    /// Node ids must match their position and the depot (node 0) carries no demand.
    pub fn new(name: &str, nodes: Vec<Node>, vehicles: Vec<Vehicle>) -> Result<Self, String> {
        if nodes.is_empty() {
            return Err("Instance has no depot".to_string());
        }
        if vehicles.is_empty() {
            return Err("Instance has no vehicle".to_string());
        }
        if let Some(node) = nodes.iter().enumerate().find(|(pos, n)| n.id != *pos) {
            return Err(format!("Node at position {} has id {}", node.0, node.1.id));
        }
        if nodes[DEPOT].demand != 0.0 {
            return Err(format!("Depot demand must be 0, got {}", nodes[DEPOT].demand));
        }
        if let Some(node) = nodes.iter().find(|n| n.demand < 0.0 || !n.demand.is_finite()) {
            return Err(format!("Invalid demand {} at node {}", node.demand, node.id));
        }
        if let Some(v) = vehicles.iter().find(|v| v.capacity <= 0.0 || !v.capacity.is_finite()) {
            return Err(format!("Invalid capacity {} for vehicle {}", v.capacity, v.id));
        }

        let distance_matrix = Self::compute_distance_matrix(&nodes);

        Ok(VrpInstance {
            name: name.to_string(),
            dimension: nodes.len(),
            nodes,
            vehicles,
            distance_matrix,
        })
    }

    /// Parse a CVRP instance from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let file = File::open(&path)
            .map_err(|e| format!("Cannot open file: {}", e))?;
        let reader = BufReader::new(file);

        let mut content = String::new();
        for line in reader.lines() {
            let line = line.map_err(|e| format!("Read error: {}", e))?;
            content.push_str(&line);
            content.push('\n');
        }

        let name = path.as_ref()
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        Self::parse(&name, &content)
    }

    /// Parse the textual instance format
    pub fn parse(name: &str, content: &str) -> Result<Self, String> {
        let mut lines = content.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty());

        let header: Vec<&str> = lines.next()
            .ok_or("Empty instance file")?
            .split_whitespace()
            .collect();
        if header.len() < 3 {
            return Err(format!("Invalid header, expected `n m C`, got {:?}", header));
        }
        let dimension: usize = header[0].parse().map_err(|_| "Invalid number of locations")?;
        let num_vehicles: usize = header[1].parse().map_err(|_| "Invalid number of vehicles")?;
        let capacity: f64 = header[2].parse().map_err(|_| "Invalid capacity")?;

        let mut nodes = Vec::with_capacity(dimension);
        for id in 0..dimension {
            let line = lines.next()
                .ok_or_else(|| format!("Expected {} locations, found {}", dimension, id))?;
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 3 {
                return Err(format!("Invalid location line {}: {:?}", id + 2, line));
            }
            let demand: f64 = parts[0].parse().map_err(|_| format!("Invalid demand at location {}", id))?;
            let x: f64 = parts[1].parse().map_err(|_| format!("Invalid x coordinate at location {}", id))?;
            let y: f64 = parts[2].parse().map_err(|_| format!("Invalid y coordinate at location {}", id))?;
            // the depot line carries a placeholder demand in the files
            let demand = if id == DEPOT { 0.0 } else { demand };
            nodes.push(Node::new(id, x, y, demand));
        }

        let vehicles = (0..num_vehicles).map(|k| Vehicle::new(k, capacity)).collect();
        Self::new(name, nodes, vehicles)
    }

    /// Generate a reproducible random instance in the `[0, 100)^2` square.
    /// Demands are integers in `[1, capacity / 4]`.
    pub fn random(seed: u64, num_customers: usize, num_vehicles: usize, capacity: f64) -> Result<Self, String> {
        use rand::prelude::*;
        use rand_chacha::ChaCha8Rng;

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let max_demand = ((capacity / 4.0).floor() as u32).max(1);

        let mut nodes = Vec::with_capacity(num_customers + 1);
        nodes.push(Node::new(DEPOT, rng.gen_range(0.0..100.0), rng.gen_range(0.0..100.0), 0.0));
        for id in 1..=num_customers {
            let x = rng.gen_range(0.0..100.0);
            let y = rng.gen_range(0.0..100.0);
            let demand = rng.gen_range(1..=max_demand) as f64;
            nodes.push(Node::new(id, x, y, demand));
        }

        let vehicles = (0..num_vehicles).map(|k| Vehicle::new(k, capacity)).collect();
        Self::new(&format!("random-{}-{}", num_customers, seed), nodes, vehicles)
    }

    /// Write the instance back in the textual format
    pub fn to_text(&self) -> String {
        let mut out = format!("{} {} {}\n", self.dimension, self.vehicles.len(), self.capacity());
        for node in &self.nodes {
            out.push_str(&format!("{} {} {}\n", node.demand, node.x, node.y));
        }
        out
    }

    /// Compute Euclidean distance matrix
    fn compute_distance_matrix(nodes: &[Node]) -> Vec<Vec<f64>> {
        let n = nodes.len();
        let mut matrix = vec![vec![0.0; n]; n];

        for i in 0..n {
            for j in 0..n {
                if i != j {
                    matrix[i][j] = (nodes[i].x - nodes[j].x).hypot(nodes[i].y - nodes[j].y);
                }
            }
        }

        matrix
    }

    /// Get the distance between two nodes
    #[inline]
    pub fn distance(&self, i: usize, j: usize) -> f64 {
        self.distance_matrix[i][j]
    }

    #[inline]
    pub fn demand(&self, i: usize) -> f64 {
        self.nodes[i].demand
    }

    /// Get the number of customer nodes (excluding depot)
    pub fn num_customers(&self) -> usize {
        self.dimension - 1
    }

    pub fn num_vehicles(&self) -> usize {
        self.vehicles.len()
    }

    /// Capacity of a single vehicle. Fleets read from files are homogeneous;
    /// for mixed fleets this is the largest capacity, which keeps demand
    /// based bounds valid.
    pub fn capacity(&self) -> f64 {
        self.vehicles.iter().map(|v| v.capacity).fold(0.0, f64::max)
    }

    /// Sum of all customer demands
    pub fn total_demand(&self) -> f64 {
        self.nodes.iter().map(|n| n.demand).sum()
    }

    /// Calculate the length of a closed route given as a node sequence
    pub fn route_length(&self, route: &[usize]) -> f64 {
        route.windows(2).map(|w| self.distance(w[0], w[1])).sum()
    }

    /// Get statistics about the instance
    pub fn statistics(&self) -> InstanceStatistics {
        let total_demand = self.total_demand();
        let capacity = self.capacity();
        let fleet_capacity: f64 = self.vehicles.iter().map(|v| v.capacity).sum();

        let mut distances: Vec<f64> = Vec::new();
        for i in 0..self.dimension {
            for j in i+1..self.dimension {
                distances.push(self.distance(i, j));
            }
        }
        let avg_distance = if distances.is_empty() {
            0.0
        } else {
            distances.iter().sum::<f64>() / distances.len() as f64
        };
        let max_distance = distances.iter().cloned().fold(0.0, f64::max);
        let max_demand = self.nodes.iter().map(|n| n.demand).fold(0.0, f64::max);

        InstanceStatistics {
            name: self.name.clone(),
            dimension: self.dimension,
            num_vehicles: self.vehicles.len(),
            capacity,
            total_demand,
            max_demand,
            fleet_capacity,
            min_vehicles: (total_demand / capacity).ceil() as usize,
            avg_distance,
            max_distance,
        }
    }
}

/// Statistics about a CVRP instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceStatistics {
    pub name: String,
    pub dimension: usize,
    pub num_vehicles: usize,
    pub capacity: f64,
    pub total_demand: f64,
    pub max_demand: f64,
    pub fleet_capacity: f64,
    /// Lower bound on the number of vehicles, `ceil(total demand / capacity)`
    pub min_vehicles: usize,
    pub avg_distance: f64,
    pub max_distance: f64,
}

impl std::fmt::Display for InstanceStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Instance: {}", self.name)?;
        writeln!(f, "  Nodes: {} (1 depot + {} customers)", self.dimension, self.dimension - 1)?;
        writeln!(f, "  Vehicles: {} (capacity {})", self.num_vehicles, self.capacity)?;
        writeln!(f, "  Total demand: {}", self.total_demand)?;
        writeln!(f, "  Max demand: {}", self.max_demand)?;
        writeln!(f, "  Fleet capacity: {}", self.fleet_capacity)?;
        writeln!(f, "  Vehicles needed (bound): {}", self.min_vehicles)?;
        writeln!(f, "  Avg distance: {:.2}", self.avg_distance)?;
        writeln!(f, "  Max distance: {:.2}", self.max_distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = "4 2 10\n\
                         0 0 0\n\
                         4 3 4\n\
                         4 6 8\n\
                         4 0 5\n";

    #[test]
    fn test_parse_small_instance() {
        let instance = VrpInstance::parse("small", SMALL).unwrap();

        assert_eq!(instance.dimension, 4);
        assert_eq!(instance.num_customers(), 3);
        assert_eq!(instance.num_vehicles(), 2);
        assert_eq!(instance.capacity(), 10.0);
        assert_eq!(instance.total_demand(), 12.0);
        assert!(instance.nodes[0].is_depot());
        assert!((instance.distance(0, 1) - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_depot_demand_is_ignored() {
        let instance = VrpInstance::parse("depot", "2 1 5\n7 0 0\n1 1 1\n").unwrap();
        assert_eq!(instance.demand(DEPOT), 0.0);
        assert_eq!(instance.demand(1), 1.0);
    }

    #[test]
    fn test_parse_rejects_truncated_file() {
        let err = VrpInstance::parse("short", "3 1 5\n0 0 0\n1 1 1\n").unwrap_err();
        assert!(err.contains("Expected 3 locations"));
    }

    #[test]
    fn test_parse_rejects_bad_header() {
        assert!(VrpInstance::parse("bad", "3 1\n").is_err());
        assert!(VrpInstance::parse("empty", "").is_err());
    }

    #[test]
    fn test_random_instance_is_reproducible() {
        let a = VrpInstance::random(1024, 8, 3, 20.0).unwrap();
        let b = VrpInstance::random(1024, 8, 3, 20.0).unwrap();

        assert_eq!(a.dimension, 9);
        assert_eq!(a.to_text(), b.to_text());
        assert!(a.nodes.iter().skip(1).all(|n| n.demand >= 1.0 && n.demand <= 5.0));
    }

    #[test]
    fn test_text_round_trip_keeps_instance() {
        let instance = VrpInstance::random(7, 5, 2, 40.0).unwrap();
        let parsed = VrpInstance::parse("copy", &instance.to_text()).unwrap();
        assert_eq!(parsed.total_demand(), instance.total_demand());
        assert_eq!(parsed.num_vehicles(), 2);
    }

    #[test]
    fn test_statistics_vehicle_bound() {
        let instance = VrpInstance::parse("small", SMALL).unwrap();
        let stats = instance.statistics();
        assert_eq!(stats.min_vehicles, 2);
        assert_eq!(stats.fleet_capacity, 20.0);
    }
}
