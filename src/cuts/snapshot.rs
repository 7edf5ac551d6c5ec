//! Read-only view of the variable values handed over by the solver.

use super::decoder::ArcValues;
use super::CutError;
use serde::{Deserialize, Serialize};

/// Shape of the arc variables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// One `x[i][j]` per node pair
    Aggregated,
    /// One `x[i][j][k]` per node pair and vehicle
    PerVehicle(usize),
}

/// Arc values (and optional load values) of one integer candidate.
///
/// Values are stored flat, row-major in `(i, j, k)`, which is also the order
/// the exact models create their variables in.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeSnapshot {
    nodes: usize,
    layout: Layout,
    values: Vec<f64>,
    loads: Vec<f64>,
}

impl EdgeSnapshot {
    /// Snapshot of a 2-index model. `loads` is either empty or holds one value per node.
    pub fn aggregated(nodes: usize, values: Vec<f64>, loads: Vec<f64>) -> Result<Self, CutError> {
        if values.len() != nodes * nodes {
            return Err(CutError::Snapshot(format!(
                "expected {} arc values for {} nodes, got {}", nodes * nodes, nodes, values.len()
            )));
        }
        if !loads.is_empty() && loads.len() != nodes {
            return Err(CutError::Snapshot(format!(
                "expected {} load values, got {}", nodes, loads.len()
            )));
        }
        Ok(EdgeSnapshot { nodes, layout: Layout::Aggregated, values, loads })
    }

    /// Snapshot of a 3-index model
    pub fn per_vehicle(nodes: usize, vehicles: usize, values: Vec<f64>) -> Result<Self, CutError> {
        if vehicles == 0 {
            return Err(CutError::Snapshot("no vehicle".to_string()));
        }
        if values.len() != nodes * nodes * vehicles {
            return Err(CutError::Snapshot(format!(
                "expected {} arc values for {} nodes and {} vehicles, got {}",
                nodes * nodes * vehicles, nodes, vehicles, values.len()
            )));
        }
        Ok(EdgeSnapshot { nodes, layout: Layout::PerVehicle(vehicles), values, loads: Vec::new() })
    }

    /// Build from a square matrix `x[i][j]`
    pub fn from_matrix(x: &[Vec<f64>], loads: Vec<f64>) -> Result<Self, CutError> {
        let n = x.len();
        if let Some(i) = x.iter().position(|row| row.len() != n) {
            return Err(CutError::Snapshot(format!("row {} does not have {} columns", i, n)));
        }
        Self::aggregated(n, x.iter().flatten().copied().collect(), loads)
    }

    /// Build from a tensor `x[i][j][k]`
    pub fn from_tensor(x: &[Vec<Vec<f64>>]) -> Result<Self, CutError> {
        let n = x.len();
        let m = x.first().and_then(|row| row.first()).map(|cell| cell.len()).unwrap_or(0);
        for (i, row) in x.iter().enumerate() {
            if row.len() != n || row.iter().any(|cell| cell.len() != m) {
                return Err(CutError::Snapshot(format!("row {} is not {}x{}", i, n, m)));
            }
        }
        Self::per_vehicle(n, m, x.iter().flatten().flatten().copied().collect())
    }

    /// Flat position of `(i, j, k)` for `n` nodes and `m` vehicles
    #[inline]
    pub fn index(n: usize, m: usize, i: usize, j: usize, k: usize) -> usize {
        (i * n + j) * m + k
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn num_vehicles(&self) -> usize {
        match self.layout {
            Layout::Aggregated => 1,
            Layout::PerVehicle(m) => m,
        }
    }

    #[inline]
    pub fn value(&self, i: usize, j: usize, k: usize) -> f64 {
        self.values[Self::index(self.nodes, self.num_vehicles(), i, j, k)]
    }

    /// Load value of node `i`, if the model has load variables
    pub fn load(&self, i: usize) -> Option<f64> {
        self.loads.get(i).copied()
    }

    pub fn has_loads(&self) -> bool {
        !self.loads.is_empty()
    }
}

impl ArcValues for EdgeSnapshot {
    fn num_nodes(&self) -> usize {
        self.nodes
    }

    #[inline]
    fn arc_value(&self, from: usize, to: usize, vehicle: Option<usize>) -> f64 {
        self.value(from, to, vehicle.unwrap_or(0))
    }
}

/// JSON form of a snapshot, as read by the `separate` command.
///
/// `{"x": [[[..]]]}` is a 3-index candidate, `{"x": [[..]], "loads": [..]}` a 2-index one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SnapshotFile {
    PerVehicle { x: Vec<Vec<Vec<f64>>> },
    Aggregated {
        x: Vec<Vec<f64>>,
        #[serde(default)]
        loads: Vec<f64>,
    },
}

impl TryFrom<SnapshotFile> for EdgeSnapshot {
    type Error = CutError;

    fn try_from(file: SnapshotFile) -> Result<Self, Self::Error> {
        match file {
            SnapshotFile::PerVehicle { x } => EdgeSnapshot::from_tensor(&x),
            SnapshotFile::Aggregated { x, loads } => EdgeSnapshot::from_matrix(&x, loads),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tensor_layout_matches_index() {
        // 2 nodes, 2 vehicles: x[0][1][1] = 1, x[1][0][1] = 1
        let mut x = vec![vec![vec![0.0; 2]; 2]; 2];
        x[0][1][1] = 1.0;
        x[1][0][1] = 1.0;
        let snapshot = EdgeSnapshot::from_tensor(&x).unwrap();

        assert_eq!(snapshot.layout(), Layout::PerVehicle(2));
        assert_eq!(snapshot.value(0, 1, 1), 1.0);
        assert_eq!(snapshot.value(0, 1, 0), 0.0);
        assert_eq!(snapshot.arc_value(1, 0, Some(1)), 1.0);
    }

    #[test]
    fn test_ragged_matrix_is_rejected() {
        let x = vec![vec![0.0, 1.0], vec![1.0]];
        assert!(matches!(EdgeSnapshot::from_matrix(&x, vec![]), Err(CutError::Snapshot(_))));
    }

    #[test]
    fn test_load_count_is_checked() {
        let x = vec![vec![0.0, 1.0], vec![1.0, 0.0]];
        assert!(EdgeSnapshot::from_matrix(&x, vec![0.0]).is_err());
        let snapshot = EdgeSnapshot::from_matrix(&x, vec![0.0, 3.0]).unwrap();
        assert_eq!(snapshot.load(1), Some(3.0));
        assert_eq!(snapshot.num_vehicles(), 1);
    }

    #[test]
    fn test_json_shapes_are_told_apart() {
        let three: SnapshotFile = serde_json::from_str(r#"{"x": [[[0.0],[1.0]],[[1.0],[0.0]]]}"#).unwrap();
        let two: SnapshotFile = serde_json::from_str(r#"{"x": [[0.0,1.0],[1.0,0.0]], "loads": [0.0, 2.0]}"#).unwrap();

        let three = EdgeSnapshot::try_from(three).unwrap();
        let two = EdgeSnapshot::try_from(two).unwrap();

        assert_eq!(three.layout(), Layout::PerVehicle(1));
        assert_eq!(two.layout(), Layout::Aggregated);
        assert!(two.has_loads());
    }
}
