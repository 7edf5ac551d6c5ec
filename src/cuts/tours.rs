//! Splits decoded successors into tours.
//!
//! Both decompositions run the same walk: take an unvisited node, follow its
//! successor until the walk comes back to where it started, repeat until no
//! start is left. They differ in where walks start and what is returned.

use super::decoder::{decode, ArcValues, Successors};
use super::ConsistencyError;

/// Node sequence of a route or a cycle
pub type Tour = Vec<usize>;

/// A way to split a candidate into tours
pub trait Decomposer {
    type Output;

    fn decompose<A: ArcValues + ?Sized>(&self, values: &A) -> Result<Self::Output, ConsistencyError>;
}

/// Routes of the 3-index model, one walk per vehicle from the depot
#[derive(Debug, Clone)]
pub struct PerVehicle {
    pub vehicles: usize,
    pub depot: usize,
    pub threshold: f64,
}

/// Cycles of the 2-index model, over all nodes
#[derive(Debug, Clone)]
pub struct Aggregated {
    pub threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleTours {
    /// `(vehicle, depot .. depot)` for every vehicle leaving the depot
    pub tours: Vec<(usize, Tour)>,
    /// Nodes reached by some vehicle, depot included
    pub served: Vec<bool>,
}

impl VehicleTours {
    /// Customers no vehicle reaches, in id order
    pub fn orphaned(&self) -> Vec<usize> {
        self.served.iter()
            .enumerate()
            .filter(|(_, served)| !**served)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn served_nodes(&self) -> Vec<usize> {
        self.served.iter()
            .enumerate()
            .filter(|(_, served)| **served)
            .map(|(i, _)| i)
            .collect()
    }
}

impl Decomposer for PerVehicle {
    type Output = VehicleTours;

    fn decompose<A: ArcValues + ?Sized>(&self, values: &A) -> Result<VehicleTours, ConsistencyError> {
        let n = values.num_nodes();
        let mut served = vec![false; n];
        let mut tours = Vec::with_capacity(self.vehicles);
        if self.depot >= n {
            return Ok(VehicleTours { tours, served });
        }
        served[self.depot] = true;

        for k in 0..self.vehicles {
            let succ = decode(values, Some(k), self.threshold)?;
            if succ.next(self.depot).is_none() {
                log::trace!("vehicle {} stays at the depot", k);
                continue;
            }

            let mut tour = vec![self.depot];
            let mut cursor = self.depot;
            loop {
                let next = succ.require(cursor)?;
                tour.push(next);
                if next == self.depot {
                    break;
                }
                // a node seen before, on this route or another, would loop or be served twice
                if served[next] {
                    return Err(ConsistencyError::Revisit { node: next, vehicle: Some(k) });
                }
                served[next] = true;
                cursor = next;
            }
            tours.push((k, tour));
        }

        Ok(VehicleTours { tours, served })
    }
}

/// Disjoint cycles covering every node, in order of their lowest node id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleDecomposition {
    pub cycles: Vec<Tour>,
    pub num_nodes: usize,
}

impl CycleDecomposition {
    /// True when one cycle goes through every node
    pub fn is_single_tour(&self) -> bool {
        self.cycles.len() == 1 && self.cycles[0].len() == self.num_nodes
    }

    /// Cycles not covering every node, in discovery order
    pub fn subtours(&self) -> impl Iterator<Item = &Tour> + '_ {
        self.cycles.iter().filter(move |c| c.len() < self.num_nodes)
    }
}

impl Aggregated {
    /// Cycle decomposition of already decoded successors
    pub fn cycles(succ: &Successors) -> Result<CycleDecomposition, ConsistencyError> {
        let n = succ.len();
        let mut visited = vec![false; n];
        let mut cycles = Vec::new();

        for start in 0..n {
            if visited[start] {
                continue;
            }
            visited[start] = true;
            let mut cycle = vec![start];
            let mut cursor = start;
            loop {
                let next = succ.require(cursor)?;
                if next == start {
                    break;
                }
                if visited[next] {
                    return Err(ConsistencyError::Revisit { node: next, vehicle: succ.vehicle() });
                }
                visited[next] = true;
                cycle.push(next);
                cursor = next;
            }
            cycles.push(cycle);
        }

        Ok(CycleDecomposition { cycles, num_nodes: n })
    }
}

impl Decomposer for Aggregated {
    type Output = CycleDecomposition;

    fn decompose<A: ArcValues + ?Sized>(&self, values: &A) -> Result<CycleDecomposition, ConsistencyError> {
        let succ = decode(values, None, self.threshold)?;
        Self::cycles(&succ)
    }
}
