//! Classifies a decomposed candidate.

use super::tours::{CycleDecomposition, Tour, VehicleTours};

/// Why a candidate is not a valid set of routes
#[derive(Debug, Clone, PartialEq)]
pub enum Violation {
    /// Some customers are on no vehicle route
    Disconnected {
        served: Vec<usize>,
        orphaned: Vec<usize>,
        /// Aggregate demand of the orphaned customers
        demand: f64,
    },
    /// A cycle misses part of the nodes; customers only, depot removed
    Subtour { cycle: Tour },
}

/// 3-index check: the candidate is feasible iff every node is served.
/// `demands` is indexed by node id.
pub fn detect_orphans(tours: &VehicleTours, demands: &[f64]) -> Option<Violation> {
    let orphaned = tours.orphaned();
    if orphaned.is_empty() {
        return None;
    }
    let demand = orphaned.iter().map(|&i| demands[i]).sum();
    Some(Violation::Disconnected {
        served: tours.served_nodes(),
        orphaned,
        demand,
    })
}

/// 2-index check: the candidate is feasible iff one cycle goes through every node.
///
/// Otherwise the shortest cycle that can be cut is returned without the depot.
/// A cycle can be cut when it keeps at least two customers once the depot is
/// removed, and not every customer. Ties keep the first cycle found.
pub fn detect_subtour(decomposition: &CycleDecomposition, depot: usize) -> Option<Violation> {
    if decomposition.is_single_tour() {
        return None;
    }
    let customers = decomposition.num_nodes.saturating_sub(1);

    let mut best: Option<(usize, Tour)> = None;
    for cycle in decomposition.subtours() {
        if best.as_ref().map_or(false, |(len, _)| cycle.len() >= *len) {
            continue;
        }
        let kept: Tour = cycle.iter().copied().filter(|&i| i != depot).collect();
        if kept.len() < 2 || kept.len() == customers {
            log::trace!("cycle {:?} has no customer pair to cut", cycle);
            continue;
        }
        best = Some((cycle.len(), kept));
    }

    match best {
        Some((_, cycle)) => Some(Violation::Subtour { cycle }),
        None => {
            log::debug!("{} cycles, none can be cut", decomposition.cycles.len());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orphan_demand_is_summed() {
        let tours = VehicleTours {
            tours: vec![(0, vec![0, 1, 0])],
            served: vec![true, true, false, false],
        };
        let violation = detect_orphans(&tours, &[0.0, 4.0, 2.5, 3.0]).unwrap();

        assert_eq!(violation, Violation::Disconnected {
            served: vec![0, 1],
            orphaned: vec![2, 3],
            demand: 5.5,
        });
    }

    #[test]
    fn test_all_served_is_feasible() {
        let tours = VehicleTours {
            tours: vec![(0, vec![0, 1, 0]), (1, vec![0, 2, 0])],
            served: vec![true, true, true],
        };
        assert_eq!(detect_orphans(&tours, &[0.0, 1.0, 1.0]), None);
    }

    #[test]
    fn test_subtour_drops_depot() {
        let decomposition = CycleDecomposition {
            cycles: vec![vec![0, 3, 4], vec![1, 2]],
            num_nodes: 5,
        };
        // shortest is [1, 2]
        assert_eq!(detect_subtour(&decomposition, 0), Some(Violation::Subtour { cycle: vec![1, 2] }));

        let decomposition = CycleDecomposition {
            cycles: vec![vec![0, 4, 5], vec![1, 2, 3]],
            num_nodes: 6,
        };
        // first of the two shortest, depot removed
        assert_eq!(detect_subtour(&decomposition, 0), Some(Violation::Subtour { cycle: vec![4, 5] }));
    }

    #[test]
    fn test_lone_customer_cycle_does_not_hide_subtour() {
        // 0 -> 4 -> 0 is shorter but keeps one customer
        let decomposition = CycleDecomposition {
            cycles: vec![vec![0, 4], vec![1, 2, 3]],
            num_nodes: 5,
        };
        assert_eq!(detect_subtour(&decomposition, 0), Some(Violation::Subtour { cycle: vec![1, 2, 3] }));

        let decomposition = CycleDecomposition {
            cycles: vec![vec![0, 1], vec![2, 3, 4, 5]],
            num_nodes: 6,
        };
        assert_eq!(detect_subtour(&decomposition, 0), Some(Violation::Subtour { cycle: vec![2, 3, 4, 5] }));
    }

    #[test]
    fn test_no_cuttable_cycle_gives_no_violation() {
        // 0 -> 1 -> 0 and 2 -> 2
        let decomposition = CycleDecomposition {
            cycles: vec![vec![0, 1], vec![2]],
            num_nodes: 3,
        };
        assert_eq!(detect_subtour(&decomposition, 0), None);
    }

    #[test]
    fn test_depot_self_loop_gives_no_violation() {
        // shortest cycle is the depot alone, nothing is left to cut
        let decomposition = CycleDecomposition {
            cycles: vec![vec![0], vec![1, 2, 3]],
            num_nodes: 4,
        };
        assert_eq!(detect_subtour(&decomposition, 0), None);
    }

    #[test]
    fn test_single_tour_is_feasible() {
        let decomposition = CycleDecomposition {
            cycles: vec![vec![0, 2, 1, 3]],
            num_nodes: 4,
        };
        assert_eq!(detect_subtour(&decomposition, 0), None);
    }
}
