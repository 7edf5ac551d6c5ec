//! Turns raw arc values into a successor table.

use super::ConsistencyError;

/// Anything that can tell the value of arc `(from, to)`, optionally for one vehicle
pub trait ArcValues {
    fn num_nodes(&self) -> usize;
    fn arc_value(&self, from: usize, to: usize, vehicle: Option<usize>) -> f64;
}

/// Successor of every node for one vehicle (or for the aggregated arcs).
/// `None` means the node has no outgoing arc above the threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Successors {
    vehicle: Option<usize>,
    next: Vec<Option<usize>>,
}

impl Successors {
    #[inline]
    pub fn next(&self, node: usize) -> Option<usize> {
        self.next[node]
    }

    /// Successor of a node the route has to leave
    #[inline]
    pub fn require(&self, node: usize) -> Result<usize, ConsistencyError> {
        self.next[node].ok_or(ConsistencyError::MissingArc { node, vehicle: self.vehicle })
    }

    pub fn vehicle(&self) -> Option<usize> {
        self.vehicle
    }

    pub fn len(&self) -> usize {
        self.next.len()
    }

    pub fn is_empty(&self) -> bool {
        self.next.is_empty()
    }
}

/// Decode the arcs of `vehicle` whose value exceeds `threshold`.
///
/// Fails when a node has more than one such arc: both formulations bound the
/// out-degree to one, so the candidate is broken.
pub fn decode<A: ArcValues + ?Sized>(
    values: &A,
    vehicle: Option<usize>,
    threshold: f64,
) -> Result<Successors, ConsistencyError> {
    let n = values.num_nodes();
    let mut next = Vec::with_capacity(n);

    for i in 0..n {
        let mut target = None;
        let mut arcs = 0;
        for j in 0..n {
            if values.arc_value(i, j, vehicle) > threshold {
                arcs += 1;
                target.get_or_insert(j);
            }
        }
        if arcs > 1 {
            return Err(ConsistencyError::MultipleArcs { node: i, vehicle, arcs });
        }
        next.push(target);
    }

    Ok(Successors { vehicle, next })
}
