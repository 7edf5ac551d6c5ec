//! Linear inequalities handed back to the solver.

use super::decoder::ArcValues;
use super::snapshot::EdgeSnapshot;
use super::{CapacityRhs, CutError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Model variable a cut refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarRef {
    /// `x[from][to]`, or `x[from][to][vehicle]` in the 3-index model
    Arc { from: usize, to: usize, vehicle: Option<usize> },
    /// Load variable `u[node]`
    Load(usize),
}

impl fmt::Display for VarRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarRef::Arc { from, to, vehicle: Some(k) } => write!(f, "x[{}][{}][{}]", from, to, k),
            VarRef::Arc { from, to, vehicle: None } => write!(f, "x[{}][{}]", from, to),
            VarRef::Load(i) => write!(f, "u[{}]", i),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Sense {
    LessEqual,
    GreaterEqual,
    Equal,
}

impl fmt::Display for Sense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Sense::LessEqual => "<=",
            Sense::GreaterEqual => ">=",
            Sense::Equal => "=",
        })
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum CutKind {
    Capacity,
    Subtour,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Term {
    pub var: VarRef,
    pub coeff: f64,
}

/// `Σ coeff · var  sense  rhs`. Terms are kept in the order they were added;
/// a variable may appear more than once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cut {
    pub kind: CutKind,
    pub terms: Vec<Term>,
    pub sense: Sense,
    pub rhs: f64,
}

impl Cut {
    pub fn new(kind: CutKind, sense: Sense, rhs: f64) -> Self {
        Cut { kind, terms: Vec::new(), sense, rhs }
    }

    pub fn add_term(&mut self, coeff: f64, var: VarRef) -> &mut Self {
        self.terms.push(Term { var, coeff });
        self
    }

    /// Sparse form: one coefficient per variable, zero coefficients dropped
    pub fn coefficients(&self) -> BTreeMap<VarRef, f64> {
        let mut merged = BTreeMap::new();
        for term in &self.terms {
            *merged.entry(term.var).or_insert(0.0) += term.coeff;
        }
        merged.retain(|_, coeff| *coeff != 0.0);
        merged
    }

    /// Left-hand side value at a candidate
    pub fn evaluate(&self, snapshot: &EdgeSnapshot) -> Result<f64, CutError> {
        let mut lhs = 0.0;
        for term in &self.terms {
            let value = match term.var {
                VarRef::Arc { from, to, vehicle } => snapshot.arc_value(from, to, vehicle),
                VarRef::Load(i) => snapshot.load(i)
                    .ok_or_else(|| CutError::Snapshot(format!("no load value for node {}", i)))?,
            };
            lhs += term.coeff * value;
        }
        Ok(lhs)
    }

    /// Whether the candidate breaks this inequality by more than `tolerance`
    pub fn is_violated_by(&self, snapshot: &EdgeSnapshot, tolerance: f64) -> Result<bool, CutError> {
        let lhs = self.evaluate(snapshot)?;
        Ok(match self.sense {
            Sense::LessEqual => lhs > self.rhs + tolerance,
            Sense::GreaterEqual => lhs < self.rhs - tolerance,
            Sense::Equal => (lhs - self.rhs).abs() > tolerance,
        })
    }
}

impl fmt::Display for Cut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let coefficients = self.coefficients();
        if coefficients.is_empty() {
            f.write_str("0")?;
        }
        for (pos, (var, coeff)) in coefficients.iter().enumerate() {
            if pos > 0 {
                f.write_str(if *coeff < 0.0 { " - " } else { " + " })?;
            } else if *coeff < 0.0 {
                f.write_str("-")?;
            }
            write!(f, "{} {}", coeff.abs(), var)?;
        }
        write!(f, " {} {}", self.sense, self.rhs)
    }
}

/// Capacity cut of the 3-index model:
/// `Σ_{i ∈ served, j ∈ orphaned, k} x[i][j][k] >= demand / capacity`.
///
/// Every vehicle brings at most `capacity` across the boundary per trip, so
/// any feasible routing crosses it at least `demand / capacity` times.
/// Orphans without demand still have to be reached once.
pub fn capacity_cut(
    served: &[usize],
    orphaned: &[usize],
    demand: f64,
    capacity: f64,
    vehicles: usize,
    rhs: CapacityRhs,
) -> Cut {
    let bound = match rhs {
        CapacityRhs::Fractional => demand / capacity,
        CapacityRhs::Ceiling => (demand / capacity).ceil(),
    };
    let bound = if demand > 0.0 { bound } else { 1.0 };

    let mut cut = Cut::new(CutKind::Capacity, Sense::GreaterEqual, bound);
    cut.terms.reserve(served.len() * orphaned.len() * vehicles);
    for &i in served {
        for &j in orphaned {
            for k in 0..vehicles {
                cut.add_term(1.0, VarRef::Arc { from: i, to: j, vehicle: Some(k) });
            }
        }
    }
    cut
}

/// Load-strengthened subtour cut of the 2-index model over cycle `t` (no depot):
/// for every ordered pair `a != b`, `u[t_a] - u[t_b] + (L + 1) x[t_a][t_b]`,
/// summed, `<= L`.
pub fn subtour_cut(cycle: &[usize]) -> Cut {
    let len = cycle.len();
    let big_m = (len + 1) as f64;

    let mut cut = Cut::new(CutKind::Subtour, Sense::LessEqual, len as f64);
    cut.terms.reserve(3 * len * len.saturating_sub(1));
    for (a, &ta) in cycle.iter().enumerate() {
        for (b, &tb) in cycle.iter().enumerate() {
            if a == b {
                continue;
            }
            cut.add_term(1.0, VarRef::Load(ta))
                .add_term(-1.0, VarRef::Load(tb))
                .add_term(big_m, VarRef::Arc { from: ta, to: tb, vehicle: None });
        }
    }
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arc_terms(cut: &Cut) -> Vec<VarRef> {
        cut.terms.iter()
            .filter(|t| matches!(t.var, VarRef::Arc { .. }))
            .map(|t| t.var)
            .collect()
    }

    #[test]
    fn test_capacity_cut_crosses_boundary_only() {
        let cut = capacity_cut(&[0, 1, 2], &[3], 4.0, 10.0, 2, CapacityRhs::Fractional);

        assert_eq!(cut.sense, Sense::GreaterEqual);
        assert!((cut.rhs - 0.4).abs() < 1e-12);
        assert_eq!(cut.terms.len(), 3 * 2);
        for term in &cut.terms {
            match term.var {
                VarRef::Arc { from, to, vehicle } => {
                    assert!(from <= 2);
                    assert_eq!(to, 3);
                    assert!(vehicle.unwrap() < 2);
                }
                VarRef::Load(_) => panic!("capacity cut has no load term"),
            }
            assert_eq!(term.coeff, 1.0);
        }
    }

    #[test]
    fn test_capacity_cut_ceiling() {
        let cut = capacity_cut(&[0], &[1, 2], 12.0, 10.0, 1, CapacityRhs::Ceiling);
        assert_eq!(cut.rhs, 2.0);
    }

    #[test]
    fn test_capacity_cut_without_demand_asks_one_crossing() {
        let cut = capacity_cut(&[0], &[1], 0.0, 10.0, 1, CapacityRhs::Fractional);
        assert_eq!(cut.rhs, 1.0);
    }

    #[test]
    fn test_subtour_cut_on_triangle() {
        let cut = subtour_cut(&[1, 2, 3]);

        assert_eq!(cut.sense, Sense::LessEqual);
        assert_eq!(cut.rhs, 3.0);
        assert_eq!(cut.terms.len(), 6 * 3);

        let arcs = arc_terms(&cut);
        assert_eq!(arcs.len(), 6);
        for (from, to) in [(1, 2), (1, 3), (2, 1), (2, 3), (3, 1), (3, 2)] {
            assert!(arcs.contains(&VarRef::Arc { from, to, vehicle: None }));
        }
        assert!(cut.terms.iter()
            .filter(|t| matches!(t.var, VarRef::Arc { .. }))
            .all(|t| t.coeff == 4.0));
    }

    #[test]
    fn test_subtour_cut_cuts_off_its_cycle() {
        // 0 -> 4 -> 0 and 1 -> 2 -> 3 -> 1
        let mut x = vec![vec![0.0; 5]; 5];
        for (i, j) in [(0, 4), (4, 0), (1, 2), (2, 3), (3, 1)] {
            x[i][j] = 1.0;
        }
        let snapshot = EdgeSnapshot::from_matrix(&x, vec![0.0, 2.0, 5.0, 7.0, 3.0]).unwrap();
        let cut = subtour_cut(&[1, 2, 3]);

        assert!(cut.is_violated_by(&snapshot, 1e-6).unwrap());
    }

    #[test]
    fn test_coefficients_merge_repeated_variables() {
        let mut cut = Cut::new(CutKind::Subtour, Sense::LessEqual, 1.0);
        cut.add_term(1.0, VarRef::Load(1))
            .add_term(-1.0, VarRef::Load(1))
            .add_term(2.0, VarRef::Load(2))
            .add_term(1.5, VarRef::Load(2));

        let merged = cut.coefficients();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[&VarRef::Load(2)], 3.5);
    }

    #[test]
    fn test_evaluate_needs_loads() {
        let x = vec![vec![0.0, 1.0], vec![1.0, 0.0]];
        let snapshot = EdgeSnapshot::from_matrix(&x, vec![]).unwrap();
        let mut cut = Cut::new(CutKind::Subtour, Sense::LessEqual, 1.0);
        cut.add_term(1.0, VarRef::Load(1));

        assert!(matches!(cut.evaluate(&snapshot), Err(CutError::Snapshot(_))));
    }

    #[test]
    fn test_display() {
        let mut cut = Cut::new(CutKind::Subtour, Sense::LessEqual, 2.0);
        cut.add_term(1.0, VarRef::Load(1))
            .add_term(-1.0, VarRef::Load(2))
            .add_term(3.0, VarRef::Arc { from: 1, to: 2, vehicle: None });

        assert_eq!(cut.to_string(), "3 x[1][2] + 1 u[1] - 1 u[2] <= 2");
    }
}
