//! Entry point called by the solver on every integer candidate.

use super::cut::{capacity_cut, subtour_cut, Cut, CutKind};
use super::decoder::ArcValues;
use super::snapshot::{EdgeSnapshot, Layout};
use super::tours::{Aggregated, Decomposer, PerVehicle};
use super::violation::{detect_orphans, detect_subtour, Violation};
use super::{CutConfig, CutError};
use crate::instance::{VrpInstance, DEPOT};
use serde::{Deserialize, Serialize};

/// Where cuts go. Submission is final: the solver keeps the cut for the rest of the search.
pub trait CutSink {
    fn submit_cut(&mut self, cut: Cut);
}

impl CutSink for Vec<Cut> {
    fn submit_cut(&mut self, cut: Cut) {
        self.push(cut);
    }
}

/// Separation routine for one formulation.
///
/// Implementations only read the instance, so one generator may serve
/// callbacks from several solver threads.
pub trait CutGenerator: Sync {
    /// Cuts that exclude the candidate; empty when it is a valid set of routes
    fn separate(&self, snapshot: &EdgeSnapshot) -> Result<Vec<Cut>, CutError>;

    fn name(&self) -> &str;
}

/// Capacity cuts for the 3-index model
pub struct CapacityCutGenerator<'a> {
    demands: Vec<f64>,
    capacity: f64,
    vehicles: usize,
    config: &'a CutConfig,
}

impl<'a> CapacityCutGenerator<'a> {
    pub fn new(instance: &VrpInstance, config: &'a CutConfig) -> Self {
        CapacityCutGenerator {
            demands: instance.nodes.iter().map(|n| n.demand).collect(),
            capacity: instance.capacity(),
            vehicles: instance.num_vehicles(),
            config,
        }
    }
}

impl<'a> CutGenerator for CapacityCutGenerator<'a> {
    fn separate(&self, snapshot: &EdgeSnapshot) -> Result<Vec<Cut>, CutError> {
        if snapshot.layout() != Layout::PerVehicle(self.vehicles) || snapshot.num_nodes() != self.demands.len() {
            return Err(CutError::Snapshot(format!(
                "expected {} nodes and {} vehicles, got {} nodes and {:?}",
                self.demands.len(), self.vehicles, snapshot.num_nodes(), snapshot.layout()
            )));
        }

        let decomposer = PerVehicle {
            vehicles: self.vehicles,
            depot: DEPOT,
            threshold: self.config.threshold,
        };
        let tours = decomposer.decompose(snapshot)?;
        log::trace!("vehicle tours: {:?}", tours.tours);

        match detect_orphans(&tours, &self.demands) {
            Some(Violation::Disconnected { served, orphaned, demand }) => {
                log::debug!("{} orphaned customers with demand {}", orphaned.len(), demand);
                Ok(vec![capacity_cut(&served, &orphaned, demand, self.capacity, self.vehicles, self.config.capacity_rhs)])
            }
            _ => Ok(Vec::new()),
        }
    }

    fn name(&self) -> &str {
        "capacity"
    }
}

/// Load-strengthened subtour cuts for the 2-index model
pub struct SubtourCutGenerator<'a> {
    nodes: usize,
    config: &'a CutConfig,
}

impl<'a> SubtourCutGenerator<'a> {
    pub fn new(instance: &VrpInstance, config: &'a CutConfig) -> Self {
        SubtourCutGenerator { nodes: instance.dimension, config }
    }
}

impl<'a> CutGenerator for SubtourCutGenerator<'a> {
    fn separate(&self, snapshot: &EdgeSnapshot) -> Result<Vec<Cut>, CutError> {
        if snapshot.layout() != Layout::Aggregated || snapshot.num_nodes() != self.nodes {
            return Err(CutError::Snapshot(format!(
                "expected {} nodes with aggregated arcs, got {} nodes and {:?}",
                self.nodes, snapshot.num_nodes(), snapshot.layout()
            )));
        }

        let decomposition = Aggregated { threshold: self.config.threshold }.decompose(snapshot)?;
        log::trace!("cycles: {:?}", decomposition.cycles);

        match detect_subtour(&decomposition, DEPOT) {
            Some(Violation::Subtour { cycle }) => {
                log::debug!("subtour over {:?}", cycle);
                Ok(vec![subtour_cut(&cycle)])
            }
            _ => Ok(Vec::new()),
        }
    }

    fn name(&self) -> &str {
        "subtour"
    }
}

/// Counters over all invocations of a driver
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CutStats {
    pub invocations: usize,
    pub feasible: usize,
    pub capacity_cuts: usize,
    pub subtour_cuts: usize,
    pub consistency_errors: usize,
    pub invalid_snapshots: usize,
}

impl CutStats {
    pub fn total_cuts(&self) -> usize {
        self.capacity_cuts + self.subtour_cuts
    }

    fn record_cut(&mut self, kind: CutKind) {
        match kind {
            CutKind::Capacity => self.capacity_cuts += 1,
            CutKind::Subtour => self.subtour_cuts += 1,
        }
    }
}

impl std::fmt::Display for CutStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Lazy cut callback")?;
        writeln!(f, "  Integer candidates: {}", self.invocations)?;
        writeln!(f, "  Accepted: {}", self.feasible)?;
        writeln!(f, "  Capacity cuts: {}", self.capacity_cuts)?;
        writeln!(f, "  Subtour cuts: {}", self.subtour_cuts)?;
        writeln!(f, "  Inconsistent candidates: {}", self.consistency_errors)?;
        writeln!(f, "  Invalid snapshots: {}", self.invalid_snapshots)
    }
}

/// What one invocation did
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The candidate is a valid set of routes
    Feasible,
    /// This many cuts were submitted
    Cut(usize),
    /// Nothing was submitted because separation failed
    Skipped(CutError),
}

/// Runs a generator on each candidate and forwards its cuts to a sink
pub struct CallbackDriver<G> {
    generator: G,
    stats: CutStats,
}

impl<G: CutGenerator> CallbackDriver<G> {
    pub fn new(generator: G) -> Self {
        CallbackDriver { generator, stats: CutStats::default() }
    }

    pub fn stats(&self) -> &CutStats {
        &self.stats
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Handle one integer candidate. Errors are logged and never reach the
    /// solver: a missing cut costs search time, not correctness.
    pub fn on_integer_solution<S: CutSink + ?Sized>(&mut self, snapshot: &EdgeSnapshot, sink: &mut S) -> Outcome {
        self.stats.invocations += 1;

        let cuts = match self.generator.separate(snapshot) {
            Ok(cuts) => cuts,
            Err(e) => {
                log::warn!("{} callback: {}, no cut submitted", self.generator.name(), e);
                match e {
                    CutError::Consistency(_) => self.stats.consistency_errors += 1,
                    CutError::Snapshot(_) => self.stats.invalid_snapshots += 1,
                }
                return Outcome::Skipped(e);
            }
        };

        if cuts.is_empty() {
            log::trace!("{} callback: candidate accepted", self.generator.name());
            self.stats.feasible += 1;
            return Outcome::Feasible;
        }

        let count = cuts.len();
        for cut in cuts {
            log::debug!("{} callback: adding {:?} cut with {} terms, rhs {}",
                self.generator.name(), cut.kind, cut.terms.len(), cut.rhs);
            self.stats.record_cut(cut.kind);
            sink.submit_cut(cut);
        }
        Outcome::Cut(count)
    }
}
