//! VRP MIP Solver Library
//!
//! Lazy cut generation for two mixed-integer formulations of the
//! capacitated Vehicle Routing Problem, and the Gurobi models they plug into.
//!
//! # Features
//!
//! - Instance parsing and seeded random generation
//! - Decoding of candidate arc values into successors, vehicle routes and cycles
//! - Capacity cuts for the 3-index model, load-strengthened subtour cuts for the 2-index model
//! - A solver-independent callback driver submitting cuts to a [`cuts::CutSink`]
//! - Branch-and-cut with Gurobi (`gurobi` feature)
//!
//! # Example
//!
//! ```no_run
//! use vrp_mip_solver::cuts::{CallbackDriver, CapacityCutGenerator, Cut, CutConfig, EdgeSnapshot};
//! use vrp_mip_solver::instance::VrpInstance;
//!
//! let instance = VrpInstance::from_file("instance.txt").unwrap();
//! let config = CutConfig::default();
//! let mut driver = CallbackDriver::new(CapacityCutGenerator::new(&instance, &config));
//!
//! let n = instance.dimension;
//! let m = instance.num_vehicles();
//! let snapshot = EdgeSnapshot::per_vehicle(n, m, vec![0.0; n * n * m]).unwrap();
//!
//! let mut cuts: Vec<Cut> = Vec::new();
//! driver.on_integer_solution(&snapshot, &mut cuts);
//! for cut in &cuts {
//!     println!("{}", cut);
//! }
//! ```

pub mod instance;
pub mod cuts;
pub mod solution;
pub mod exact;

pub use instance::VrpInstance;
pub use solution::RoutingSolution;
