//! VRP MIP Solver - Command Line Interface
//!
//! Branch-and-cut for the capacitated VRP, and offline cut separation on
//! saved candidate solutions.

use clap::{Parser, Subcommand, ValueEnum};
use vrp_mip_solver::cuts::{
    CallbackDriver, CapacityCutGenerator, CapacityRhs, Cut, CutConfig, CutGenerator, EdgeSnapshot,
    Layout, Outcome, SnapshotFile, SubtourCutGenerator, ARC_THRESHOLD,
};
use vrp_mip_solver::exact::{Formulation, GurobiConfig, GurobiSolver};
use vrp_mip_solver::instance::VrpInstance;

use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vrp-mip-solver")]
#[command(version = "1.0")]
#[command(about = "Branch-and-cut for the capacitated VRP with lazy capacity and subtour cuts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve an instance with Gurobi
    Solve {
        #[arg(short, long)]
        instance: PathBuf,

        /// MIP formulation
        #[arg(short, long, value_enum, default_value = "three-index")]
        formulation: Model,

        /// Time limit in seconds
        #[arg(short, long, default_value = "200")]
        time_limit: f64,

        /// Number of solver threads (0 = automatic)
        #[arg(long, default_value = "0")]
        threads: i32,

        /// Right-hand side of capacity cuts
        #[arg(long, value_enum, default_value = "fractional")]
        capacity_rhs: Rhs,

        /// Output solution to file (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write route coordinates for plotting
        #[arg(long)]
        coordinates: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Analyze an instance
    Analyze {
        /// Path to the instance file
        #[arg(short, long)]
        instance: PathBuf,
    },

    /// Generate a random instance
    Generate {
        /// Number of customers
        #[arg(short, long)]
        customers: usize,

        /// Number of vehicles
        #[arg(short = 'm', long, default_value = "3")]
        vehicles: usize,

        /// Vehicle capacity
        #[arg(short = 'C', long, default_value = "100")]
        capacity: f64,

        /// Random seed
        #[arg(short, long, default_value = "1024")]
        seed: u64,

        /// Output instance file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Run cut separation on a saved candidate
    Separate {
        #[arg(short, long)]
        instance: PathBuf,

        /// Candidate arc values (JSON, `{"x": ...}`)
        #[arg(short = 'x', long)]
        snapshot: PathBuf,

        /// Arc presence threshold
        #[arg(long, default_value_t = ARC_THRESHOLD)]
        threshold: f64,

        /// Right-hand side of capacity cuts
        #[arg(long, value_enum, default_value = "fractional")]
        capacity_rhs: Rhs,

        /// Output cuts to file (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum Model {
    /// Per-vehicle arcs, capacity cuts
    ThreeIndex,
    /// Aggregated arcs with loads, subtour cuts
    TwoIndex,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum Rhs {
    /// Orphan demand over capacity
    Fractional,
    /// Rounded up to whole vehicles
    Ceiling,
}

impl From<Rhs> for CapacityRhs {
    fn from(rhs: Rhs) -> Self {
        match rhs {
            Rhs::Fractional => CapacityRhs::Fractional,
            Rhs::Ceiling => CapacityRhs::Ceiling,
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Solve { instance, formulation, time_limit, threads, capacity_rhs, output, coordinates, verbose } => {
            solve_instance(&instance, formulation, time_limit, threads, capacity_rhs, output, coordinates, verbose);
        }

        Commands::Analyze { instance } => {
            analyze_instance(&instance);
        }

        Commands::Generate { customers, vehicles, capacity, seed, output } => {
            generate_instance(customers, vehicles, capacity, seed, &output);
        }

        Commands::Separate { instance, snapshot, threshold, capacity_rhs, output } => {
            separate(&instance, &snapshot, threshold, capacity_rhs, output);
        }
    }
}

fn load_instance(path: &PathBuf) -> VrpInstance {
    match VrpInstance::from_file(path) {
        Ok(inst) => inst,
        Err(e) => {
            eprintln!("Error loading instance: {}", e);
            std::process::exit(1);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn solve_instance(
    path: &PathBuf,
    formulation: Model,
    time_limit: f64,
    threads: i32,
    capacity_rhs: Rhs,
    output: Option<PathBuf>,
    coordinates: Option<PathBuf>,
    verbose: bool,
) {
    println!("Loading instance from {:?}...", path);
    let instance = load_instance(path);

    if verbose {
        println!("{}", instance.statistics());
    }

    let formulation = match formulation {
        Model::ThreeIndex => Formulation::ThreeIndex,
        Model::TwoIndex => Formulation::TwoIndex,
    };
    let config = GurobiConfig {
        time_limit,
        threads,
        verbose,
        cuts: CutConfig { capacity_rhs: capacity_rhs.into(), ..Default::default() },
        ..Default::default()
    };

    println!("Solving with the {} model...", formulation.name());
    let result = match GurobiSolver::new(config).solve(&instance, formulation) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Gurobi solver error: {}", e);
            std::process::exit(1);
        }
    };

    println!("\n========== Results ==========");
    println!("Status: {}", result.status);
    println!("Objective: {:.2}", result.upper_bound);
    println!("Lower bound: {:.2}", result.lower_bound);
    println!("Gap: {:.4}%", result.gap * 100.0);
    println!("Nodes explored: {}", result.nodes_explored);
    println!("\n{}", result.cut_stats);
    println!("{}", result.solution);

    if let Some(out_path) = output {
        let written = serde_json::to_string_pretty(&result.solution)
            .map_err(|e| e.to_string())
            .and_then(|json| std::fs::write(&out_path, json).map_err(|e| e.to_string()));
        match written {
            Ok(()) => println!("Solution saved to {:?}", out_path),
            Err(e) => eprintln!("Failed to write solution: {}", e),
        }
    }

    if let Some(coord_path) = coordinates {
        match result.solution.write_coordinates(&instance, &coord_path) {
            Ok(()) => println!("Coordinates saved to {:?}", coord_path),
            Err(e) => eprintln!("Failed to write coordinates: {}", e),
        }
    }
}

fn analyze_instance(path: &PathBuf) {
    let instance = load_instance(path);

    println!("========== Instance Analysis ==========\n");
    println!("{}", instance.statistics());

    let demands: Vec<f64> = instance.nodes.iter()
        .filter(|n| !n.is_depot())
        .map(|n| n.demand)
        .collect();
    if !demands.is_empty() {
        let avg = demands.iter().sum::<f64>() / demands.len() as f64;
        let min = demands.iter().cloned().fold(f64::INFINITY, f64::min);
        println!("\nDemand Statistics:");
        println!("  Average: {:.2}", avg);
        println!("  Min: {}", min);
        println!("  Capacity utilization ratio: {:.2}%",
            instance.total_demand() / instance.vehicles.iter().map(|v| v.capacity).sum::<f64>() * 100.0);
    }
}

fn generate_instance(customers: usize, vehicles: usize, capacity: f64, seed: u64, output: &PathBuf) {
    let instance = match VrpInstance::random(seed, customers, vehicles, capacity) {
        Ok(inst) => inst,
        Err(e) => {
            eprintln!("Error generating instance: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = std::fs::write(output, instance.to_text()) {
        eprintln!("Failed to write instance: {}", e);
        std::process::exit(1);
    }
    println!("Instance with {} customers saved to {:?}", customers, output);
}

fn separate(path: &PathBuf, snapshot_path: &PathBuf, threshold: f64, capacity_rhs: Rhs, output: Option<PathBuf>) {
    let instance = load_instance(path);

    let snapshot = std::fs::read_to_string(snapshot_path)
        .map_err(|e| format!("Cannot read snapshot: {}", e))
        .and_then(|content| serde_json::from_str::<SnapshotFile>(&content)
            .map_err(|e| format!("Invalid snapshot: {}", e)))
        .and_then(|file| EdgeSnapshot::try_from(file).map_err(|e| e.to_string()));
    let snapshot = match snapshot {
        Ok(snapshot) => snapshot,
        Err(e) => {
            eprintln!("Error loading snapshot: {}", e);
            std::process::exit(1);
        }
    };

    let config = CutConfig { threshold, capacity_rhs: capacity_rhs.into() };
    let mut cuts: Vec<Cut> = Vec::new();
    let outcome = match snapshot.layout() {
        Layout::PerVehicle(_) => run_driver(CapacityCutGenerator::new(&instance, &config), &snapshot, &mut cuts),
        Layout::Aggregated => run_driver(SubtourCutGenerator::new(&instance, &config), &snapshot, &mut cuts),
    };

    match outcome {
        Outcome::Feasible => println!("Candidate is a valid set of routes, no cut"),
        Outcome::Cut(count) => {
            println!("{} cut(s):", count);
            for cut in &cuts {
                println!("  {}", cut);
            }
        }
        Outcome::Skipped(e) => {
            eprintln!("Separation failed: {}", e);
            std::process::exit(1);
        }
    }

    if let Some(out_path) = output {
        let written = serde_json::to_string_pretty(&cuts)
            .map_err(|e| e.to_string())
            .and_then(|json| std::fs::write(&out_path, json).map_err(|e| e.to_string()));
        match written {
            Ok(()) => println!("Cuts saved to {:?}", out_path),
            Err(e) => eprintln!("Failed to write cuts: {}", e),
        }
    }
}

fn run_driver<G: CutGenerator>(generator: G, snapshot: &EdgeSnapshot, cuts: &mut Vec<Cut>) -> Outcome {
    let mut driver = CallbackDriver::new(generator);
    let outcome = driver.on_integer_solution(snapshot, cuts);
    log::debug!("{}", driver.stats());
    outcome
}
