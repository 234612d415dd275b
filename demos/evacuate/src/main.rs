//! evacuate — command-line driver for the evc evacuation router.
//!
//! Loads a road network, evacuees, and safe zones from CSV (or uses the
//! built-in sample town), routes everyone, writes the solution with one of
//! the `evc-output` backends, and optionally walks the routes with the
//! flocking engine to validate them.
//!
//! ```text
//! RUST_LOG=debug evacuate --network roads.csv --evacuees people.csv \
//!     --zones shelters.csv --method casper --flock
//! ```

mod sample;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};

use evc_core::{CarmaSort, CostUnit, SolverConfig, SolverMethod, TrafficModelKind};
use evc_flock::{FlockConfig, FlockEngine, FlockPath, Trajectory};
use evc_graph::load_network_csv;
use evc_output::{write_solution, CsvWriter, OutputWriter, SolveOutputObserver};
use evc_solver::{load_evacuees_csv, load_safe_zones_csv, SolveReport, Solver, SolverBuilder};

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Format {
    Csv,
    Sqlite,
    Parquet,
}

#[derive(Parser)]
#[command(name = "evacuate")]
#[command(about = "Capacity-aware evacuation routing")]
struct Cli {
    /// Road network CSV; the built-in sample town when omitted
    #[arg(long)]
    network: Option<PathBuf>,

    /// Evacuee CSV, one row per origin
    #[arg(long)]
    evacuees: Option<PathBuf>,

    /// Safe-zone CSV
    #[arg(long)]
    zones: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, default_value = "output/evacuate")]
    out: PathBuf,

    #[arg(long, value_enum, default_value = "csv")]
    format: Format,

    /// sp, ccrp, or casper
    #[arg(long, default_value = "casper")]
    method: SolverMethod,

    /// flat, step, linear, exponential, or power
    #[arg(long, default_value = "exponential")]
    traffic_model: TrafficModelKind,

    #[arg(long, default_value_t = 20.0)]
    critical_density: f64,

    #[arg(long, default_value_t = 500.0)]
    saturation_density: f64,

    /// Give each direction of a two-way road its own capacity
    #[arg(long)]
    separate_directions: bool,

    /// Allow an evacuee's population to be split over several paths
    #[arg(long)]
    separable: bool,

    #[arg(long, default_value_t = 0.01)]
    initial_delay: f64,

    #[arg(long, default_value_t = 0.1)]
    carma_ratio: f64,

    #[arg(long, default_value = "bwcont")]
    carma_sort: CarmaSort,

    #[arg(long, default_value_t = 0.0)]
    selfish_ratio: f64,

    #[arg(long, default_value_t = 0.0)]
    iterative_ratio: f64,

    #[arg(long, default_value_t = 3)]
    max_passes: u32,

    #[arg(long, default_value_t = 0.0)]
    zone_density_cost: f64,

    /// Keep the previous CARMA search tree between loops
    #[arg(long)]
    three_generation: bool,

    #[arg(long, default_value = "minutes")]
    cost_unit: CostUnit,

    /// Walk the solved routes with the flocking engine
    #[arg(long)]
    flock: bool,

    #[arg(long, default_value_t = 1.0)]
    flock_speed: f64,

    #[arg(long, default_value_t = 0.1)]
    flock_jitter: f64,

    #[arg(long, default_value_t = 0.05)]
    flock_spacing: f64,

    #[arg(long, default_value_t = 0.1)]
    flock_step: f64,

    #[arg(long, default_value_t = 1.0)]
    flock_snapshot: f64,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

impl Cli {
    fn solver_config(&self) -> SolverConfig {
        SolverConfig {
            solver_method:                     self.method,
            traffic_model:                     self.traffic_model,
            critical_density_per_capacity:     self.critical_density,
            saturation_density_per_capacity:   self.saturation_density,
            two_way_share_capacity:            !self.separate_directions,
            separable_evacuee:                 self.separable,
            initial_delay_cost_per_population: self.initial_delay,
            carma_performance_ratio:           self.carma_ratio,
            carma_sort:                        self.carma_sort,
            selfish_ratio:                     self.selfish_ratio,
            iterative_ratio:                   self.iterative_ratio,
            max_refinement_passes:             self.max_passes,
            cost_per_zone_density:             self.zone_density_cost,
            three_generation_carma:            self.three_generation,
            cost_unit:                         self.cost_unit,
        }
    }

    fn flock_config(&self) -> FlockConfig {
        FlockConfig {
            speed:               self.flock_speed,
            speed_jitter:        self.flock_jitter,
            spacing:             self.flock_spacing,
            simulation_interval: self.flock_step,
            snapshot_interval:   self.flock_snapshot,
            start_spacing:       self.initial_delay,
            seed:                self.seed,
            ..FlockConfig::default()
        }
    }
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Stderr)
        .init();

    println!("=== evacuate — capacity-aware evacuation routing ===");

    // 1. Inputs.
    let (network, evacuees, zones) = match (&cli.network, &cli.evacuees, &cli.zones) {
        (Some(n), Some(e), Some(z)) => (load_network_csv(n)?, load_evacuees_csv(e)?, load_safe_zones_csv(z)?),
        (None, None, None) => {
            println!("No inputs given: using the built-in sample town");
            (sample::network()?, sample::evacuees()?, sample::safe_zones()?)
        }
        _ => bail!("--network, --evacuees and --zones must be given together"),
    };
    println!(
        "Road network: {} junctions, {} edges  |  Evacuees: {}  |  Safe zones: {}",
        network.junction_count(),
        network.edge_count(),
        evacuees.len(),
        zones.len()
    );

    // 2. Solver.
    let config = cli.solver_config();
    println!(
        "Method: {}  |  Traffic model: {:?}  |  Cost unit: {}",
        config.solver_method, config.traffic_model, config.cost_unit
    );
    let mut solver = SolverBuilder::new(config, network)
        .evacuees(evacuees)
        .safe_zones(zones)
        .build()?;

    // 3. Solve and write.
    std::fs::create_dir_all(&cli.out)?;
    log::info!("writing {:?} output to {}", cli.format, cli.out.display());
    let t0 = Instant::now();
    let report = match cli.format {
        Format::Csv => solve_into(&mut solver, CsvWriter::new(&cli.out)?)?,
        Format::Sqlite => solve_sqlite(&mut solver, &cli.out)?,
        Format::Parquet => solve_parquet(&mut solver, &cli.out)?,
    };
    let elapsed = t0.elapsed();

    println!("Solved in {:.3} s", elapsed.as_secs_f64());
    println!("  paths               : {}", report.paths);
    println!("  routed population   : {}", report.routed_population);
    println!("  unrouted population : {}", report.unrouted_population);
    println!("  unreachable         : {}", report.unreachable.len());
    println!("  CARMA loops         : {}", report.carma_loops);
    println!("  refinement passes   : {}", report.refinement_passes);
    println!("  max evacuation cost : {:.3}", report.max_final_cost);
    if report.partial {
        println!("  (partial solution)");
    }
    println!("Output written to {}", cli.out.display());

    // 4. Flocking.
    if cli.flock {
        let paths: Vec<FlockPath> = solver.routes().iter().map(|r| FlockPath::from_route(r, 0.0)).collect();
        let mut engine = FlockEngine::new(cli.flock_config(), paths)?;
        let t0 = Instant::now();
        let flock = engine.run();
        println!();
        println!("Flocking complete in {:.3} s", t0.elapsed().as_secs_f64());
        println!("  agents     : {} ({} arrived)", flock.agents, flock.finished);
        println!("  collisions : {}", flock.collisions);
        println!("  last time  : {:.3}", flock.end_time);

        let file = cli.out.join("trajectories.csv");
        write_trajectories(&file, engine.trajectories())?;
        println!("Trajectories written to {}", file.display());
    }

    Ok(())
}

/// Solve with pass summaries streamed to `writer`, then write the routes.
fn solve_into<W: OutputWriter>(solver: &mut Solver, writer: W) -> Result<SolveReport> {
    let mut obs = SolveOutputObserver::new(writer);
    let report = solver.solve(&mut obs)?;
    if let Some(e) = obs.take_error() {
        eprintln!("output error: {e}");
    }
    write_solution(solver, obs.writer_mut())?;
    Ok(report)
}

#[cfg(feature = "sqlite")]
fn solve_sqlite(solver: &mut Solver, dir: &Path) -> Result<SolveReport> {
    solve_into(solver, evc_output::SqliteWriter::new(dir)?)
}

#[cfg(not(feature = "sqlite"))]
fn solve_sqlite(_solver: &mut Solver, _dir: &Path) -> Result<SolveReport> {
    bail!("built without the `sqlite` feature")
}

#[cfg(feature = "parquet")]
fn solve_parquet(solver: &mut Solver, dir: &Path) -> Result<SolveReport> {
    solve_into(solver, evc_output::ParquetWriter::new(dir)?)
}

#[cfg(not(feature = "parquet"))]
fn solve_parquet(_solver: &mut Solver, _dir: &Path) -> Result<SolveReport> {
    bail!("built without the `parquet` feature")
}

fn write_trajectories(path: &Path, trajectories: &[Trajectory]) -> Result<()> {
    let mut w = csv::Writer::from_path(path)?;
    w.write_record(["agent", "evacuee_id", "time", "segment", "offset", "status"])?;
    for t in trajectories {
        for p in &t.points {
            w.write_record(&[
                t.agent.to_string(),
                t.evacuee_id.to_string(),
                p.time.to_string(),
                p.segment.to_string(),
                p.offset.to_string(),
                p.status.as_str().to_owned(),
            ])?;
        }
    }
    w.flush()?;
    Ok(())
}
