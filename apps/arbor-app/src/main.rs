//! Arbor IK command-line driver.
//!
//! Provides three modes of operation:
//! - `solve`: Track an orbiting target with one algorithm and report timing
//! - `compare`: Run every algorithm on the same scenario and tabulate results
//! - `info`: Print the algorithms and the default configuration

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};
use log::Level;
use nalgebra::Vector3;

use arbor_core::{Algorithm, ArborError, IkError, SolverConfig};
use arbor_ik::{IkSolver, Skeleton};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

/// Inverse kinematics solvers for articulated chains.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Solver configuration file (TOML). Defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Track an orbiting target with one algorithm.
    Solve {
        /// Algorithm to run; overrides the configuration file.
        #[arg(short, long)]
        algorithm: Option<Algorithm>,

        #[command(flatten)]
        scenario: ScenarioArgs,
    },

    /// Run every algorithm on the same scenario.
    Compare {
        #[command(flatten)]
        scenario: ScenarioArgs,
    },

    /// Print algorithms and the default configuration.
    Info,
}

/// Demo chain and target motion.
#[derive(Args, Clone, Copy)]
struct ScenarioArgs {
    /// Joints in the chain, base and effector included.
    #[arg(short, long, default_value_t = 5)]
    joints: usize,

    /// Length of every bone.
    #[arg(short, long, default_value_t = 1.0)]
    bone: f32,

    /// Number of solver ticks.
    #[arg(short, long, default_value_t = 120)]
    ticks: u32,

    /// Orbit radius as a fraction of the chain's reach (above 1 is out of reach).
    #[arg(short, long, default_value_t = 0.8)]
    radius: f32,

    /// Orbit angle advanced per tick, in radians.
    #[arg(short, long, default_value_t = 0.05)]
    speed: f32,
}

// ---------------------------------------------------------------------------
// Scenario
// ---------------------------------------------------------------------------

/// Aggregate over all ticks of one run.
struct RunSummary {
    algorithm: Algorithm,
    ticks: u32,
    converged: u32,
    mean_error: f32,
    max_error: f32,
    iterations: u64,
    elapsed: Duration,
}

impl RunSummary {
    fn ticks_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            f64::from(self.ticks) / secs
        } else {
            f64::INFINITY
        }
    }
}

/// Target on a tilted circle around the base: the drag handle of an editor,
/// replayed deterministically.
fn orbit(tick: u32, radius: f32, speed: f32) -> Vector3<f32> {
    let angle = tick as f32 * speed;
    Vector3::new(radius * angle.cos(), radius * angle.sin(), 0.3 * radius * angle.sin())
}

fn run_scenario(
    config: &SolverConfig,
    scenario: &ScenarioArgs,
    tick_level: Level,
) -> Result<RunSummary, IkError> {
    let positions: Vec<_> = (0..scenario.joints)
        .map(|i| Vector3::new(i as f32 * scenario.bone, 0.0, 0.0))
        .collect();
    let (mut skeleton, ids) = Skeleton::from_positions(&positions);
    let (base, effector) = (ids[0], ids[ids.len() - 1]);
    let reach = scenario.bone * (scenario.joints - 1) as f32;
    let solver = IkSolver::new(config.clone());

    let mut summary = RunSummary {
        algorithm: config.algorithm,
        ticks: scenario.ticks,
        converged: 0,
        mean_error: 0.0,
        max_error: 0.0,
        iterations: 0,
        elapsed: Duration::ZERO,
    };
    for tick in 0..scenario.ticks {
        let target = orbit(tick, scenario.radius * reach, scenario.speed);
        let start = Instant::now();
        let result = solver.solve(&mut skeleton, base, effector, &target)?;
        let took = start.elapsed();

        log::log!(
            tick_level,
            "tick {tick}: error {:.5}, iterations {}, converged {}, {:.1} us",
            result.error,
            result.iterations,
            result.converged,
            took.as_secs_f64() * 1e6
        );
        summary.elapsed += took;
        summary.iterations += u64::from(result.iterations);
        summary.converged += u32::from(result.converged);
        summary.mean_error += result.error;
        summary.max_error = summary.max_error.max(result.error);
    }
    if scenario.ticks > 0 {
        summary.mean_error /= scenario.ticks as f32;
    }
    Ok(summary)
}

// ---------------------------------------------------------------------------
// Mode implementations
// ---------------------------------------------------------------------------

fn load_config(path: Option<&Path>) -> Result<SolverConfig, ArborError> {
    let config = match path {
        Some(path) => SolverConfig::from_file(path)?,
        None => SolverConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn check_scenario(scenario: &ScenarioArgs) -> Result<(), String> {
    if scenario.joints < 2 {
        return Err(format!("need at least 2 joints, got {}", scenario.joints));
    }
    if !(scenario.bone > 0.0 && scenario.bone.is_finite()) {
        return Err(format!("bone length must be positive, got {}", scenario.bone));
    }
    Ok(())
}

fn run_solve(
    mut config: SolverConfig,
    algorithm: Option<Algorithm>,
    scenario: &ScenarioArgs,
) -> Result<(), ArborError> {
    if let Some(algorithm) = algorithm {
        config.algorithm = algorithm;
    }
    println!(
        "{}: {} joints, bone {}, {} ticks",
        config.algorithm, scenario.joints, scenario.bone, scenario.ticks
    );
    let summary = run_scenario(&config, scenario, Level::Info)?;
    println!(
        "\nconverged {}/{}, mean error {:.5}, max error {:.5}, iterations {}",
        summary.converged, summary.ticks, summary.mean_error, summary.max_error, summary.iterations
    );
    println!("average: {:.1} ticks/s", summary.ticks_per_second());
    Ok(())
}

fn run_compare(config: &SolverConfig, scenario: &ScenarioArgs) -> Result<(), ArborError> {
    println!(
        "{:<24} {:>9} {:>10} {:>10} {:>10} {:>12}",
        "algorithm", "converged", "mean err", "max err", "iters", "ticks/s"
    );
    for algorithm in Algorithm::ALL {
        if algorithm == Algorithm::TwoBone && scenario.joints != 3 {
            println!("{:<24} (needs exactly 3 joints)", algorithm.name());
            continue;
        }
        let config = SolverConfig {
            algorithm,
            ..config.clone()
        };
        let summary = run_scenario(&config, scenario, Level::Debug)?;
        println!(
            "{:<24} {:>9} {:>10.5} {:>10.5} {:>10} {:>12.1}",
            summary.algorithm.name(),
            format!("{}/{}", summary.converged, summary.ticks),
            summary.mean_error,
            summary.max_error,
            summary.iterations,
            summary.ticks_per_second()
        );
    }
    Ok(())
}

fn run_info() {
    println!("arbor v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("algorithms:");
    for algorithm in Algorithm::ALL {
        println!("  {algorithm}");
    }
    println!();
    println!("default configuration:");
    match toml::to_string_pretty(&SolverConfig::default()) {
        Ok(text) => print!("{text}"),
        Err(e) => eprintln!("failed to render configuration: {e}"),
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let scenario = match &cli.command {
        Some(Commands::Solve { scenario, .. } | Commands::Compare { scenario }) => Some(*scenario),
        _ => None,
    };
    if let Some(Err(e)) = scenario.as_ref().map(check_scenario) {
        log::error!("{e}");
        return ExitCode::FAILURE;
    }

    let outcome = match cli.command {
        Some(Commands::Solve {
            algorithm,
            scenario,
        }) => run_solve(config, algorithm, &scenario),
        Some(Commands::Compare { scenario }) => run_compare(&config, &scenario),
        Some(Commands::Info) => {
            run_info();
            Ok(())
        }
        None => {
            // Default: a short CCD run on the demo chain
            let scenario = ScenarioArgs {
                joints: 5,
                bone: 1.0,
                ticks: 120,
                radius: 0.8,
                speed: 0.05,
            };
            run_solve(config, Some(Algorithm::Ccd), &scenario)
        }
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
