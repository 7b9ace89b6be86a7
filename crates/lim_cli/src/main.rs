//! `lim`: the command-line interface of the latency-insensitive module linker.
//!
//! Provides `lim graph` for assembling and checking the module graph,
//! `lim place` for solving the area-group floorplan, `lim treecut` for
//! building the merge tree, and `lim tour` for ordering placed groups.

#![warn(missing_docs)]

mod graph;
mod pipeline;
mod place;
mod tour;
mod treecut;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use lim_config::SolverKind;
use tracing_subscriber::EnvFilter;

/// Default directory for stage snapshots.
const DEFAULT_SNAPSHOT_DIR: &str = "lim_snapshots";

/// lim: links separately compiled latency-insensitive hardware modules.
#[derive(Parser, Debug)]
#[command(name = "lim", version, about = "Latency-insensitive module linker")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Control colored output.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Path to a custom `lim.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Assemble the module graph from dangling-connection logs and check it.
    Graph(GraphArgs),
    /// Solve the area-group floorplan.
    Place(PlaceArgs),
    /// Partition the module graph into a merge tree.
    Treecut(TreecutArgs),
    /// Order placed area groups along a short closed tour.
    Tour(TourArgs),
}

/// Arguments for the `lim graph` subcommand.
#[derive(Parser, Debug)]
pub struct GraphArgs {
    /// Compiler logs with dangling-connection records.
    #[arg(required = true, num_args = 1..)]
    pub logs: Vec<PathBuf>,

    /// Accept unmatched required connections as warnings.
    #[arg(long)]
    pub allow_unmatched: bool,

    /// Write the module graph in Graphviz DOT format (`-` for stdout).
    #[arg(long)]
    pub dot: Option<PathBuf>,
}

/// Arguments for the `lim place` subcommand.
#[derive(Parser, Debug)]
pub struct PlaceArgs {
    /// Area-group constraint file.
    #[arg(short = 'C', long)]
    pub constraints: PathBuf,

    /// JSON resource table mapping module names to areas.
    #[arg(short, long)]
    pub resources: Option<PathBuf>,

    /// Compiler logs providing inter-module traffic.
    #[arg(long = "log", num_args = 1..)]
    pub logs: Vec<PathBuf>,

    /// Directory holding stage snapshots.
    #[arg(long, default_value = DEFAULT_SNAPSHOT_DIR)]
    pub snapshot_dir: PathBuf,

    /// Override the configured ILP backend.
    #[arg(long, value_enum)]
    pub solver: Option<SolverChoice>,

    /// Ignore dimensions from a previous placement.
    #[arg(long)]
    pub no_reuse: bool,
}

/// Arguments for the `lim treecut` subcommand.
#[derive(Parser, Debug)]
pub struct TreecutArgs {
    /// Compiler logs with dangling-connection records.
    #[arg(required = true, num_args = 1..)]
    pub logs: Vec<PathBuf>,

    /// Accept unmatched required connections as warnings.
    #[arg(long)]
    pub allow_unmatched: bool,

    /// Directory holding stage snapshots.
    #[arg(long, default_value = DEFAULT_SNAPSHOT_DIR)]
    pub snapshot_dir: PathBuf,

    /// Always bisect by minimum cut, even when a placement exists.
    #[arg(long)]
    pub no_placement: bool,

    /// Override the synthesis boundary promotion threshold.
    #[arg(long)]
    pub threshold: Option<usize>,

    /// Write the JSON tree report here instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the `lim tour` subcommand.
#[derive(Parser, Debug)]
pub struct TourArgs {
    /// Directory holding stage snapshots.
    #[arg(long, default_value = DEFAULT_SNAPSHOT_DIR)]
    pub snapshot_dir: PathBuf,

    /// Override the configured annealing seed.
    #[arg(long)]
    pub seed: Option<u64>,
}

/// ILP backend selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SolverChoice {
    /// The in-process solver.
    Builtin,
    /// An external `cbc` process.
    Cbc,
    /// An external `glpsol` process.
    Glpk,
}

impl From<SolverChoice> for SolverKind {
    fn from(choice: SolverChoice) -> Self {
        match choice {
            SolverChoice::Builtin => SolverKind::Builtin,
            SolverChoice::Cbc => SolverKind::Cbc,
            SolverChoice::Glpk => SolverKind::Glpk,
        }
    }
}

/// Controls whether colored output is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Detect from terminal capabilities.
    Auto,
    /// Always produce colored output.
    Always,
    /// Never produce colored output.
    Never,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Whether to use colored output.
    pub color: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let color = match cli.color {
        ColorChoice::Auto => std::env::var_os("TERM").is_some_and(|t| t != "dumb"),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        color,
        config: cli.config,
    };
    init_tracing(&global);

    let result = match cli.command {
        Command::Graph(ref args) => graph::run(args, &global),
        Command::Place(ref args) => place::run(args, &global),
        Command::Treecut(ref args) => treecut::run(args, &global),
        Command::Tour(ref args) => tour::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Default log filter for the verbosity flags. `RUST_LOG` takes precedence.
fn default_filter(global: &GlobalArgs) -> &'static str {
    if global.verbose {
        "debug"
    } else if global.quiet {
        "error"
    } else {
        "info"
    }
}

fn init_tracing(global: &GlobalArgs) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(global)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(global.color)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn global(quiet: bool, verbose: bool) -> GlobalArgs {
        GlobalArgs {
            quiet,
            verbose,
            color: false,
            config: None,
        }
    }

    #[test]
    fn parse_graph_logs() {
        let cli = Cli::parse_from(["lim", "graph", "a.log", "b.log", "--dot", "-"]);
        match cli.command {
            Command::Graph(ref args) => {
                assert_eq!(args.logs, vec![PathBuf::from("a.log"), PathBuf::from("b.log")]);
                assert_eq!(args.dot, Some(PathBuf::from("-")));
                assert!(!args.allow_unmatched);
            }
            _ => panic!("expected Graph command"),
        }
    }

    #[test]
    fn graph_requires_a_log() {
        assert!(Cli::try_parse_from(["lim", "graph"]).is_err());
    }

    #[test]
    fn parse_place_defaults() {
        let cli = Cli::parse_from(["lim", "place", "--constraints", "top.cons"]);
        match cli.command {
            Command::Place(ref args) => {
                assert_eq!(args.constraints, PathBuf::from("top.cons"));
                assert!(args.resources.is_none());
                assert!(args.logs.is_empty());
                assert_eq!(args.snapshot_dir, PathBuf::from(DEFAULT_SNAPSHOT_DIR));
                assert!(args.solver.is_none());
                assert!(!args.no_reuse);
            }
            _ => panic!("expected Place command"),
        }
    }

    #[test]
    fn parse_place_with_args() {
        let cli = Cli::parse_from([
            "lim",
            "place",
            "-C",
            "top.cons",
            "--resources",
            "areas.json",
            "--log",
            "user.log",
            "platform.log",
            "--solver",
            "cbc",
            "--no-reuse",
        ]);
        match cli.command {
            Command::Place(ref args) => {
                assert_eq!(args.resources, Some(PathBuf::from("areas.json")));
                assert_eq!(args.logs.len(), 2);
                assert_eq!(args.solver, Some(SolverChoice::Cbc));
                assert!(args.no_reuse);
            }
            _ => panic!("expected Place command"),
        }
    }

    #[test]
    fn parse_treecut_with_args() {
        let cli = Cli::parse_from([
            "lim",
            "treecut",
            "user.log",
            "--no-placement",
            "--threshold",
            "40",
            "-o",
            "tree.json",
        ]);
        match cli.command {
            Command::Treecut(ref args) => {
                assert!(args.no_placement);
                assert_eq!(args.threshold, Some(40));
                assert_eq!(args.output, Some(PathBuf::from("tree.json")));
            }
            _ => panic!("expected Treecut command"),
        }
    }

    #[test]
    fn parse_tour_seed() {
        let cli = Cli::parse_from(["lim", "tour", "--seed", "7", "--snapshot-dir", "snaps"]);
        match cli.command {
            Command::Tour(ref args) => {
                assert_eq!(args.seed, Some(7));
                assert_eq!(args.snapshot_dir, PathBuf::from("snaps"));
            }
            _ => panic!("expected Tour command"),
        }
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::parse_from(["lim", "--quiet", "--color", "never", "tour"]);
        assert!(cli.quiet);
        assert!(!cli.verbose);
        assert_eq!(cli.color, ColorChoice::Never);
    }

    #[test]
    fn parse_config_path() {
        let cli = Cli::parse_from(["lim", "tour", "--config", "/path/to/lim.toml"]);
        assert_eq!(cli.config.as_deref(), Some("/path/to/lim.toml"));
    }

    #[test]
    fn solver_choice_maps_to_config() {
        assert_eq!(SolverKind::from(SolverChoice::Builtin), SolverKind::Builtin);
        assert_eq!(SolverKind::from(SolverChoice::Glpk), SolverKind::Glpk);
    }

    #[test]
    fn verbosity_selects_filter() {
        assert_eq!(default_filter(&global(false, true)), "debug");
        assert_eq!(default_filter(&global(true, false)), "error");
        assert_eq!(default_filter(&global(false, false)), "info");
    }
}
