//! Command-line interface orchestration for the rollout engine.
//!
//! The CLI offers a `run` command that assembles a population (the built-in
//! demo graph or a seeded random one), executes a total or limited rollout,
//! and renders a summary of who ended up on the new version.

use std::io::{self, Write};

use clap::{Args, Parser, Subcommand, ValueEnum};
use rollout_core::{
    PopulationError, SimulationBuilder, SimulationError, TargetRangePolicy,
};
use thiserror::Error;

use crate::scenario::{self, RandomSpec, Scenario, ScenarioError};

const DEFAULT_TARGET: f64 = 0.25;
const DEFAULT_BASE_VERSION: &str = "00000";
const DEFAULT_NEW_VERSION: &str = "00001";

/// Top-level CLI options parsed by [`clap`].
#[derive(Debug, Parser, Clone)]
#[command(name = "rollout", about = "Run version rollouts over a class graph.")]
pub struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported CLI commands.
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Execute a rollout against a population.
    Run(RunCommand),
}

/// Options accepted by the `run` command.
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Rollout strategy.
    #[arg(long, value_enum, default_value_t = Mode::Limited)]
    pub mode: Mode,

    /// Fraction of users to reach; only meaningful in limited mode.
    #[arg(long, default_value_t = DEFAULT_TARGET)]
    pub target: f64,

    /// Version tag applied to infected users.
    #[arg(long = "new-version", default_value = DEFAULT_NEW_VERSION)]
    pub new_version: String,

    /// Version tag every user starts with.
    #[arg(long = "base-version", default_value = DEFAULT_BASE_VERSION)]
    pub base_version: String,

    /// Acceptable distance from the target fraction.
    #[arg(long)]
    pub delta: Option<f64>,

    /// Fraction of the population treated as a tolerable side effect.
    #[arg(long = "affected-threshold-factor")]
    pub affected_threshold_factor: Option<f64>,

    /// Connectivity size at or above which a class is never infected on the
    /// heuristic path.
    #[arg(long = "size-limit")]
    pub size_limit: Option<usize>,

    /// Draws attempted when the walk runs out of candidates.
    #[arg(long)]
    pub retries: Option<usize>,

    /// Seed for the engine's candidate selection.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Stop only once the target is met or exceeded, never short of it.
    #[arg(long = "one-sided")]
    pub one_sided: bool,

    /// Population to run against.
    #[command(subcommand)]
    pub source: RunSource,
}

/// Rollout strategies exposed on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Flood-fill everyone reachable from a random seed user.
    Total,
    /// Spread class by class until a target fraction is reached.
    Limited,
}

impl Mode {
    fn as_str(self) -> &'static str {
        match self {
            Self::Total => "total",
            Self::Limited => "limited",
        }
    }
}

/// Populations the `run` command can assemble.
#[derive(Debug, Subcommand, Clone)]
pub enum RunSource {
    /// The built-in three-class demo graph.
    Demo,
    /// A randomly generated population.
    Random(RandomArgs),
}

/// Random population arguments.
#[derive(Debug, Args, Clone)]
pub struct RandomArgs {
    /// Number of classes to generate.
    #[arg(long, default_value_t = 100)]
    pub classes: usize,

    /// Upper bound on students per class, inclusive.
    #[arg(long = "max-class-size", default_value_t = 30)]
    pub max_class_size: usize,

    /// Extra cross-enrolments linking otherwise separate classes.
    #[arg(long = "cross-links", default_value_t = 25)]
    pub cross_links: usize,

    /// Seed for the population generator.
    #[arg(long, default_value_t = 7)]
    pub seed: u64,
}

/// Errors surfaced while executing CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Total mode found nobody left to seed the flood fill with.
    #[error("no uninfected user is available to seed the rollout")]
    NothingToInfect,
    /// Scenario assembly failed.
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
    /// An arena lookup failed.
    #[error(transparent)]
    Population(#[from] PopulationError),
    /// The engine rejected the configuration or the run itself failed.
    #[error(transparent)]
    Core(#[from] SimulationError),
}

/// Summarises the outcome of executing a CLI command.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Label of the population the rollout ran against.
    pub scenario: String,
    /// Strategy that was executed.
    pub mode: Mode,
    /// Users in the population.
    pub users: usize,
    /// Classes in the population.
    pub classes: usize,
    /// Users carrying the new version after the run.
    pub infected: usize,
    /// Infected users as a fraction of the population.
    pub percentage: f64,
    /// Name of the flood-fill seed, in total mode.
    pub seed_user: Option<String>,
    /// Names of the infected users, in roster order.
    pub infected_names: Vec<String>,
}

/// Executes the CLI command represented by `cli`.
///
/// # Errors
/// Returns [`CliError`] when scenario assembly or the rollout fails.
///
/// # Examples
/// ```
/// # use std::error::Error;
/// # use rollout_cli::cli::{Cli, run_cli};
/// # use clap::Parser;
/// #
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let cli = Cli::try_parse_from(["rollout", "run", "--mode", "total", "demo"])?;
/// let summary = run_cli(cli)?;
/// assert_eq!(summary.infected, summary.users);
/// # Ok(())
/// # }
/// ```
pub fn run_cli(cli: Cli) -> Result<RunSummary, CliError> {
    match cli.command {
        Command::Run(run) => run_command(run),
    }
}

fn run_command(command: RunCommand) -> Result<RunSummary, CliError> {
    let Scenario {
        label,
        population,
        classes,
    } = match &command.source {
        RunSource::Demo => scenario::demo(&command.base_version)?,
        RunSource::Random(args) => scenario::random(
            &RandomSpec {
                classes: args.classes,
                max_class_size: args.max_class_size,
                cross_links: args.cross_links,
                seed: args.seed,
            },
            &command.base_version,
        )?,
    };

    let mut builder = SimulationBuilder::new().with_rng_seed(command.seed);
    if let Some(delta) = command.delta {
        builder = builder.with_delta(delta);
    }
    if let Some(factor) = command.affected_threshold_factor {
        builder = builder.with_affected_threshold_factor(factor);
    }
    if let Some(limit) = command.size_limit {
        builder = builder.with_size_limit(limit);
    }
    if let Some(retries) = command.retries {
        builder = builder.with_num_retries(retries);
    }
    if command.one_sided {
        builder = builder.with_range_policy(TargetRangePolicy::OneSided);
    }

    let mut simulation = builder.build(population)?;
    for class in &classes {
        simulation.add_class(*class)?;
    }

    let seed_user = match command.mode {
        Mode::Total => {
            let Some(user) = simulation.sample_uninfected_user() else {
                return Err(CliError::NothingToInfect);
            };
            simulation.total_infection(user, &command.new_version)?;
            Some(simulation.population().user(user)?.name().to_owned())
        }
        Mode::Limited => {
            simulation.limited_infection(&command.new_version, command.target)?;
            None
        }
    };

    let mut infected_names = Vec::with_capacity(simulation.infected_count());
    for user in simulation.infected_users() {
        infected_names.push(simulation.population().user(user)?.name().to_owned());
    }

    Ok(RunSummary {
        scenario: label,
        mode: command.mode,
        users: simulation.users().len(),
        classes: classes.len(),
        infected: simulation.infected_count(),
        percentage: simulation.total_percentage_infected(),
        seed_user,
        infected_names,
    })
}

/// Renders `summary` to `writer` in a human-readable text format.
///
/// # Errors
/// Returns [`io::Error`] if writing to the supplied writer fails.
pub fn render_summary(summary: &RunSummary, mut writer: impl Write) -> io::Result<()> {
    writeln!(writer, "scenario: {}", summary.scenario)?;
    writeln!(writer, "mode: {}", summary.mode.as_str())?;
    if let Some(seed_user) = &summary.seed_user {
        writeln!(writer, "seed user: {seed_user}")?;
    }
    writeln!(writer, "users: {}", summary.users)?;
    writeln!(writer, "classes: {}", summary.classes)?;
    writeln!(
        writer,
        "infected: {} ({:.1}%)",
        summary.infected,
        summary.percentage * 100.0
    )?;
    for name in &summary.infected_names {
        writeln!(writer, "  {name}")?;
    }
    Ok(())
}
