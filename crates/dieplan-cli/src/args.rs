use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// The dieplan floorplanner.
#[derive(Debug, Clone, Parser)]
#[clap(name = "dieplan", version)]
pub struct CliArguments {
    /// The tool to run.
    #[command(subcommand)]
    pub command: Command,

    /// Print solver logs and additional information.
    #[clap(short, long, global = true)]
    pub verbose: bool,
}

/// What to do.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Computes a refined fractional floorplan minimizing wire length and
    /// dispersion
    Glbfloor(GlbfloorCommand),

    /// Turns module skeletons into legal non-overlapping rectangles
    Legalfloor(LegalfloorCommand),

    /// Relocates modules with a force-directed pass to seed later stages
    Force(ForceCommand),
}

/// Arguments shared by all tools.
#[derive(Debug, Clone, Parser)]
pub struct SharedArgs {
    /// Path to the input netlist (YAML).
    #[clap(long = "netlist", value_name = "FILE")]
    pub netlist: PathBuf,

    /// Size of the die (`WIDTHxHEIGHT`) or path to a die file.
    #[clap(short = 'd', long = "die", value_name = "WxH or FILE", default_value = "1x1")]
    pub die: String,

    /// Path of the output netlist (if not present, none is produced).
    #[clap(long = "out-netlist", value_name = "FILE")]
    pub out_netlist: Option<PathBuf>,
}

/// Computes a refined fractional floorplan
#[derive(Debug, Clone, Parser)]
pub struct GlbfloorCommand {
    /// Shared arguments.
    #[clap(flatten)]
    pub common: SharedArgs,

    /// Size of the initial grid (`ROWSxCOLS`); requires a die without
    /// regions, blockages or fixed rectangles.
    #[clap(short = 'g', long = "grid", value_name = "ROWSxCOLS")]
    pub grid: Option<String>,

    /// Tradeoff between wire length (1) and dispersion (0).
    #[clap(short = 'a', long = "alpha")]
    pub alpha: f64,

    /// Occupancies beyond this threshold count as saturated; the rest
    /// trigger refinement.
    #[clap(short = 't', long = "threshold", default_value_t = 0.95)]
    pub threshold: f64,

    /// Maximum number of optimization passes (if not present, until no
    /// more refinements can be performed).
    #[clap(short = 'i', long = "max-iter")]
    pub max_iter: Option<usize>,

    /// Maximum aspect ratio of the initial cells derived from the die
    /// decomposition.
    #[clap(short = 'r', long = "aspect-ratio", default_value_t = 2.0)]
    pub aspect_ratio: f64,

    /// Minimum number of initial cells derived from the die decomposition.
    #[clap(short = 'n', long = "num-rectangles", default_value_t = 8)]
    pub num_rectangles: usize,

    /// Path of the output allocation (if not present, none is produced).
    #[clap(long = "out-allocation", value_name = "FILE")]
    pub out_allocation: Option<PathBuf>,
}

/// Legalizes module skeletons
#[derive(Debug, Clone, Parser)]
pub struct LegalfloorCommand {
    /// Shared arguments.
    #[clap(flatten)]
    pub common: SharedArgs,

    /// The maximum allowable aspect ratio for a rectangle.
    #[clap(long = "max_ratio", default_value_t = 2.0)]
    pub max_ratio: f64,
}

/// Force-directed relocation
#[derive(Debug, Clone, Parser)]
pub struct ForceCommand {
    /// Shared arguments.
    #[clap(flatten)]
    pub common: SharedArgs,

    /// The number of iterations.
    #[clap(short = 'i', long = "max-iter", default_value_t = 100)]
    pub max_iter: usize,
}
