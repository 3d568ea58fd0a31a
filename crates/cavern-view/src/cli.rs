use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cavern-view")]
#[command(about = "Headless renderer for processed cave surveys")]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Render one frame of a survey to a PNG.
    Render(RenderArgs),
    /// Run the marker capability probe and report the chosen techniques.
    Probe(ProbeArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum StereoArg {
    Mono,
    Split,
    Anaglyph,
}

#[derive(Args)]
pub struct RenderArgs {
    #[arg(long = "in")]
    pub input: PathBuf,
    #[arg(long)]
    pub out: PathBuf,
    #[arg(long, default_value_t = 800)]
    pub width: u32,
    #[arg(long, default_value_t = 600)]
    pub height: u32,
    #[arg(long)]
    pub scale: Option<f64>,
    /// Bearing faced, in degrees.
    #[arg(long)]
    pub pan: Option<f64>,
    /// Degrees; 90 is plan, 0 is elevation.
    #[arg(long)]
    pub tilt: Option<f64>,
    #[arg(long)]
    pub perspective: bool,
    #[arg(long, value_enum, default_value_t = StereoArg::Mono)]
    pub stereo: StereoArg,
    #[arg(long)]
    pub names: bool,
    /// JSON file remembering probe results between runs.
    #[arg(long)]
    pub hints: Option<PathBuf>,
    /// JSON display options.
    #[arg(long)]
    pub options: Option<PathBuf>,
}

#[derive(Args)]
pub struct ProbeArgs {
    #[arg(long)]
    pub hints: Option<PathBuf>,
    #[arg(long, default_value_t = 64.0)]
    pub max_point_size: f32,
    /// Advertise point sprites that draw nothing.
    #[arg(long)]
    pub broken_sprites: bool,
}
