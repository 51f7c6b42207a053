use crate::domain::constants::DEFAULT_SENSOR_DIAGONAL_MM;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "horizon",
    version,
    about = "Estimate distance to a planet from a horizon photo"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    pub json: bool,
    #[arg(
        long,
        global = true,
        help = "Config file (default: ~/.config/horizon/config.toml)"
    )]
    pub config: Option<PathBuf>,
    #[arg(long, global = true, help = "Log pipeline stages to stderr")]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone)]
pub struct ManualSpecs {
    #[arg(long, help = "Actual lens focal length in millimetres")]
    pub focal_length_mm: Option<f64>,
    #[arg(long, help = "Sensor pixel pitch in micrometres")]
    pub pixel_pitch_um: Option<f64>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full pipeline on one image.
    Measure {
        image: PathBuf,
        #[command(flatten)]
        manual: ManualSpecs,
        #[arg(long, help = "Planetary radius in metres")]
        planetary_radius_m: Option<f64>,
    },
    /// Resolve the camera specification without running the pipeline.
    Resolve {
        image: PathBuf,
        #[command(flatten)]
        manual: ManualSpecs,
    },
    Devices {
        #[command(subcommand)]
        command: DeviceCommands,
    },
    /// Convert a 35mm-equivalent focal length to the actual one.
    Focal {
        #[arg(long)]
        f35: f64,
        #[arg(long, default_value_t = DEFAULT_SENSOR_DIAGONAL_MM)]
        sensor_diagonal: f64,
    },
    Doctor,
}

#[derive(Subcommand, Debug)]
pub enum DeviceCommands {
    List,
    Lookup {
        #[arg(long)]
        make: String,
        #[arg(long)]
        model: String,
    },
}
