use std::path::PathBuf;

use clap::Parser;

/// Play a virtual piano with your hands.
#[derive(Debug, Parser)]
#[command(name = "handpiano", version, about)]
pub struct Cli {
    /// Settings file (JSON). Defaults to the user config directory.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Replay recorded landmark frames (JSON lines) instead of the
    /// simulated hand
    #[arg(long, value_name = "FILE")]
    pub replay: Option<PathBuf>,

    /// Directory of WAV samples laid out as <instrument>/<note>.wav.
    /// Without it notes are synthesized.
    #[arg(long, value_name = "DIR")]
    pub samples: Option<PathBuf>,

    /// Instrument to start with
    #[arg(long)]
    pub instrument: Option<String>,

    /// Stop after this many frames
    #[arg(long)]
    pub frames: Option<u64>,

    /// Frame rate of the detection loop
    #[arg(long, default_value_t = 60.0)]
    pub fps: f64,

    /// Run without opening an audio device
    #[arg(long)]
    pub no_audio: bool,

    /// Seed for the simulated hand
    #[arg(long, default_value_t = 1)]
    pub seed: u64,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}
