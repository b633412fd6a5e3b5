use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};

use handpiano::app::PianoApp;
use handpiano::cli::Cli;
use handpiano::config::PianoSettings;
use handpiano::core::keyboard::KeyboardLayout;
use handpiano::core::playback::{
    CpalOutput, InstrumentCatalog, InstrumentStore, PlaybackEngine, SampleLoader, ToneStore,
    WavDirectoryStore,
};
use handpiano::messaging::{spawn_console, CONSOLE_HELP};
use handpiano::render::LogSink;
use handpiano::source::{LandmarkSource, ReplaySource, SimulatedSource};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
    info!("Starting handpiano");

    let mut settings = PianoSettings::load(cli.config.as_deref())?;
    if let Some(instrument) = &cli.instrument {
        settings.instrument = instrument.clone();
    }

    let layout = Arc::new(KeyboardLayout::standard());
    let notes: Vec<String> = layout.notes().map(String::from).collect();

    let catalog = match &settings.catalog {
        Some(path) => InstrumentCatalog::load_from_file(path)?,
        None => InstrumentCatalog::builtin(&notes),
    };

    let output = if cli.no_audio {
        info!("Audio disabled");
        CpalOutput::headless()
    } else {
        match CpalOutput::open() {
            Ok(output) => output,
            Err(e) => {
                warn!("No audio output, continuing silently: {:#}", e);
                CpalOutput::headless()
            }
        }
    };

    if !output.is_streaming() {
        info!("No audio stream, notes will be tracked but not heard");
    }

    let store: Arc<dyn InstrumentStore> = match &cli.samples {
        Some(dir) => {
            let wav = WavDirectoryStore::new(dir);
            info!("Loading samples from {}", wav.root().display());
            Arc::new(wav)
        }
        None => Arc::new(ToneStore::new(output.sample_rate())),
    };
    let loader = SampleLoader::spawn(store)?;
    let engine = PlaybackEngine::new(output, catalog, notes, Some(loader));

    let source: Box<dyn LandmarkSource> = match &cli.replay {
        Some(path) => Box::new(ReplaySource::open(path)?),
        None => Box::new(SimulatedSource::new(Arc::clone(&layout), &settings, cli.seed).with_fps(cli.fps)),
    };

    let mut app = PianoApp::new(settings, layout, engine, source, Box::new(LogSink::new()));

    spawn_console(app.sender()).context("Console unavailable")?;
    info!("{}", CONSOLE_HELP);

    app.run(cli.fps, cli.frames);
    Ok(())
}
