use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;
use log::{debug, info};

use crate::config::PianoSettings;
use crate::core::keyboard::KeyboardLayout;
use crate::core::pipeline::{FrameOutput, FramePipeline};
use crate::core::playback::{AudioOutput, PlaybackEngine};
use crate::messaging::{MessageBus, PianoMessage};
use crate::render::RenderSink;
use crate::source::LandmarkSource;

/// Control messages handled per frame at most.
const MAX_MESSAGES_PER_FRAME: usize = 32;

/// Owns the whole per-frame path: control messages, landmark source,
/// detection pipeline, playback engine and render sink. Everything runs on
/// the thread that calls [`PianoApp::step`].
pub struct PianoApp<O: AudioOutput> {
    settings: PianoSettings,
    pipeline: FramePipeline,
    engine: PlaybackEngine<O>,
    source: Box<dyn LandmarkSource>,
    sink: Box<dyn RenderSink>,
    bus: MessageBus,
    frames: u64,
    quit: bool,
}

impl<O: AudioOutput> PianoApp<O> {
    pub fn new(
        settings: PianoSettings,
        layout: Arc<KeyboardLayout>,
        mut engine: PlaybackEngine<O>,
        source: Box<dyn LandmarkSource>,
        sink: Box<dyn RenderSink>,
    ) -> Self {
        let pipeline =
            FramePipeline::new(layout, settings.algorithm).with_band_fraction(settings.band_fraction);

        engine.set_volume(settings.volume);
        engine.set_muted(settings.muted);
        engine.set_release_fade(settings.release_fade);
        engine.load_instrument(&settings.instrument);

        Self {
            settings,
            pipeline,
            engine,
            source,
            sink,
            bus: MessageBus::new(),
            frames: 0,
            quit: false,
        }
    }

    pub fn sender(&self) -> Sender<PianoMessage> {
        self.bus.sender()
    }

    pub fn settings(&self) -> &PianoSettings {
        &self.settings
    }

    pub fn engine(&self) -> &PlaybackEngine<O> {
        &self.engine
    }

    pub fn pipeline(&self) -> &FramePipeline {
        &self.pipeline
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn apply_message(&mut self, msg: PianoMessage) {
        debug!("applying {:?}", msg);
        let s = &mut self.settings;
        match msg {
            PianoMessage::SetAlgorithm(algorithm) => s.algorithm = algorithm,
            PianoMessage::SetSensitivity(value) => s.sensitivity = value.clamp(0.0, 1.0),
            PianoMessage::SetVolume(value) => {
                s.volume = value.clamp(0.0, 1.0);
                self.engine.set_volume(s.volume);
            }
            PianoMessage::SetMuted(muted) => {
                s.muted = muted;
                self.engine.set_muted(muted);
            }
            PianoMessage::SetInstrument(id) => {
                self.engine.load_instrument(&id);
                s.instrument = self.engine.instrument().id.clone();
            }
            PianoMessage::SetPlacement(placement) => s.placement = placement,
            PianoMessage::ToggleFlipHorizontal => s.flip_horizontal = !s.flip_horizontal,
            PianoMessage::ToggleFlipVertical => s.flip_vertical = !s.flip_vertical,
            PianoMessage::SetPressLatch(on) => s.press_latch = on,
            PianoMessage::Quit => {
                info!("quit requested");
                self.quit = true;
            }
        }
    }

    /// Run one frame. `None` once the source is exhausted or a quit was
    /// requested.
    pub fn step(&mut self) -> Option<FrameOutput> {
        let mut pending = Vec::new();
        self.bus.process_messages(MAX_MESSAGES_PER_FRAME, |msg| pending.push(msg));
        for msg in pending {
            self.apply_message(msg);
        }
        if self.quit {
            return None;
        }

        let frame = self.source.next_frame()?;
        let settings = self.settings.frame_settings();
        let output = self.pipeline.process(&frame, &settings);

        self.engine.apply(&output.events);
        self.engine.poll();
        self.sink.render(&output.held, self.pipeline.hands());

        self.frames += 1;
        Some(output)
    }

    /// Step at `fps` until the source ends, a quit arrives or `max_frames`
    /// have run. Returns the number of frames processed.
    pub fn run(&mut self, fps: f64, max_frames: Option<u64>) -> u64 {
        let interval = if fps > 0.0 {
            Duration::from_secs_f64(1.0 / fps)
        } else {
            Duration::ZERO
        };
        info!("running at {:.0} fps", fps);

        let start = self.frames;
        loop {
            if max_frames.is_some_and(|max| self.frames - start >= max) {
                break;
            }
            let tick = Instant::now();
            if self.step().is_none() {
                break;
            }
            if let Some(rest) = interval.checked_sub(tick.elapsed()) {
                thread::sleep(rest);
            }
        }

        self.engine.stop_all();
        let ran = self.frames - start;
        info!("stopped after {} frames", ran);
        ran
    }
}
