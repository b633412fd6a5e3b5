use std::sync::Arc;

use handpiano::app::PianoApp;
use handpiano::config::PianoSettings;
use handpiano::core::keyboard::{
    note_range, DisplayTransform, KeyDimensions, KeyboardLayout, KeyboardPlacement, Viewport,
};
use handpiano::core::landmark::{Frame, Hand, Landmark, INDEX_MCP, INDEX_TIP};
use handpiano::core::pipeline::{FrameSettings, FramePipeline};
use handpiano::core::playback::{CpalOutput, InstrumentCatalog, PlaybackEngine};
use handpiano::core::press::PressAlgorithm;
use handpiano::render::NullSink;
use handpiano::source::SimulatedSource;

fn one_octave() -> Arc<KeyboardLayout> {
    let notes = note_range("C4", "B4").unwrap();
    assert!((notes[0].frequency - 261.63).abs() < 0.01);
    Arc::new(KeyboardLayout::build(&notes, KeyDimensions::default()).unwrap())
}

/// One hand whose index tip sits at normalized (x, y) with depth `z`,
/// `reach` away from its knuckle. The rest of the hand is off the keys.
fn hand(x: f32, y: f32, z: f32, reach: f32) -> Frame {
    let mut points = vec![Landmark::new(0.95, 0.95, 0.0); 21];
    points[INDEX_TIP] = Landmark::new(x, y, z);
    points[INDEX_MCP] = Landmark::new(x, y - reach, 0.0);
    Frame::new(0.0, vec![Hand::new(points)])
}

#[test]
fn press_then_lift_plays_one_note() {
    let layout = one_octave();
    // 280 x 500 px with a 150 px band on top: one pixel per keyboard unit
    let settings = FrameSettings {
        algorithm: PressAlgorithm::Velocity,
        sensitivity: 0.8,
        transform: DisplayTransform::default(),
        placement: KeyboardPlacement::Top,
        viewport: Viewport::new(280.0, 500.0),
        smoothing: 1.0,
        press_latch: false,
    };
    let (x, y) = (20.0 / 280.0, 75.0 / 500.0);

    let mut pipeline = FramePipeline::new(Arc::clone(&layout), PressAlgorithm::Velocity);
    let hovering = pipeline.process(&hand(x, y, 0.0, 0.1), &settings);
    assert!(hovering.held.is_empty());

    let pressed = pipeline.process(&hand(x, y, -0.004, 0.095), &settings);
    assert_eq!(pressed.held.iter().collect::<Vec<_>>(), vec!["C4"]);

    let lifted = pipeline.process(&hand(x, 0.9, -0.004, 0.095), &settings);
    assert!(lifted.held.is_empty());

    let attacks: Vec<_> = [&hovering, &pressed, &lifted]
        .iter()
        .flat_map(|o| o.events.attacks.clone())
        .collect();
    let releases: Vec<_> = [&hovering, &pressed, &lifted]
        .iter()
        .flat_map(|o| o.events.releases.clone())
        .collect();
    assert_eq!(attacks, vec!["C4".to_string()]);
    assert_eq!(releases, vec!["C4".to_string()]);
    assert_eq!(pressed.events.attacks, vec!["C4".to_string()]);
    assert_eq!(lifted.events.releases, vec!["C4".to_string()]);
}

#[test]
fn simulated_hand_taps_the_first_key() {
    let layout = Arc::new(KeyboardLayout::standard());
    let notes: Vec<String> = layout.notes().map(String::from).collect();
    let settings = PianoSettings::default();

    let engine = PlaybackEngine::new(
        CpalOutput::headless(),
        InstrumentCatalog::builtin(&notes),
        notes,
        None,
    );
    let source = SimulatedSource::new(Arc::clone(&layout), &settings, 42).with_limit(12);
    let mut app = PianoApp::new(settings, layout, engine, Box::new(source), Box::new(NullSink));

    let mut attacks = Vec::new();
    let mut releases = Vec::new();
    while let Some(output) = app.step() {
        attacks.extend(output.events.attacks);
        releases.extend(output.events.releases);
    }

    assert_eq!(app.frames(), 12);
    assert_eq!(attacks, vec!["C4".to_string()]);
    assert_eq!(releases, vec!["C4".to_string()]);
}
