use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::core::keyboard::{DisplayTransform, KeyboardPlacement, Viewport, DEFAULT_BAND_FRACTION};
use crate::core::pipeline::FrameSettings;
use crate::core::playback::{DEFAULT_INSTRUMENT, DEFAULT_RELEASE_FADE_SECS, DEFAULT_VOLUME};
use crate::core::press::PressAlgorithm;
use crate::core::smoother::DEFAULT_SMOOTHING;

const SETTINGS_DIR: &str = "handpiano";
const SETTINGS_FILE: &str = "settings.json";

/// Everything the player can tune. Read once at startup and then changed
/// only through control messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PianoSettings {
    pub algorithm: PressAlgorithm,
    /// 0 is strict, 1 is lenient.
    pub sensitivity: f32,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
    pub placement: KeyboardPlacement,
    pub volume: f32,
    pub muted: bool,
    pub instrument: String,
    pub smoothing: f32,
    pub band_fraction: f32,
    pub press_latch: bool,
    pub release_fade: f32,
    pub viewport_width: f32,
    pub viewport_height: f32,
    /// Optional JSON instrument catalog replacing the built-in one.
    pub catalog: Option<PathBuf>,
}

impl Default for PianoSettings {
    fn default() -> Self {
        let viewport = Viewport::default();
        Self {
            algorithm: PressAlgorithm::default(),
            sensitivity: 0.5,
            flip_horizontal: true,
            flip_vertical: false,
            placement: KeyboardPlacement::Bottom,
            volume: DEFAULT_VOLUME,
            muted: false,
            instrument: DEFAULT_INSTRUMENT.to_string(),
            smoothing: DEFAULT_SMOOTHING,
            band_fraction: DEFAULT_BAND_FRACTION,
            press_latch: false,
            release_fade: DEFAULT_RELEASE_FADE_SECS,
            viewport_width: viewport.width,
            viewport_height: viewport.height,
            catalog: None,
        }
    }
}

impl PianoSettings {
    /// `<config dir>/handpiano/settings.json`, if the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(SETTINGS_DIR).join(SETTINGS_FILE))
    }

    /// Read settings from `path`, or from the default location when it
    /// exists, or fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load_from_file(&path),
                _ => {
                    debug!("no settings file, using defaults");
                    Ok(Self::default())
                }
            },
        }
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open settings: {}", path.display()))?;
        let settings: PianoSettings = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse settings: {}", path.display()))?;
        info!("Loaded settings from {}", path.display());
        Ok(settings.clamped())
    }

    /// Pull every numeric field back into its valid range.
    pub fn clamped(mut self) -> Self {
        self.sensitivity = clamp_unit(self.sensitivity, 0.5);
        self.volume = clamp_unit(self.volume, DEFAULT_VOLUME);
        self.smoothing = clamp_unit(self.smoothing, DEFAULT_SMOOTHING);
        self.band_fraction = if self.band_fraction.is_finite() {
            self.band_fraction.clamp(0.05, 1.0)
        } else {
            DEFAULT_BAND_FRACTION
        };
        if !self.release_fade.is_finite() || self.release_fade < 0.0 {
            self.release_fade = DEFAULT_RELEASE_FADE_SECS;
        }
        let viewport = Viewport::default();
        if !(self.viewport_width > 0.0) {
            self.viewport_width = viewport.width;
        }
        if !(self.viewport_height > 0.0) {
            self.viewport_height = viewport.height;
        }
        self
    }

    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.viewport_width, self.viewport_height)
    }

    pub fn transform(&self) -> DisplayTransform {
        DisplayTransform {
            flip_horizontal: self.flip_horizontal,
            flip_vertical: self.flip_vertical,
        }
    }

    /// The per-frame view consumed by the pipeline.
    pub fn frame_settings(&self) -> FrameSettings {
        FrameSettings {
            algorithm: self.algorithm,
            sensitivity: self.sensitivity,
            transform: self.transform(),
            placement: self.placement,
            viewport: self.viewport(),
            smoothing: self.smoothing,
            press_latch: self.press_latch,
        }
    }
}

fn clamp_unit(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_reference_setup() {
        let s = PianoSettings::default();
        assert_eq!(s.algorithm, PressAlgorithm::Velocity);
        assert!(s.flip_horizontal && !s.flip_vertical);
        assert_eq!(s.placement, KeyboardPlacement::Bottom);
        assert_eq!(s.volume, 0.5);
        assert_eq!(s.instrument, "piano");
        assert!(!s.press_latch);
    }

    #[test]
    fn partial_file_fills_in_defaults_and_clamps() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "algorithm": "pose", "sensitivity": 3.0, "placement": "top", "volume": -1 }}"#
        )
        .unwrap();

        let s = PianoSettings::load(Some(file.path())).unwrap();
        assert_eq!(s.algorithm, PressAlgorithm::Pose);
        assert_eq!(s.sensitivity, 1.0);
        assert_eq!(s.volume, 0.0);
        assert_eq!(s.placement, KeyboardPlacement::Top);
        assert_eq!(s.smoothing, DEFAULT_SMOOTHING);
        assert!(s.flip_horizontal);
    }

    #[test]
    fn bad_json_reports_the_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = PianoSettings::load(Some(file.path())).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse settings"));
    }

    #[test]
    fn frame_settings_carry_display_options() {
        let s = PianoSettings {
            flip_vertical: true,
            press_latch: true,
            ..PianoSettings::default()
        };
        let frame = s.frame_settings();
        assert!(frame.transform.flip_vertical);
        assert!(frame.press_latch);
        assert_eq!(frame.viewport, Viewport::new(1280.0, 720.0));
    }
}
