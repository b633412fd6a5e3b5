use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use log::{info, warn};

use super::LandmarkSource;
use crate::core::landmark::Frame;

/// Plays back recorded frames stored as JSON lines, one [`Frame`] per
/// line. Lines that fail to parse are logged and skipped.
pub struct ReplaySource {
    reader: Box<dyn BufRead + Send>,
    line_no: usize,
}

impl ReplaySource {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open replay: {}", path.display()))?;
        info!("Replaying frames from {}", path.display());
        Ok(Self::from_reader(BufReader::new(file)))
    }

    pub fn from_reader<R: BufRead + Send + 'static>(reader: R) -> Self {
        Self {
            reader: Box::new(reader),
            line_no: 0,
        }
    }
}

impl LandmarkSource for ReplaySource {
    fn next_frame(&mut self) -> Option<Frame> {
        let mut line = String::new();
        loop {
            line.clear();
            match self.reader.read_line(&mut line) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => {
                    warn!("replay read failed at line {}: {}", self.line_no + 1, e);
                    return None;
                }
            }
            self.line_no += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<Frame>(trimmed) {
                Ok(frame) => return Some(frame),
                Err(e) => warn!("skipping replay line {}: {}", self.line_no, e),
            }
        }
    }
}
