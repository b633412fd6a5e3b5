use std::io::{self, BufRead};
use std::thread::{self, JoinHandle};

use anyhow::{anyhow, bail, Context, Result};
use crossbeam_channel::Sender;
use log::{debug, warn};

use super::PianoMessage;
use crate::core::keyboard::KeyboardPlacement;
use crate::core::press::PressAlgorithm;

pub const CONSOLE_HELP: &str = "commands: sens <0-1> | vol <0-1> | mute | unmute | inst <id> | \
algo velocity|pose | place top|bottom | flip h|v | latch on|off | quit";

/// Parse one console line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<PianoMessage>> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();

    let msg = match (command.to_ascii_lowercase().as_str(), arg) {
        ("sens" | "sensitivity", Some(v)) => PianoMessage::SetSensitivity(parse_unit(v)?),
        ("vol" | "volume", Some(v)) => PianoMessage::SetVolume(parse_unit(v)?),
        ("mute", None) => PianoMessage::SetMuted(true),
        ("unmute", None) => PianoMessage::SetMuted(false),
        ("inst" | "instrument", Some(id)) => PianoMessage::SetInstrument(id.to_string()),
        ("algo" | "algorithm", Some(name)) => PianoMessage::SetAlgorithm(
            PressAlgorithm::parse(name).ok_or_else(|| anyhow!("unknown algorithm '{}'", name))?,
        ),
        ("place" | "placement", Some(edge)) => PianoMessage::SetPlacement(match edge {
            "top" => KeyboardPlacement::Top,
            "bottom" => KeyboardPlacement::Bottom,
            other => bail!("unknown placement '{}'", other),
        }),
        ("flip", Some("h")) => PianoMessage::ToggleFlipHorizontal,
        ("flip", Some("v")) => PianoMessage::ToggleFlipVertical,
        ("latch", Some("on")) => PianoMessage::SetPressLatch(true),
        ("latch", Some("off")) => PianoMessage::SetPressLatch(false),
        ("quit" | "exit" | "q", None) => PianoMessage::Quit,
        _ => bail!("unrecognized command '{}'", line.trim()),
    };
    Ok(Some(msg))
}

fn parse_unit(value: &str) -> Result<f32> {
    let v: f32 = value
        .parse()
        .with_context(|| format!("'{}' is not a number", value))?;
    if !(0.0..=1.0).contains(&v) {
        bail!("{} is outside 0..1", v);
    }
    Ok(v)
}

/// Read stdin on its own thread and forward parsed commands. The thread
/// ends at end of input or once the receiver is gone.
pub fn spawn_console(sender: Sender<PianoMessage>) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("console".into())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                match parse_command(&line) {
                    Ok(Some(msg)) => {
                        debug!("console: {:?}", msg);
                        if sender.send(msg).is_err() {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => warn!("{}. {}", e, CONSOLE_HELP),
                }
            }
        })
        .context("Failed to spawn console thread")
}
