use crate::core::keyboard::KeyboardPlacement;
use crate::core::press::PressAlgorithm;

/// Runtime control messages, applied at the start of the next frame.
#[derive(Debug, Clone, PartialEq)]
pub enum PianoMessage {
    SetAlgorithm(PressAlgorithm),
    SetSensitivity(f32),
    SetVolume(f32),
    SetMuted(bool),
    SetInstrument(String),
    SetPlacement(KeyboardPlacement),
    ToggleFlipHorizontal,
    ToggleFlipVertical,
    SetPressLatch(bool),
    Quit,
}
