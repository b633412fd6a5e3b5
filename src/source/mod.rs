//! Producers of landmark frames.

mod replay;
mod sim;

pub use replay::ReplaySource;
pub use sim::SimulatedSource;

use crate::core::landmark::Frame;

/// Anything that can deliver one detector frame per tick.
pub trait LandmarkSource {
    /// Next frame, or `None` when the source is exhausted.
    fn next_frame(&mut self) -> Option<Frame>;
}

impl<S: LandmarkSource + ?Sized> LandmarkSource for Box<S> {
    fn next_frame(&mut self) -> Option<Frame> {
        (**self).next_frame()
    }
}
