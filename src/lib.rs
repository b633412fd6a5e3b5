//! Virtual piano played with tracked hand landmarks.
//!
//! Each frame flows through [`core::pipeline::FramePipeline`] (smoothing,
//! key hit-testing, press detection, held-set diffing) and the resulting
//! note edges drive a [`core::playback::PlaybackEngine`].

pub mod app;
pub mod cli;
pub mod config;
pub mod core;
pub mod messaging;
pub mod render;
pub mod source;
pub mod utils;
