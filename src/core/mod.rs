pub mod keyboard;
pub mod landmark;
pub mod note;
pub mod pipeline;
pub mod playback;
pub mod press;
pub mod smoother;
