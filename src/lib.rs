//! Freehand strokes for a shared, infinitely scrolling whiteboard.
//!
//! Pointer input is decimated, smoothed and refined into a dense curve by the stages in [`pipes`].
//! Finished strokes are cut into pieces per fixed-size canvas tile and compressed for transmission
//! and storage by [`engine`].

pub(crate) mod util;

pub mod config;
pub mod engine;
pub mod geom;
pub mod pipes;

pub use config::*;

#[cfg(test)]
pub mod test;
