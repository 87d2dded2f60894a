//! # DSP Primitives
//!
//! - **`delay_store`**: per-channel ring buffers sharing one write cursor.
//!   The audio history every echo is read from.
//! - **`smoother`**: fixed-length linear ramps that turn parameter jumps
//!   into click-free glides.
//! - **`saturation`**: the soft clipper on the feedback path that keeps
//!   100% feedback from running away.

pub mod delay_store;
pub mod saturation;
pub mod smoother;
