//! Time subsystem.
//!
//! - `FrameClock` measures clamped wall-clock deltas, one per presented frame.
//! - `FixedStep` turns those deltas into a bounded number of fixed logic steps.

mod fixed_step;
mod frame_clock;

pub use fixed_step::FixedStep;
pub use frame_clock::{FrameClock, FrameTime};
