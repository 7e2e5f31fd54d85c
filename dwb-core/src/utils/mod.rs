//! Utility re-exports and helper macros for the Differential-Wheel Bot.
//!
//! This module re-exports the motion controller, timing, and unit conversion
//! helpers, and provides a helper macro for static initialization:
//!
//! - `controllers`: closed-loop and open-loop motion control, hardware bindings
//! - `math`: wheel geometry and unit conversion
//!
//! The `mk_static!` macro simplifies static initialization in no-std contexts.

pub mod controllers;
pub mod math;

pub use controllers::MotionController;
pub use embassy_time::*;
pub use math::conversion::WheelGeometry;
#[doc(hidden)]
pub use static_cell::StaticCell;

#[macro_export]
/// Initialize a no-std static cell and write the given value into it.
///
/// This macro creates a `static_cell::StaticCell` for type `$t` and initializes
/// it with `$val`, returning a mutable reference to the stored value.
macro_rules! mk_static {
    ($t:ty, $val:expr) => {{
        static STATIC_CELL: $crate::utils::StaticCell<$t> = $crate::utils::StaticCell::new();
        STATIC_CELL.uninit().write($val)
    }};
}
