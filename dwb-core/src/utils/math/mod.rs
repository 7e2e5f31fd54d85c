//! Math utilities for the Differential-Wheel Bot.
//!
//! Unit conversion between linear travel, turn angles and wheel rotation, plus
//! gyro-rate integration into a heading.

pub mod conversion;
pub mod heading;
