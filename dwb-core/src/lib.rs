//! Closed-loop motion core for a two-wheeled differential-drive bot on no-std
//! embedded platforms.
//!
//! For a runnable host simulation, see the `dwb-app/sim-mcu` crate.
#![no_std]

pub mod utils;
