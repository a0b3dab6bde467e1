#![no_std]

#[cfg(feature = "alloc")]
extern crate alloc;

// Shared logic for the spot-weld controller.
//
// This crate stays portable across MCU firmware and host tooling by avoiding the
// Rust standard library. Hardware enters only through the capability traits
// exposed by `clock`, `sequencer`, `trigger`, and `link`.

pub mod clock;
pub mod controller;
pub mod interlock;
pub mod link;
pub mod protocol;
pub mod recipe;
pub mod sequencer;
pub mod telemetry;
pub mod trigger;
