#![no_std]

// Shared logic for the power-loss monitor.
//
// This crate stays portable across MCU firmware and host tooling by avoiding the
// Rust standard library and exposing the sensor, clock and sink seams the other
// crates implement.

pub mod battery;
pub mod heartbeat;
pub mod link;
pub mod monitor;
pub mod notify;
pub mod power;
pub mod sensors;
pub mod status;
pub mod telemetry;
