//! egui harness window
//!
//! Drives the configuration store and the widget lifecycle manager from a
//! single UI thread.

mod components;
mod constants;
mod manager;

pub use manager::{run_gui, HarnessStore};
