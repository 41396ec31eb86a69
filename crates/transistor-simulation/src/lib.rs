//! # Transistor Simulation
//!
//! Frame-driven carrier ensemble for the NPN transistor visualizer.

pub mod params;
pub mod simulation;

pub use params::*;
pub use simulation::*;
