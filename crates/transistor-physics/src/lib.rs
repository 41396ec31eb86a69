//! # Transistor Physics
//!
//! Carrier model for an NPN bipolar junction transistor in its active region:
//! device geometry, the electron lifecycle and the per-step kinematics.

pub mod constants;
pub mod kinematics;
pub mod particle;

pub use constants::*;
pub use kinematics::*;
pub use particle::*;
