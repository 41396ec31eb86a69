//! # Transistor Renderer
//!
//! Draws the carrier ensemble and the device structure with wgpu.
//! Everything here reads the simulation state and never mutates it.

pub mod camera;
pub mod instance;
pub mod renderer;
pub mod structure;

pub use camera::*;
pub use instance::*;
pub use renderer::*;
pub use structure::*;
