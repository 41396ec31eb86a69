//! Charge carriers and their lifecycle states

use crate::constants::*;
use glam::Vec3;
use rand::Rng;

/// Where a carrier is in its emitter → base → collector cycle
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CarrierState {
    /// Drifting through the emitter towards the base junction
    Emitter = 0,
    /// Injected into the base, diffusing towards the collector
    BaseDiffusion = 1,
    /// Captured by a hole in the base, falling out through the base terminal
    Recombining = 2,
    /// Swept across the collector by the reverse-biased field
    CollectorSweep = 3,
    // Declared for density-based dimming that was never built. Nothing assigns it.
    Hidden = 4,
}

impl CarrierState {
    /// States a carrier can actually be in
    pub const REACHABLE: [CarrierState; 4] = [
        CarrierState::Emitter,
        CarrierState::BaseDiffusion,
        CarrierState::Recombining,
        CarrierState::CollectorSweep,
    ];

    pub fn label(self) -> &'static str {
        match self {
            CarrierState::Emitter => "Emitter",
            CarrierState::BaseDiffusion => "Base diffusion",
            CarrierState::Recombining => "Recombining",
            CarrierState::CollectorSweep => "Collector sweep",
            CarrierState::Hidden => "Hidden",
        }
    }
}

/// A single electron in the ensemble
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Carrier {
    /// x runs along the transport axis, y/z only spread carriers for display
    pub position: Vec3,
    /// Velocity along x used in the most recent step
    pub speed: f32,
    pub state: CarrierState,
    /// Drop target below the base. Fixed at creation, not read by the transitions.
    pub recombination_target_y: f32,
}

impl Carrier {
    /// Create an electron at rest somewhere inside the emitter block
    pub fn new_electron<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let position = Vec3::new(
            EMITTER_START + rng.random::<f32>() * EMITTER_WIDTH,
            random_spread(rng, BLOCK_HEIGHT),
            random_spread(rng, BLOCK_DEPTH),
        );

        Self {
            position,
            speed: 0.0,
            state: CarrierState::Emitter,
            recombination_target_y: -HALF_HEIGHT - 1.0,
        }
    }

    /// Send the carrier back to the emitter start with a fresh height.
    /// z and speed are left alone.
    pub fn respawn<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.state = CarrierState::Emitter;
        self.position.x = EMITTER_START;
        self.position.y = random_spread(rng, BLOCK_HEIGHT);
    }
}

/// Uniform draw in `[-extent * SPAWN_SPREAD / 2, extent * SPAWN_SPREAD / 2)`
pub fn random_spread<R: Rng + ?Sized>(rng: &mut R, extent: f32) -> f32 {
    (rng.random::<f32>() - 0.5) * extent * SPAWN_SPREAD
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_new_electron_inside_emitter() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let c = Carrier::new_electron(&mut rng);
            assert_eq!(c.state, CarrierState::Emitter);
            assert_eq!(c.speed, 0.0);
            assert!(c.position.x >= EMITTER_START && c.position.x <= EMITTER_END);
            assert!(c.position.y.abs() <= BLOCK_HEIGHT * SPAWN_SPREAD / 2.0);
            assert!(c.position.z.abs() <= BLOCK_DEPTH * SPAWN_SPREAD / 2.0);
            assert_eq!(c.recombination_target_y, -HALF_HEIGHT - 1.0);
        }
    }

    #[test]
    fn test_respawn_keeps_depth() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut c = Carrier::new_electron(&mut rng);
        c.state = CarrierState::CollectorSweep;
        c.position = Vec3::new(COLLECTOR_END + 0.1, 0.3, 0.25);

        c.respawn(&mut rng);

        assert_eq!(c.state, CarrierState::Emitter);
        assert_eq!(c.position.x, EMITTER_START);
        assert_eq!(c.position.z, 0.25);
        assert!(c.position.y.abs() <= BLOCK_HEIGHT * SPAWN_SPREAD / 2.0);
    }

    #[test]
    fn test_hidden_is_not_reachable() {
        assert!(!CarrierState::REACHABLE.contains(&CarrierState::Hidden));
    }
}
