//! Per-carrier kinematics and lifecycle transitions
//!
//! One call to [`advance`] moves a single carrier forward by `dt` seconds. The
//! voltage-derived speeds are computed once per frame into [`DriveFactors`] and
//! shared by every carrier in that frame.

use crate::constants::*;
use crate::particle::{Carrier, CarrierState};
use rand::Rng;

/// Speeds derived from the junction voltages
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveFactors {
    /// Base-emitter voltage the factors were derived from
    pub vbe: f32,
    /// `max(0, (vbe - threshold) * 2)`
    pub injection_factor: f32,
    /// `max(1, vce * 2)`
    pub sweep_speed: f32,
    /// Diffusion speed through the base, `0.5 * injection_factor`
    pub base_speed: f32,
}

impl DriveFactors {
    pub fn new(vbe: f32, vce: f32) -> Self {
        let injection_factor = ((vbe - INJECTION_THRESHOLD) * 2.0).max(0.0);
        Self {
            vbe,
            injection_factor,
            sweep_speed: (vce * 2.0).max(1.0),
            base_speed: 0.5 * injection_factor,
        }
    }

    /// Below threshold the junction barrier pushes carriers back
    pub fn barrier_holds(&self) -> bool {
        self.vbe < INJECTION_THRESHOLD
    }

    /// Above threshold carriers reaching the junction cross into the base
    pub fn injects(&self) -> bool {
        self.vbe > INJECTION_THRESHOLD
    }
}

/// Something noteworthy that happened to a carrier during one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarrierEvent {
    /// Crossed into the base and started diffusing
    Injected,
    /// Crossed into the base and was captured by a hole straight away
    Captured,
    /// Reached the junction without enough forward bias and was sent back
    Blocked,
    /// Left through the collector end and respawned in the emitter
    Collected,
    /// Dropped out through the base terminal and respawned in the emitter
    Recombined,
}

/// Result of advancing a carrier by one step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepOutcome {
    pub event: Option<CarrierEvent>,
    /// The safety clamp had to pull the carrier back
    pub clamped: bool,
}

/// Advance one carrier by `dt`.
///
/// Draws one uniform number per emitter step for thermal jitter, one more on
/// every emitter → base crossing, and one per respawn.
pub fn advance<R: Rng + ?Sized>(
    carrier: &mut Carrier,
    drive: &DriveFactors,
    dt: f32,
    rng: &mut R,
) -> StepOutcome {
    let mut outcome = StepOutcome::default();

    match carrier.state {
        CarrierState::Emitter => {
            carrier.speed = EMITTER_DRIFT_SPEED + rng.random::<f32>() * THERMAL_JITTER;

            if drive.barrier_holds() && carrier.position.x > EMITTER_END - BARRIER_WIDTH {
                carrier.speed = BARRIER_BOUNCE_SPEED;
            }

            carrier.position.x += carrier.speed * dt;

            if carrier.position.x > EMITTER_END {
                if drive.injects() {
                    carrier.state = CarrierState::BaseDiffusion;
                    if rng.random::<f32>() < RECOMBINATION_PROBABILITY {
                        carrier.state = CarrierState::Recombining;
                        outcome.event = Some(CarrierEvent::Captured);
                    } else {
                        outcome.event = Some(CarrierEvent::Injected);
                    }
                } else {
                    carrier.position.x = EMITTER_START;
                    outcome.event = Some(CarrierEvent::Blocked);
                }
            }
        }

        CarrierState::BaseDiffusion => {
            carrier.speed = drive.base_speed;
            carrier.position.x += carrier.speed * dt;

            if carrier.position.x > BASE_END {
                carrier.state = CarrierState::CollectorSweep;
            }
        }

        CarrierState::Recombining => {
            carrier.position.x += drive.base_speed * RECOMBINATION_DRIFT_FACTOR * dt;
            carrier.position.y -= RECOMBINATION_DROP_SPEED * dt;

            if carrier.position.y < -HALF_HEIGHT - RECOMBINATION_EXIT_MARGIN {
                carrier.respawn(rng);
                outcome.event = Some(CarrierEvent::Recombined);
            }
        }

        CarrierState::CollectorSweep => {
            carrier.speed = drive.sweep_speed + COLLECTOR_SWEEP_BOOST;
            carrier.position.x += carrier.speed * dt;

            if carrier.position.x > COLLECTOR_END {
                carrier.respawn(rng);
                outcome.event = Some(CarrierEvent::Collected);
            }
        }

        // Never assigned, so nothing moves it.
        CarrierState::Hidden => {}
    }

    outcome.clamped = apply_safety_clamp(carrier);
    outcome
}

/// Pull runaway carriers back into range. Returns true if anything changed.
pub fn apply_safety_clamp(carrier: &mut Carrier) -> bool {
    if carrier.position.x > COLLECTOR_END + SAFETY_MARGIN {
        carrier.position.x = EMITTER_START;
        carrier.state = CarrierState::Emitter;
        return true;
    }
    if carrier.position.x < EMITTER_START - SAFETY_MARGIN {
        carrier.position.x = EMITTER_START;
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn carrier_at(x: f32, y: f32, state: CarrierState) -> Carrier {
        Carrier {
            position: Vec3::new(x, y, 0.0),
            speed: 0.0,
            state,
            recombination_target_y: -HALF_HEIGHT - 1.0,
        }
    }

    #[test]
    fn test_drive_factors() {
        let d = DriveFactors::new(0.8, 5.0);
        assert!((d.injection_factor - 0.4).abs() < 1e-5);
        assert!((d.base_speed - 0.2).abs() < 1e-5);
        assert_eq!(d.sweep_speed, 10.0);

        let cutoff = DriveFactors::new(0.3, 0.2);
        assert_eq!(cutoff.injection_factor, 0.0);
        assert_eq!(cutoff.base_speed, 0.0);
        assert_eq!(cutoff.sweep_speed, 1.0);
    }

    #[test]
    fn test_threshold_is_exclusive_both_ways() {
        let d = DriveFactors::new(INJECTION_THRESHOLD, 5.0);
        assert!(!d.barrier_holds());
        assert!(!d.injects());
    }

    #[test]
    fn test_base_diffusion_enters_collector() {
        let mut rng = StdRng::seed_from_u64(1);
        let drive = DriveFactors::new(0.8, 5.0);
        let mut c = carrier_at(BASE_END - 0.01, 0.0, CarrierState::BaseDiffusion);

        let outcome = advance(&mut c, &drive, 0.1, &mut rng);

        assert!((c.position.x - (BASE_END + 0.01)).abs() < 1e-5);
        assert_eq!(c.state, CarrierState::CollectorSweep);
        assert_eq!(outcome.event, None);
        assert!(!outcome.clamped);
    }

    #[test]
    fn test_recombining_carrier_respawns_below_block() {
        let mut rng = StdRng::seed_from_u64(2);
        let drive = DriveFactors::new(0.75, 5.0);
        let mut c = carrier_at(0.0, -HALF_HEIGHT - 0.4, CarrierState::Recombining);

        let outcome = advance(&mut c, &drive, 0.1, &mut rng);

        assert_eq!(outcome.event, Some(CarrierEvent::Recombined));
        assert_eq!(c.state, CarrierState::Emitter);
        assert_eq!(c.position.x, EMITTER_START);
        assert!(c.position.y.abs() <= BLOCK_HEIGHT * SPAWN_SPREAD / 2.0);
    }

    #[test]
    fn test_recombining_carrier_drifts_and_drops() {
        let mut rng = StdRng::seed_from_u64(3);
        let drive = DriveFactors::new(0.8, 5.0);
        let mut c = carrier_at(0.0, 0.0, CarrierState::Recombining);

        advance(&mut c, &drive, 0.1, &mut rng);

        assert_eq!(c.state, CarrierState::Recombining);
        assert!((c.position.x - 0.004).abs() < 1e-5);
        assert!((c.position.y - -0.2).abs() < 1e-5);
    }

    #[test]
    fn test_collector_sweep_respawns_past_end() {
        let mut rng = StdRng::seed_from_u64(4);
        let drive = DriveFactors::new(0.75, 5.0);
        let mut c = carrier_at(COLLECTOR_END - 0.05, 0.1, CarrierState::CollectorSweep);

        let outcome = advance(&mut c, &drive, 0.01, &mut rng);

        assert_eq!(c.speed, 15.0);
        assert_eq!(outcome.event, Some(CarrierEvent::Collected));
        assert_eq!(c.state, CarrierState::Emitter);
        assert_eq!(c.position.x, EMITTER_START);
    }

    #[test]
    fn test_emitter_speed_has_thermal_jitter() {
        let mut rng = StdRng::seed_from_u64(5);
        let drive = DriveFactors::new(0.75, 5.0);
        let mut c = carrier_at(EMITTER_START, 0.0, CarrierState::Emitter);

        for _ in 0..100 {
            c.position.x = EMITTER_START;
            advance(&mut c, &drive, 0.01, &mut rng);
            assert!(c.speed >= EMITTER_DRIFT_SPEED);
            assert!(c.speed <= EMITTER_DRIFT_SPEED + THERMAL_JITTER);
        }
    }

    #[test]
    fn test_barrier_bounces_near_junction() {
        let mut rng = StdRng::seed_from_u64(6);
        let drive = DriveFactors::new(0.5, 5.0);
        let start = EMITTER_END - 0.1;
        let mut c = carrier_at(start, 0.0, CarrierState::Emitter);

        let outcome = advance(&mut c, &drive, 0.1, &mut rng);

        assert_eq!(c.speed, BARRIER_BOUNCE_SPEED);
        assert!((c.position.x - (start - 0.05)).abs() < 1e-5);
        assert_eq!(c.state, CarrierState::Emitter);
        assert_eq!(outcome.event, None);
    }

    #[test]
    fn test_blocked_crossing_resets_to_emitter_start() {
        let mut rng = StdRng::seed_from_u64(7);
        // Exactly at threshold: no bounce, but no injection either
        let drive = DriveFactors::new(INJECTION_THRESHOLD, 5.0);
        let mut c = carrier_at(EMITTER_END - 0.001, 0.0, CarrierState::Emitter);

        let outcome = advance(&mut c, &drive, 0.1, &mut rng);

        assert_eq!(outcome.event, Some(CarrierEvent::Blocked));
        assert_eq!(c.position.x, EMITTER_START);
        assert_eq!(c.state, CarrierState::Emitter);
    }

    #[test]
    fn test_safety_clamp_far_right() {
        let mut c = carrier_at(COLLECTOR_END + 1.5, 0.0, CarrierState::BaseDiffusion);
        assert!(apply_safety_clamp(&mut c));
        assert_eq!(c.position.x, EMITTER_START);
        assert_eq!(c.state, CarrierState::Emitter);
    }

    #[test]
    fn test_safety_clamp_far_left_keeps_state() {
        let mut c = carrier_at(EMITTER_START - 1.5, 0.0, CarrierState::Recombining);
        assert!(apply_safety_clamp(&mut c));
        assert_eq!(c.position.x, EMITTER_START);
        assert_eq!(c.state, CarrierState::Recombining);
    }

    #[test]
    fn test_safety_clamp_leaves_in_range_alone() {
        let mut c = carrier_at(COLLECTOR_END + 0.5, 0.0, CarrierState::CollectorSweep);
        assert!(!apply_safety_clamp(&mut c));
        assert_eq!(c.position.x, COLLECTOR_END + 0.5);
    }

    #[test]
    fn test_recombination_fraction_near_three_percent() {
        let mut rng = StdRng::seed_from_u64(0xB17);
        let drive = DriveFactors::new(0.75, 5.0);
        let trials = 20_000;
        let mut captured = 0;
        let mut injected = 0;

        for _ in 0..trials {
            let mut c = carrier_at(EMITTER_END - 0.001, 0.0, CarrierState::Emitter);
            match advance(&mut c, &drive, 0.01, &mut rng).event {
                Some(CarrierEvent::Captured) => {
                    assert_eq!(c.state, CarrierState::Recombining);
                    captured += 1;
                }
                Some(CarrierEvent::Injected) => {
                    assert_eq!(c.state, CarrierState::BaseDiffusion);
                    injected += 1;
                }
                other => panic!("unexpected outcome {other:?}"),
            }
        }

        assert_eq!(captured + injected, trials);
        let fraction = captured as f32 / trials as f32;
        assert!(
            (fraction - RECOMBINATION_PROBABILITY).abs() < 0.01,
            "fraction {fraction}"
        );
    }
}
