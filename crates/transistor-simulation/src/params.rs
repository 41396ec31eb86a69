//! Bias parameters and runtime configuration

use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::ops::RangeInclusive;
use thiserror::Error;
use transistor_physics::{DriveFactors, DEFAULT_CARRIER_COUNT, INJECTION_THRESHOLD};

/// Junction voltages set from the control panel.
///
/// The sliders keep these in range; the simulation does not re-check them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BiasParams {
    /// Base-emitter voltage (V)
    pub vbe: f32,
    /// Collector-emitter voltage (V)
    pub vce: f32,
}

impl BiasParams {
    pub const VBE_RANGE: RangeInclusive<f32> = 0.0..=1.2;
    pub const VBE_STEP: f64 = 0.01;
    pub const VCE_RANGE: RangeInclusive<f32> = 0.5..=10.0;
    pub const VCE_STEP: f64 = 0.5;

    /// Nominal current gain shown next to the estimate
    pub const NOMINAL_CURRENT_GAIN: f32 = 100.0;

    pub fn new(vbe: f32, vce: f32) -> Self {
        Self { vbe, vce }
    }

    /// Per-frame speeds for the kinematics step
    pub fn drive_factors(&self) -> DriveFactors {
        DriveFactors::new(self.vbe, self.vce)
    }

    /// Base-emitter junction is forward biased past the threshold
    pub fn is_active(&self) -> bool {
        self.vbe > INJECTION_THRESHOLD
    }

    /// Illustrative collector current in mA.
    ///
    /// Display only. It is not derived from the carrier flow.
    pub fn estimated_collector_current_ma(&self) -> f32 {
        if self.is_active() {
            (self.vbe * 5.0).exp() * 0.1
        } else {
            0.0
        }
    }
}

impl Default for BiasParams {
    fn default() -> Self {
        // Active region: forward-biased BE junction, reverse-biased BC junction
        Self { vbe: 0.75, vce: 5.0 }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("carrier_count must be at least 1")]
    NoCarriers,
    #[error("max_frame_dt must be positive and finite, got {0}")]
    InvalidFrameDt(f32),
}

/// Startup configuration for the carrier simulation
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationConfig {
    /// Number of electrons in the ensemble
    pub carrier_count: usize,
    /// Optional RNG seed for reproducible runs
    pub rng_seed: Option<u64>,
    /// Longest frame interval (seconds) fed into a single step
    pub max_frame_dt: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            carrier_count: DEFAULT_CARRIER_COUNT,
            rng_seed: None,
            max_frame_dt: 0.1,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.carrier_count == 0 {
            return Err(ConfigError::NoCarriers);
        }
        if !(self.max_frame_dt.is_finite() && self.max_frame_dt > 0.0) {
            return Err(ConfigError::InvalidFrameDt(self.max_frame_dt));
        }
        Ok(())
    }

    /// RNG for the step loop, seeded from entropy when no seed is configured
    pub fn seeded_rng(&self) -> SmallRng {
        match self.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => {
                let seed: u64 = rand::random();
                log::debug!("No rng_seed configured, using {seed:#x}");
                SmallRng::seed_from_u64(seed)
            }
        }
    }

    /// Limit a wall-clock frame interval to something the step can absorb
    pub fn clamp_dt(&self, dt: f32) -> f32 {
        dt.clamp(0.0, self.max_frame_dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_default_bias_is_active() {
        let params = BiasParams::default();
        assert!(params.is_active());
        assert!(BiasParams::VBE_RANGE.contains(&params.vbe));
        assert!(BiasParams::VCE_RANGE.contains(&params.vce));
    }

    #[test]
    fn test_estimated_current() {
        let active = BiasParams::new(0.75, 5.0);
        let expected = (0.75f32 * 5.0).exp() * 0.1;
        assert!((active.estimated_collector_current_ma() - expected).abs() < 1e-5);

        let cutoff = BiasParams::new(0.6, 5.0);
        assert!(!cutoff.is_active());
        assert_eq!(cutoff.estimated_collector_current_ma(), 0.0);
    }

    #[test]
    fn test_drive_factors_follow_bias() {
        let d = BiasParams::new(0.8, 2.0).drive_factors();
        assert!((d.base_speed - 0.2).abs() < 1e-5);
        assert_eq!(d.sweep_speed, 4.0);
    }

    #[test]
    fn test_validate() {
        assert_eq!(SimulationConfig::default().validate(), Ok(()));

        let empty = SimulationConfig {
            carrier_count: 0,
            ..Default::default()
        };
        assert_eq!(empty.validate(), Err(ConfigError::NoCarriers));

        let bad_dt = SimulationConfig {
            max_frame_dt: 0.0,
            ..Default::default()
        };
        assert_eq!(bad_dt.validate(), Err(ConfigError::InvalidFrameDt(0.0)));
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        let config = SimulationConfig {
            rng_seed: Some(42),
            ..Default::default()
        };
        let a: Vec<u32> = (0..8).map(|_| config.seeded_rng().random()).collect();
        let mut rng = config.seeded_rng();
        let first: u32 = rng.random();
        assert!(a.iter().all(|&v| v == first));
    }

    #[test]
    fn test_clamp_dt() {
        let config = SimulationConfig::default();
        assert_eq!(config.clamp_dt(0.016), 0.016);
        assert_eq!(config.clamp_dt(2.0), 0.1);
        assert_eq!(config.clamp_dt(-1.0), 0.0);
    }
}
