//! Geometry and transport constants for the NPN transistor model
//!
//! Everything here is derived from the block widths at compile time. The
//! transport axis is x; y and z only spread carriers out for display.

/// Height of every region block (y extent)
pub const BLOCK_HEIGHT: f32 = 2.0;

/// Depth of every region block (z extent)
pub const BLOCK_DEPTH: f32 = 2.0;

/// Emitter width along the transport axis
pub const EMITTER_WIDTH: f32 = 2.0;

/// Base width (thin compared to emitter and collector)
pub const BASE_WIDTH: f32 = 0.4;

/// Collector width
pub const COLLECTOR_WIDTH: f32 = 2.5;

// Region boundaries along x. The base is centred on the origin and the
// outer regions share its faces exactly, so neighbouring bounds compare equal.
pub const BASE_START: f32 = -BASE_WIDTH / 2.0;
pub const BASE_END: f32 = BASE_WIDTH / 2.0;
pub const EMITTER_END: f32 = BASE_START;
pub const EMITTER_START: f32 = EMITTER_END - EMITTER_WIDTH;
pub const COLLECTOR_START: f32 = BASE_END;
pub const COLLECTOR_END: f32 = COLLECTOR_START + COLLECTOR_WIDTH;

/// Region centres
pub const EMITTER_X: f32 = BASE_START - EMITTER_WIDTH / 2.0;
pub const BASE_X: f32 = 0.0;
pub const COLLECTOR_X: f32 = BASE_END + COLLECTOR_WIDTH / 2.0;

/// Fraction of the block height/depth used when scattering carriers
pub const SPAWN_SPREAD: f32 = 0.8;

/// Forward bias (volts) the base-emitter junction needs before injection
pub const INJECTION_THRESHOLD: f32 = 0.6;

/// Probability that an injected electron recombines in the base (~3%)
pub const RECOMBINATION_PROBABILITY: f32 = 0.03;

/// Emitter drift: base speed plus up to `THERMAL_JITTER` of random thermal motion
pub const EMITTER_DRIFT_SPEED: f32 = 1.0;
pub const THERMAL_JITTER: f32 = 0.5;

/// Speed applied near the emitter/base junction while the barrier holds
pub const BARRIER_BOUNCE_SPEED: f32 = -0.5;

/// Distance in front of the junction where the barrier pushes back
pub const BARRIER_WIDTH: f32 = 0.2;

/// Downward speed of a recombining carrier (towards the base terminal)
pub const RECOMBINATION_DROP_SPEED: f32 = 2.0;

/// Fraction of the base diffusion speed kept while recombining
pub const RECOMBINATION_DRIFT_FACTOR: f32 = 0.2;

/// Extra speed added on top of the V_CE field in the collector
pub const COLLECTOR_SWEEP_BOOST: f32 = 5.0;

/// Recombining carriers respawn once they fall this far below the block
pub const RECOMBINATION_EXIT_MARGIN: f32 = 0.5;

/// Slack beyond the device ends before the safety clamp kicks in
pub const SAFETY_MARGIN: f32 = 1.0;

/// Carrier size for rendering
pub const ELECTRON_SIZE: f32 = 0.08;

/// Default ensemble size
pub const DEFAULT_CARRIER_COUNT: usize = 1000;

/// Half of the block height; the bottom face sits at `-HALF_HEIGHT`
pub const HALF_HEIGHT: f32 = BLOCK_HEIGHT / 2.0;

/// Region boundaries bundled for callers that prefer a value over constants
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionBounds {
    pub emitter_start: f32,
    pub emitter_end: f32,
    pub base_start: f32,
    pub base_end: f32,
    pub collector_start: f32,
    pub collector_end: f32,
}

impl RegionBounds {
    pub const DEVICE: Self = Self {
        emitter_start: EMITTER_START,
        emitter_end: EMITTER_END,
        base_start: BASE_START,
        base_end: BASE_END,
        collector_start: COLLECTOR_START,
        collector_end: COLLECTOR_END,
    };

    /// Region containing `x`, or `None` outside the device
    pub fn region_at(&self, x: f32) -> Option<Region> {
        if x < self.emitter_start || x > self.collector_end {
            None
        } else if x <= self.emitter_end {
            Some(Region::Emitter)
        } else if x <= self.base_end {
            Some(Region::Base)
        } else {
            Some(Region::Collector)
        }
    }
}

/// Doped regions of the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Emitter,
    Base,
    Collector,
}

impl Region {
    pub const ALL: [Region; 3] = [Region::Emitter, Region::Base, Region::Collector];

    pub fn center_x(self) -> f32 {
        match self {
            Region::Emitter => EMITTER_X,
            Region::Base => BASE_X,
            Region::Collector => COLLECTOR_X,
        }
    }

    pub fn width(self) -> f32 {
        match self {
            Region::Emitter => EMITTER_WIDTH,
            Region::Base => BASE_WIDTH,
            Region::Collector => COLLECTOR_WIDTH,
        }
    }

    /// Label shown above the block
    pub fn label(self) -> &'static str {
        match self {
            Region::Emitter => "Emitter (N)",
            Region::Base => "Base (P)",
            Region::Collector => "Collector (N)",
        }
    }

    /// Doping note shown below the block, if any
    pub fn doping_note(self) -> Option<&'static str> {
        match self {
            Region::Emitter => Some("High Doping"),
            Region::Base => Some("Thin/Light Doped"),
            Region::Collector => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regions_are_contiguous() {
        let b = RegionBounds::DEVICE;
        assert!(b.emitter_start < b.emitter_end);
        assert_eq!(b.emitter_end, b.base_start);
        assert!(b.base_start < b.base_end);
        assert_eq!(b.base_end, b.collector_start);
        assert!(b.collector_start < b.collector_end);
    }

    #[test]
    fn test_boundary_values() {
        assert!((EMITTER_START - -2.2).abs() < 1e-6);
        assert!((EMITTER_END - -0.2).abs() < 1e-6);
        assert!((BASE_END - 0.2).abs() < 1e-6);
        assert!((COLLECTOR_END - 2.7).abs() < 1e-6);
    }

    #[test]
    fn test_region_at() {
        let b = RegionBounds::DEVICE;
        assert_eq!(b.region_at(-1.0), Some(Region::Emitter));
        assert_eq!(b.region_at(0.0), Some(Region::Base));
        assert_eq!(b.region_at(1.0), Some(Region::Collector));
        assert_eq!(b.region_at(3.0), None);
        assert_eq!(b.region_at(-3.0), None);
    }

    #[test]
    fn test_region_widths_sum() {
        let total: f32 = Region::ALL.iter().map(|r| r.width()).sum();
        assert!((total - (COLLECTOR_END - EMITTER_START)).abs() < 1e-5);
    }
}
