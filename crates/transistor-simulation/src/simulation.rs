//! Carrier ensemble and the per-frame step loop
//!
//! The ensemble is created once and never grows or shrinks. Each frame the
//! owner calls [`CarrierSimulation::step`] with the current bias and the
//! elapsed wall-clock time; rendering reads [`CarrierSimulation::carriers`]
//! afterwards.

use crate::BiasParams;
use rand::Rng;
use transistor_physics::{advance, Carrier, CarrierEvent, CarrierState, StepOutcome};

/// Create `count` electrons scattered through the emitter
pub fn initialize<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<Carrier> {
    (0..count).map(|_| Carrier::new_electron(rng)).collect()
}

/// Advance every carrier by `dt` under `params`.
///
/// The drive factors are derived once and shared by the whole ensemble.
pub fn step_carriers<R: Rng + ?Sized>(
    carriers: &mut [Carrier],
    params: &BiasParams,
    dt: f32,
    rng: &mut R,
) -> StepReport {
    let drive = params.drive_factors();
    let mut report = StepReport::default();

    for carrier in carriers.iter_mut() {
        report.record(advance(carrier, &drive, dt, rng));
    }

    report
}

/// Event tallies for one or more steps
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepReport {
    /// Entered the base and kept diffusing
    pub injected: u32,
    /// Entered the base and recombined immediately
    pub captured: u32,
    /// Turned back at the emitter/base barrier
    pub blocked: u32,
    /// Left through the collector
    pub collected: u32,
    /// Left through the base terminal
    pub recombined: u32,
    /// Safety clamp had to intervene
    pub clamped: u32,
}

impl StepReport {
    pub fn record(&mut self, outcome: StepOutcome) {
        match outcome.event {
            Some(CarrierEvent::Injected) => self.injected += 1,
            Some(CarrierEvent::Captured) => self.captured += 1,
            Some(CarrierEvent::Blocked) => self.blocked += 1,
            Some(CarrierEvent::Collected) => self.collected += 1,
            Some(CarrierEvent::Recombined) => self.recombined += 1,
            None => {}
        }
        if outcome.clamped {
            self.clamped += 1;
        }
    }

    /// All carriers that crossed the emitter/base junction
    pub fn crossings(&self) -> u32 {
        self.injected + self.captured
    }

    pub fn accumulate(&mut self, other: &StepReport) {
        self.injected += other.injected;
        self.captured += other.captured;
        self.blocked += other.blocked;
        self.collected += other.collected;
        self.recombined += other.recombined;
        self.clamped += other.clamped;
    }
}

/// How many carriers are in each lifecycle state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateCounts {
    pub emitter: usize,
    pub base_diffusion: usize,
    pub recombining: usize,
    pub collector_sweep: usize,
    pub hidden: usize,
}

impl StateCounts {
    pub fn tally(carriers: &[Carrier]) -> Self {
        let mut counts = Self::default();
        for carrier in carriers {
            match carrier.state {
                CarrierState::Emitter => counts.emitter += 1,
                CarrierState::BaseDiffusion => counts.base_diffusion += 1,
                CarrierState::Recombining => counts.recombining += 1,
                CarrierState::CollectorSweep => counts.collector_sweep += 1,
                CarrierState::Hidden => counts.hidden += 1,
            }
        }
        counts
    }

    pub fn get(&self, state: CarrierState) -> usize {
        match state {
            CarrierState::Emitter => self.emitter,
            CarrierState::BaseDiffusion => self.base_diffusion,
            CarrierState::Recombining => self.recombining,
            CarrierState::CollectorSweep => self.collector_sweep,
            CarrierState::Hidden => self.hidden,
        }
    }

    pub fn total(&self) -> usize {
        self.emitter + self.base_diffusion + self.recombining + self.collector_sweep + self.hidden
    }
}

/// Smoothed event rates (per second of simulated time)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowMeter {
    /// Smoothing time constant in seconds
    pub time_constant: f32,
    pub injection_rate: f32,
    pub collection_rate: f32,
    pub recombination_rate: f32,
}

impl Default for FlowMeter {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl FlowMeter {
    pub fn new(time_constant: f32) -> Self {
        Self {
            time_constant,
            injection_rate: 0.0,
            collection_rate: 0.0,
            recombination_rate: 0.0,
        }
    }

    /// Fold one step's events into the running rates.
    /// Zero-length steps carry no rate information and are skipped.
    pub fn update(&mut self, report: &StepReport, dt: f32) {
        if dt <= 0.0 {
            return;
        }

        // Exponential smoothing (frame-rate independent)
        let t = 1.0 - (-dt / self.time_constant).exp();

        let injection = report.crossings() as f32 / dt;
        let collection = report.collected as f32 / dt;
        let recombination = report.captured as f32 / dt;

        self.injection_rate += (injection - self.injection_rate) * t;
        self.collection_rate += (collection - self.collection_rate) * t;
        self.recombination_rate += (recombination - self.recombination_rate) * t;
    }

    /// Collected over recombined carriers, once there is something to divide by
    pub fn observed_gain(&self) -> Option<f32> {
        if self.recombination_rate > 1e-3 {
            Some(self.collection_rate / self.recombination_rate)
        } else {
            None
        }
    }
}

/// The electron ensemble plus the bookkeeping the UI reads
pub struct CarrierSimulation {
    carriers: Vec<Carrier>,
    flow: FlowMeter,
    totals: StepReport,
    steps: u64,
    elapsed: f64,
}

impl CarrierSimulation {
    pub fn new<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Self {
        log::info!("Initializing CarrierSimulation...");
        let carriers = initialize(count, rng);
        log::info!("✓ Initialized {} carriers", carriers.len());
        log::debug!(
            "  Carrier struct size: {} bytes",
            std::mem::size_of::<Carrier>()
        );

        Self::from_carriers(carriers)
    }

    /// Wrap an existing ensemble (tests and replays)
    pub fn from_carriers(carriers: Vec<Carrier>) -> Self {
        Self {
            carriers,
            flow: FlowMeter::default(),
            totals: StepReport::default(),
            steps: 0,
            elapsed: 0.0,
        }
    }

    /// Advance the whole ensemble by `dt` seconds
    pub fn step<R: Rng + ?Sized>(&mut self, params: &BiasParams, dt: f32, rng: &mut R) -> StepReport {
        let report = step_carriers(&mut self.carriers, params, dt, rng);

        if report.clamped > 0 {
            log::warn!(
                "Safety clamp pulled back {} carriers at step {} (dt={dt:.4})",
                report.clamped,
                self.steps
            );
        }

        self.flow.update(&report, dt);
        self.totals.accumulate(&report);
        self.steps += 1;
        self.elapsed += dt as f64;

        report
    }

    pub fn carriers(&self) -> &[Carrier] {
        &self.carriers
    }

    pub fn carrier_count(&self) -> u32 {
        self.carriers.len() as u32
    }

    pub fn state_counts(&self) -> StateCounts {
        StateCounts::tally(&self.carriers)
    }

    pub fn flow(&self) -> &FlowMeter {
        &self.flow
    }

    /// Events accumulated since the simulation was created
    pub fn totals(&self) -> &StepReport {
        &self.totals
    }

    pub fn step_count(&self) -> u64 {
        self.steps
    }

    /// Simulated seconds so far
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }
}
