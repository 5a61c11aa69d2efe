//! Step-driven particle tracker.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::{DeathCause, Particle};
use crate::advection::{Advection, TransportError};
use crate::analysis::{CflMonitor, CflStatus};
use crate::config::{ConfigError, TransportConfig};
use crate::dataset::{Dataset, DatasetError};
use crate::dispersion::HorizontalDispersion;
use crate::types::{Displacement, GeoPoint, GridPoint, TimeArrow};

/// What happens to a particle whose move ends on land.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CoastlineBehavior {
    /// Move anyway; the particle may sit on land.
    None,
    /// Move and kill the particle on land.
    #[default]
    Beaching,
    /// Cancel the move.
    Standstill,
}

impl fmt::Display for CoastlineBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Beaching => "beaching",
            Self::Standstill => "standstill",
        };
        f.write_str(name)
    }
}

impl FromStr for CoastlineBehavior {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "beaching" => Ok(Self::Beaching),
            "standstill" => Ok(Self::Standstill),
            other => Err(format!("unknown coastline behavior '{}'", other)),
        }
    }
}

/// Summary of one tracker step.
#[derive(Clone, Debug)]
pub struct StepReport {
    pub step: usize,
    /// Clock at the end of the step.
    pub time: f64,
    /// Records read from the archives before the step.
    pub records_loaded: usize,
    /// Particles still moving after the step.
    pub alive: usize,
    /// Particles stopped during the step, by id.
    pub deaths: Vec<(usize, DeathCause)>,
    /// CFL check of the advective displacements.
    pub cfl: CflStatus,
}

struct Slot {
    particle: Particle,
    rng: ChaCha8Rng,
}

/// Read-only view shared by the particle updates of one step.
struct StepContext<'a> {
    dataset: &'a Dataset,
    advection: &'a Advection,
    horizontal: Option<HorizontalDispersion>,
    vertical: bool,
    coastline: CoastlineBehavior,
    time: f64,
    dt: f64,
}

enum Outcome {
    Idle,
    Moved(Displacement),
    Died(DeathCause),
}

impl StepContext<'_> {
    fn move_particle(&self, slot: &mut Slot) -> Outcome {
        if !slot.particle.is_alive() {
            return Outcome::Idle;
        }
        let p = slot.particle.position();
        let advective = match self.advection.displacement(self.dataset, p, self.time, self.dt) {
            Ok(d) => d,
            Err(TransportError::Edge(_)) => return self.kill(slot, DeathCause::Edge),
            Err(TransportError::Interpolation(e)) => {
                debug!("particle {} stopped: {}", slot.particle.id(), e);
                return self.kill(slot, DeathCause::OutOfDomain);
            }
        };

        let mut d = advective;
        if let Some(h) = &self.horizontal {
            d = d + self.dataset.horizontal_dispersion(h, p, self.dt, &mut slot.rng);
        }
        if self.vertical {
            d = d + self
                .dataset
                .vertical_dispersion(p, self.time, self.dt, &mut slot.rng);
        }

        let mut target = p + d;
        target.z = target.z.clamp(0.0, self.dataset.geometry().surface_z());
        let wet = self.dataset.is_in_water(target);
        match self.coastline {
            CoastlineBehavior::None => slot.particle.move_to(target),
            CoastlineBehavior::Beaching => {
                slot.particle.move_to(target);
                if !wet {
                    return self.kill(slot, DeathCause::Beached);
                }
            }
            CoastlineBehavior::Standstill => {
                if wet {
                    slot.particle.move_to(target);
                }
            }
        }
        slot.particle.grow_older(self.dt);
        if self.dataset.is_on_edge(slot.particle.position()) {
            return self.kill(slot, DeathCause::Edge);
        }
        Outcome::Moved(advective)
    }

    fn kill(&self, slot: &mut Slot, cause: DeathCause) -> Outcome {
        slot.particle.kill(cause);
        Outcome::Died(cause)
    }
}

/// Moves a population of particles through a [`Dataset`].
///
/// Every step first advances the dataset to the clock, then updates each
/// particle from the loaded records: advection, then horizontal and
/// vertical dispersion, then the coastline and edge checks. Particles
/// only write their own state during the update, so with the `parallel`
/// feature the update runs on the rayon pool.
///
/// Each particle draws from its own ChaCha8 stream derived from the run
/// seed and its id; seeded runs give the same trajectories whatever the
/// thread count.
pub struct ParticleTracker {
    dataset: Dataset,
    config: TransportConfig,
    advection: Advection,
    coastline: CoastlineBehavior,
    monitor: CflMonitor,
    slots: Vec<Slot>,
    seed: u64,
    time: f64,
    steps: usize,
    started: bool,
    stop: Option<Arc<AtomicBool>>,
}

impl ParticleTracker {
    /// Tracker over `dataset`; the time step must run along the dataset's
    /// time arrow.
    pub fn new(dataset: Dataset, config: TransportConfig) -> Result<Self, DatasetError> {
        let arrow = dataset.cache().arrow();
        if TimeArrow::from_dt(config.dt) != arrow {
            return Err(ConfigError::InvalidValue {
                key: "time_step".into(),
                value: config.dt.to_string(),
                reason: format!("time step runs against the {:?} dataset", arrow),
            }
            .into());
        }
        let seed = config.seed.unwrap_or_else(rand::random);
        info!("Particle tracker: {} advection, dt = {} s, seed {}", config.scheme, config.dt, seed);
        Ok(Self {
            advection: config.advection().with_cfl_warnings(false),
            coastline: config.coastline,
            monitor: CflMonitor::new(config.cfl),
            dataset,
            config,
            slots: Vec::new(),
            seed,
            time: 0.0,
            steps: 0,
            started: false,
            stop: None,
        })
    }

    /// Flag checked between steps; setting it ends [`run`](Self::run).
    pub fn with_stop_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop = Some(flag);
        self
    }

    /// Release a particle at a grid position.
    ///
    /// Returns its id, or `None` on land or on the domain edge.
    pub fn release(&mut self, p: GridPoint) -> Option<usize> {
        if !p.is_finite() || !self.dataset.is_in_water(p) || self.dataset.is_on_edge(p) {
            return None;
        }
        let id = self.slots.len();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        rng.set_stream(id as u64);
        self.slots.push(Slot {
            particle: Particle::new(id, p),
            rng,
        });
        Some(id)
    }

    /// Release a particle at a geographic position.
    pub fn release_geo(&mut self, geo: GeoPoint) -> Option<usize> {
        let p = self.dataset.geo_to_grid(geo)?;
        self.release(p)
    }

    /// Load the records around the start time and set the clock.
    pub fn start(&mut self, time: f64) -> Result<(), DatasetError> {
        self.dataset.init(time)?;
        self.time = time;
        self.started = true;
        Ok(())
    }

    /// Advance every particle by one time step.
    pub fn step(&mut self) -> Result<StepReport, DatasetError> {
        if !self.started {
            return Err(DatasetError::NotInitialized);
        }
        let records_loaded = self.dataset.advance(self.time)?;
        if records_loaded > 0 {
            debug!("{} record(s) loaded at t = {} s", records_loaded, self.time);
        }

        let context = StepContext {
            dataset: &self.dataset,
            advection: &self.advection,
            horizontal: self.config.horizontal_dispersion,
            vertical: self.config.vertical_dispersion,
            coastline: self.coastline,
            time: self.time,
            dt: self.config.dt,
        };

        #[cfg(feature = "parallel")]
        let outcomes: Vec<Outcome> = {
            use rayon::prelude::*;
            self.slots
                .par_iter_mut()
                .map(|slot| context.move_particle(slot))
                .collect()
        };
        #[cfg(not(feature = "parallel"))]
        let outcomes: Vec<Outcome> = self
            .slots
            .iter_mut()
            .map(|slot| context.move_particle(slot))
            .collect();

        let mut deaths = Vec::new();
        let mut moves = Vec::with_capacity(outcomes.len());
        for (id, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Outcome::Idle => {}
                Outcome::Moved(d) => moves.push((id, d)),
                Outcome::Died(cause) => deaths.push((id, cause)),
            }
        }

        let cfl = self.monitor.record(self.steps, moves).clone();
        self.time += self.config.dt;
        self.steps += 1;
        self.monitor.report(self.time);

        Ok(StepReport {
            step: self.steps,
            time: self.time,
            records_loaded,
            alive: self.alive(),
            deaths,
            cfl,
        })
    }

    /// Run `steps` steps, handing every report to `callback`.
    ///
    /// Stops early when every particle is dead or the stop flag is set.
    /// Returns the number of steps taken.
    pub fn run_with_callback<F>(&mut self, steps: usize, mut callback: F) -> Result<usize, DatasetError>
    where
        F: FnMut(&StepReport, &Self),
    {
        let mut taken = 0;
        while taken < steps {
            if self.is_stopped() {
                info!("Stop requested at t = {} s", self.time);
                break;
            }
            if !self.slots.is_empty() && self.alive() == 0 {
                info!("No particle left at t = {} s", self.time);
                break;
            }
            let report = self.step()?;
            callback(&report, self);
            taken += 1;
        }
        Ok(taken)
    }

    pub fn run(&mut self, steps: usize) -> Result<usize, DatasetError> {
        self.run_with_callback(steps, |_, _| {})
    }

    fn is_stopped(&self) -> bool {
        self.stop.as_ref().is_some_and(|f| f.load(Ordering::Relaxed))
    }

    pub fn particles(&self) -> impl Iterator<Item = &Particle> {
        self.slots.iter().map(|s| &s.particle)
    }

    pub fn particle(&self, id: usize) -> Option<&Particle> {
        self.slots.get(id).map(|s| &s.particle)
    }

    /// Geographic position of a particle.
    pub fn geo_position(&self, id: usize) -> Option<GeoPoint> {
        self.particle(id)
            .map(|p| self.dataset.grid_to_geo(p.position()))
    }

    pub fn alive(&self) -> usize {
        self.slots.iter().filter(|s| s.particle.is_alive()).count()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn cfl_monitor(&self) -> &CflMonitor {
        &self.monitor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    use crate::dataset::synthetic::FlatCurrent;

    fn tracker(scenario: &FlatCurrent, config: TransportConfig) -> ParticleTracker {
        let mut tracker = ParticleTracker::new(scenario.dataset().unwrap(), config).unwrap();
        tracker.start(0.0).unwrap();
        tracker
    }

    #[test]
    fn test_flat_current_moves_east() {
        let scenario = FlatCurrent::new(20, 10, 3).with_u(0.5);
        let config = TransportConfig::new(600.0).with_scheme(crate::advection::AdvectionScheme::Euler);
        let mut tracker = tracker(&scenario, config);
        let id = tracker.release(GridPoint::new(5.0, 5.0, 1.0)).unwrap();

        let taken = tracker.run(3).unwrap();
        assert_eq!(taken, 3);
        let p = tracker.particle(id).unwrap();
        assert!(p.is_alive());
        assert_relative_eq!(p.position().x, 5.0 + 3.0 * 0.3, epsilon = 1e-9);
        assert_relative_eq!(p.position().y, 5.0, epsilon = 1e-9);
        assert_relative_eq!(p.age(), 1800.0);
        assert_relative_eq!(tracker.time(), 1800.0);
    }

    #[test]
    fn test_shallow_release_keeps_its_depth() {
        // 2 m is above the top tracer point (5 m) of 10 m layers.
        let scenario = FlatCurrent::new(20, 10, 3).with_u(0.5);
        let config = TransportConfig::new(600.0).with_scheme(crate::advection::AdvectionScheme::Euler);
        let mut tracker = tracker(&scenario, config);
        let id = tracker.release_geo(GeoPoint::new(5.05, 43.05, -2.0)).unwrap();
        assert!(tracker.particle(id).unwrap().position().z > 2.0);

        tracker.run(2).unwrap();
        let geo = tracker.geo_position(id).unwrap();
        assert_relative_eq!(geo.depth, -2.0, epsilon = 1e-9);
        assert_relative_eq!(geo.lon, 5.05 + 0.006, epsilon = 1e-6);
    }

    #[test]
    fn test_release_rejects_land_and_edge() {
        let scenario = FlatCurrent::new(10, 10, 3).with_land_column(4);
        let mut tracker = tracker(&scenario, TransportConfig::new(600.0));
        assert!(tracker.release(GridPoint::new(4.0, 5.0, 1.0)).is_none());
        assert!(tracker.release(GridPoint::new(0.2, 5.0, 1.0)).is_none());
        assert_eq!(tracker.release(GridPoint::new(6.0, 5.0, 1.0)), Some(0));
    }

    #[test]
    fn test_particle_killed_on_edge() {
        // 3 cells per step toward the east edge.
        let scenario = FlatCurrent::new(12, 10, 2).with_u(5.0);
        let config = TransportConfig::new(600.0).with_scheme(crate::advection::AdvectionScheme::Euler);
        let mut tracker = tracker(&scenario, config);
        let id = tracker.release(GridPoint::new(5.0, 5.0, 0.0)).unwrap();

        let first = tracker.step().unwrap();
        assert!(first.deaths.is_empty());
        assert_eq!(first.cfl.warnings.len(), 1);
        let second = tracker.step().unwrap();
        assert_eq!(second.deaths, vec![(id, DeathCause::Edge)]);
        assert_eq!(second.alive, 0);
        assert_eq!(tracker.run(5).unwrap(), 0);
    }

    #[test]
    fn test_beaching_and_standstill() {
        // 1.8 cells per step into a two-column strip of land.
        let scenario = FlatCurrent::new(14, 10, 2)
            .with_u(3.0)
            .with_land_column(7)
            .with_land_column(8);
        let euler = TransportConfig::new(600.0).with_scheme(crate::advection::AdvectionScheme::Euler);
        let start = GridPoint::new(6.0, 5.0, 0.0);

        let mut beaching = tracker(&scenario, euler.clone());
        let id = beaching.release(start).unwrap();
        let report = beaching.step().unwrap();
        assert_eq!(report.deaths, vec![(id, DeathCause::Beached)]);

        let mut standstill = tracker(&scenario, euler.with_coastline(CoastlineBehavior::Standstill));
        let id = standstill.release(start).unwrap();
        standstill.step().unwrap();
        let p = standstill.particle(id).unwrap();
        assert!(p.is_alive());
        assert_eq!(p.position(), start);
    }

    #[test]
    fn test_seeded_runs_repeat() {
        let scenario = FlatCurrent::new(20, 20, 4).with_kv(1e-3);
        let config = TransportConfig::new(600.0)
            .with_horizontal_dispersion(HorizontalDispersion::default())
            .with_vertical_dispersion(true)
            .with_seed(42);
        let positions = |config: TransportConfig| {
            let mut tracker = tracker(&scenario, config);
            for i in 0..8 {
                tracker.release(GridPoint::new(8.0 + i as f64 * 0.5, 10.0, 1.5));
            }
            tracker.run(4).unwrap();
            tracker.particles().map(Particle::position).collect::<Vec<_>>()
        };
        let a = positions(config.clone());
        let b = positions(config);
        assert_eq!(a, b);
        assert!(a.iter().any(|p| p.y != 10.0));
    }

    #[test]
    fn test_time_step_against_arrow() {
        let scenario = FlatCurrent::new(10, 10, 2);
        let result = ParticleTracker::new(scenario.dataset().unwrap(), TransportConfig::new(-600.0));
        assert!(matches!(result, Err(DatasetError::Config(_))));
    }

    #[test]
    fn test_stop_flag() {
        let scenario = FlatCurrent::new(10, 10, 2);
        let flag = Arc::new(AtomicBool::new(false));
        let mut tracker = tracker(&scenario, TransportConfig::new(600.0)).with_stop_flag(flag.clone());
        tracker.release(GridPoint::new(5.0, 5.0, 0.5)).unwrap();
        let taken = tracker
            .run_with_callback(10, |report, _| {
                if report.step == 2 {
                    flag.store(true, Ordering::Relaxed);
                }
            })
            .unwrap();
        assert_eq!(taken, 2);
    }

    #[test]
    fn test_step_before_start() {
        let scenario = FlatCurrent::new(10, 10, 2);
        let mut tracker = ParticleTracker::new(scenario.dataset().unwrap(), TransportConfig::new(600.0)).unwrap();
        assert!(matches!(tracker.step(), Err(DatasetError::NotInitialized)));
    }
}
