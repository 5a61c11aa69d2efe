//! Time-varying ocean fields on a static grid.
//!
//! A [`Dataset`] is the context object of a run. It owns the
//! [`GridGeometry`] built at setup and the [`TimeSeriesCache`] holding the
//! two records around the clock for every tracked field, and answers the
//! queries of the transport code:
//!
//! - location: [`is_in_water`](Dataset::is_in_water),
//!   [`is_close_to_coast`](Dataset::is_close_to_coast),
//!   [`is_on_edge`](Dataset::is_on_edge), [`grid_to_geo`](Dataset::grid_to_geo),
//!   [`geo_to_grid`](Dataset::geo_to_grid), [`depth`](Dataset::depth),
//!   [`depth_to_z`](Dataset::depth_to_z), [`z_to_depth`](Dataset::z_to_depth),
//!   [`bathymetry`](Dataset::bathymetry)
//! - fields: [`temperature`](Dataset::temperature),
//!   [`salinity`](Dataset::salinity), [`tracer`](Dataset::tracer), and the
//!   velocity and diffusivity seams used by advection and dispersion
//!
//! # Life Cycle
//!
//! ```text
//! open ──> init(t0) ──> advance(t) ──> advance(t) ──> ...
//!                 (records loaded)   (barrier before particle updates)
//! ```
//!
//! `advance` mutates the cache and must complete before particles read the
//! new records; between two calls the dataset is shared read-only.
//!
//! # Example
//!
//! ```
//! use ichthyop_rs::dataset::synthetic::FlatCurrent;
//! use ichthyop_rs::types::GridPoint;
//!
//! let mut dataset = FlatCurrent::new(10, 10, 5).with_temperature(14.0).dataset().unwrap();
//! dataset.init(0.0).unwrap();
//!
//! let p = GridPoint::new(4.2, 5.7, 1.5);
//! assert!(dataset.is_in_water(p));
//! assert!((dataset.temperature(p, 0.0).unwrap() - 14.0).abs() < 1e-12);
//! assert!(dataset.salinity(p, 0.0).unwrap().is_nan());
//! ```

mod cache;
mod fields;
pub mod synthetic;
mod timeline;
mod units;

pub use cache::{read_record, CacheState, RecordBuffer, TimeSeriesCache};
pub use fields::{FieldRole, FieldSpec};
pub use timeline::{read_times, ArchiveTimeline, RecordRef, TimeConversion};
pub use units::{parse_date, round_time, TimeUnits};

use log::info;
use rand::Rng;
use thiserror::Error;

use crate::advection::{Advection, AdvectionScheme, TransportError, VelocityField};
use crate::config::{ConfigError, DatasetConfig};
use crate::dispersion::{DiffusivityProfile, HorizontalDispersion, VerticalDispersion};
use crate::grid::{GridError, GridGeometry, OceanModel};
use crate::interpolation::{
    EmptyStencilPolicy, FieldInterpolator, InterpolationError, Placement, ScalarMethod,
};
use crate::io::{ArchiveError, ArchiveSource, DirectorySource};
use crate::types::{Displacement, GeoPoint, GridPoint};

/// Error type for dataset setup and record loading.
///
/// All variants are fatal for the run: a dataset that cannot be opened,
/// or a record that cannot be loaded, leaves the particles without
/// currents.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// Archive access failed
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// Grid construction failed
    #[error(transparent)]
    Grid(#[from] GridError),

    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Required variable absent from its archives
    #[error("missing variable '{variable}' in {location}")]
    MissingVariable { variable: String, location: String },

    /// No archive matches the pattern
    #[error("no archive matches '{pattern}'")]
    NoMatchingFile { pattern: String },

    /// Archives hold no time record
    #[error("archives hold no time record")]
    NoRecords,

    /// Time records do not increase
    #[error("time records of {location} are not increasing")]
    UnorderedTimes { location: String },

    /// Two archives cover the same time span
    #[error("archives {first} and {second} overlap in time")]
    OverlappingArchives { first: String, second: String },

    /// Time outside the records of the archives
    #[error("time {time} s outside the archive records [{first} s, {last} s]")]
    TimeOutOfRange { time: f64, first: f64, last: f64 },

    /// No archive follows the last record read
    #[error("no record after t = {time} s in {location}")]
    Rollover { location: String, time: f64 },

    /// Records requested before `init`
    #[error("dataset not initialized")]
    NotInitialized,

    /// Variable with an unexpected shape
    #[error("variable '{variable}' has unexpected shape {shape:?}")]
    FieldShape { variable: String, shape: Vec<usize> },

    /// Unreadable time units
    #[error("invalid time units '{0}'")]
    InvalidTimeUnits(String),
}

/// Static grid and time-varying fields of a run.
#[derive(Debug)]
pub struct Dataset {
    geometry: GridGeometry,
    cache: TimeSeriesCache,
    policy: EmptyStencilPolicy,
    method: ScalarMethod,
}

impl Dataset {
    /// Open the archives described by `config` from `source`.
    ///
    /// The static grid is loaded from the first velocity archive (or the
    /// model's grid files), shrunk to the configured corners, and every
    /// field series is scanned.
    pub fn open(config: &DatasetConfig, source: Box<dyn ArchiveSource>) -> Result<Self, DatasetError> {
        let model = config.model();
        let first = source
            .list(&config.pattern)?
            .into_iter()
            .next()
            .ok_or_else(|| DatasetError::NoMatchingFile {
                pattern: config.pattern.clone(),
            })?;
        let mut geometry = model.load_geometry(source.as_ref(), &first)?;
        if let Some((north_west, south_east)) = config.shrink {
            geometry = geometry.shrink(north_west, south_east)?;
        }
        info!(
            "{} grid {}x{}x{}, extent {}",
            model.name(),
            geometry.nx(),
            geometry.ny(),
            geometry.nz(),
            geometry.extent()
        );
        Self::with_geometry(geometry, model, source, config)
    }

    /// Open the archives of `config.directory` (current directory when unset).
    pub fn from_config(config: &DatasetConfig) -> Result<Self, DatasetError> {
        let root = config.directory.as_deref().unwrap_or(".");
        Self::open(config, Box::new(DirectorySource::new(root)))
    }

    /// Dataset on an already built geometry.
    pub fn with_geometry(
        geometry: GridGeometry,
        model: Box<dyn OceanModel>,
        source: Box<dyn ArchiveSource>,
        config: &DatasetConfig,
    ) -> Result<Self, DatasetError> {
        let cache = TimeSeriesCache::new(
            source,
            model,
            &config.pattern,
            &config.variables.time,
            &config.time_conversion(),
            config.time_arrow,
            config.fields(),
        )?;
        Ok(Self {
            geometry,
            cache,
            policy: config.empty_stencil,
            method: config.scalar_method,
        })
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    pub fn cache(&self) -> &TimeSeriesCache {
        &self.cache
    }

    /// Load the records bracketing the start time.
    pub fn init(&mut self, time: f64) -> Result<(), DatasetError> {
        self.cache.init(&self.geometry, time)
    }

    /// Move the records along until they bracket `time`.
    pub fn advance(&mut self, time: f64) -> Result<usize, DatasetError> {
        self.cache.advance(&self.geometry, time)
    }

    /// Interpolator with the configured policy and scalar method.
    pub fn interpolator(&self) -> FieldInterpolator<'_> {
        FieldInterpolator::new(&self.geometry)
            .with_policy(self.policy)
            .with_method(self.method)
    }

    // =========================================================================
    // Location
    // =========================================================================

    pub fn is_in_water(&self, p: GridPoint) -> bool {
        self.geometry.is_in_water_at(p)
    }

    pub fn is_close_to_coast(&self, p: GridPoint) -> bool {
        self.geometry.is_close_to_coast(p)
    }

    pub fn is_on_edge(&self, p: GridPoint) -> bool {
        self.geometry.is_on_edge(p)
    }

    pub fn grid_to_geo(&self, p: GridPoint) -> GeoPoint {
        self.geometry.grid_to_geo(p)
    }

    /// Grid position of a geographic point, `None` outside the domain.
    pub fn geo_to_grid(&self, geo: GeoPoint) -> Option<GridPoint> {
        self.geometry.geo_to_grid_point(geo)
    }

    /// Depth (negative down) of a particle.
    pub fn depth(&self, p: GridPoint) -> f64 {
        self.geometry.z_to_depth(p.x, p.y, p.z)
    }

    pub fn z_to_depth(&self, x: f64, y: f64, z: f64) -> f64 {
        self.geometry.z_to_depth(x, y, z)
    }

    pub fn depth_to_z(&self, x: f64, y: f64, depth: f64) -> f64 {
        self.geometry.depth_to_z(x, y, depth)
    }

    /// Water depth in meters of column `(i, j)`, NaN on land.
    pub fn bathymetry(&self, i: isize, j: isize) -> f64 {
        self.geometry.bathymetry(i, j)
    }

    // =========================================================================
    // Fields
    // =========================================================================

    /// Whether a field is tracked and found in the archives.
    pub fn has_field(&self, key: &str) -> bool {
        self.cache.is_enabled(key)
    }

    /// Value of a tracked centre field; NaN when the field is disabled.
    pub fn tracer(&self, key: &str, p: GridPoint, time: f64) -> Result<f64, InterpolationError> {
        match self.cache.field(key, time) {
            Some((pair, blend)) => self.interpolator().scalar(&pair, p, blend),
            None => Ok(f64::NAN),
        }
    }

    /// Sea water temperature (°C).
    pub fn temperature(&self, p: GridPoint, time: f64) -> Result<f64, InterpolationError> {
        self.tracer(FieldRole::Temperature.key(), p, time)
    }

    /// Salinity (PSU).
    pub fn salinity(&self, p: GridPoint, time: f64) -> Result<f64, InterpolationError> {
        self.tracer(FieldRole::Salinity.key(), p, time)
    }

    // =========================================================================
    // Transport
    // =========================================================================

    /// Forward Euler advection step; CFL exceedance is logged.
    pub fn advect_euler(&self, p: GridPoint, time: f64, dt: f64) -> Result<Displacement, TransportError> {
        Advection::new(AdvectionScheme::Euler).checked_step(self, p, time, dt)
    }

    /// Runge-Kutta 4 advection step; CFL exceedance is logged.
    pub fn advect_rk4(&self, p: GridPoint, time: f64, dt: f64) -> Result<Displacement, TransportError> {
        Advection::new(AdvectionScheme::Rk4).checked_step(self, p, time, dt)
    }

    /// Horizontal dispersion step.
    pub fn horizontal_dispersion<R: Rng + ?Sized>(
        &self,
        dispersion: &HorizontalDispersion,
        p: GridPoint,
        dt: f64,
        rng: &mut R,
    ) -> Displacement {
        dispersion.displacement(&self.geometry, p, dt, rng)
    }

    /// Vertical dispersion step; no motion without diffusivity.
    pub fn vertical_dispersion<R: Rng + ?Sized>(
        &self,
        p: GridPoint,
        time: f64,
        dt: f64,
        rng: &mut R,
    ) -> Displacement {
        VerticalDispersion.displacement(self, p, time, dt, rng)
    }
}

impl VelocityField for Dataset {
    fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    fn grid_velocity(&self, p: GridPoint, time: f64) -> Result<Displacement, InterpolationError> {
        let interpolator = self.interpolator();
        let component = |key: &str, placement: Placement| match self.cache.field(key, time) {
            Some((pair, blend)) => interpolator.grid_velocity(&pair, placement, p, blend),
            None => Ok(0.0),
        };
        let dx = component(FieldRole::U.key(), Placement::EastFace)?;
        let dy = component(FieldRole::V.key(), Placement::NorthFace)?;
        let dz = match self.cache.vertical_velocity_field(time) {
            Some((pair, blend)) if self.geometry.nz() > 1 => {
                interpolator.grid_velocity(&pair, Placement::TopFace, p, blend)?
            }
            _ => 0.0,
        };
        Ok(Displacement::new(dx, dy, dz))
    }
}

impl DiffusivityProfile for Dataset {
    fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    fn kv_column(&self, j: usize, i: usize, time: f64) -> Option<Vec<f64>> {
        let (pair, blend) = self.cache.field(FieldRole::Kv.key(), time)?;
        let levels = self.geometry.nz() + 1;
        if pair.t0.nz() != levels || j >= pair.t0.ny() || i >= pair.t0.nx() {
            return None;
        }
        Some(
            (0..levels)
                .map(|kw| blend.blend(pair.t0.get(kw, j, i), pair.t1.get(kw, j, i)))
                .collect(),
        )
    }
}
