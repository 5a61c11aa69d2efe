//! Synthetic scenarios for tests, benches and examples.
//!
//! [`FlatCurrent`] builds a regular box of uniform cells with horizontally
//! uniform currents and tracers, stored in an in-memory archive that goes
//! through the same loading path as real model output.

use super::{Dataset, DatasetError};
use crate::config::{DatasetConfig, GridConvention};
use crate::grid::{Array3, GridError, GridGeometry, HorizontalGrid, HorizontalMetrics, LandMask, RegularModel};
use crate::io::{AttributeValue, MemoryArchive, MemorySource};
use crate::vertical::{VerticalGrid, ZLevels};

/// Name of the diffusivity variable in the synthetic archive.
pub const KV_VARIABLE: &str = "kz";

/// Box of `nx × ny × nz` cells with a steady, uniform current.
#[derive(Clone, Debug)]
pub struct FlatCurrent {
    nx: usize,
    ny: usize,
    nz: usize,
    dx: f64,
    dy: f64,
    layer: f64,
    u: f64,
    v: f64,
    kv: Option<f64>,
    temperature: Option<f64>,
    salinity: Option<f64>,
    records: usize,
    record_step: f64,
    land_columns: Vec<usize>,
}

impl FlatCurrent {
    /// 1 km cells, 10 m layers, no current, four hourly records.
    pub fn new(nx: usize, ny: usize, nz: usize) -> Self {
        Self {
            nx,
            ny,
            nz,
            dx: 1000.0,
            dy: 1000.0,
            layer: 10.0,
            u: 0.0,
            v: 0.0,
            kv: None,
            temperature: None,
            salinity: None,
            records: 4,
            record_step: 3600.0,
            land_columns: Vec::new(),
        }
    }

    /// Eastward velocity in m/s.
    pub fn with_u(mut self, u: f64) -> Self {
        self.u = u;
        self
    }

    /// Northward velocity in m/s.
    pub fn with_v(mut self, v: f64) -> Self {
        self.v = v;
        self
    }

    /// Uniform vertical diffusivity in m²/s.
    pub fn with_kv(mut self, kv: f64) -> Self {
        self.kv = Some(kv);
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_salinity(mut self, salinity: f64) -> Self {
        self.salinity = Some(salinity);
        self
    }

    /// Horizontal cell size in meters.
    pub fn with_spacing(mut self, dx: f64, dy: f64) -> Self {
        self.dx = dx;
        self.dy = dy;
        self
    }

    /// Number of records and seconds between them.
    pub fn with_records(mut self, records: usize, step: f64) -> Self {
        self.records = records.max(2);
        self.record_step = step;
        self
    }

    /// Turn grid column `i` into land over the whole `j` range.
    pub fn with_land_column(mut self, i: usize) -> Self {
        self.land_columns.push(i);
        self
    }

    pub fn dx(&self) -> f64 {
        self.dx
    }

    pub fn dy(&self) -> f64 {
        self.dy
    }

    /// Thickness of every layer in meters.
    pub fn layer(&self) -> f64 {
        self.layer
    }

    /// Time of record `n` in seconds.
    pub fn record_time(&self, n: usize) -> f64 {
        n as f64 * self.record_step
    }

    fn is_land(&self, i: usize) -> bool {
        self.land_columns.contains(&i)
    }

    pub fn geometry(&self) -> Result<GridGeometry, GridError> {
        let lon = (0..self.nx).map(|i| 5.0 + 0.01 * i as f64).collect();
        let lat = (0..self.ny).map(|j| 43.0 + 0.01 * j as f64).collect();
        let mut mask = LandMask::all_wet(self.nz, self.ny, self.nx);
        for &i in &self.land_columns {
            for j in 0..self.ny {
                mask.set_column_dry(j, i);
            }
        }
        GridGeometry::new(
            HorizontalGrid::rectilinear(lon, lat, false)?,
            HorizontalMetrics::uniform(self.ny, self.nx, self.dx, self.dy),
            VerticalGrid::ZLevels(ZLevels::uniform(self.nz, self.nz as f64 * self.layer)?),
            mask,
        )
    }

    /// One record of the eastward velocity, zero on land.
    pub fn u_field(&self) -> Array3 {
        Array3::from_fn(self.nz, self.ny, self.nx, |_, _, i| {
            if self.is_land(i) {
                0.0
            } else {
                self.u
            }
        })
    }

    /// Record of a horizontally uniform field on `levels` levels.
    fn records_of(&self, levels: usize, value: f64, land: f64) -> Vec<f64> {
        let mut data = Vec::with_capacity(self.records * levels * self.ny * self.nx);
        for _ in 0..self.records {
            for _ in 0..levels {
                for _ in 0..self.ny {
                    for i in 0..self.nx {
                        data.push(if self.is_land(i) { land } else { value });
                    }
                }
            }
        }
        data
    }

    /// Archive holding every record.
    pub fn archive(&self) -> MemoryArchive {
        let (nz, ny, nx, nt) = (self.nz, self.ny, self.nx, self.records);
        let times = (0..nt).map(|n| self.record_time(n)).collect();
        let mut archive = MemoryArchive::new("synthetic_0000.nc")
            .with_dimension("time", nt)
            .with_dimension("depth", nz)
            .with_dimension("latitude", ny)
            .with_dimension("longitude", nx)
            .with_variable("time", &[nt], times)
            .with_variable_attribute(
                "time",
                "units",
                AttributeValue::Text("seconds since 2000-01-01 00:00:00".into()),
            )
            .with_variable("uo", &[nt, nz, ny, nx], self.records_of(nz, self.u, 0.0))
            .with_variable("vo", &[nt, nz, ny, nx], self.records_of(nz, self.v, 0.0));
        if let Some(t) = self.temperature {
            archive = archive.with_variable("thetao", &[nt, nz, ny, nx], self.records_of(nz, t, f64::NAN));
        }
        if let Some(s) = self.salinity {
            archive = archive.with_variable("so", &[nt, nz, ny, nx], self.records_of(nz, s, f64::NAN));
        }
        if let Some(kv) = self.kv {
            archive = archive.with_variable(
                KV_VARIABLE,
                &[nt, nz + 1, ny, nx],
                self.records_of(nz + 1, kv, f64::NAN),
            );
        }
        archive
    }

    pub fn source(&self) -> MemorySource {
        MemorySource::new().with_archive(self.archive())
    }

    /// Dataset configuration matching the archive.
    pub fn config(&self) -> DatasetConfig {
        let mut config = DatasetConfig::new(GridConvention::regular(), "synthetic_*.nc");
        config.variables.kv = Some(KV_VARIABLE.to_string());
        config
    }

    /// Dataset over the scenario, not yet initialized.
    pub fn dataset(&self) -> Result<Dataset, DatasetError> {
        self.dataset_with(&self.config())
    }

    /// Dataset over the scenario with a custom configuration.
    pub fn dataset_with(&self, config: &DatasetConfig) -> Result<Dataset, DatasetError> {
        Dataset::with_geometry(
            self.geometry()?,
            Box::new(RegularModel::new()),
            Box::new(self.source()),
            config,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GridPoint;

    #[test]
    fn test_archive_layout() {
        let scenario = FlatCurrent::new(6, 5, 3).with_u(0.4).with_kv(1e-3);
        let archive = scenario.archive();
        use crate::io::Archive;
        assert_eq!(archive.variable_shape("uo").unwrap(), vec![4, 3, 5, 6]);
        assert_eq!(archive.variable_shape(KV_VARIABLE).unwrap(), vec![4, 4, 5, 6]);
        assert!(!archive.has_variable("thetao"));
    }

    #[test]
    fn test_land_column() {
        let scenario = FlatCurrent::new(6, 5, 3).with_land_column(0);
        let geometry = scenario.geometry().unwrap();
        assert!(!geometry.is_in_water_at(GridPoint::new(0.0, 2.0, 1.0)));
        assert!(geometry.is_in_water_at(GridPoint::new(1.0, 2.0, 1.0)));
        assert!(geometry.bathymetry(0, 2).is_nan());
        assert_eq!(geometry.bathymetry(3, 2), 30.0);
    }
}
