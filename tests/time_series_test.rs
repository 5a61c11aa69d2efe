//! Integration tests for the two-record time series cache.
//!
//! The archives hold a temperature equal to `10 + n` at record `n`
//! (hourly records), so every interpolated value tells which records are
//! loaded and how they are blended.

use approx::assert_relative_eq;
use ichthyop_rs::config::{DatasetConfig, GridConvention};
use ichthyop_rs::dataset::synthetic::FlatCurrent;
use ichthyop_rs::dataset::{Dataset, DatasetError, FieldRole};
use ichthyop_rs::grid::RegularModel;
use ichthyop_rs::io::{AttributeValue, MemoryArchive, MemorySource};
use ichthyop_rs::types::{GridPoint, TimeArrow};

const NX: usize = 6;
const NY: usize = 5;
const NZ: usize = 2;
const HOUR: f64 = 3600.0;

/// Archive holding records `first..first + count`.
fn archive(name: &str, first: usize, count: usize) -> MemoryArchive {
    let cells = NZ * NY * NX;
    let records = first..first + count;
    let times = records.clone().map(|n| n as f64 * HOUR).collect();
    let temperature = records
        .flat_map(|n| std::iter::repeat(10.0 + n as f64).take(cells))
        .collect();
    let shape = [count, NZ, NY, NX];
    MemoryArchive::new(name)
        .with_dimension("time", count)
        .with_variable("time", &[count], times)
        .with_variable_attribute(
            "time",
            "units",
            AttributeValue::Text("seconds since 2000-01-01".into()),
        )
        .with_variable("uo", &shape, vec![0.0; count * cells])
        .with_variable("vo", &shape, vec![0.0; count * cells])
        .with_variable("thetao", &shape, temperature)
}

fn two_archives() -> MemorySource {
    MemorySource::new()
        .with_archive(archive("ocean_a.nc", 0, 3))
        .with_archive(archive("ocean_b.nc", 3, 2))
}

fn open(source: MemorySource, config: &DatasetConfig) -> Result<Dataset, DatasetError> {
    let geometry = FlatCurrent::new(NX, NY, NZ).geometry()?;
    Dataset::with_geometry(geometry, Box::new(RegularModel::new()), Box::new(source), config)
}

fn config() -> DatasetConfig {
    DatasetConfig::new(GridConvention::regular(), "ocean_*.nc")
}

fn p() -> GridPoint {
    GridPoint::new(2.5, 2.0, 0.5)
}

#[test]
fn test_blend_reduces_to_records() {
    let mut dataset = open(two_archives(), &config()).unwrap();
    dataset.init(0.0).unwrap();
    assert_relative_eq!(dataset.temperature(p(), 0.0).unwrap(), 10.0, epsilon = 1e-12);
    assert_relative_eq!(dataset.temperature(p(), 0.5 * HOUR).unwrap(), 10.5, epsilon = 1e-12);
    assert_relative_eq!(dataset.temperature(p(), HOUR).unwrap(), 11.0, epsilon = 1e-12);
}

#[test]
fn test_rollover_across_archives() {
    let mut dataset = open(two_archives(), &config()).unwrap();
    dataset.init(0.0).unwrap();

    assert_eq!(dataset.advance(0.5 * HOUR).unwrap(), 0);
    assert_eq!(dataset.advance(2.0 * HOUR).unwrap(), 2);
    assert_eq!(dataset.cache().record_times(), Some((2.0 * HOUR, 3.0 * HOUR)));
    assert_relative_eq!(dataset.temperature(p(), 2.5 * HOUR).unwrap(), 12.5, epsilon = 1e-12);

    assert_eq!(dataset.advance(3.0 * HOUR).unwrap(), 1);
    assert_relative_eq!(dataset.temperature(p(), 3.25 * HOUR).unwrap(), 13.25, epsilon = 1e-12);

    let err = dataset.advance(4.0 * HOUR).unwrap_err();
    assert!(matches!(err, DatasetError::Rollover { .. }));
}

#[test]
fn test_backward_series() {
    let config = config().with_time_arrow(TimeArrow::Backward);
    let mut dataset = open(two_archives(), &config).unwrap();
    dataset.init(4.0 * HOUR).unwrap();
    assert_eq!(dataset.cache().record_times(), Some((4.0 * HOUR, 3.0 * HOUR)));
    assert_relative_eq!(dataset.temperature(p(), 3.5 * HOUR).unwrap(), 13.5, epsilon = 1e-12);

    assert_eq!(dataset.advance(3.0 * HOUR).unwrap(), 1);
    assert_relative_eq!(dataset.temperature(p(), 2.75 * HOUR).unwrap(), 12.75, epsilon = 1e-12);
}

#[test]
fn test_overlapping_archives_rejected() {
    let source = MemorySource::new()
        .with_archive(archive("ocean_a.nc", 0, 3))
        .with_archive(archive("ocean_b.nc", 2, 2));
    let err = open(source, &config()).unwrap_err();
    assert!(matches!(err, DatasetError::OverlappingArchives { .. }));
}

#[test]
fn test_start_outside_records() {
    let mut dataset = open(two_archives(), &config()).unwrap();
    let err = dataset.init(10.0 * HOUR).unwrap_err();
    assert!(matches!(err, DatasetError::TimeOutOfRange { .. }));
}

#[test]
fn test_optional_and_required_fields() {
    let mut dataset = open(two_archives(), &config()).unwrap();
    dataset.init(0.0).unwrap();
    assert!(dataset.has_field(FieldRole::Temperature.key()));
    assert!(!dataset.has_field(FieldRole::Salinity.key()));
    assert!(dataset.salinity(p(), 0.0).unwrap().is_nan());

    let strict = config().with_required(false, true, false);
    let err = open(two_archives(), &strict).unwrap_err();
    assert!(matches!(err, DatasetError::MissingVariable { .. }));
}

#[test]
fn test_no_matching_archive() {
    let config = DatasetConfig::new(GridConvention::regular(), "roms_*.nc");
    let err = open(two_archives(), &config).unwrap_err();
    assert!(matches!(err, DatasetError::NoMatchingFile { .. }));
}
