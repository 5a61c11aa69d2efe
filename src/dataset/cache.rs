//! Two-record cache of the tracked fields.
//!
//! Each field keeps the records bracketing the clock in a two-slot ring.
//! Advancing past the upper record overwrites the stale slot with the next
//! record and swaps the roles of the slots, so no array is ever copied
//! and the slot being read is never written.
//!
//! Fields are grouped by the archive series they come from. Each series
//! moves along its own [`ArchiveTimeline`], opening the next (or previous)
//! archive when the record crosses a file boundary.

use log::{debug, info, warn};

use super::fields::{FieldRole, FieldSpec};
use super::timeline::{ArchiveTimeline, TimeConversion};
use super::DatasetError;
use crate::grid::{Array3, GridGeometry, OceanModel};
use crate::interpolation::{FieldPair, TimeBlend};
use crate::io::{is_valid_f64, Archive, ArchiveSource};
use crate::types::TimeArrow;

/// Two records of one field; `t0` and `t1` swap roles on every push.
#[derive(Clone, Debug)]
pub struct RecordBuffer {
    slots: [Array3; 2],
    head: usize,
}

impl RecordBuffer {
    pub fn new(t0: Array3, t1: Array3) -> Self {
        Self {
            slots: [t0, t1],
            head: 0,
        }
    }

    #[inline]
    pub fn t0(&self) -> &Array3 {
        &self.slots[self.head]
    }

    #[inline]
    pub fn t1(&self) -> &Array3 {
        &self.slots[1 - self.head]
    }

    /// Drop the `t0` record; the current `t1` becomes `t0` and `next` the
    /// new `t1`.
    pub fn push(&mut self, next: Array3) {
        self.slots[self.head] = next;
        self.head = 1 - self.head;
    }
}

/// Life cycle of the cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheState {
    Uninitialized,
    Loaded,
}

#[derive(Debug)]
struct Series {
    pattern: String,
    timeline: ArchiveTimeline,
    /// Timeline index of the `t0` record.
    cursor: usize,
    /// Timeline index of the `t1` record.
    next: usize,
    open: Option<(usize, Box<dyn Archive>)>,
}

impl Series {
    fn t0(&self) -> f64 {
        self.timeline.record(self.cursor).time
    }

    fn t1(&self) -> f64 {
        self.timeline.record(self.next).time
    }

    /// Archive holding a timeline record, opened on demand.
    fn archive(
        &mut self,
        source: &dyn ArchiveSource,
        index: usize,
    ) -> Result<(&dyn Archive, usize), DatasetError> {
        let record = self.timeline.record(index);
        let reopen = !matches!(&self.open, Some((file, _)) if *file == record.file);
        if reopen {
            let location = self.timeline.file(record.file);
            if self.open.is_some() {
                info!("Rollover to {} at t = {} s", location, record.time);
            } else {
                info!("Opened {}", location);
            }
            let archive = source.open(location)?;
            self.open = Some((record.file, archive));
        }
        match &self.open {
            Some((_, archive)) => Ok((archive.as_ref(), record.rank)),
            None => Err(DatasetError::NotInitialized),
        }
    }
}

#[derive(Debug)]
struct FieldSlot {
    spec: FieldSpec,
    series: usize,
    enabled: bool,
    buffer: Option<RecordBuffer>,
}

/// Records bracketing the clock for every tracked field.
#[derive(Debug)]
pub struct TimeSeriesCache {
    source: Box<dyn ArchiveSource>,
    model: Box<dyn OceanModel>,
    arrow: TimeArrow,
    series: Vec<Series>,
    fields: Vec<FieldSlot>,
    /// Diagnosed vertical velocity on w levels.
    w: Option<RecordBuffer>,
    state: CacheState,
}

impl TimeSeriesCache {
    /// Scan the archive series of every field.
    ///
    /// Fields without a pattern of their own are read from the archives
    /// matching `pattern`. A required field missing from its series fails
    /// here; an optional one is disabled.
    pub fn new(
        source: Box<dyn ArchiveSource>,
        model: Box<dyn OceanModel>,
        pattern: &str,
        time_variable: &str,
        conversion: &TimeConversion,
        arrow: TimeArrow,
        specs: Vec<FieldSpec>,
    ) -> Result<Self, DatasetError> {
        let mut series: Vec<Series> = Vec::new();
        let mut fields = Vec::with_capacity(specs.len());

        for spec in specs {
            let pattern = spec.pattern.clone().unwrap_or_else(|| pattern.to_string());
            let index = match series.iter().position(|s| s.pattern == pattern) {
                Some(index) => index,
                None => {
                    let timeline =
                        ArchiveTimeline::scan(source.as_ref(), &pattern, time_variable, conversion)?;
                    series.push(Series {
                        pattern,
                        timeline,
                        cursor: 0,
                        next: 0,
                        open: None,
                    });
                    series.len() - 1
                }
            };

            let first = series[index].timeline.file(0).to_string();
            let enabled = source.open(&first)?.has_variable(&spec.variable);
            if !enabled {
                if spec.required {
                    return Err(DatasetError::MissingVariable {
                        variable: spec.variable,
                        location: first,
                    });
                }
                warn!(
                    "Optional field '{}' ({}) not found in {}, disabled",
                    spec.key(),
                    spec.variable,
                    first
                );
            }
            fields.push(FieldSlot {
                spec,
                series: index,
                enabled,
                buffer: None,
            });
        }

        Ok(Self {
            source,
            model,
            arrow,
            series,
            fields,
            w: None,
            state: CacheState::Uninitialized,
        })
    }

    pub fn state(&self) -> CacheState {
        self.state
    }

    pub fn arrow(&self) -> TimeArrow {
        self.arrow
    }

    pub fn model(&self) -> &dyn OceanModel {
        self.model.as_ref()
    }

    pub fn source(&self) -> &dyn ArchiveSource {
        self.source.as_ref()
    }

    /// Timeline of the velocity series.
    pub fn timeline(&self) -> Option<&ArchiveTimeline> {
        self.velocity_series().map(|s| &self.series[s].timeline)
    }

    /// Times of the records bracketing the clock (velocity series).
    pub fn record_times(&self) -> Option<(f64, f64)> {
        if self.state != CacheState::Loaded {
            return None;
        }
        let s = &self.series[self.velocity_series()?];
        Some((s.t0(), s.t1()))
    }

    /// Load the records bracketing `time`.
    pub fn init(&mut self, geometry: &GridGeometry, time: f64) -> Result<(), DatasetError> {
        for s in 0..self.series.len() {
            let series = &mut self.series[s];
            series.cursor = series.timeline.locate(time, self.arrow)?;
            series.next = series.timeline.step(series.cursor, self.arrow)?;
            let (cursor, next) = (series.cursor, series.next);

            let first = self.read_series(geometry, s, cursor)?;
            let second = self.read_series(geometry, s, next)?;
            let slots: Vec<usize> = self.series_slots(s).collect();
            for ((slot, a), b) in slots.into_iter().zip(first).zip(second) {
                self.fields[slot].buffer = Some(RecordBuffer::new(a, b));
            }
        }
        self.w = match (self.vertical_velocity(geometry, 0), self.vertical_velocity(geometry, 1)) {
            (Some(w0), Some(w1)) => Some(RecordBuffer::new(w0, w1)),
            _ => None,
        };
        self.state = CacheState::Loaded;
        if let Some((t0, t1)) = self.record_times() {
            info!("Fields loaded for t = {} s (records {} s, {} s)", time, t0, t1);
        }
        Ok(())
    }

    /// Move the records forward (backward) until they bracket `time`.
    ///
    /// Returns the number of records read per series.
    pub fn advance(&mut self, geometry: &GridGeometry, time: f64) -> Result<usize, DatasetError> {
        if self.state != CacheState::Loaded {
            return Err(DatasetError::NotInitialized);
        }
        let velocity = self.velocity_series();
        let mut shifts = 0;
        for s in 0..self.series.len() {
            let mut count = 0;
            while !self.arrow.before(time, self.series[s].t1()) {
                let series = &mut self.series[s];
                let next = series.timeline.step(series.next, self.arrow)?;
                let records = self.read_series(geometry, s, next)?;
                let slots: Vec<usize> = self.series_slots(s).collect();
                for (slot, record) in slots.into_iter().zip(records) {
                    if let Some(buffer) = self.fields[slot].buffer.as_mut() {
                        buffer.push(record);
                    }
                }
                let series = &mut self.series[s];
                series.cursor = series.next;
                series.next = next;

                if Some(s) == velocity {
                    let w = self.vertical_velocity(geometry, 1);
                    if let (Some(buffer), Some(w)) = (self.w.as_mut(), w) {
                        buffer.push(w);
                    }
                }
                count += 1;
            }
            shifts = shifts.max(count);
        }
        Ok(shifts)
    }

    /// Whether a field is tracked and present in the archives.
    pub fn is_enabled(&self, key: &str) -> bool {
        self.slot(key).is_some_and(|f| f.enabled)
    }

    /// Records of a field and the time blend for `time`.
    ///
    /// `None` for unknown or disabled fields, or before [`init`](Self::init).
    pub fn field(&self, key: &str, time: f64) -> Option<(FieldPair<'_>, TimeBlend)> {
        let slot = self.slot(key)?;
        let buffer = slot.buffer.as_ref()?;
        let pair = FieldPair::new(slot.spec.role.key(), buffer.t0(), buffer.t1());
        Some((pair, self.blend(slot.series, time)))
    }

    /// Vertical velocity records (m/s on w levels).
    pub fn vertical_velocity_field(&self, time: f64) -> Option<(FieldPair<'_>, TimeBlend)> {
        let buffer = self.w.as_ref()?;
        let series = self.velocity_series()?;
        Some((FieldPair::new("w", buffer.t0(), buffer.t1()), self.blend(series, time)))
    }

    fn blend(&self, series: usize, time: f64) -> TimeBlend {
        let s = &self.series[series];
        TimeBlend::new(time, s.t1(), s.t1() - s.t0())
    }

    fn slot(&self, key: &str) -> Option<&FieldSlot> {
        self.fields.iter().find(|f| f.spec.key() == key)
    }

    fn velocity_series(&self) -> Option<usize> {
        self.fields
            .iter()
            .find(|f| f.spec.role == FieldRole::U)
            .map(|f| f.series)
    }

    /// Indices of the enabled fields of a series.
    fn series_slots(&self, series: usize) -> impl Iterator<Item = usize> + '_ {
        self.fields
            .iter()
            .enumerate()
            .filter(move |(_, f)| f.series == series && f.enabled)
            .map(|(i, _)| i)
    }

    /// Read one record of every enabled field of a series.
    fn read_series(
        &mut self,
        geometry: &GridGeometry,
        series: usize,
        index: usize,
    ) -> Result<Vec<Array3>, DatasetError> {
        let slots: Vec<usize> = self.series_slots(series).collect();
        let (archive, rank) = self.series[series].archive(self.source.as_ref(), index)?;
        debug!("Reading record {} of {}", rank, archive.location());
        slots
            .into_iter()
            .map(|slot| read_record(archive, &self.fields[slot].spec, rank, geometry))
            .collect()
    }

    /// W from the `t0` (slot 0) or `t1` (slot 1) velocity records.
    fn vertical_velocity(&self, geometry: &GridGeometry, which: usize) -> Option<Array3> {
        if geometry.nz() < 2 {
            return None;
        }
        let pick = |key: &str| {
            self.slot(key)
                .and_then(|f| f.buffer.as_ref())
                .map(|b| if which == 0 { b.t0() } else { b.t1() })
        };
        let u = pick(FieldRole::U.key())?;
        let v = pick(FieldRole::V.key())?;
        let zeta = pick(FieldRole::Zeta.key()).map(|z| z.level(0));
        Some(self.model.vertical_velocity(geometry, u, v, zeta.as_ref()))
    }
}

/// Read one record of a field over the working domain.
///
/// Variables are `[time, y, x]` (2-D) or `[time, level, y, x]`. Fill values
/// become NaN, surface-first levels are flipped, and diffusivity stored on
/// `nz` w levels gets a bottom level so that it spans `nz + 1` faces.
pub fn read_record(
    archive: &dyn Archive,
    spec: &FieldSpec,
    rank: usize,
    geometry: &GridGeometry,
) -> Result<Array3, DatasetError> {
    let name = &spec.variable;
    let shape = archive.variable_shape(name)?;
    let bad_shape = || DatasetError::FieldShape {
        variable: name.clone(),
        shape: shape.clone(),
    };
    if shape.len() < 3 || shape.len() > 4 || rank >= shape[0] {
        return Err(bad_shape());
    }

    let (i0, j0) = geometry.origin();
    let rank_dims = shape.len();
    let ny = geometry.ny().min(shape[rank_dims - 2].saturating_sub(j0));
    let nx = geometry.nx().min(shape[rank_dims - 1].saturating_sub(i0));
    if ny == 0 || nx == 0 {
        return Err(bad_shape());
    }
    let (origin, count, nz) = if rank_dims == 4 {
        let nz = shape[1];
        (vec![rank, 0, j0, i0], vec![1, nz, ny, nx], nz)
    } else {
        (vec![rank, j0, i0], vec![1, ny, nx], 1)
    };

    let mut data = archive.read_region(name, &origin, &count)?;
    for v in data.iter_mut() {
        if !is_valid_f64(*v) {
            *v = f64::NAN;
        }
    }
    let mut field = Array3::from_vec(nz, ny, nx, data).ok_or_else(bad_shape)?;
    if nz > 1 && geometry.surface_first() {
        field.flip_levels();
    }
    if spec.role == FieldRole::Kv && nz == geometry.nz() && nz > 1 {
        field = pad_bottom_level(&field);
    }
    Ok(field)
}

/// Prepend a copy of level 0 (w levels stored from the top of the bottom cell).
fn pad_bottom_level(field: &Array3) -> Array3 {
    Array3::from_fn(field.nz() + 1, field.ny(), field.nx(), |k, j, i| {
        field.get(k.saturating_sub(1), j, i)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_buffer_swaps_roles() {
        let a = Array3::filled(1, 1, 1, 1.0);
        let b = Array3::filled(1, 1, 1, 2.0);
        let mut buffer = RecordBuffer::new(a, b);
        assert_eq!(buffer.t0().get(0, 0, 0), 1.0);
        assert_eq!(buffer.t1().get(0, 0, 0), 2.0);

        buffer.push(Array3::filled(1, 1, 1, 3.0));
        assert_eq!(buffer.t0().get(0, 0, 0), 2.0);
        assert_eq!(buffer.t1().get(0, 0, 0), 3.0);

        buffer.push(Array3::filled(1, 1, 1, 4.0));
        assert_eq!(buffer.t0().get(0, 0, 0), 3.0);
        assert_eq!(buffer.t1().get(0, 0, 0), 4.0);
    }

    #[test]
    fn test_pad_bottom_level() {
        let f = Array3::from_fn(2, 1, 1, |k, _, _| k as f64 + 1.0);
        let padded = pad_bottom_level(&f);
        assert_eq!(padded.nz(), 3);
        assert_eq!(
            (padded.get(0, 0, 0), padded.get(1, 0, 0), padded.get(2, 0, 0)),
            (1.0, 1.0, 2.0)
        );
    }
}
