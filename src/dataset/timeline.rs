//! Time records of a series of archives.
//!
//! Every archive of a series contributes its time records. Archives are
//! ordered by their first record, which makes the whole series one
//! ascending list of `(file, rank, time)` entries: moving to the next
//! record of the series is moving one entry along that list, whether or
//! not the file changes.

use chrono::NaiveDateTime;
use log::{debug, info};

use super::units::{round_time, TimeUnits};
use super::DatasetError;
use crate::io::{Archive, ArchiveSource};
use crate::types::TimeArrow;

/// One time record of a series.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RecordRef {
    /// Index of the archive in [`ArchiveTimeline::files`].
    pub file: usize,
    /// Rank along the archive's time dimension.
    pub rank: usize,
    /// Seconds since the simulation origin.
    pub time: f64,
}

/// How archive time values become simulation seconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimeConversion {
    /// Simulation origin; archive origins are re-based onto it.
    pub epoch: Option<NaiveDateTime>,
    /// Record times are rounded to multiples of this many seconds.
    pub rounding: f64,
}

impl Default for TimeConversion {
    fn default() -> Self {
        Self {
            epoch: None,
            rounding: 60.0,
        }
    }
}

/// Ordered time records of an archive series.
#[derive(Clone, Debug)]
pub struct ArchiveTimeline {
    files: Vec<String>,
    records: Vec<RecordRef>,
}

/// Time values of one archive, in seconds.
pub fn read_times(
    archive: &dyn Archive,
    time_variable: &str,
    conversion: &TimeConversion,
) -> Result<Vec<f64>, DatasetError> {
    if !archive.has_variable(time_variable) {
        return Err(DatasetError::MissingVariable {
            variable: time_variable.to_string(),
            location: archive.location().to_string(),
        });
    }
    let units = match archive
        .variable_attribute(time_variable, "units")
        .and_then(|a| a.as_text().map(str::to_string))
    {
        Some(text) => TimeUnits::parse(&text)?,
        None => {
            debug!(
                "'{}' in {} has no units, assuming seconds",
                time_variable,
                archive.location()
            );
            TimeUnits::seconds()
        }
    };
    Ok(archive
        .read_all(time_variable)?
        .into_iter()
        .map(|t| round_time(units.to_seconds(t, conversion.epoch), conversion.rounding))
        .collect())
}

impl ArchiveTimeline {
    /// Records of every archive matching `pattern`.
    pub fn scan(
        source: &dyn ArchiveSource,
        pattern: &str,
        time_variable: &str,
        conversion: &TimeConversion,
    ) -> Result<Self, DatasetError> {
        let locations = source.list(pattern)?;
        if locations.is_empty() {
            return Err(DatasetError::NoMatchingFile {
                pattern: pattern.to_string(),
            });
        }
        let mut files = Vec::with_capacity(locations.len());
        for location in locations {
            let archive = source.open(&location)?;
            let times = read_times(archive.as_ref(), time_variable, conversion)?;
            files.push((location, times));
        }
        let timeline = Self::from_files(files)?;
        info!(
            "{} archive(s) matching '{}', {} records from {} s to {} s",
            timeline.files.len(),
            pattern,
            timeline.records.len(),
            timeline.first_time(),
            timeline.last_time()
        );
        Ok(timeline)
    }

    /// Build from explicit `(location, times)` pairs.
    ///
    /// Archives are sorted by their first record. Records must increase
    /// strictly within an archive, and an archive may not start before its
    /// predecessor ends.
    pub fn from_files(mut files: Vec<(String, Vec<f64>)>) -> Result<Self, DatasetError> {
        files.retain(|(location, times)| {
            if times.is_empty() {
                debug!("{} holds no time record, skipped", location);
            }
            !times.is_empty()
        });
        if files.is_empty() {
            return Err(DatasetError::NoRecords);
        }
        files.sort_by(|a, b| a.1[0].total_cmp(&b.1[0]));

        let mut records = Vec::new();
        for (file, (location, times)) in files.iter().enumerate() {
            if times.windows(2).any(|w| w[1] <= w[0]) {
                return Err(DatasetError::UnorderedTimes {
                    location: location.clone(),
                });
            }
            if let Some(previous) = records.last().map(|r: &RecordRef| r.time) {
                if times[0] <= previous {
                    return Err(DatasetError::OverlappingArchives {
                        first: files[file - 1].0.clone(),
                        second: location.clone(),
                    });
                }
            }
            records.extend(times.iter().enumerate().map(|(rank, &time)| RecordRef {
                file,
                rank,
                time,
            }));
        }

        Ok(Self {
            files: files.into_iter().map(|(location, _)| location).collect(),
            records,
        })
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn file(&self, index: usize) -> &str {
        &self.files[index]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record(&self, index: usize) -> RecordRef {
        self.records[index]
    }

    pub fn first_time(&self) -> f64 {
        self.records.first().map_or(f64::NAN, |r| r.time)
    }

    pub fn last_time(&self) -> f64 {
        self.records.last().map_or(f64::NAN, |r| r.time)
    }

    /// Index of the record the clock starts from.
    ///
    /// Forward: `t[r] <= time < t[r + 1]`. Backward: `t[r - 1] < time <= t[r]`.
    /// In both cases the record `r + arrow` must exist.
    pub fn locate(&self, time: f64, arrow: TimeArrow) -> Result<usize, DatasetError> {
        let out_of_range = || DatasetError::TimeOutOfRange {
            time,
            first: self.first_time(),
            last: self.last_time(),
        };
        let n = self.records.len();
        let index = match arrow {
            TimeArrow::Forward => {
                let after = self.records.partition_point(|r| r.time <= time);
                if after == 0 || after >= n {
                    return Err(out_of_range());
                }
                after - 1
            }
            TimeArrow::Backward => {
                let at = self.records.partition_point(|r| r.time < time);
                if at == 0 || at >= n {
                    return Err(out_of_range());
                }
                at
            }
        };
        Ok(index)
    }

    /// Index of the record following `index` along the time arrow.
    pub fn step(&self, index: usize, arrow: TimeArrow) -> Result<usize, DatasetError> {
        let next = index as i64 + arrow.sign();
        if next < 0 || next as usize >= self.records.len() {
            let last = self.records[index];
            return Err(DatasetError::Rollover {
                location: self.files[last.file].clone(),
                time: last.time,
            });
        }
        Ok(next as usize)
    }
}
