//! CSV loading for trail visit exports.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

use crate::aggregate::parse_coordinate;
use crate::records::RawVisitRecord;

/// Reads every row of a visits CSV at `path`.
#[tracing::instrument(fields(path = %path.display()))]
pub fn load_records(path: &Path) -> Result<Vec<RawVisitRecord>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let records =
        read_records(file).with_context(|| format!("reading visits from {}", path.display()))?;

    info!(rows = records.len(), "Loaded visit records");
    Ok(records)
}

/// Deserializes visit rows from any CSV source with a header row.
pub fn read_records<R: Read>(reader: R) -> Result<Vec<RawVisitRecord>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();

    for result in rdr.deserialize() {
        let record: RawVisitRecord = result?;
        rows.push(record);
    }

    Ok(rows)
}

/// Shape and coordinate quality of a visits CSV.
#[derive(Debug, Default, Serialize)]
pub struct DatasetProfile {
    pub rows: usize,
    pub columns: Vec<String>,
    pub blank_latitude: usize,
    pub blank_longitude: usize,
    pub invalid_latitude: usize,
    pub invalid_longitude: usize,
}

impl DatasetProfile {
    /// Upper bound on the rows that survive coordinate cleaning.
    pub fn usable_upper_bound(&self) -> usize {
        let bad_lat = self.blank_latitude + self.invalid_latitude;
        let bad_lon = self.blank_longitude + self.invalid_longitude;
        self.rows.saturating_sub(bad_lat.max(bad_lon))
    }
}

/// Profiles the CSV at `path` without requiring any column to be well formed.
#[tracing::instrument(fields(path = %path.display()))]
pub fn profile(path: &Path) -> Result<DatasetProfile> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    profile_reader(file).with_context(|| format!("profiling {}", path.display()))
}

pub fn profile_reader<R: Read>(reader: R) -> Result<DatasetProfile> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();

    let lat_idx = headers.iter().position(|h| h == "latitude");
    let lon_idx = headers.iter().position(|h| h == "longitude");

    let mut profile = DatasetProfile {
        columns: headers.iter().map(str::to_string).collect(),
        ..Default::default()
    };

    for result in rdr.records() {
        let record = result?;
        profile.rows += 1;

        let (blank, invalid) = cell_quality(lat_idx.and_then(|i| record.get(i)));
        profile.blank_latitude += blank as usize;
        profile.invalid_latitude += invalid as usize;

        let (blank, invalid) = cell_quality(lon_idx.and_then(|i| record.get(i)));
        profile.blank_longitude += blank as usize;
        profile.invalid_longitude += invalid as usize;
    }

    debug!(rows = profile.rows, columns = profile.columns.len(), "Profiled dataset");
    Ok(profile)
}

// (blank, invalid) for a single coordinate cell.
fn cell_quality(cell: Option<&str>) -> (bool, bool) {
    match cell.map(str::trim) {
        None | Some("") => (true, false),
        Some(v) => (false, parse_coordinate(v).is_none()),
    }
}
