//! CSV readers for sector coordinate files and labelled planet datasets.
//!
//! Malformed rows are logged and skipped rather than failing the whole file.

use std::{fs, path::Path};
use tracing::{debug, warn};

use crate::common_types::{SpatialDataset, SpatialPoint};
use crate::error::InputError;

type Coordinates = (i32, i32, i32);

fn read_to_string(path: &Path) -> Result<String, InputError> {
    fs::read_to_string(path).map_err(|source| InputError::Io { path: path.to_path_buf(), source })
}

fn parse_coordinates(line: &str) -> Option<Coordinates> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    let [x, y, z] = fields.as_slice() else {
        return None;
    };
    Some((x.parse().ok()?, y.parse().ok()?, z.parse().ok()?))
}

/// Parses `x,y,z` rows after a header line.
pub fn parse_sector_csv(content: &str) -> Vec<Coordinates> {
    let mut coordinates = Vec::new();
    for (number, line) in content.lines().enumerate().skip(1) {
        if line.trim().is_empty() {
            continue;
        }
        match parse_coordinates(line) {
            Some(c) => coordinates.push(c),
            None => warn!(line = number + 1, content = line, "Skipping malformed sector row"),
        }
    }
    debug!(sectors = coordinates.len(), "Parsed sector coordinates");
    coordinates
}

pub fn read_sector_file(path: impl AsRef<Path>) -> Result<Vec<Coordinates>, InputError> {
    Ok(parse_sector_csv(&read_to_string(path.as_ref())?))
}

/// Parses a dataset whose header names N feature columns followed by the label column.
///
/// An empty label cell yields an unlabelled point.
pub fn parse_dataset_csv(content: &str, threshold: f64) -> Result<SpatialDataset, InputError> {
    let mut lines = content.lines().enumerate();
    let header: Vec<String> = loop {
        match lines.next() {
            Some((_, line)) if line.trim().is_empty() => continue,
            Some((_, line)) => break line.split(',').map(|h| h.trim().to_string()).collect(),
            None => return Err(InputError::MissingHeader),
        }
    };
    let feature_count = header.len().saturating_sub(1);

    let mut points = Vec::new();
    for (number, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() != header.len() {
            warn!(
                line = number + 1,
                expected = header.len(),
                found = fields.len(),
                "Skipping dataset row with wrong column count"
            );
            continue;
        }
        let features: Result<Vec<f64>, _> = fields[..feature_count].iter().map(|f| f.parse::<f64>()).collect();
        let Ok(features) = features else {
            warn!(line = number + 1, content = line, "Skipping dataset row with unparsable feature");
            continue;
        };
        let label = fields[feature_count];
        let label = (!label.is_empty()).then(|| label.to_string());
        points.push(SpatialPoint::new(features, label));
    }

    debug!(points = points.len(), features = feature_count, "Parsed dataset");
    Ok(SpatialDataset::new(points, header, threshold))
}

pub fn read_dataset_file(path: impl AsRef<Path>, threshold: f64) -> Result<SpatialDataset, InputError> {
    parse_dataset_csv(&read_to_string(path.as_ref())?, threshold)
}
