use std::{fs, path::Path};

use ndarray::Array2;

use super::InMemoryDataset;
use crate::{Result, TrainErr};

/// Loads a dataset from a CSV file where each line holds the features of a sample followed by
/// its integer class label. A first line that does not parse as numbers is taken as a header.
///
/// # Arguments
/// * `path` - The CSV file.
/// * `num_classes` - The amount of classes the labels index into.
/// * `rescale` - Factor every feature is multiplied by.
///
/// # Errors
/// An io error if the file cannot be read, a data error if a line is malformed.
pub fn load_csv<P: AsRef<Path>>(path: P, num_classes: usize, rescale: f32) -> Result<InMemoryDataset> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;

    let mut features = Vec::new();
    let mut labels = Vec::new();
    let mut width = None;

    for (i, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let values = match parse_line(line) {
            Ok(values) => values,
            Err(_) if i == 0 => continue,
            Err(v) => {
                return Err(TrainErr::Data(format!(
                    "{} line {}: cannot parse '{v}' as a number",
                    path.display(),
                    i + 1
                )));
            }
        };

        let Some((&label, row)) = values.split_last() else {
            continue;
        };

        let expected = *width.get_or_insert(row.len());
        if row.is_empty() || row.len() != expected {
            return Err(TrainErr::Data(format!(
                "{} line {}: expected {expected} features and a label, got {} values",
                path.display(),
                i + 1,
                values.len()
            )));
        }

        if label < 0. || label.fract() != 0. {
            return Err(TrainErr::Data(format!(
                "{} line {}: label {label} is not a class index",
                path.display(),
                i + 1
            )));
        }

        features.extend(row.iter().map(|v| v * rescale));
        labels.push(label as usize);
    }

    let width = width.unwrap_or_default();
    if labels.is_empty() {
        return Err(TrainErr::Data(format!("{} has no samples", path.display())));
    }

    let x = Array2::from_shape_vec((labels.len(), width), features)
        .map_err(|e| TrainErr::Data(e.to_string()))?;

    InMemoryDataset::from_labels(x, &labels, num_classes)
}

fn parse_line(line: &str) -> std::result::Result<Vec<f32>, String> {
    line.split(',')
        .map(|v| v.trim().parse::<f32>().map_err(|_| v.trim().to_string()))
        .collect()
}
