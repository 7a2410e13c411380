use opgraph_core::OpGraphError;

use crate::dataset::Dataset;

/// One feature row with its class label.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub features: Vec<f32>,
    pub label: i32,
}

/// In-memory classification data: row-major features of a fixed width and
/// one I32 label per row.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledDataset {
    features: Vec<f32>,
    labels: Vec<i32>,
    width: usize,
}

impl LabeledDataset {
    /// Creates a dataset of `labels.len()` rows of `width` features each.
    ///
    /// # Errors
    ///
    /// `OpGraphError::ShapeMismatch` if `features.len() != labels.len() * width`
    /// or if `width` is zero.
    pub fn new(features: Vec<f32>, labels: Vec<i32>, width: usize) -> Result<Self, OpGraphError> {
        if width == 0 || features.len() != labels.len() * width {
            return Err(OpGraphError::ShapeMismatch {
                expected: vec![labels.len(), width],
                actual: vec![features.len()],
                operation: "LabeledDataset::new".to_string(),
            });
        }
        Ok(LabeledDataset {
            features,
            labels,
            width,
        })
    }

    /// Builds a dataset from separate rows. An empty slice has no width and
    /// is rejected.
    pub fn from_samples(samples: &[Sample]) -> Result<Self, OpGraphError> {
        let width = samples.first().map_or(0, |s| s.features.len());
        let mut features = Vec::with_capacity(samples.len() * width);
        let mut labels = Vec::with_capacity(samples.len());
        for sample in samples {
            if sample.features.len() != width {
                return Err(OpGraphError::ShapeMismatch {
                    expected: vec![width],
                    actual: vec![sample.features.len()],
                    operation: "LabeledDataset::from_samples".to_string(),
                });
            }
            features.extend_from_slice(&sample.features);
            labels.push(sample.label);
        }
        LabeledDataset::new(features, labels, width)
    }

    /// Features per row.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn labels(&self) -> &[i32] {
        &self.labels
    }

    /// Feature row `index`.
    pub fn row(&self, index: usize) -> Result<&[f32], OpGraphError> {
        if index >= self.labels.len() {
            return Err(OpGraphError::IndexOutOfBounds {
                index: index as i64,
                size: self.labels.len(),
                operation: "LabeledDataset::row".to_string(),
            });
        }
        Ok(&self.features[index * self.width..(index + 1) * self.width])
    }
}

impl Dataset for LabeledDataset {
    type Item = Sample;

    fn get(&self, index: usize) -> Result<Sample, OpGraphError> {
        let features = self.row(index)?.to_vec();
        Ok(Sample {
            features,
            label: self.labels[index],
        })
    }

    fn len(&self) -> usize {
        self.labels.len()
    }
}

#[cfg(test)]
#[path = "labeled_test.rs"]
mod tests;
