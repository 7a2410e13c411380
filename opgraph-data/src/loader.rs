//! # Batch loading
//!
//! [`BatchLoader`] walks a dataset in sampler order and yields [`Batch`]es
//! of `batch_size` samples; the last one is partial unless `drop_last` is
//! set. Call [`BatchLoader::reset`] to start the next pass.
//!
//! [`feed`] then copies a batch into a graph's input and label buffers,
//! resizing the batch axis of both descriptors first, so a partial batch can
//! be run without rebuilding the graph.

use opgraph_core::{DType, Engine, Graph, OpGraphError, VariableAttr, Workspace};

use crate::dataset::Dataset;
use crate::datasets::Sample;
use crate::samplers::Sampler;

/// Batching settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLoaderConfig {
    pub batch_size: usize,
    /// Skip the trailing partial batch.
    pub drop_last: bool,
}

impl Default for BatchLoaderConfig {
    fn default() -> Self {
        BatchLoaderConfig {
            batch_size: 32,
            drop_last: false,
        }
    }
}

impl BatchLoaderConfig {
    pub fn new(batch_size: usize) -> Self {
        BatchLoaderConfig {
            batch_size,
            ..BatchLoaderConfig::default()
        }
    }

    pub fn with_drop_last(mut self, drop_last: bool) -> Self {
        self.drop_last = drop_last;
        self
    }
}

/// Samples collated row-major: `features` holds `len() * width` values.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub features: Vec<f32>,
    pub labels: Vec<i32>,
    pub width: usize,
}

impl Batch {
    /// Stacks samples that all have `width` features.
    pub fn collate(samples: Vec<Sample>, width: usize) -> Result<Self, OpGraphError> {
        let mut features = Vec::with_capacity(samples.len() * width);
        let mut labels = Vec::with_capacity(samples.len());
        for sample in samples {
            if sample.features.len() != width {
                return Err(OpGraphError::ShapeMismatch {
                    expected: vec![width],
                    actual: vec![sample.features.len()],
                    operation: "Batch::collate".to_string(),
                });
            }
            features.extend(sample.features);
            labels.push(sample.label);
        }
        Ok(Batch {
            features,
            labels,
            width,
        })
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

pub struct BatchLoader<D: Dataset<Item = Sample>, S: Sampler> {
    dataset: D,
    sampler: S,
    config: BatchLoaderConfig,
    width: usize,
    indices_iter: Box<dyn Iterator<Item = usize> + Send + Sync>,
}

impl<D: Dataset<Item = Sample>, S: Sampler> std::fmt::Debug for BatchLoader<D, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchLoader")
            .field("dataset_len", &self.dataset.len())
            .field("sampler", &self.sampler)
            .field("config", &self.config)
            .finish()
    }
}

impl<D: Dataset<Item = Sample>, S: Sampler> BatchLoader<D, S> {
    /// # Errors
    ///
    /// `OpGraphError::AttributeConstraint` if `config.batch_size` is zero;
    /// any error of reading the first sample to learn the feature width.
    pub fn new(dataset: D, sampler: S, config: BatchLoaderConfig) -> Result<Self, OpGraphError> {
        if config.batch_size == 0 {
            return Err(OpGraphError::AttributeConstraint {
                op_type: "BatchLoader".to_string(),
                attr: "batch_size".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        let width = if dataset.is_empty() {
            0
        } else {
            dataset.get(0)?.features.len()
        };
        let indices_iter = sampler.iter(dataset.len());
        Ok(BatchLoader {
            dataset,
            sampler,
            config,
            width,
            indices_iter,
        })
    }

    pub fn dataset(&self) -> &D {
        &self.dataset
    }

    pub fn config(&self) -> &BatchLoaderConfig {
        &self.config
    }

    /// Feature width of every sample.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Batches in one full pass.
    pub fn num_batches(&self) -> usize {
        let samples = self.sampler.len(self.dataset.len());
        let full = samples / self.config.batch_size;
        if self.config.drop_last || samples % self.config.batch_size == 0 {
            full
        } else {
            full + 1
        }
    }

    /// Starts a new pass with a fresh sampler order.
    pub fn reset(&mut self) {
        log::debug!(
            "BatchLoader: new pass over {} sample(s)",
            self.dataset.len()
        );
        self.indices_iter = self.sampler.iter(self.dataset.len());
    }
}

impl<D: Dataset<Item = Sample>, S: Sampler> Iterator for BatchLoader<D, S> {
    type Item = Result<Batch, OpGraphError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut samples = Vec::with_capacity(self.config.batch_size);
        for index in self.indices_iter.by_ref().take(self.config.batch_size) {
            match self.dataset.get(index) {
                Ok(sample) => samples.push(sample),
                Err(e) => return Some(Err(e)),
            }
        }
        if samples.is_empty() || (self.config.drop_last && samples.len() < self.config.batch_size) {
            return None;
        }
        Some(Batch::collate(samples, self.width))
    }
}

/// Dims of `attr` with the leading (batch) axis set to `batch`.
fn with_batch_axis(attr: &VariableAttr, batch: usize) -> Result<Vec<usize>, OpGraphError> {
    let mut dims = attr.dims.clone();
    match dims.first_mut() {
        Some(first) => *first = batch,
        None => {
            return Err(OpGraphError::DimensionMismatch {
                expected: 1,
                actual: 0,
                operation: format!("feed({})", attr.name),
            })
        }
    }
    Ok(dims)
}

/// Resizes the batch axis of `input` (`[n, width]`, F32) and `label`
/// (`[n]` or `[n, 1]`, I32) to `batch.len()`.
fn resize_for_batch(graph: &mut Graph, batch: &Batch, input: &str, label: &str) -> Result<(), OpGraphError> {
    let input_attr = graph.var_by_name(input)?.clone();
    if input_attr.dtype != DType::F32 {
        return Err(OpGraphError::TensorTypeMismatch {
            name: input.to_string(),
            expected: DType::F32,
            actual: input_attr.dtype,
        });
    }
    let input_dims = with_batch_axis(&input_attr, batch.len())?;
    if input_dims.len() != 2 || input_dims[1] != batch.width {
        return Err(OpGraphError::ShapeMismatch {
            expected: input_attr.dims.clone(),
            actual: vec![batch.len(), batch.width],
            operation: format!("feed({})", input),
        });
    }

    let label_attr = graph.var_by_name(label)?.clone();
    if label_attr.dtype != DType::I32 {
        return Err(OpGraphError::TensorTypeMismatch {
            name: label.to_string(),
            expected: DType::I32,
            actual: label_attr.dtype,
        });
    }
    let label_dims = with_batch_axis(&label_attr, batch.len())?;

    graph.create_or_get_var(input, input_dims, input_attr.need_backward, DType::F32)?;
    graph.create_or_get_var(label, label_dims, label_attr.need_backward, DType::I32)?;
    Ok(())
}

/// Writes `batch` into the buffers of `input` and `label`, resizing both
/// descriptors and buffers to the batch size.
///
/// # Errors
///
/// `UnknownTensor` for missing descriptors, `TensorTypeMismatch` unless the
/// input is F32 and the label I32, `ShapeMismatch` if the input is not
/// `[_, batch.width]`.
pub fn feed(
    graph: &mut Graph,
    workspace: &mut Workspace,
    batch: &Batch,
    input: &str,
    label: &str,
) -> Result<(), OpGraphError> {
    resize_for_batch(graph, batch, input, label)?;
    workspace.get_or_create_buffer(graph.var_by_name(input)?)?;
    workspace.get_or_create_buffer(graph.var_by_name(label)?)?;
    workspace.write_f32(input, &batch.features)?;
    workspace.write_i32(label, &batch.labels)?;
    log::debug!("Fed a batch of {} into '{}' / '{}'", batch.len(), input, label);
    Ok(())
}

/// [`feed`] into the graph and workspace owned by `engine`.
pub fn feed_engine(engine: &mut Engine, batch: &Batch, input: &str, label: &str) -> Result<(), OpGraphError> {
    resize_for_batch(engine.graph_mut(), batch, input, label)?;
    engine.write_f32(input, &batch.features)?;
    engine.write_i32(label, &batch.labels)?;
    log::debug!("Fed a batch of {} into '{}' / '{}'", batch.len(), input, label);
    Ok(())
}

#[cfg(test)]
#[path = "loader_test.rs"]
mod tests;
