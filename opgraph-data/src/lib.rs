//! Mini-batch feeding for opgraph graphs.
//!
//! A [`Dataset`] hands out labeled samples, a [`Sampler`] decides the visiting
//! order and a [`BatchLoader`] groups samples into [`Batch`]es. [`feed`] and
//! [`feed_engine`] resize the batch axis of the input and label descriptors
//! and copy a batch into their buffers.

pub mod dataset;
pub mod datasets;
pub mod loader;
pub mod samplers;

pub use dataset::Dataset;
pub use datasets::{LabeledDataset, Sample};
pub use loader::{feed, feed_engine, Batch, BatchLoader, BatchLoaderConfig};
pub use samplers::{RandomSampler, Sampler, SequentialSampler};
