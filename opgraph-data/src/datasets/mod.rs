pub mod labeled;

pub use labeled::{LabeledDataset, Sample};
