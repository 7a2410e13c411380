use std::fmt::Debug;

/// Decides the order in which a loader visits dataset indices.
pub trait Sampler: Debug + Send + Sync {
    /// Indices of one pass over a dataset of `dataset_len` samples.
    fn iter(&self, dataset_len: usize) -> Box<dyn Iterator<Item = usize> + Send + Sync>;

    /// Number of indices [`Sampler::iter`] yields.
    fn len(&self, dataset_len: usize) -> usize;
}
