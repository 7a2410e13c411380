use std::ops::Range;

use super::traits::Sampler;

/// Visits dataset indices in order.
///
/// [`SequentialSampler::window`] restricts a pass to `start..end`, e.g. a
/// held-out tail of the dataset used for evaluation. A window reaching past
/// the dataset is cut at its end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequentialSampler {
    window: Option<(usize, usize)>,
}

impl SequentialSampler {
    pub fn new() -> Self {
        SequentialSampler::default()
    }

    /// Only indices in `start..end`. An inverted window is empty.
    pub fn window(start: usize, end: usize) -> Self {
        SequentialSampler {
            window: Some((start, end.max(start))),
        }
    }

    fn bounds(&self, dataset_len: usize) -> Range<usize> {
        match self.window {
            None => 0..dataset_len,
            Some((start, end)) => {
                let end = end.min(dataset_len);
                start.min(end)..end
            }
        }
    }
}

impl Sampler for SequentialSampler {
    fn iter(&self, dataset_len: usize) -> Box<dyn Iterator<Item = usize> + Send + Sync> {
        if let Some((start, end)) = self.window {
            if end > dataset_len {
                log::warn!(
                    "SequentialSampler: window {}..{} cut to a dataset of {} samples",
                    start,
                    end,
                    dataset_len
                );
            }
        }
        Box::new(self.bounds(dataset_len))
    }

    fn len(&self, dataset_len: usize) -> usize {
        self.bounds(dataset_len).len()
    }
}

#[cfg(test)]
#[path = "sequential_sampler_test.rs"]
mod tests;
