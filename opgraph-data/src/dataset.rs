use opgraph_core::OpGraphError;

/// Indexed collection of samples.
pub trait Dataset {
    /// The type of a single sample.
    type Item: Send + 'static;

    /// Returns the sample at `index`.
    ///
    /// # Errors
    ///
    /// `OpGraphError::IndexOutOfBounds` if `index >= len()`.
    fn get(&self, index: usize) -> Result<Self::Item, OpGraphError>;

    /// Number of samples.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
