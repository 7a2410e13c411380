use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::buffer::{read_buffer, write_buffer, Buffer, Element, SharedBuffer};
use crate::error::OpGraphError;
use crate::graph::VariableAttr;
use crate::tensor::Tensor;

/// Runtime buffer pool. Binds descriptor names to at most one buffer each.
#[derive(Debug, Default)]
pub struct Workspace {
    buffers: HashMap<String, SharedBuffer>,
}

impl Workspace {
    pub fn new() -> Self {
        Workspace::default()
    }

    /// Returns the buffer for `attr`, creating it or resizing it to
    /// `product(attr.dims)` elements.
    ///
    /// # Errors
    /// `BufferTypeMismatch` if the name is already bound to a buffer of
    /// another element type.
    pub fn get_or_create_buffer(&mut self, attr: &VariableAttr) -> Result<SharedBuffer, OpGraphError> {
        let len = attr.numel();
        if let Some(buffer) = self.buffers.get(&attr.name) {
            {
                let mut guard = write_buffer(buffer)?;
                if guard.dtype() != attr.dtype {
                    return Err(OpGraphError::BufferTypeMismatch {
                        name: attr.name.clone(),
                        expected: attr.dtype,
                        actual: guard.dtype(),
                    });
                }
                if guard.len() != len {
                    guard.resize(len);
                }
            }
            return Ok(Arc::clone(buffer));
        }

        log::debug!(
            "Allocating buffer '{}' ({:?}, {} elements)",
            attr.name,
            attr.dtype,
            len
        );
        let buffer = Arc::new(RwLock::new(Buffer::zeros(attr.name.clone(), attr.dtype, len)));
        self.buffers.insert(attr.name.clone(), Arc::clone(&buffer));
        Ok(buffer)
    }

    /// Pairs `attr` with its buffer, creating or resizing the buffer first.
    pub fn get_tensor(&mut self, attr: &VariableAttr) -> Result<Tensor, OpGraphError> {
        let buffer = self.get_or_create_buffer(attr)?;
        Ok(Tensor::new(attr.clone(), buffer))
    }

    /// Pairs `attr` with its existing buffer without allocating.
    ///
    /// # Errors
    /// `MissingBuffer` if nothing is bound to the name, `ShapeMismatch` if the
    /// buffer was not sized for the descriptor's current dims.
    pub fn tensor(&self, attr: &VariableAttr) -> Result<Tensor, OpGraphError> {
        let buffer = self
            .buffers
            .get(&attr.name)
            .ok_or_else(|| OpGraphError::MissingBuffer(attr.name.clone()))?;
        let len = read_buffer(buffer)?.len();
        if len != attr.numel() {
            return Err(OpGraphError::ShapeMismatch {
                expected: attr.dims.clone(),
                actual: vec![len],
                operation: format!("bind buffer '{}'", attr.name),
            });
        }
        Ok(Tensor::new(attr.clone(), Arc::clone(buffer)))
    }

    pub fn buffer(&self, name: &str) -> Option<&SharedBuffer> {
        self.buffers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.buffers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    pub fn remove(&mut self, name: &str) -> Option<SharedBuffer> {
        self.buffers.remove(name)
    }

    fn existing(&self, name: &str) -> Result<&SharedBuffer, OpGraphError> {
        self.buffers
            .get(name)
            .ok_or_else(|| OpGraphError::MissingBuffer(name.to_string()))
    }

    /// Copies a buffer's contents out.
    pub fn read<T: Element>(&self, name: &str) -> Result<Vec<T>, OpGraphError> {
        let guard = read_buffer(self.existing(name)?)?;
        Ok(guard.as_slice::<T>()?.to_vec())
    }

    pub fn read_f32(&self, name: &str) -> Result<Vec<f32>, OpGraphError> {
        self.read::<f32>(name)
    }

    /// Overwrites a buffer with `data`, which must have the buffer's length.
    pub fn write<T: Element>(&self, name: &str, data: &[T]) -> Result<(), OpGraphError> {
        let mut guard = write_buffer(self.existing(name)?)?;
        let slice = guard.as_mut_slice::<T>()?;
        if slice.len() != data.len() {
            return Err(OpGraphError::ShapeMismatch {
                expected: vec![slice.len()],
                actual: vec![data.len()],
                operation: format!("write buffer '{}'", name),
            });
        }
        slice.copy_from_slice(data);
        Ok(())
    }

    pub fn write_f32(&self, name: &str, data: &[f32]) -> Result<(), OpGraphError> {
        self.write::<f32>(name, data)
    }

    pub fn write_i32(&self, name: &str, data: &[i32]) -> Result<(), OpGraphError> {
        self.write::<i32>(name, data)
    }
}

#[cfg(test)]
#[path = "workspace_test.rs"]
mod tests;
