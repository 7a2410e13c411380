use std::sync::{Arc, RwLockReadGuard, RwLockWriteGuard};

use crate::buffer::{read_buffer, write_buffer, Buffer, Element, SharedBuffer};
use crate::error::OpGraphError;
use crate::graph::VariableAttr;
use crate::types::DType;

/// A concrete tensor: a descriptor snapshot paired with its workspace buffer.
///
/// Tensors are built fresh for every kernel invocation and dropped right after.
/// Cloning is cheap; the buffer handle is shared.
#[derive(Debug, Clone)]
pub struct Tensor {
    attr: VariableAttr,
    buffer: SharedBuffer,
}

impl Tensor {
    pub fn new(attr: VariableAttr, buffer: SharedBuffer) -> Self {
        Tensor { attr, buffer }
    }

    pub fn attr(&self) -> &VariableAttr {
        &self.attr
    }

    pub fn name(&self) -> &str {
        &self.attr.name
    }

    pub fn dims(&self) -> &[usize] {
        &self.attr.dims
    }

    pub fn dtype(&self) -> DType {
        self.attr.dtype
    }

    pub fn numel(&self) -> usize {
        self.attr.numel()
    }

    pub fn buffer(&self) -> &SharedBuffer {
        &self.buffer
    }

    pub fn read_data(&self) -> Result<RwLockReadGuard<'_, Buffer>, OpGraphError> {
        read_buffer(&self.buffer)
    }

    pub fn write_data(&self) -> Result<RwLockWriteGuard<'_, Buffer>, OpGraphError> {
        write_buffer(&self.buffer)
    }

    /// True if both tensors are backed by the same buffer (in-place ops).
    pub fn shares_buffer(&self, other: &Tensor) -> bool {
        Arc::ptr_eq(&self.buffer, &other.buffer)
    }

    /// Copies the contents out as a flat vector.
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>, OpGraphError> {
        let guard = self.read_data()?;
        Ok(guard.as_slice::<T>()?.to_vec())
    }

    /// Overwrites every element with `value`.
    pub fn fill<T: Element>(&self, value: T) -> Result<(), OpGraphError> {
        let mut guard = self.write_data()?;
        guard.as_mut_slice::<T>()?.iter_mut().for_each(|x| *x = value);
        Ok(())
    }
}
