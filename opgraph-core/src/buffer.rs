use std::fmt::Debug;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use num_traits::Zero;

use crate::error::OpGraphError;
use crate::types::DType;

/// Typed storage behind a [`Buffer`].
#[derive(Debug, Clone, PartialEq)]
pub enum BufferData {
    /// Buffer holding f32 data on the CPU.
    F32(Vec<f32>),
    /// Buffer holding i32 data on the CPU.
    I32(Vec<i32>),
}

/// A named, contiguous CPU buffer backing one graph tensor.
///
/// The length is always `product(dims)` of the descriptor it was last sized
/// for. Shrinking keeps the allocation, growing reallocates.
#[derive(Debug, Clone, PartialEq)]
pub struct Buffer {
    name: String,
    data: BufferData,
}

/// Shared handle to a workspace buffer.
pub type SharedBuffer = Arc<RwLock<Buffer>>;

/// Element types that can live in a [`Buffer`].
pub trait Element: Copy + Zero + Debug + Send + Sync + 'static {
    const DTYPE: DType;

    fn slice(data: &BufferData) -> Option<&[Self]>;

    fn slice_mut(data: &mut BufferData) -> Option<&mut [Self]>;
}

impl Element for f32 {
    const DTYPE: DType = DType::F32;

    fn slice(data: &BufferData) -> Option<&[Self]> {
        match data {
            BufferData::F32(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    fn slice_mut(data: &mut BufferData) -> Option<&mut [Self]> {
        match data {
            BufferData::F32(v) => Some(v.as_mut_slice()),
            _ => None,
        }
    }
}

impl Element for i32 {
    const DTYPE: DType = DType::I32;

    fn slice(data: &BufferData) -> Option<&[Self]> {
        match data {
            BufferData::I32(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    fn slice_mut(data: &mut BufferData) -> Option<&mut [Self]> {
        match data {
            BufferData::I32(v) => Some(v.as_mut_slice()),
            _ => None,
        }
    }
}

fn resize_zeroed<T: Zero + Clone>(vec: &mut Vec<T>, len: usize) {
    if len <= vec.len() {
        vec.truncate(len);
    } else {
        vec.resize(len, T::zero());
    }
}

impl Buffer {
    /// Creates a zero-filled buffer of `len` elements.
    pub fn zeros(name: impl Into<String>, dtype: DType, len: usize) -> Self {
        let data = match dtype {
            DType::F32 => BufferData::F32(vec![0.0; len]),
            DType::I32 => BufferData::I32(vec![0; len]),
        };
        Buffer {
            name: name.into(),
            data,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dtype(&self) -> DType {
        match self.data {
            BufferData::F32(_) => DType::F32,
            BufferData::I32(_) => DType::I32,
        }
    }

    /// Number of elements currently held.
    pub fn len(&self) -> usize {
        match &self.data {
            BufferData::F32(v) => v.len(),
            BufferData::I32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of elements that fit without reallocating.
    pub fn capacity(&self) -> usize {
        match &self.data {
            BufferData::F32(v) => v.capacity(),
            BufferData::I32(v) => v.capacity(),
        }
    }

    pub fn size_in_bytes(&self) -> usize {
        self.len() * self.dtype().size_of()
    }

    /// Resizes to `len` elements. New elements are zero.
    pub fn resize(&mut self, len: usize) {
        match &mut self.data {
            BufferData::F32(v) => resize_zeroed(v, len),
            BufferData::I32(v) => resize_zeroed(v, len),
        }
    }

    pub fn fill_zero(&mut self) {
        match &mut self.data {
            BufferData::F32(v) => v.iter_mut().for_each(|x| *x = 0.0),
            BufferData::I32(v) => v.iter_mut().for_each(|x| *x = 0),
        }
    }

    /// Typed read access. Fails if the buffer holds another element type.
    pub fn as_slice<T: Element>(&self) -> Result<&[T], OpGraphError> {
        let actual = self.dtype();
        T::slice(&self.data).ok_or_else(|| OpGraphError::BufferTypeMismatch {
            name: self.name.clone(),
            expected: T::DTYPE,
            actual,
        })
    }

    /// Typed write access. Fails if the buffer holds another element type.
    pub fn as_mut_slice<T: Element>(&mut self) -> Result<&mut [T], OpGraphError> {
        let actual = self.dtype();
        let name = self.name.clone();
        T::slice_mut(&mut self.data).ok_or(OpGraphError::BufferTypeMismatch {
            name,
            expected: T::DTYPE,
            actual,
        })
    }

    pub fn data(&self) -> &BufferData {
        &self.data
    }
}

/// Acquires a read guard, mapping lock poisoning to `OpGraphError::LockError`.
pub fn read_buffer(buffer: &SharedBuffer) -> Result<RwLockReadGuard<'_, Buffer>, OpGraphError> {
    buffer.read().map_err(|e| OpGraphError::LockError {
        lock_type: "read".to_string(),
        reason: e.to_string(),
    })
}

/// Acquires a write guard, mapping lock poisoning to `OpGraphError::LockError`.
pub fn write_buffer(buffer: &SharedBuffer) -> Result<RwLockWriteGuard<'_, Buffer>, OpGraphError> {
    buffer.write().map_err(|e| OpGraphError::LockError {
        lock_type: "write".to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
#[path = "buffer_test.rs"]
mod tests;
