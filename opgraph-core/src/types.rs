/// Defines the possible element types of a graph tensor.
///
/// Only the two types the operator library actually consumes are supported:
/// floating point activations/parameters and integer labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    /// 32-bit floating-point type.
    F32,
    /// 32-bit integer type (labels, indices).
    I32,
}

impl DType {
    /// Size in bytes of a single element of this type.
    pub fn size_of(&self) -> usize {
        match self {
            DType::F32 => std::mem::size_of::<f32>(),
            DType::I32 => std::mem::size_of::<i32>(),
        }
    }
}

/// Product of all dimensions; the empty shape is a scalar with one element.
pub fn numel(dims: &[usize]) -> usize {
    dims.iter().product()
}
