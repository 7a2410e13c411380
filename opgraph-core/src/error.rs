use crate::device::StorageDevice;
use crate::types::DType;
use thiserror::Error;

/// Custom error type for the opgraph framework.
///
/// Graph construction, compiler passes and execution all report failures through
/// this enum instead of aborting, so callers (and tests) can match on the kind.
#[derive(Error, Debug, PartialEq, Clone)]
pub enum OpGraphError {
    #[error("Unknown op type '{0}': it was never registered")]
    UnknownOpType(String),

    #[error("Unknown compiler pass '{0}'")]
    UnknownCompilerPass(String),

    #[error("Unknown tensor '{0}' in graph")]
    UnknownTensor(String),

    #[error("Attribute '{attr}' of op '{op_type}' violates a constraint: {reason}")]
    AttributeConstraint {
        op_type: String,
        attr: String,
        reason: String,
    },

    #[error("Attribute '{attr}' has kind {actual}, expected {expected}")]
    AttributeTypeMismatch {
        attr: String,
        expected: String,
        actual: String,
    },

    #[error("Missing required attribute '{0}'")]
    MissingAttribute(String),

    #[error("Default value for attribute '{attr}' was already set to {previous}")]
    DefaultAlreadySet { attr: String, previous: String },

    #[error("Shape mismatch: expected {expected:?}, got {actual:?} during operation {operation}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
        operation: String,
    },

    #[error("Dimension mismatch: expected rank {expected}, got {actual} during operation {operation}")]
    DimensionMismatch {
        expected: usize,
        actual: usize,
        operation: String,
    },

    #[error("Data type mismatch for tensor '{name}': expected {expected:?}, got {actual:?}")]
    TensorTypeMismatch {
        name: String,
        expected: DType,
        actual: DType,
    },

    #[error("Loss tensor '{name}' must be a scalar, got dims {dims:?}")]
    NonScalarLoss { name: String, dims: Vec<usize> },

    #[error("Cannot run the backward pass on an empty graph")]
    EmptyGraph,

    #[error("Backward point {point} is out of range for a graph with {num_ops} ops")]
    InvalidBackwardPoint { point: i64, num_ops: usize },

    #[error("Op '{0}' needs a gradient but has no gradient function registered")]
    NonDifferentiableOp(String),

    #[error("Op '{op_type}' has no kernel for device {device:?}")]
    MissingKernel {
        op_type: String,
        device: StorageDevice,
    },

    #[error("Compiler pass '{0}' requires a workspace in its context")]
    MissingWorkspace(String),

    #[error("No buffer allocated for tensor '{0}'")]
    MissingBuffer(String),

    #[error("Buffer '{name}' holds {actual:?} data, expected {expected:?}")]
    BufferTypeMismatch {
        name: String,
        expected: DType,
        actual: DType,
    },

    #[error("Index out of bounds: index {index} for size {size} in {operation}")]
    IndexOutOfBounds {
        index: i64,
        size: usize,
        operation: String,
    },

    #[error("Op '{op_type}' expects {expected} {slot}, got {actual}")]
    InvalidOpArity {
        op_type: String,
        slot: String,
        expected: usize,
        actual: usize,
    },

    #[error("Op '{op_type}' requires {slot} {index} to be present")]
    MissingOperand {
        op_type: String,
        slot: String,
        index: usize,
    },

    #[error("Op '{op_type}' cannot run with {first} and {second} sharing the buffer of '{name}'")]
    AliasedOperands {
        op_type: String,
        name: String,
        first: String,
        second: String,
    },

    #[error("Failed to acquire {lock_type} lock: {reason}")]
    LockError { lock_type: String, reason: String },

    #[error("Internal error: {0}")]
    InternalError(String),
}
