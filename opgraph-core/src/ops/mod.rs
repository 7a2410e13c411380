//! # Operator library
//!
//! Each submodule registers one forward op and, when differentiable, its
//! gradient op. A registration bundles four things:
//!
//! - a **CPU kernel** (`*_kernel`) working on row-major `f32` buffers,
//! - a **shape inferer** (`*_shape`) that sets output dims from input dims,
//! - a **gradient generator** (`*_grad_ops`) that emits the gradient op(s),
//! - optional **attribute metas** with defaults and constraints.
//!
//! Kernels overwrite their outputs; they never accumulate into them.

use crate::error::OpGraphError;
use crate::graph::VariableAttr;
use crate::registry::OpRegistry;
use crate::tensor::Tensor;
use crate::types::DType;

pub mod cross_entropy;
pub mod error_rate;
pub mod fc;
pub mod linalg;
pub mod mean;
pub mod sgd;
pub mod sigmoid;
pub mod softmax;
pub mod tanh;

/// Registers every built-in op.
pub fn register_all(registry: &mut OpRegistry) {
    fc::register(registry);
    sigmoid::register(registry);
    tanh::register(registry);
    softmax::register(registry);
    cross_entropy::register(registry);
    mean::register(registry);
    error_rate::register(registry);
    sgd::register(registry);
}

// --- Slot helpers shared by kernels and shape inferers ---

pub(crate) fn check_arity<T>(
    slots: &[Option<T>],
    min: usize,
    max: usize,
    op_type: &str,
    slot: &str,
) -> Result<(), OpGraphError> {
    if slots.len() < min || slots.len() > max {
        return Err(OpGraphError::InvalidOpArity {
            op_type: op_type.to_string(),
            slot: slot.to_string(),
            expected: if slots.len() < min { min } else { max },
            actual: slots.len(),
        });
    }
    Ok(())
}

/// A slot that must be present.
pub(crate) fn required<'a, T>(
    slots: &'a [Option<T>],
    index: usize,
    op_type: &str,
    slot: &str,
) -> Result<&'a T, OpGraphError> {
    slots
        .get(index)
        .and_then(|s| s.as_ref())
        .ok_or_else(|| OpGraphError::MissingOperand {
            op_type: op_type.to_string(),
            slot: slot.to_string(),
            index,
        })
}

/// A slot that may be absent or past the end of the list.
pub(crate) fn optional<T>(slots: &[Option<T>], index: usize) -> Option<&T> {
    slots.get(index).and_then(|s| s.as_ref())
}

/// Sets the dims of output `index` if that output is present.
pub(crate) fn set_dims(outputs: &mut [Option<VariableAttr>], index: usize, dims: Vec<usize>) {
    if let Some(Some(out)) = outputs.get_mut(index) {
        out.dims = dims;
    }
}

/// Rows and columns of a rank-2 descriptor.
pub(crate) fn matrix_dims(attr: &VariableAttr, op_type: &str) -> Result<(usize, usize), OpGraphError> {
    if attr.dims.len() != 2 {
        return Err(OpGraphError::DimensionMismatch {
            expected: 2,
            actual: attr.dims.len(),
            operation: format!("{} ({})", op_type, attr.name),
        });
    }
    Ok((attr.dims[0], attr.dims[1]))
}

pub(crate) fn check_dtype(attr: &VariableAttr, expected: DType) -> Result<(), OpGraphError> {
    if attr.dtype != expected {
        return Err(OpGraphError::TensorTypeMismatch {
            name: attr.name.clone(),
            expected,
            actual: attr.dtype,
        });
    }
    Ok(())
}

pub(crate) fn check_same_dims(
    a: &VariableAttr,
    b: &VariableAttr,
    op_type: &str,
) -> Result<(), OpGraphError> {
    if a.dims != b.dims {
        return Err(OpGraphError::ShapeMismatch {
            expected: a.dims.clone(),
            actual: b.dims.clone(),
            operation: op_type.to_string(),
        });
    }
    Ok(())
}

/// Buffer length guard for kernels that index by computed dims.
pub(crate) fn check_numel(tensor: &Tensor, expected: usize, op_type: &str) -> Result<(), OpGraphError> {
    let len = tensor.read_data()?.len();
    if len != expected {
        return Err(OpGraphError::ShapeMismatch {
            expected: vec![expected],
            actual: vec![len],
            operation: format!("{} ({})", op_type, tensor.name()),
        });
    }
    Ok(())
}

/// Shape inferer for element-wise unary ops: output dims = input dims.
pub(crate) fn same_shape(
    inputs: &[Option<VariableAttr>],
    outputs: &mut [Option<VariableAttr>],
) -> Result<(), OpGraphError> {
    let x = required(inputs, 0, "elementwise", "input")?;
    set_dims(outputs, 0, x.dims.clone());
    Ok(())
}

/// Applies `f` element-wise from `input` into `output`. Runs in place when
/// both share a buffer.
pub(crate) fn map_unary(input: &Tensor, output: &Tensor, f: impl Fn(f32) -> f32) -> Result<(), OpGraphError> {
    if input.shares_buffer(output) {
        let mut guard = output.write_data()?;
        guard.as_mut_slice::<f32>()?.iter_mut().for_each(|v| *v = f(*v));
        return Ok(());
    }
    let x_guard = input.read_data()?;
    let x = x_guard.as_slice::<f32>()?;
    let mut o_guard = output.write_data()?;
    let o = o_guard.as_mut_slice::<f32>()?;
    if x.len() != o.len() {
        return Err(OpGraphError::ShapeMismatch {
            expected: vec![x.len()],
            actual: vec![o.len()],
            operation: format!("{} -> {}", input.name(), output.name()),
        });
    }
    o.iter_mut().zip(x.iter()).for_each(|(o, &x)| *o = f(x));
    Ok(())
}

/// `ig = og * f(o)` element-wise, the backward shape of every activation
/// whose derivative is expressible in terms of its own output.
pub(crate) fn activation_grad(
    output: &Tensor,
    output_grad: &Tensor,
    input_grad: &Tensor,
    derivative: impl Fn(f32) -> f32,
) -> Result<(), OpGraphError> {
    let o_guard = output.read_data()?;
    let o = o_guard.as_slice::<f32>()?;
    let og_guard = output_grad.read_data()?;
    let og = og_guard.as_slice::<f32>()?;
    let mut ig_guard = input_grad.write_data()?;
    let ig = ig_guard.as_mut_slice::<f32>()?;
    if o.len() != og.len() || o.len() != ig.len() {
        return Err(OpGraphError::ShapeMismatch {
            expected: vec![o.len()],
            actual: vec![og.len(), ig.len()],
            operation: format!("activation grad of {}", output.name()),
        });
    }
    for ((ig, &og), &o) in ig.iter_mut().zip(og.iter()).zip(o.iter()) {
        *ig = og * derivative(o);
    }
    Ok(())
}
