//! Fully connected layer: `O[n, m] = X[n, k] · W[k, m] (+ B)`.
//!
//! The bias is optional. When present it holds `m` elements and is added to
//! every row of the product.

use crate::device::StorageDevice;
use crate::error::OpGraphError;
use crate::graph::{Op, VarId, VariableAttr};
use crate::ops::linalg::{col_sum, matmul, matmul_a_bt, matmul_at_b};
use crate::ops::{check_arity, check_dtype, check_numel, matrix_dims, optional, required, set_dims};
use crate::registry::{OpMeta, OpRegistry};
use crate::tensor::Tensor;
use crate::attr::AttrMap;
use crate::types::DType;

pub const FC: &str = "fc";
pub const FC_GRAD: &str = "fc_grad";

pub(crate) fn register(registry: &mut OpRegistry) {
    registry.register(
        OpMeta::new(FC, fc_shape)
            .with_kernel(StorageDevice::CPU, fc_kernel)
            .with_grad(fc_grad_ops),
    );
    registry.register(
        OpMeta::new(FC_GRAD, fc_grad_shape).with_kernel(StorageDevice::CPU, fc_grad_kernel),
    );
}

fn check_bias(bias: &VariableAttr, m: usize) -> Result<(), OpGraphError> {
    if bias.numel() != m {
        return Err(OpGraphError::ShapeMismatch {
            expected: vec![m, 1],
            actual: bias.dims.clone(),
            operation: format!("{} bias ({})", FC, bias.name),
        });
    }
    check_dtype(bias, DType::F32)
}

/// Validates `X`, `W` and the optional `B`; returns `(n, k, m)`.
fn fc_dims(
    x: &VariableAttr,
    w: &VariableAttr,
    b: Option<&VariableAttr>,
) -> Result<(usize, usize, usize), OpGraphError> {
    check_dtype(x, DType::F32)?;
    check_dtype(w, DType::F32)?;
    let (n, k) = matrix_dims(x, FC)?;
    let (wk, m) = matrix_dims(w, FC)?;
    if k != wk {
        return Err(OpGraphError::ShapeMismatch {
            expected: vec![k, m],
            actual: w.dims.clone(),
            operation: format!("{} ({} · {})", FC, x.name, w.name),
        });
    }
    if let Some(b) = b {
        check_bias(b, m)?;
    }
    Ok((n, k, m))
}

fn fc_shape(
    inputs: &[Option<VariableAttr>],
    outputs: &mut [Option<VariableAttr>],
) -> Result<(), OpGraphError> {
    check_arity(inputs, 2, 3, FC, "inputs")?;
    check_arity(outputs, 1, 1, FC, "outputs")?;
    let x = required(inputs, 0, FC, "input")?;
    let w = required(inputs, 1, FC, "input")?;
    let (n, _, m) = fc_dims(x, w, optional(inputs, 2))?;
    set_dims(outputs, 0, vec![n, m]);
    Ok(())
}

fn fc_kernel(
    inputs: &[Option<Tensor>],
    outputs: &[Option<Tensor>],
    _attrs: &AttrMap,
) -> Result<(), OpGraphError> {
    let x = required(inputs, 0, FC, "input")?;
    let w = required(inputs, 1, FC, "input")?;
    let bias = optional(inputs, 2);
    let out = required(outputs, 0, FC, "output")?;
    let (n, k, m) = fc_dims(x.attr(), w.attr(), bias.map(Tensor::attr))?;
    check_numel(x, n * k, FC)?;
    check_numel(w, k * m, FC)?;
    check_numel(out, n * m, FC)?;

    let x_guard = x.read_data()?;
    let w_guard = w.read_data()?;
    let mut o_guard = out.write_data()?;
    let o = o_guard.as_mut_slice::<f32>()?;
    matmul(x_guard.as_slice::<f32>()?, w_guard.as_slice::<f32>()?, o, n, k, m);

    if let (Some(bias), true) = (bias, m > 0) {
        let b_guard = bias.read_data()?;
        let b = b_guard.as_slice::<f32>()?;
        for row in o.chunks_mut(m) {
            row.iter_mut().zip(b.iter()).for_each(|(o, &b)| *o += b);
        }
    }
    Ok(())
}

/// `fc_grad{X, W, OG, B?} -> {GW?, GX?, GB?}`
fn fc_grad_ops(
    inputs: &[Option<VarId>],
    _outputs: &[Option<VarId>],
    output_grads: &[Option<VarId>],
    input_grads: &[Option<VarId>],
) -> Result<Vec<Op>, OpGraphError> {
    let og = match output_grads.first().copied().flatten() {
        Some(og) => og,
        None => return Ok(Vec::new()),
    };
    let x = *required(inputs, 0, FC, "input")?;
    let w = *required(inputs, 1, FC, "input")?;
    let b = optional(inputs, 2).copied();

    let gx = optional(input_grads, 0).copied();
    let gw = optional(input_grads, 1).copied();
    let gb = optional(input_grads, 2).copied();
    Ok(vec![Op::new(
        FC_GRAD,
        vec![Some(x), Some(w), Some(og), b],
        vec![gw, gx, gb],
    )])
}

fn fc_grad_shape(
    inputs: &[Option<VariableAttr>],
    outputs: &mut [Option<VariableAttr>],
) -> Result<(), OpGraphError> {
    check_arity(inputs, 3, 4, FC_GRAD, "inputs")?;
    check_arity(outputs, 1, 3, FC_GRAD, "outputs")?;
    let x = required(inputs, 0, FC_GRAD, "input")?;
    let w = required(inputs, 1, FC_GRAD, "input")?;
    let og = required(inputs, 2, FC_GRAD, "input")?;
    let bias = optional(inputs, 3);
    let (n, _, m) = fc_dims(x, w, bias)?;
    if og.dims != [n, m] {
        return Err(OpGraphError::ShapeMismatch {
            expected: vec![n, m],
            actual: og.dims.clone(),
            operation: format!("{} output grad ({})", FC_GRAD, og.name),
        });
    }
    set_dims(outputs, 0, w.dims.clone());
    set_dims(outputs, 1, x.dims.clone());
    if let Some(bias) = bias {
        set_dims(outputs, 2, bias.dims.clone());
    }
    Ok(())
}

fn fc_grad_kernel(
    inputs: &[Option<Tensor>],
    outputs: &[Option<Tensor>],
    _attrs: &AttrMap,
) -> Result<(), OpGraphError> {
    let x = required(inputs, 0, FC_GRAD, "input")?;
    let w = required(inputs, 1, FC_GRAD, "input")?;
    let og = required(inputs, 2, FC_GRAD, "input")?;
    let (n, k, m) = fc_dims(x.attr(), w.attr(), optional(inputs, 3).map(Tensor::attr))?;
    check_numel(og, n * m, FC_GRAD)?;
    for (grad, len) in [(optional(outputs, 0), k * m), (optional(outputs, 1), n * k), (optional(outputs, 2), m)] {
        if let Some(grad) = grad {
            check_numel(grad, len, FC_GRAD)?;
        }
    }

    let og_guard = og.read_data()?;
    let og = og_guard.as_slice::<f32>()?;

    if let Some(gw) = optional(outputs, 0) {
        let x_guard = x.read_data()?;
        let mut gw_guard = gw.write_data()?;
        matmul_at_b(x_guard.as_slice::<f32>()?, og, gw_guard.as_mut_slice::<f32>()?, n, k, m);
    }
    if let Some(gx) = optional(outputs, 1) {
        let w_guard = w.read_data()?;
        let mut gx_guard = gx.write_data()?;
        matmul_a_bt(og, w_guard.as_slice::<f32>()?, gx_guard.as_mut_slice::<f32>()?, n, m, k);
    }
    if let Some(gb) = optional(outputs, 2) {
        let mut gb_guard = gb.write_data()?;
        col_sum(og, gb_guard.as_mut_slice::<f32>()?, n, m);
    }
    Ok(())
}

#[cfg(test)]
#[path = "fc_test.rs"]
mod tests;
