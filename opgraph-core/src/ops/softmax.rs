//! Row-wise softmax over `[n, c]` matrices.

use crate::attr::AttrMap;
use crate::device::StorageDevice;
use crate::error::OpGraphError;
use crate::graph::{Op, VarId, VariableAttr};
use crate::ops::{check_arity, check_numel, check_same_dims, matrix_dims, optional, required, set_dims};
use crate::registry::{OpMeta, OpRegistry};
use crate::tensor::Tensor;

pub const SOFTMAX: &str = "softmax";
pub const SOFTMAX_GRAD: &str = "softmax_grad";

pub(crate) fn register(registry: &mut OpRegistry) {
    registry.register(
        OpMeta::new(SOFTMAX, softmax_shape)
            .with_kernel(StorageDevice::CPU, softmax_kernel)
            .with_grad(softmax_grad_ops),
    );
    registry.register(
        OpMeta::new(SOFTMAX_GRAD, softmax_grad_shape)
            .with_kernel(StorageDevice::CPU, softmax_grad_kernel),
    );
}

fn softmax_shape(
    inputs: &[Option<VariableAttr>],
    outputs: &mut [Option<VariableAttr>],
) -> Result<(), OpGraphError> {
    check_arity(inputs, 1, 1, SOFTMAX, "inputs")?;
    check_arity(outputs, 1, 1, SOFTMAX, "outputs")?;
    let x = required(inputs, 0, SOFTMAX, "input")?;
    matrix_dims(x, SOFTMAX)?;
    set_dims(outputs, 0, x.dims.clone());
    Ok(())
}

fn softmax_kernel(
    inputs: &[Option<Tensor>],
    outputs: &[Option<Tensor>],
    _attrs: &AttrMap,
) -> Result<(), OpGraphError> {
    let x = required(inputs, 0, SOFTMAX, "input")?;
    let out = required(outputs, 0, SOFTMAX, "output")?;
    let (n, c) = matrix_dims(x.attr(), SOFTMAX)?;
    check_numel(x, n * c, SOFTMAX)?;
    check_numel(out, n * c, SOFTMAX)?;
    if c == 0 {
        return Ok(());
    }

    let x_guard = x.read_data()?;
    let x = x_guard.as_slice::<f32>()?;
    let mut o_guard = out.write_data()?;
    let o = o_guard.as_mut_slice::<f32>()?;
    for (x_row, o_row) in x.chunks(c).zip(o.chunks_mut(c)) {
        // Shift by the row max so exp never overflows.
        let max = x_row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let mut sum = 0.0;
        for (o, &x) in o_row.iter_mut().zip(x_row.iter()) {
            *o = (x - max).exp();
            sum += *o;
        }
        o_row.iter_mut().for_each(|o| *o /= sum);
    }
    Ok(())
}

/// `softmax_grad{P, OG} -> {IG}`
fn softmax_grad_ops(
    _inputs: &[Option<VarId>],
    outputs: &[Option<VarId>],
    output_grads: &[Option<VarId>],
    input_grads: &[Option<VarId>],
) -> Result<Vec<Op>, OpGraphError> {
    let (og, ig) = match (optional(output_grads, 0), optional(input_grads, 0)) {
        (Some(&og), Some(&ig)) => (og, ig),
        _ => return Ok(Vec::new()),
    };
    let p = *required(outputs, 0, SOFTMAX, "output")?;
    Ok(vec![Op::new(SOFTMAX_GRAD, vec![Some(p), Some(og)], vec![Some(ig)])])
}

fn softmax_grad_shape(
    inputs: &[Option<VariableAttr>],
    outputs: &mut [Option<VariableAttr>],
) -> Result<(), OpGraphError> {
    check_arity(inputs, 2, 2, SOFTMAX_GRAD, "inputs")?;
    check_arity(outputs, 1, 1, SOFTMAX_GRAD, "outputs")?;
    let p = required(inputs, 0, SOFTMAX_GRAD, "input")?;
    let og = required(inputs, 1, SOFTMAX_GRAD, "input")?;
    matrix_dims(p, SOFTMAX_GRAD)?;
    check_same_dims(p, og, SOFTMAX_GRAD)?;
    set_dims(outputs, 0, p.dims.clone());
    Ok(())
}

/// `IG[i, j] = P[i, j] * (OG[i, j] - Σ_k OG[i, k] * P[i, k])`
fn softmax_grad_kernel(
    inputs: &[Option<Tensor>],
    outputs: &[Option<Tensor>],
    _attrs: &AttrMap,
) -> Result<(), OpGraphError> {
    let p = required(inputs, 0, SOFTMAX_GRAD, "input")?;
    let og = required(inputs, 1, SOFTMAX_GRAD, "input")?;
    let ig = required(outputs, 0, SOFTMAX_GRAD, "output")?;
    let (n, c) = matrix_dims(p.attr(), SOFTMAX_GRAD)?;
    for t in [p, og, ig] {
        check_numel(t, n * c, SOFTMAX_GRAD)?;
    }
    if c == 0 {
        return Ok(());
    }

    let p_guard = p.read_data()?;
    let p = p_guard.as_slice::<f32>()?;
    let og_guard = og.read_data()?;
    let og = og_guard.as_slice::<f32>()?;
    let mut ig_guard = ig.write_data()?;
    let ig = ig_guard.as_mut_slice::<f32>()?;
    for ((p_row, og_row), ig_row) in p.chunks(c).zip(og.chunks(c)).zip(ig.chunks_mut(c)) {
        let dot: f32 = p_row.iter().zip(og_row.iter()).map(|(p, g)| p * g).sum();
        for ((ig, &p), &g) in ig_row.iter_mut().zip(p_row.iter()).zip(og_row.iter()) {
            *ig = p * (g - dot);
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "softmax_test.rs"]
mod tests;
