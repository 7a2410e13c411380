//! Per-sample negative log-likelihood of integer labels under row
//! probabilities: `loss[i] = -ln P[i, L[i]]`.

use crate::attr::AttrMap;
use crate::device::StorageDevice;
use crate::error::OpGraphError;
use crate::graph::{Op, VarId, VariableAttr};
use crate::ops::{check_arity, check_dtype, check_numel, matrix_dims, optional, required, set_dims};
use crate::registry::{OpMeta, OpRegistry};
use crate::tensor::Tensor;
use crate::types::DType;

pub const CROSS_ENTROPY: &str = "cross_entropy";
pub const CROSS_ENTROPY_GRAD: &str = "cross_entropy_grad";

pub(crate) fn register(registry: &mut OpRegistry) {
    registry.register(
        OpMeta::new(CROSS_ENTROPY, cross_entropy_shape)
            .with_kernel(StorageDevice::CPU, cross_entropy_kernel)
            .with_grad(cross_entropy_grad_ops),
    );
    registry.register(
        OpMeta::new(CROSS_ENTROPY_GRAD, cross_entropy_grad_shape)
            .with_kernel(StorageDevice::CPU, cross_entropy_grad_kernel),
    );
}

/// Checks `P[n, c]` against `L` (I32, `n` elements); returns `(n, c)`.
pub(crate) fn check_prob_and_labels(
    p: &VariableAttr,
    labels: &VariableAttr,
    op_type: &str,
) -> Result<(usize, usize), OpGraphError> {
    check_dtype(p, DType::F32)?;
    check_dtype(labels, DType::I32)?;
    let (n, c) = matrix_dims(p, op_type)?;
    if labels.numel() != n {
        return Err(OpGraphError::ShapeMismatch {
            expected: vec![n],
            actual: labels.dims.clone(),
            operation: format!("{} labels ({})", op_type, labels.name),
        });
    }
    Ok((n, c))
}

/// Converts a label into a column index.
pub(crate) fn label_index(label: i32, classes: usize, op_type: &str) -> Result<usize, OpGraphError> {
    if label < 0 || label as usize >= classes {
        return Err(OpGraphError::IndexOutOfBounds {
            index: label as i64,
            size: classes,
            operation: op_type.to_string(),
        });
    }
    Ok(label as usize)
}

fn cross_entropy_shape(
    inputs: &[Option<VariableAttr>],
    outputs: &mut [Option<VariableAttr>],
) -> Result<(), OpGraphError> {
    check_arity(inputs, 2, 2, CROSS_ENTROPY, "inputs")?;
    check_arity(outputs, 1, 1, CROSS_ENTROPY, "outputs")?;
    let p = required(inputs, 0, CROSS_ENTROPY, "input")?;
    let labels = required(inputs, 1, CROSS_ENTROPY, "input")?;
    let (n, _) = check_prob_and_labels(p, labels, CROSS_ENTROPY)?;
    set_dims(outputs, 0, vec![n, 1]);
    Ok(())
}

fn cross_entropy_kernel(
    inputs: &[Option<Tensor>],
    outputs: &[Option<Tensor>],
    _attrs: &AttrMap,
) -> Result<(), OpGraphError> {
    let p = required(inputs, 0, CROSS_ENTROPY, "input")?;
    let labels = required(inputs, 1, CROSS_ENTROPY, "input")?;
    let loss = required(outputs, 0, CROSS_ENTROPY, "output")?;
    let (n, c) = check_prob_and_labels(p.attr(), labels.attr(), CROSS_ENTROPY)?;
    check_numel(p, n * c, CROSS_ENTROPY)?;
    check_numel(loss, n, CROSS_ENTROPY)?;

    let p_guard = p.read_data()?;
    let p = p_guard.as_slice::<f32>()?;
    let l_guard = labels.read_data()?;
    let labels = l_guard.as_slice::<i32>()?;
    let mut loss_guard = loss.write_data()?;
    let loss = loss_guard.as_mut_slice::<f32>()?;
    for (i, (loss, &label)) in loss.iter_mut().zip(labels.iter()).enumerate() {
        let j = label_index(label, c, CROSS_ENTROPY)?;
        *loss = -p[i * c + j].ln();
    }
    Ok(())
}

/// `cross_entropy_grad{P, L, OG} -> {GP}`
fn cross_entropy_grad_ops(
    inputs: &[Option<VarId>],
    _outputs: &[Option<VarId>],
    output_grads: &[Option<VarId>],
    input_grads: &[Option<VarId>],
) -> Result<Vec<Op>, OpGraphError> {
    let (og, gp) = match (optional(output_grads, 0), optional(input_grads, 0)) {
        (Some(&og), Some(&gp)) => (og, gp),
        _ => return Ok(Vec::new()),
    };
    let p = *required(inputs, 0, CROSS_ENTROPY, "input")?;
    let labels = *required(inputs, 1, CROSS_ENTROPY, "input")?;
    Ok(vec![Op::new(
        CROSS_ENTROPY_GRAD,
        vec![Some(p), Some(labels), Some(og)],
        vec![Some(gp)],
    )])
}

fn cross_entropy_grad_shape(
    inputs: &[Option<VariableAttr>],
    outputs: &mut [Option<VariableAttr>],
) -> Result<(), OpGraphError> {
    check_arity(inputs, 3, 3, CROSS_ENTROPY_GRAD, "inputs")?;
    check_arity(outputs, 1, 1, CROSS_ENTROPY_GRAD, "outputs")?;
    let p = required(inputs, 0, CROSS_ENTROPY_GRAD, "input")?;
    let labels = required(inputs, 1, CROSS_ENTROPY_GRAD, "input")?;
    let og = required(inputs, 2, CROSS_ENTROPY_GRAD, "input")?;
    let (n, _) = check_prob_and_labels(p, labels, CROSS_ENTROPY_GRAD)?;
    if og.numel() != n {
        return Err(OpGraphError::ShapeMismatch {
            expected: vec![n, 1],
            actual: og.dims.clone(),
            operation: format!("{} output grad ({})", CROSS_ENTROPY_GRAD, og.name),
        });
    }
    set_dims(outputs, 0, p.dims.clone());
    Ok(())
}

/// `GP[i, L[i]] = -OG[i] / P[i, L[i]]`, zero elsewhere.
fn cross_entropy_grad_kernel(
    inputs: &[Option<Tensor>],
    outputs: &[Option<Tensor>],
    _attrs: &AttrMap,
) -> Result<(), OpGraphError> {
    let p = required(inputs, 0, CROSS_ENTROPY_GRAD, "input")?;
    let labels = required(inputs, 1, CROSS_ENTROPY_GRAD, "input")?;
    let og = required(inputs, 2, CROSS_ENTROPY_GRAD, "input")?;
    let gp = required(outputs, 0, CROSS_ENTROPY_GRAD, "output")?;
    let (n, c) = check_prob_and_labels(p.attr(), labels.attr(), CROSS_ENTROPY_GRAD)?;
    check_numel(p, n * c, CROSS_ENTROPY_GRAD)?;
    check_numel(og, n, CROSS_ENTROPY_GRAD)?;
    check_numel(gp, n * c, CROSS_ENTROPY_GRAD)?;

    let p_guard = p.read_data()?;
    let p = p_guard.as_slice::<f32>()?;
    let l_guard = labels.read_data()?;
    let labels = l_guard.as_slice::<i32>()?;
    let og_guard = og.read_data()?;
    let og = og_guard.as_slice::<f32>()?;
    let mut gp_guard = gp.write_data()?;
    gp_guard.fill_zero();
    let gp = gp_guard.as_mut_slice::<f32>()?;
    for (i, &label) in labels.iter().enumerate() {
        let j = label_index(label, c, CROSS_ENTROPY_GRAD)?;
        gp[i * c + j] = -og[i] / p[i * c + j];
    }
    Ok(())
}

#[cfg(test)]
#[path = "cross_entropy_test.rs"]
mod tests;
