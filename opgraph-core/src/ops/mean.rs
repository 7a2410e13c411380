use crate::attr::AttrMap;
use crate::device::StorageDevice;
use crate::error::OpGraphError;
use crate::graph::{Op, VarId, VariableAttr};
use crate::ops::{check_arity, check_dtype, check_numel, optional, required, set_dims};
use crate::registry::{OpMeta, OpRegistry};
use crate::tensor::Tensor;
use crate::types::DType;

pub const MEAN: &str = "mean";
pub const MEAN_GRAD: &str = "mean_grad";

pub(crate) fn register(registry: &mut OpRegistry) {
    registry.register(
        OpMeta::new(MEAN, mean_shape)
            .with_kernel(StorageDevice::CPU, mean_kernel)
            .with_grad(mean_grad_ops),
    );
    registry.register(
        OpMeta::new(MEAN_GRAD, mean_grad_shape).with_kernel(StorageDevice::CPU, mean_grad_kernel),
    );
}

fn mean_shape(
    inputs: &[Option<VariableAttr>],
    outputs: &mut [Option<VariableAttr>],
) -> Result<(), OpGraphError> {
    check_arity(inputs, 1, 1, MEAN, "inputs")?;
    check_arity(outputs, 1, 1, MEAN, "outputs")?;
    check_dtype(required(inputs, 0, MEAN, "input")?, DType::F32)?;
    set_dims(outputs, 0, vec![1, 1]);
    Ok(())
}

/// Mean of all elements, accumulated in f64. An empty input yields 0.
fn mean_kernel(
    inputs: &[Option<Tensor>],
    outputs: &[Option<Tensor>],
    _attrs: &AttrMap,
) -> Result<(), OpGraphError> {
    let x = required(inputs, 0, MEAN, "input")?;
    let out = required(outputs, 0, MEAN, "output")?;
    check_numel(out, 1, MEAN)?;
    let mean = {
        let guard = x.read_data()?;
        let x = guard.as_slice::<f32>()?;
        if x.is_empty() {
            0.0
        } else {
            (x.iter().map(|&v| v as f64).sum::<f64>() / x.len() as f64) as f32
        }
    };
    out.fill(mean)
}

/// `mean_grad{X, OG} -> {IG}`
fn mean_grad_ops(
    inputs: &[Option<VarId>],
    _outputs: &[Option<VarId>],
    output_grads: &[Option<VarId>],
    input_grads: &[Option<VarId>],
) -> Result<Vec<Op>, OpGraphError> {
    let (og, ig) = match (optional(output_grads, 0), optional(input_grads, 0)) {
        (Some(&og), Some(&ig)) => (og, ig),
        _ => return Ok(Vec::new()),
    };
    let x = *required(inputs, 0, MEAN, "input")?;
    Ok(vec![Op::new(MEAN_GRAD, vec![Some(x), Some(og)], vec![Some(ig)])])
}

fn mean_grad_shape(
    inputs: &[Option<VariableAttr>],
    outputs: &mut [Option<VariableAttr>],
) -> Result<(), OpGraphError> {
    check_arity(inputs, 2, 2, MEAN_GRAD, "inputs")?;
    check_arity(outputs, 1, 1, MEAN_GRAD, "outputs")?;
    let x = required(inputs, 0, MEAN_GRAD, "input")?;
    let og = required(inputs, 1, MEAN_GRAD, "input")?;
    if og.numel() != 1 {
        return Err(OpGraphError::ShapeMismatch {
            expected: vec![1, 1],
            actual: og.dims.clone(),
            operation: format!("{} output grad ({})", MEAN_GRAD, og.name),
        });
    }
    set_dims(outputs, 0, x.dims.clone());
    Ok(())
}

/// `IG = og / numel(IG)` everywhere.
fn mean_grad_kernel(
    inputs: &[Option<Tensor>],
    outputs: &[Option<Tensor>],
    _attrs: &AttrMap,
) -> Result<(), OpGraphError> {
    let og = required(inputs, 1, MEAN_GRAD, "input")?;
    let ig = required(outputs, 0, MEAN_GRAD, "output")?;
    check_numel(og, 1, MEAN_GRAD)?;
    let g = og.to_vec::<f32>()?[0];
    let len = ig.read_data()?.len();
    if len == 0 {
        return Ok(());
    }
    ig.fill(g / len as f32)
}

#[cfg(test)]
#[path = "mean_test.rs"]
mod tests;
