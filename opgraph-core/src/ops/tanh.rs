use crate::attr::AttrMap;
use crate::device::StorageDevice;
use crate::error::OpGraphError;
use crate::graph::{Op, VarId, VariableAttr};
use crate::ops::{activation_grad, check_arity, map_unary, optional, required, same_shape};
use crate::registry::{OpMeta, OpRegistry};
use crate::tensor::Tensor;

pub const TANH: &str = "tanh";
pub const TANH_GRAD: &str = "tanh_grad";

pub(crate) fn register(registry: &mut OpRegistry) {
    registry.register(
        OpMeta::new(TANH, tanh_shape)
            .with_kernel(StorageDevice::CPU, tanh_kernel)
            .with_in_place(0, 0)
            .with_grad(tanh_grad_ops),
    );
    registry.register(
        OpMeta::new(TANH_GRAD, tanh_grad_shape).with_kernel(StorageDevice::CPU, tanh_grad_kernel),
    );
}

fn tanh_shape(
    inputs: &[Option<VariableAttr>],
    outputs: &mut [Option<VariableAttr>],
) -> Result<(), OpGraphError> {
    check_arity(inputs, 1, 1, TANH, "inputs")?;
    check_arity(outputs, 1, 1, TANH, "outputs")?;
    same_shape(inputs, outputs)
}

fn tanh_kernel(
    inputs: &[Option<Tensor>],
    outputs: &[Option<Tensor>],
    _attrs: &AttrMap,
) -> Result<(), OpGraphError> {
    let x = required(inputs, 0, TANH, "input")?;
    let out = required(outputs, 0, TANH, "output")?;
    map_unary(x, out, f32::tanh)
}

fn tanh_grad_ops(
    _inputs: &[Option<VarId>],
    outputs: &[Option<VarId>],
    output_grads: &[Option<VarId>],
    input_grads: &[Option<VarId>],
) -> Result<Vec<Op>, OpGraphError> {
    let (og, ig) = match (optional(output_grads, 0), optional(input_grads, 0)) {
        (Some(&og), Some(&ig)) => (og, ig),
        _ => return Ok(Vec::new()),
    };
    let out = *required(outputs, 0, TANH, "output")?;
    Ok(vec![Op::new(TANH_GRAD, vec![Some(out), Some(og)], vec![Some(ig)])])
}

fn tanh_grad_shape(
    inputs: &[Option<VariableAttr>],
    outputs: &mut [Option<VariableAttr>],
) -> Result<(), OpGraphError> {
    check_arity(inputs, 2, 2, TANH_GRAD, "inputs")?;
    check_arity(outputs, 1, 1, TANH_GRAD, "outputs")?;
    same_shape(inputs, outputs)
}

/// `IG = OG * (1 - O²)`
fn tanh_grad_kernel(
    inputs: &[Option<Tensor>],
    outputs: &[Option<Tensor>],
    _attrs: &AttrMap,
) -> Result<(), OpGraphError> {
    let out = required(inputs, 0, TANH_GRAD, "input")?;
    let og = required(inputs, 1, TANH_GRAD, "input")?;
    let ig = required(outputs, 0, TANH_GRAD, "output")?;
    activation_grad(out, og, ig, |o| 1.0 - o * o)
}

#[cfg(test)]
#[path = "tanh_test.rs"]
mod tests;
