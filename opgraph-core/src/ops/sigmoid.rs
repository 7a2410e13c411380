use crate::attr::AttrMap;
use crate::device::StorageDevice;
use crate::error::OpGraphError;
use crate::graph::{Op, VarId, VariableAttr};
use crate::ops::{activation_grad, check_arity, map_unary, optional, required, same_shape};
use crate::registry::{OpMeta, OpRegistry};
use crate::tensor::Tensor;

pub const SIGMOID: &str = "sigmoid";
pub const SIGMOID_GRAD: &str = "sigmoid_grad";

pub(crate) fn register(registry: &mut OpRegistry) {
    registry.register(
        OpMeta::new(SIGMOID, sigmoid_shape)
            .with_kernel(StorageDevice::CPU, sigmoid_kernel)
            .with_in_place(0, 0)
            .with_grad(sigmoid_grad_ops),
    );
    registry.register(
        OpMeta::new(SIGMOID_GRAD, sigmoid_grad_shape)
            .with_kernel(StorageDevice::CPU, sigmoid_grad_kernel),
    );
}

pub(crate) fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

fn sigmoid_shape(
    inputs: &[Option<VariableAttr>],
    outputs: &mut [Option<VariableAttr>],
) -> Result<(), OpGraphError> {
    check_arity(inputs, 1, 1, SIGMOID, "inputs")?;
    check_arity(outputs, 1, 1, SIGMOID, "outputs")?;
    same_shape(inputs, outputs)
}

fn sigmoid_kernel(
    inputs: &[Option<Tensor>],
    outputs: &[Option<Tensor>],
    _attrs: &AttrMap,
) -> Result<(), OpGraphError> {
    let x = required(inputs, 0, SIGMOID, "input")?;
    let out = required(outputs, 0, SIGMOID, "output")?;
    map_unary(x, out, sigmoid)
}

/// `sigmoid_grad{O, OG} -> {IG}`
fn sigmoid_grad_ops(
    _inputs: &[Option<VarId>],
    outputs: &[Option<VarId>],
    output_grads: &[Option<VarId>],
    input_grads: &[Option<VarId>],
) -> Result<Vec<Op>, OpGraphError> {
    let (og, ig) = match (optional(output_grads, 0), optional(input_grads, 0)) {
        (Some(&og), Some(&ig)) => (og, ig),
        _ => return Ok(Vec::new()),
    };
    let out = *required(outputs, 0, SIGMOID, "output")?;
    Ok(vec![Op::new(SIGMOID_GRAD, vec![Some(out), Some(og)], vec![Some(ig)])])
}

fn sigmoid_grad_shape(
    inputs: &[Option<VariableAttr>],
    outputs: &mut [Option<VariableAttr>],
) -> Result<(), OpGraphError> {
    check_arity(inputs, 2, 2, SIGMOID_GRAD, "inputs")?;
    check_arity(outputs, 1, 1, SIGMOID_GRAD, "outputs")?;
    same_shape(inputs, outputs)
}

fn sigmoid_grad_kernel(
    inputs: &[Option<Tensor>],
    outputs: &[Option<Tensor>],
    _attrs: &AttrMap,
) -> Result<(), OpGraphError> {
    let out = required(inputs, 0, SIGMOID_GRAD, "input")?;
    let og = required(inputs, 1, SIGMOID_GRAD, "input")?;
    let ig = required(outputs, 0, SIGMOID_GRAD, "output")?;
    activation_grad(out, og, ig, |o| o * (1.0 - o))
}

#[cfg(test)]
#[path = "sigmoid_test.rs"]
mod tests;
