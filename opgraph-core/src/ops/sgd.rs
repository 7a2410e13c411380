//! Plain stochastic gradient descent with optional L2 weight decay.
//!
//! `sgd{param, grad} -> {param}`: the output usually aliases the input
//! parameter, so the update happens in place.

use crate::attr::{attr_float, AttrKind, AttrMap, AttributeMeta};
use crate::device::StorageDevice;
use crate::error::OpGraphError;
use crate::graph::VariableAttr;
use crate::ops::{check_arity, check_dtype, check_same_dims, required, set_dims};
use crate::registry::{OpMeta, OpRegistry};
use crate::tensor::Tensor;
use crate::types::DType;

pub const SGD: &str = "sgd";
pub const LEARNING_RATE: &str = "learning_rate";
pub const WEIGHT_DECAY: &str = "weight_decay";

pub const DEFAULT_LEARNING_RATE: f32 = 1e-4;

pub(crate) fn register(registry: &mut OpRegistry) {
    registry.register(
        OpMeta::new(SGD, sgd_shape)
            .with_kernel(StorageDevice::CPU, sgd_kernel)
            .with_in_place(0, 0)
            .with_attr(
                AttributeMeta::new(LEARNING_RATE, "Step size of the update", AttrKind::Float)
                    .default_value(DEFAULT_LEARNING_RATE)
                    .positive(),
            )
            .with_attr(
                AttributeMeta::new(WEIGHT_DECAY, "L2 penalty coefficient", AttrKind::Float)
                    .default_value(0.0f32)
                    .non_negative(),
            ),
    );
}

fn sgd_shape(
    inputs: &[Option<VariableAttr>],
    outputs: &mut [Option<VariableAttr>],
) -> Result<(), OpGraphError> {
    check_arity(inputs, 2, 2, SGD, "inputs")?;
    check_arity(outputs, 1, 1, SGD, "outputs")?;
    let param = required(inputs, 0, SGD, "input")?;
    let grad = required(inputs, 1, SGD, "input")?;
    check_dtype(param, DType::F32)?;
    check_dtype(grad, DType::F32)?;
    check_same_dims(param, grad, SGD)?;
    set_dims(outputs, 0, param.dims.clone());
    Ok(())
}

fn apply(target: &mut [f32], param: Option<&[f32]>, grad: &[f32], lr: f32, wd: f32) {
    for (i, (t, &g)) in target.iter_mut().zip(grad.iter()).enumerate() {
        let p = param.map_or(*t, |p| p[i]);
        *t = p - lr * (g + wd * p);
    }
}

/// `p ← p - lr * (g + wd * p)`
fn sgd_kernel(
    inputs: &[Option<Tensor>],
    outputs: &[Option<Tensor>],
    attrs: &AttrMap,
) -> Result<(), OpGraphError> {
    let param = required(inputs, 0, SGD, "input")?;
    let grad = required(inputs, 1, SGD, "input")?;
    let out = required(outputs, 0, SGD, "output")?;
    let lr = attr_float(attrs, LEARNING_RATE)?;
    let wd = attr_float(attrs, WEIGHT_DECAY)?;

    let g_guard = grad.read_data()?;
    let g = g_guard.as_slice::<f32>()?;
    let mut o_guard = out.write_data()?;
    let o = o_guard.as_mut_slice::<f32>()?;
    if o.len() != g.len() {
        return Err(OpGraphError::ShapeMismatch {
            expected: vec![o.len()],
            actual: vec![g.len()],
            operation: format!("{} ({})", SGD, grad.name()),
        });
    }

    if out.shares_buffer(param) {
        apply(o, None, g, lr, wd);
    } else {
        let p_guard = param.read_data()?;
        let p = p_guard.as_slice::<f32>()?;
        if p.len() != o.len() {
            return Err(OpGraphError::ShapeMismatch {
                expected: vec![o.len()],
                actual: vec![p.len()],
                operation: format!("{} ({})", SGD, param.name()),
            });
        }
        apply(o, Some(p), g, lr, wd);
    }
    Ok(())
}

#[cfg(test)]
#[path = "sgd_test.rs"]
mod tests;
