//! Reverse-mode gradient generation.
//!
//! Walks the forward ops from the backward point down to the first op and
//! appends the gradient ops each op's [`GradFn`](crate::registry::GradFn)
//! returns. Gradient descriptors are named `<name>.grad` and take the dims and
//! dtype of the descriptor they belong to.
//!
//! Gradient ops overwrite their outputs. A descriptor consumed by several
//! differentiable ops therefore only keeps the gradient written last.

use std::sync::Arc;

use crate::attr::{attr_int, attr_str};
use crate::compiler::PassContext;
use crate::error::OpGraphError;
use crate::graph::{grad_name, Graph, VarId};
use crate::registry::OpRegistry;
use crate::tensor::Tensor;
use crate::types::DType;

pub const LOSS_NAME: &str = "loss_name";
pub const BACKWARD_POINT: &str = "backward_point";

/// Creates (or fetches) the gradient descriptor of `id`.
pub(crate) fn grad_var(graph: &mut Graph, id: VarId) -> Result<VarId, OpGraphError> {
    let var = graph.var(id);
    let name = grad_name(&var.name);
    let dims = var.dims.clone();
    let dtype = var.dtype;
    graph.create_or_get_var(&name, dims, false, dtype)
}

/// Gradient slot for each forward slot: `Some` only for present descriptors
/// that need a gradient.
fn grad_slots(graph: &mut Graph, slots: &[Option<VarId>]) -> Result<Vec<Option<VarId>>, OpGraphError> {
    let mut grads = Vec::with_capacity(slots.len());
    for slot in slots {
        let grad = match slot {
            Some(id) if graph.var(*id).need_backward => Some(grad_var(graph, *id)?),
            _ => None,
        };
        grads.push(grad);
    }
    Ok(grads)
}

fn any_needs_backward(graph: &Graph, slots: &[Option<VarId>]) -> bool {
    slots.iter().flatten().any(|id| graph.var(*id).need_backward)
}

/// Appends the gradient ops of `loss_name` to `graph`.
///
/// # Arguments
/// * `backward_point`: index of the last forward op to differentiate;
///   defaults to the last op of the graph.
///
/// # Errors
/// * `EmptyGraph` if the graph has no ops.
/// * `UnknownTensor` if no descriptor is called `loss_name`.
/// * `TensorTypeMismatch` / `NonScalarLoss` if the loss is not a float scalar.
/// * `InvalidBackwardPoint` if `backward_point` is negative or past the end.
/// * `NonDifferentiableOp` if an op on the gradient path has no `GradFn`.
///
/// On error the graph is left as it was.
pub fn build_backward(
    graph: &mut Graph,
    registry: &OpRegistry,
    loss_name: &str,
    backward_point: Option<i64>,
) -> Result<(), OpGraphError> {
    let num_ops = graph.num_ops();
    if num_ops == 0 {
        return Err(OpGraphError::EmptyGraph);
    }

    let loss_id = graph.lookup(loss_name)?;
    let loss = graph.var(loss_id);
    if loss.dtype != DType::F32 {
        return Err(OpGraphError::TensorTypeMismatch {
            name: loss.name.clone(),
            expected: DType::F32,
            actual: loss.dtype,
        });
    }
    if loss.numel() != 1 {
        return Err(OpGraphError::NonScalarLoss {
            name: loss.name.clone(),
            dims: loss.dims.clone(),
        });
    }

    let start = match backward_point {
        None => num_ops - 1,
        Some(point) if point >= 0 && (point as usize) < num_ops => point as usize,
        Some(point) => return Err(OpGraphError::InvalidBackwardPoint { point, num_ops }),
    };

    // Built on a copy so a failure leaves `graph` untouched.
    let mut staged = graph.clone();
    let loss_grad = grad_var(&mut staged, loss_id)?;
    staged.var_mut(loss_grad).special_reset = Some(Arc::new(|t: &Tensor| t.fill(1.0f32)));

    let mut grad_ops = Vec::new();
    for index in (0..=start).rev() {
        let op = staged.ops()[index].clone();
        if !any_needs_backward(&staged, &op.outputs) {
            log::debug!("backward: skipping op #{} '{}'", index, op.op_type);
            continue;
        }
        let meta = registry.lookup(&op.op_type)?;
        let grad_fn = meta
            .grad
            .ok_or_else(|| OpGraphError::NonDifferentiableOp(op.op_type.clone()))?;

        let output_grads = grad_slots(&mut staged, &op.outputs)?;
        let input_grads = grad_slots(&mut staged, &op.inputs)?;
        let generated = grad_fn(&op.inputs, &op.outputs, &output_grads, &input_grads)?;
        log::debug!(
            "backward: op #{} '{}' produced {} gradient op(s)",
            index,
            op.op_type,
            generated.len()
        );
        for mut grad_op in generated {
            registry.finalize_op(&mut grad_op)?;
            staged.validate_op(&grad_op)?;
            grad_ops.push(grad_op);
        }
    }

    for grad_op in grad_ops {
        staged.push_op(grad_op)?;
    }
    *graph = staged;
    Ok(())
}

pub(crate) fn backward_pass(graph: &mut Graph, ctx: &mut PassContext<'_>) -> Result<(), OpGraphError> {
    let loss_name = attr_str(&ctx.attrs, LOSS_NAME)?.to_string();
    let backward_point = if ctx.attrs.contains_key(BACKWARD_POINT) {
        Some(attr_int(&ctx.attrs, BACKWARD_POINT)?)
    } else {
        None
    };
    build_backward(graph, ctx.registry, &loss_name, backward_point)
}

#[cfg(test)]
#[path = "backward_test.rs"]
mod tests;
