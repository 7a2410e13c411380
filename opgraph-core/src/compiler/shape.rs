use crate::compiler::PassContext;
use crate::error::OpGraphError;
use crate::graph::{Graph, Op};
use crate::registry::OpRegistry;

/// Re-derives every op's output dims in program order.
///
/// Running it twice on an unchanged graph is a no-op.
pub fn infer_shapes(graph: &mut Graph, registry: &OpRegistry) -> Result<(), OpGraphError> {
    for index in 0..graph.num_ops() {
        let op = graph.ops()[index].clone();
        infer_op_shape(graph, registry, &op)?;
    }
    Ok(())
}

/// Runs the shape inferer of `op` on descriptor snapshots and writes the
/// output dims back. `op` need not be part of the graph yet.
pub(crate) fn infer_op_shape(graph: &mut Graph, registry: &OpRegistry, op: &Op) -> Result<(), OpGraphError> {
    let meta = registry.lookup(&op.op_type)?;
    let inputs = graph.snapshot(&op.inputs);
    let mut outputs = graph.snapshot(&op.outputs);

    (meta.shape_inferer)(&inputs, &mut outputs)?;

    for (id, attr) in op.outputs.iter().zip(outputs) {
        if let (Some(id), Some(attr)) = (id, attr) {
            graph.var_mut(*id).dims = attr.dims;
        }
    }
    Ok(())
}

pub(crate) fn infer_shape_pass(graph: &mut Graph, ctx: &mut PassContext<'_>) -> Result<(), OpGraphError> {
    infer_shapes(graph, ctx.registry)
}

#[cfg(test)]
#[path = "shape_test.rs"]
mod tests;
