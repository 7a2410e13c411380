use crate::attr::{attr_str, AttrMap};
use crate::compiler::PassContext;
use crate::error::OpGraphError;
use crate::graph::{Graph, Op, GRAD_SUFFIX, PARAM_MARKER};
use crate::registry::OpRegistry;

/// Attribute naming the optimizer op type, e.g. `"sgd"`.
pub const OPTIMIZER_TYPE: &str = "optimizer";

/// `name` with its last `.grad` removed.
fn strip_last_grad(name: &str) -> String {
    match name.rfind(GRAD_SUFFIX) {
        Some(pos) => format!("{}{}", &name[..pos], &name[pos + GRAD_SUFFIX.len()..]),
        None => name.to_string(),
    }
}

/// Appends one `optimizer{param, grad} -> {param}` op per parameter gradient
/// and returns how many were added.
///
/// Only the entries of `attrs` the optimizer declares are copied onto each op;
/// the rest get the optimizer's defaults. Not idempotent: every call appends
/// another round of update ops.
pub fn add_optimizer_ops(
    graph: &mut Graph,
    registry: &OpRegistry,
    optimizer: &str,
    attrs: &AttrMap,
) -> Result<usize, OpGraphError> {
    let meta = registry.lookup(optimizer)?;
    let op_attrs: AttrMap = meta
        .attr_meta
        .iter()
        .filter_map(|m| attrs.get(m.name()).map(|v| (m.name().to_string(), v.clone())))
        .collect();

    let mut added = 0;
    for name in graph.sorted_names() {
        if !(name.contains(PARAM_MARKER) && name.contains(GRAD_SUFFIX)) {
            continue;
        }
        let grad = graph.lookup(&name)?;
        let param = graph.lookup(&strip_last_grad(&name))?;
        let mut op = Op::new(optimizer, vec![Some(param), Some(grad)], vec![Some(param)])
            .with_attrs(op_attrs.clone());
        registry.finalize_op(&mut op)?;
        graph.push_op(op)?;
        added += 1;
    }
    log::debug!("optimizer: appended {} '{}' op(s)", added, optimizer);
    Ok(added)
}

pub(crate) fn optimizer_pass(graph: &mut Graph, ctx: &mut PassContext<'_>) -> Result<(), OpGraphError> {
    let optimizer = attr_str(&ctx.attrs, OPTIMIZER_TYPE)?.to_string();
    add_optimizer_ops(graph, ctx.registry, &optimizer, &ctx.attrs).map(|_| ())
}

#[cfg(test)]
#[path = "optimizer_test.rs"]
mod tests;
