use crate::compiler::{PassContext, REQUEST_RESOURCE};
use crate::error::OpGraphError;
use crate::graph::Graph;
use crate::workspace::Workspace;

/// Gives every descriptor of `graph` a buffer of the right size.
pub fn request_resources(graph: &Graph, workspace: &mut Workspace) -> Result<(), OpGraphError> {
    for (_, var) in graph.vars() {
        workspace.get_or_create_buffer(var)?;
    }
    Ok(())
}

pub(crate) fn request_resource_pass(
    graph: &mut Graph,
    ctx: &mut PassContext<'_>,
) -> Result<(), OpGraphError> {
    let workspace = ctx.workspace_mut(REQUEST_RESOURCE)?;
    request_resources(graph, workspace)
}
