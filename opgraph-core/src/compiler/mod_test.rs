use super::*;
use crate::compiler::backward::LOSS_NAME;
use crate::compiler::optimizer::OPTIMIZER_TYPE;
use crate::ops::sgd;
use crate::test_utils::classifier;

fn failing_pass(_graph: &mut Graph, _ctx: &mut PassContext<'_>) -> Result<(), OpGraphError> {
    Err(OpGraphError::InternalError("failing pass ran".to_string()))
}

#[test]
fn test_default_pass_names() {
    let passes = CompilerRegistry::with_default_passes();
    assert_eq!(
        passes.names(),
        vec![BACKWARD, INFER_SHAPE, OPTIMIZER, REQUEST_RESOURCE]
    );
    assert!(passes.contains(BACKWARD));
    assert!(!passes.contains("fuse"));
    assert!(CompilerRegistry::new().names().is_empty());
}

#[test]
fn test_unknown_pass_leaves_graph_untouched() {
    let builder = classifier();
    let registry = builder.registry().clone();
    let mut graph = builder.finish();
    let num_ops = graph.num_ops();
    let num_vars = graph.num_vars();

    let mut ctx = PassContext::new(&registry).with_attr(LOSS_NAME, "avg_loss");
    let err = compile_graph(&mut graph, &[BACKWARD, "fuse"], &mut ctx).unwrap_err();
    assert_eq!(err, OpGraphError::UnknownCompilerPass("fuse".to_string()));
    assert_eq!(graph.num_ops(), num_ops);
    assert_eq!(graph.num_vars(), num_vars);
}

#[test]
fn test_full_pipeline() {
    let builder = classifier();
    let registry = builder.registry().clone();
    let mut graph = builder.finish();
    let mut workspace = Workspace::new();

    let mut ctx = PassContext::new(&registry)
        .with_attr(LOSS_NAME, "avg_loss")
        .with_attr(OPTIMIZER_TYPE, sgd::SGD)
        .with_attr(sgd::LEARNING_RATE, 0.1f32)
        .with_workspace(&mut workspace);
    compile_graph(
        &mut graph,
        &[BACKWARD, OPTIMIZER, INFER_SHAPE, REQUEST_RESOURCE],
        &mut ctx,
    )
    .unwrap();

    // 6 forward, 6 gradient and 4 update ops.
    assert_eq!(graph.num_ops(), 16);
    assert!(graph.ops()[12..].iter().all(|op| op.op_type == sgd::SGD));
    assert_eq!(
        graph.ops()[12].attrs.get(sgd::LEARNING_RATE),
        Some(&AttrValue::Float(0.1))
    );
    assert!(!graph.ops()[12].attrs.contains_key(LOSS_NAME));
    assert_eq!(workspace.len(), graph.num_vars());
    assert!(workspace.contains("hidden.param.weight.0.grad"));
}

#[test]
fn test_request_resource_requires_workspace() {
    let builder = classifier();
    let registry = builder.registry().clone();
    let mut graph = builder.finish();
    let mut ctx = PassContext::new(&registry);
    assert_eq!(
        compile_graph(&mut graph, &[REQUEST_RESOURCE], &mut ctx).unwrap_err(),
        OpGraphError::MissingWorkspace(REQUEST_RESOURCE.to_string())
    );
}

#[test]
fn test_backward_pass_requires_loss_name() {
    let builder = classifier();
    let registry = builder.registry().clone();
    let mut graph = builder.finish();
    let mut ctx = PassContext::new(&registry);
    assert_eq!(
        compile_graph(&mut graph, &[BACKWARD], &mut ctx).unwrap_err(),
        OpGraphError::MissingAttribute(LOSS_NAME.to_string())
    );
}

#[test]
fn test_custom_pass_stops_the_sequence() {
    let builder = classifier();
    let registry = builder.registry().clone();
    let mut graph = builder.finish();
    let num_ops = graph.num_ops();

    let mut passes = CompilerRegistry::with_default_passes();
    passes.register("fail", failing_pass);
    let mut ctx = PassContext::new(&registry).with_attr(LOSS_NAME, "avg_loss");
    let err = passes
        .compile_graph(&mut graph, &["fail", BACKWARD], &mut ctx)
        .unwrap_err();
    assert!(matches!(err, OpGraphError::InternalError(_)));
    assert_eq!(graph.num_ops(), num_ops);
}
