use opgraph_core::compiler::infer_shapes;
use opgraph_core::graph::grad_name;
use opgraph_core::{Activation, DType, EngineConfig, Graph, OpGraphError, OpRegistry};

mod common;
use common::{mlp, new_builder, pattern};

#[test]
fn test_shape_inference_is_idempotent() {
    let mut builder = mlp(8, 12, &[6, 5], 3).unwrap();
    builder.backward("avg_loss").unwrap();
    let mut graph = builder.finish();
    let registry = OpRegistry::with_default_ops();

    infer_shapes(&mut graph, &registry).unwrap();
    let first: Vec<Vec<usize>> = graph.vars().map(|(_, v)| v.dims.clone()).collect();
    infer_shapes(&mut graph, &registry).unwrap();
    let second: Vec<Vec<usize>> = graph.vars().map(|(_, v)| v.dims.clone()).collect();
    assert_eq!(first, second);
}

#[test]
fn test_backward_covers_every_input() {
    let mut builder = new_builder();
    let x = builder.input("x", vec![4, 3], DType::F32).unwrap();
    builder.graph_mut().var_mut(x).need_backward = true;
    let h = builder
        .fully_connected("h", x, 5, true, Activation::Tanh)
        .unwrap();
    let y = builder
        .fully_connected("y", h, 2, true, Activation::Sigmoid)
        .unwrap();
    builder.mean(y, "avg").unwrap();
    let forward_ops = builder.graph().num_ops();
    assert_eq!(forward_ops, 5);

    builder.backward("avg").unwrap();
    let graph = builder.graph();
    let grad_types: Vec<&str> = graph.ops()[forward_ops..]
        .iter()
        .map(|op| op.op_type.as_str())
        .collect();
    assert_eq!(
        grad_types,
        vec!["mean_grad", "sigmoid_grad", "fc_grad", "tanh_grad", "fc_grad"]
    );

    for op in &graph.ops()[..forward_ops] {
        for id in op.inputs.iter().flatten() {
            let var = graph.var(*id);
            assert!(var.need_backward, "{} should need a gradient", var.name);
            let grad = graph.var_by_name(&grad_name(&var.name)).unwrap();
            assert_eq!(grad.dims, var.dims, "dims of {}", grad.name);
            assert_eq!(grad.dtype, var.dtype);
        }
    }
}

#[test]
fn test_descriptor_round_trip_naming() {
    let mut graph = Graph::new();
    let first = graph.create_or_get_var("W", vec![2, 3], true, DType::F32).unwrap();
    let second = graph.create_or_get_var("W", vec![4, 5], true, DType::F32).unwrap();
    assert_eq!(first, second);
    assert_eq!(graph.var(first).dims, vec![4, 5]);
    assert_eq!(graph.num_vars(), 1);

    assert!(matches!(
        graph.create_or_get_var_strict("W", vec![2, 3], true, DType::F32),
        Err(OpGraphError::ShapeMismatch { .. })
    ));
    assert!(graph
        .create_or_get_var_strict("W", vec![4, 5], true, DType::F32)
        .is_ok());
}

#[test]
fn test_absent_bias_matches_zero_bias() {
    let weights: Vec<f32> = pattern(12).iter().map(|v| v - 0.5).collect();
    let x = pattern(8);

    let mut engines = Vec::new();
    for with_bias in [false, true] {
        let mut builder = new_builder();
        let input = builder.input("x", vec![2, 4], DType::F32).unwrap();
        let out = builder
            .fully_connected("fc", input, 3, with_bias, Activation::None)
            .unwrap();
        builder.mean(out, "avg").unwrap();
        builder.backward("avg").unwrap();

        let mut engine = builder.into_engine(EngineConfig::new());
        engine.write_f32("x", &x).unwrap();
        engine.write_f32("fc.param.weight.0", &weights).unwrap();
        if with_bias {
            engine.write_f32("fc.param.bias", &[0.0; 3]).unwrap();
        }
        engine.reset_gradients().unwrap();
        engine.run().unwrap();
        engines.push(engine);
    }

    let (without, with) = (&engines[0], &engines[1]);
    assert_eq!(
        without.read_f32("fc.fc.output").unwrap(),
        with.read_f32("fc.fc.output").unwrap()
    );
    assert_eq!(
        without.read_f32("fc.param.weight.0.grad").unwrap(),
        with.read_f32("fc.param.weight.0.grad").unwrap()
    );

    let grad_op = without.graph().ops().last().unwrap();
    assert_eq!(grad_op.op_type, "fc_grad");
    assert_eq!(grad_op.inputs[3], None);
    assert_eq!(grad_op.outputs[2], None);
    assert!(without.graph().var_id("fc.param.bias.grad").is_none());
}
