use super::*;

#[test]
fn test_create_or_get_var_resizes_existing() {
    let mut graph = Graph::new();
    let first = graph
        .create_or_get_var("W", vec![3, 4], true, DType::F32)
        .unwrap();
    let second = graph
        .create_or_get_var("W", vec![5, 4], true, DType::F32)
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(graph.num_vars(), 1);
    assert_eq!(graph.var(first).dims, vec![5, 4]);
}

#[test]
fn test_create_or_get_var_strict_requires_same_dims() {
    let mut graph = Graph::new();
    let id = graph
        .create_or_get_var_strict("W", vec![3, 4], true, DType::F32)
        .unwrap();
    assert_eq!(
        graph
            .create_or_get_var_strict("W", vec![3, 4], true, DType::F32)
            .unwrap(),
        id
    );

    match graph.create_or_get_var_strict("W", vec![2, 4], true, DType::F32) {
        Err(OpGraphError::ShapeMismatch {
            expected, actual, ..
        }) => {
            assert_eq!(expected, vec![3, 4]);
            assert_eq!(actual, vec![2, 4]);
        }
        other => panic!("Expected ShapeMismatch, got {:?}", other),
    }
    // The failed call must not have touched the descriptor.
    assert_eq!(graph.var(id).dims, vec![3, 4]);
}

#[test]
fn test_create_or_get_var_rejects_dtype_change() {
    let mut graph = Graph::new();
    graph
        .create_or_get_var("label", vec![10], false, DType::I32)
        .unwrap();
    assert!(matches!(
        graph.create_or_get_var("label", vec![10], false, DType::F32),
        Err(OpGraphError::TensorTypeMismatch { .. })
    ));
}

#[test]
fn test_lookup_unknown_name() {
    let graph = Graph::new();
    assert_eq!(
        graph.lookup("missing"),
        Err(OpGraphError::UnknownTensor("missing".to_string()))
    );
    assert!(graph.var_id("missing").is_none());
}

#[test]
fn test_push_op_validates_ids() {
    let mut graph = Graph::new();
    let x = graph.create_or_get_var("x", vec![2, 2], false, DType::F32).unwrap();
    let y = graph.create_or_get_var("y", vec![2, 2], true, DType::F32).unwrap();
    graph
        .push_op(Op::new("sigmoid", vec![Some(x)], vec![Some(y)]))
        .unwrap();
    assert_eq!(graph.num_ops(), 1);

    let dangling = VarId(42);
    assert_eq!(
        graph.try_var(dangling).unwrap_err(),
        OpGraphError::UnknownTensor("%42".to_string())
    );
    assert_eq!(graph.try_var(x).unwrap().name, "x");
    assert!(matches!(
        graph.push_op(Op::new("sigmoid", vec![Some(dangling)], vec![Some(y)])),
        Err(OpGraphError::UnknownTensor(_))
    ));
    assert_eq!(graph.num_ops(), 1);
}

#[test]
fn test_null_slots_are_allowed() {
    let mut graph = Graph::new();
    let x = graph.create_or_get_var("x", vec![2, 3], false, DType::F32).unwrap();
    let w = graph
        .create_or_get_var("fc.param.weight.0", vec![3, 4], true, DType::F32)
        .unwrap();
    let o = graph.create_or_get_var("o", vec![0], true, DType::F32).unwrap();
    graph
        .push_op(Op::new("fc", vec![Some(x), Some(w), None], vec![Some(o)]))
        .unwrap();

    let snapshot = graph.snapshot(&graph.ops()[0].inputs);
    assert_eq!(snapshot.len(), 3);
    assert_eq!(snapshot[1].as_ref().map(|v| v.name.as_str()), Some("fc.param.weight.0"));
    assert!(snapshot[2].is_none());
}

#[test]
fn test_name_conventions() {
    assert_eq!(grad_name("fc1.param.bias"), "fc1.param.bias.grad");
    assert!(is_param_name("fc1.param.bias"));
    assert!(!is_param_name("fc1.param.bias.grad"));
    assert!(!is_param_name("fc1.output"));
    assert!(is_grad_name("fc1.output.grad"));
}

#[test]
fn test_sorted_names() {
    let mut graph = Graph::new();
    for name in ["b", "a", "c"] {
        graph.create_or_get_var(name, vec![1], false, DType::F32).unwrap();
    }
    assert_eq!(graph.sorted_names(), vec!["a", "b", "c"]);
}
