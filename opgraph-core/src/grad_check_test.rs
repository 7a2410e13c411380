use super::*;
use crate::builder::{Activation, GraphBuilder};
use crate::engine::EngineConfig;
use crate::test_utils::{classifier, registry};
use crate::types::DType;
use approx::assert_relative_eq;

fn tanh_engine() -> Engine {
    let mut builder = GraphBuilder::new(registry());
    let x = builder.input("x", vec![3, 4], DType::F32).unwrap();
    let y = builder
        .fully_connected("layer", x, 2, true, Activation::Tanh)
        .unwrap();
    builder.mean(y, "avg").unwrap();
    builder.backward("avg").unwrap();

    let mut engine = builder.into_engine(EngineConfig::new().with_seed(11));
    engine.randomize_params().unwrap();
    let x: Vec<f32> = (0..12).map(|i| (i as f32 - 6.0) / 6.0).collect();
    engine.write_f32("x", &x).unwrap();
    engine
}

#[test]
fn test_relative_error() {
    assert_relative_eq!(relative_error(1.0, 1.0), 0.0);
    assert_relative_eq!(relative_error(0.0, 0.0), 0.0);
    assert_relative_eq!(relative_error(1.0, 0.5), 0.5);
    assert_relative_eq!(relative_error(-2.0, 2.0), 2.0);
}

#[test]
fn test_tanh_layer_gradients_match() {
    let mut engine = tanh_engine();
    for param in ["layer.param.weight.0", "layer.param.bias"] {
        let report = check_gradient(&mut engine, param, "avg", 1e-2).unwrap();
        assert_eq!(report.param, param);
        assert_eq!(report.indices.len(), report.analytic.len());
        assert!(report.all_close(1e-3, 1e-2), "{:?}", report);
    }
}

#[test]
fn test_classifier_gradients_match() {
    let mut builder = classifier();
    builder.backward("avg_loss").unwrap();
    let mut engine = builder.into_engine(EngineConfig::new().with_seed(3));
    engine.randomize_params().unwrap();
    engine
        .write_f32(
            "x",
            &[0.5, -0.2, 0.1, 0.3, 0.8, -0.6, -0.4, 0.2, 0.9, 0.0, -0.7, 0.4],
        )
        .unwrap();
    engine.write_i32("label", &[0, 1, 1, 0]).unwrap();

    for param in ["out.param.weight.0", "hidden.param.bias"] {
        let report = check_gradient(&mut engine, param, "avg_loss", 1e-2).unwrap();
        assert!(report.all_close(1e-3, 5e-2), "{:?}", report);
    }
}

#[test]
fn test_parameter_is_restored() {
    let mut engine = tanh_engine();
    let before = engine.read_f32("layer.param.weight.0").unwrap();
    let report = check_gradient_elements(&mut engine, "layer.param.weight.0", "avg", 1e-2, &[0, 5])
        .unwrap();
    assert_eq!(report.indices, vec![0, 5]);
    assert_eq!(report.numeric.len(), 2);
    assert_eq!(engine.read_f32("layer.param.weight.0").unwrap(), before);
}

#[test]
fn test_bad_arguments() {
    let mut engine = tanh_engine();
    assert!(matches!(
        check_gradient_elements(&mut engine, "layer.param.bias", "avg", 1e-2, &[2]),
        Err(OpGraphError::IndexOutOfBounds { index: 2, size: 2, .. })
    ));
    assert!(matches!(
        check_gradient(&mut engine, "layer.param.bias", "x", 1e-2),
        Err(OpGraphError::InternalError(_))
    ));
    assert_eq!(
        check_gradient(&mut engine, "missing", "avg", 1e-2).unwrap_err(),
        OpGraphError::UnknownTensor("missing".to_string())
    );
}
