use std::sync::Arc;

use opgraph_core::{Activation, DType, GraphBuilder, OpGraphError, OpRegistry, VarId};

#[allow(dead_code)]
pub(crate) fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[allow(dead_code)]
pub(crate) fn new_builder() -> GraphBuilder {
    GraphBuilder::new(Arc::new(OpRegistry::with_default_ops()))
}

/// Deterministic inputs in `[0.1, 1.0]`.
#[allow(dead_code)]
pub(crate) fn pattern(len: usize) -> Vec<f32> {
    (0..len).map(|i| 0.1 + ((i * 7) % 10) as f32 / 10.0).collect()
}

/// `x[batch, features] -> sigmoid layers... -> fc(classes, softmax) ->
/// cross_entropy(label) -> mean`, returning the builder with `avg_loss` as
/// the scalar loss.
#[allow(dead_code)]
pub(crate) fn mlp(
    batch: usize,
    features: usize,
    hidden: &[usize],
    classes: usize,
) -> Result<GraphBuilder, OpGraphError> {
    let mut builder = new_builder();
    let mut h: VarId = builder.input("x", vec![batch, features], DType::F32)?;
    let label = builder.input("label", vec![batch], DType::I32)?;
    for (i, &size) in hidden.iter().enumerate() {
        h = builder.fully_connected(&format!("fc{}", i), h, size, true, Activation::Sigmoid)?;
    }
    let prob = builder.fully_connected("classifier", h, classes, true, Activation::Softmax)?;
    let loss = builder.cross_entropy(prob, label, "loss")?;
    builder.mean(loss, "avg_loss")?;
    Ok(builder)
}
