use std::sync::Arc;

use approx::assert_relative_eq;

use opgraph_core::{Activation, AttrMap, AttrValue, DType, EngineConfig, GraphBuilder, OpRegistry};
use opgraph_data::{feed_engine, BatchLoader, BatchLoaderConfig, LabeledDataset, RandomSampler};

/// Two well separated clusters in 4 dimensions.
fn clusters(rows: usize) -> LabeledDataset {
    let mut features = Vec::with_capacity(rows * 4);
    let mut labels = Vec::with_capacity(rows);
    for i in 0..rows {
        let class = (i % 2) as i32;
        let sign = if class == 0 { 1.0 } else { -1.0 };
        let jitter = (i % 5) as f32 * 0.05;
        features.extend_from_slice(&[sign * (0.8 + jitter), sign * 0.5, -sign * 0.3, jitter]);
        labels.push(class);
    }
    LabeledDataset::new(features, labels, 4).unwrap()
}

#[test]
fn test_epochs_reduce_the_loss() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut builder = GraphBuilder::new(Arc::new(OpRegistry::with_default_ops()));
    let x = builder.input("x", vec![8, 4], DType::F32).unwrap();
    let label = builder.input("label", vec![8], DType::I32).unwrap();
    let h = builder
        .fully_connected("hidden", x, 6, true, Activation::Tanh)
        .unwrap();
    let prob = builder
        .fully_connected("out", h, 2, true, Activation::Softmax)
        .unwrap();
    let loss = builder.cross_entropy(prob, label, "loss").unwrap();
    builder.mean(loss, "avg_loss").unwrap();
    builder.error_rate(prob, label, "error").unwrap();
    builder.backward("avg_loss").unwrap();
    let mut attrs = AttrMap::new();
    attrs.insert("learning_rate".to_string(), AttrValue::Float(0.2));
    builder.optimizer("sgd", attrs).unwrap();

    let mut engine = builder.into_engine(EngineConfig::new().with_seed(9));
    engine.randomize_params().unwrap();

    let config = BatchLoaderConfig::new(8);
    let mut loader = BatchLoader::new(clusters(30), RandomSampler::with_seed(4), config).unwrap();
    assert_eq!(loader.num_batches(), 4);

    let mut epoch_losses = Vec::new();
    let mut last_error = 1.0;
    for _ in 0..15 {
        loader.reset();
        let mut total = 0.0;
        let mut batches = 0;
        for batch in loader.by_ref() {
            let batch = batch.unwrap();
            feed_engine(&mut engine, &batch, "x", "label").unwrap();
            engine.reset_gradients().unwrap();
            engine.run().unwrap();
            total += engine.mean_of("avg_loss").unwrap();
            last_error = engine.mean_of("error").unwrap();
            batches += 1;
        }
        assert_eq!(batches, 4);
        epoch_losses.push(total / batches as f32);
    }

    assert!(
        epoch_losses[epoch_losses.len() - 1] < epoch_losses[0],
        "{:?}",
        epoch_losses
    );
    assert!((0.0..=1.0).contains(&last_error));

    let losses = engine.read_f32("loss").unwrap();
    let mean = losses.iter().sum::<f32>() / losses.len() as f32;
    assert_relative_eq!(engine.mean_of("avg_loss").unwrap(), mean, epsilon = 1e-5);
}
