//! Trains a small classifier on synthetic clustered data.
//!
//! Run with `RUST_LOG=info` to see per-epoch progress.

use std::sync::Arc;

use opgraph_core::{
    Activation, AttrMap, AttrValue, DType, EngineConfig, GraphBuilder, OpGraphError, OpRegistry,
};
use opgraph_data::{feed_engine, BatchLoader, BatchLoaderConfig, LabeledDataset, RandomSampler};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const FEATURES: usize = 16;
const CLASSES: usize = 4;
const SAMPLES: usize = 512;
const BATCH: usize = 32;
const EPOCHS: usize = 20;

/// Points scattered around one random center per class.
fn synthetic_dataset(seed: u64) -> Result<LabeledDataset, OpGraphError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let centers: Vec<Vec<f32>> = (0..CLASSES)
        .map(|_| (0..FEATURES).map(|_| rng.gen_range(-1.0..1.0)).collect())
        .collect();

    let mut features = Vec::with_capacity(SAMPLES * FEATURES);
    let mut labels = Vec::with_capacity(SAMPLES);
    for i in 0..SAMPLES {
        let class = i % CLASSES;
        for &c in &centers[class] {
            features.push(c + rng.gen_range(-0.3..0.3));
        }
        labels.push(class as i32);
    }
    LabeledDataset::new(features, labels, FEATURES)
}

fn main() -> Result<(), OpGraphError> {
    env_logger::init();

    let mut builder = GraphBuilder::new(Arc::new(OpRegistry::with_default_ops()));
    let x = builder.input("x", vec![BATCH, FEATURES], DType::F32)?;
    let label = builder.input("label", vec![BATCH], DType::I32)?;
    let h = builder.fully_connected("fc1", x, 32, true, Activation::Sigmoid)?;
    let h = builder.fully_connected("fc2", h, 32, true, Activation::Sigmoid)?;
    let prob = builder.fully_connected("classifier", h, CLASSES, true, Activation::Softmax)?;
    let loss = builder.cross_entropy(prob, label, "loss")?;
    builder.mean(loss, "avg_loss")?;
    builder.error_rate(prob, label, "error")?;
    builder.backward("avg_loss")?;

    let mut attrs = AttrMap::new();
    attrs.insert("learning_rate".to_string(), AttrValue::Float(0.5));
    let updates = builder.optimizer("sgd", attrs)?;
    log::info!("Graph has {} ops, {} parameter updates", builder.graph().num_ops(), updates);

    let mut engine = builder.into_engine(EngineConfig::new().with_seed(42));
    engine.randomize_params()?;

    let mut loader = BatchLoader::new(
        synthetic_dataset(7)?,
        RandomSampler::with_seed(1),
        BatchLoaderConfig::new(BATCH),
    )?;

    for epoch in 0..EPOCHS {
        loader.reset();
        let (mut loss_sum, mut error_sum, mut batches) = (0.0, 0.0, 0);
        for batch in loader.by_ref() {
            let batch = batch?;
            feed_engine(&mut engine, &batch, "x", "label")?;
            engine.reset_gradients()?;
            engine.run()?;
            loss_sum += engine.mean_of("avg_loss")?;
            error_sum += engine.mean_of("error")?;
            batches += 1;
        }
        log::info!(
            "epoch {:>2}: loss {:.4}, error rate {:.3}",
            epoch,
            loss_sum / batches as f32,
            error_sum / batches as f32
        );
    }

    engine.print_gradient_means()?;
    Ok(())
}
