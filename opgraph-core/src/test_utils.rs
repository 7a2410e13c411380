//! Helpers shared by the unit tests: standalone tensors with their own
//! buffers and a small reference graph.

use std::sync::{Arc, RwLock};

use crate::buffer::{Buffer, Element};
use crate::builder::{Activation, GraphBuilder};
use crate::graph::VariableAttr;
use crate::registry::OpRegistry;
use crate::tensor::Tensor;
use crate::types::DType;

pub(crate) fn attr_f32(name: &str, dims: &[usize]) -> VariableAttr {
    VariableAttr::new(name, dims.to_vec(), DType::F32, false)
}

pub(crate) fn zeros(name: &str, dims: &[usize], dtype: DType) -> Tensor {
    let attr = VariableAttr::new(name, dims.to_vec(), dtype, false);
    let buffer = Buffer::zeros(name, dtype, attr.numel());
    Tensor::new(attr, Arc::new(RwLock::new(buffer)))
}

fn filled<T: Element>(name: &str, dims: &[usize], data: &[T]) -> Tensor {
    let tensor = zeros(name, dims, T::DTYPE);
    {
        let mut guard = tensor.write_data().unwrap();
        guard.as_mut_slice::<T>().unwrap().copy_from_slice(data);
    }
    tensor
}

pub(crate) fn tensor_f32(name: &str, dims: &[usize], data: &[f32]) -> Tensor {
    filled(name, dims, data)
}

pub(crate) fn tensor_i32(name: &str, dims: &[usize], data: &[i32]) -> Tensor {
    filled(name, dims, data)
}

pub(crate) fn zeros_f32(name: &str, dims: &[usize]) -> Tensor {
    zeros(name, dims, DType::F32)
}

pub(crate) fn registry() -> Arc<OpRegistry> {
    Arc::new(OpRegistry::with_default_ops())
}

/// `x[4, 3] -> fc(5, sigmoid) -> fc(2, softmax) -> cross_entropy -> mean`,
/// six forward ops with `avg_loss` as the scalar loss.
pub(crate) fn classifier() -> GraphBuilder {
    let mut builder = GraphBuilder::new(registry());
    let x = builder.input("x", vec![4, 3], DType::F32).unwrap();
    let label = builder.input("label", vec![4], DType::I32).unwrap();
    let hidden = builder
        .fully_connected("hidden", x, 5, true, Activation::Sigmoid)
        .unwrap();
    let prob = builder
        .fully_connected("out", hidden, 2, true, Activation::Softmax)
        .unwrap();
    let loss = builder.cross_entropy(prob, label, "loss").unwrap();
    builder.mean(loss, "avg_loss").unwrap();
    builder
}
