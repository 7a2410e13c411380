//! Convenience layer for assembling training graphs.
//!
//! [`GraphBuilder`] creates descriptors, finalizes every op against the
//! registry and infers its output shape as soon as it is added, so shape
//! errors surface at the call that introduced them.

use std::sync::Arc;

use crate::attr::AttrMap;
use crate::compiler::shape::{infer_op_shape, infer_shapes};
use crate::compiler::{add_optimizer_ops, build_backward};
use crate::engine::{Engine, EngineConfig};
use crate::error::OpGraphError;
use crate::graph::{Graph, Op, VarId};
use crate::ops::{cross_entropy, error_rate, fc, mean, sigmoid, softmax, tanh};
use crate::registry::OpRegistry;
use crate::types::DType;

/// Activation applied after a fully connected layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Sigmoid,
    Tanh,
    Softmax,
    None,
}

impl Activation {
    fn op_type(&self) -> Option<&'static str> {
        match self {
            Activation::Sigmoid => Some(sigmoid::SIGMOID),
            Activation::Tanh => Some(tanh::TANH),
            Activation::Softmax => Some(softmax::SOFTMAX),
            Activation::None => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GraphBuilder {
    graph: Graph,
    registry: Arc<OpRegistry>,
}

impl GraphBuilder {
    pub fn new(registry: Arc<OpRegistry>) -> Self {
        GraphBuilder::from_graph(Graph::new(), registry)
    }

    /// Continues building on an existing graph.
    pub fn from_graph(graph: Graph, registry: Arc<OpRegistry>) -> Self {
        GraphBuilder { graph, registry }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    pub fn registry(&self) -> &Arc<OpRegistry> {
        &self.registry
    }

    pub fn finish(self) -> Graph {
        self.graph
    }

    /// Hands the graph and registry to a new [`Engine`].
    pub fn into_engine(self, config: EngineConfig) -> Engine {
        Engine::with_config(self.graph, self.registry, config)
    }

    /// A data input. Inputs never need gradients; re-declaring one resizes it.
    pub fn input(&mut self, name: &str, dims: Vec<usize>, dtype: DType) -> Result<VarId, OpGraphError> {
        self.graph.create_or_get_var(name, dims, false, dtype)
    }

    /// A trainable F32 parameter. An existing parameter must already have
    /// `dims`.
    pub fn param(&mut self, name: &str, dims: Vec<usize>) -> Result<VarId, OpGraphError> {
        self.graph.create_or_get_var_strict(name, dims, true, DType::F32)
    }

    /// An op output. It needs a gradient when any of `inputs` does; its dims
    /// are filled in by shape inference.
    ///
    /// # Errors
    /// `UnknownTensor` if an input id does not belong to this graph.
    pub fn output(
        &mut self,
        name: &str,
        inputs: &[Option<VarId>],
        dtype: DType,
    ) -> Result<VarId, OpGraphError> {
        let mut need_backward = false;
        for id in inputs.iter().flatten() {
            need_backward |= self.graph.try_var(*id)?.need_backward;
        }
        self.graph.create_or_get_var(name, Vec::new(), need_backward, dtype)
    }

    /// Finalizes an op, appends it and infers its output dims.
    pub fn add_op(
        &mut self,
        op_type: &str,
        inputs: Vec<Option<VarId>>,
        outputs: Vec<Option<VarId>>,
        attrs: AttrMap,
    ) -> Result<(), OpGraphError> {
        let mut op = Op::new(op_type, inputs, outputs).with_attrs(attrs);
        self.registry.finalize_op(&mut op)?;
        self.graph.validate_op(&op)?;
        infer_op_shape(&mut self.graph, &self.registry, &op)?;
        self.graph.push_op(op)
    }

    fn unary(&mut self, op_type: &str, input: VarId, name: &str) -> Result<VarId, OpGraphError> {
        let out = self.output(name, &[Some(input)], DType::F32)?;
        self.add_op(op_type, vec![Some(input)], vec![Some(out)], AttrMap::new())?;
        Ok(out)
    }

    /// `<prefix>.output = activation(input · <prefix>.param.weight.0 + <prefix>.param.bias)`
    ///
    /// Without an activation the layer's output is `<prefix>.fc.output`.
    pub fn fully_connected(
        &mut self,
        prefix: &str,
        input: VarId,
        size: usize,
        with_bias: bool,
        activation: Activation,
    ) -> Result<VarId, OpGraphError> {
        let in_dims = self.graph.try_var(input)?.dims.clone();
        if in_dims.len() != 2 {
            return Err(OpGraphError::DimensionMismatch {
                expected: 2,
                actual: in_dims.len(),
                operation: format!("fully_connected({})", prefix),
            });
        }

        let weight = self.param(&format!("{}.param.weight.0", prefix), vec![in_dims[1], size])?;
        let bias = if with_bias {
            Some(self.param(&format!("{}.param.bias", prefix), vec![size, 1])?)
        } else {
            None
        };
        let inputs = vec![Some(input), Some(weight), bias];
        let fc_out = self.output(&format!("{}.fc.output", prefix), &inputs, DType::F32)?;
        self.add_op(fc::FC, inputs, vec![Some(fc_out)], AttrMap::new())?;

        match activation.op_type() {
            Some(op_type) => self.unary(op_type, fc_out, &format!("{}.output", prefix)),
            None => Ok(fc_out),
        }
    }

    /// Per-sample loss `[n, 1]` of `prob` against integer `label`.
    pub fn cross_entropy(&mut self, prob: VarId, label: VarId, name: &str) -> Result<VarId, OpGraphError> {
        let inputs = vec![Some(prob), Some(label)];
        let out = self.output(name, &inputs, DType::F32)?;
        self.add_op(cross_entropy::CROSS_ENTROPY, inputs, vec![Some(out)], AttrMap::new())?;
        Ok(out)
    }

    /// Classification error `[1, 1]`. Its output never needs a gradient.
    pub fn error_rate(&mut self, prob: VarId, label: VarId, name: &str) -> Result<VarId, OpGraphError> {
        self.graph.try_var(prob)?;
        self.graph.try_var(label)?;
        let out = self.output(name, &[], DType::F32)?;
        self.add_op(
            error_rate::ERROR_RATE,
            vec![Some(prob), Some(label)],
            vec![Some(out)],
            AttrMap::new(),
        )?;
        Ok(out)
    }

    pub fn mean(&mut self, input: VarId, name: &str) -> Result<VarId, OpGraphError> {
        self.unary(mean::MEAN, input, name)
    }

    /// Appends the gradient ops of `loss` and infers their shapes.
    pub fn backward(&mut self, loss: &str) -> Result<(), OpGraphError> {
        build_backward(&mut self.graph, &self.registry, loss, None)?;
        infer_shapes(&mut self.graph, &self.registry)
    }

    /// Appends one `optimizer` update op per parameter gradient.
    pub fn optimizer(&mut self, optimizer: &str, attrs: AttrMap) -> Result<usize, OpGraphError> {
        add_optimizer_ops(&mut self.graph, &self.registry, optimizer, &attrs)
    }
}

#[cfg(test)]
#[path = "builder_test.rs"]
mod tests;
