//! Operator metadata and the registry that maps op type names to it.
//!
//! There is no global registry: build one [`OpRegistry`] at start-up (usually
//! with [`OpRegistry::with_default_ops`]) and share it by `Arc` with the
//! compiler passes and the engine. Tests can build isolated registries.

use std::collections::HashMap;

use crate::attr::{AttrMap, AttributeMeta};
use crate::device::StorageDevice;
use crate::error::OpGraphError;
use crate::graph::{Op, VarId, VariableAttr};
use crate::tensor::Tensor;

/// Computes one op on concrete tensors. Outputs are written through the
/// tensors' buffers; `None` entries are absent optional operands.
pub type KernelFn =
    fn(inputs: &[Option<Tensor>], outputs: &[Option<Tensor>], attrs: &AttrMap) -> Result<(), OpGraphError>;

/// Sets output dims from input dims. Receives descriptor snapshots; the pass
/// writes the output dims back into the graph.
pub type ShapeInferFn =
    fn(inputs: &[Option<VariableAttr>], outputs: &mut [Option<VariableAttr>]) -> Result<(), OpGraphError>;

/// Produces the gradient ops of one forward op.
///
/// Receives the forward inputs and outputs plus their gradient descriptors;
/// a gradient slot is `None` when no gradient flows through it.
pub type GradFn = fn(
    inputs: &[Option<VarId>],
    outputs: &[Option<VarId>],
    output_grads: &[Option<VarId>],
    input_grads: &[Option<VarId>],
) -> Result<Vec<Op>, OpGraphError>;

/// Everything the graph compiler and the engine need to know about one op type.
#[derive(Clone)]
pub struct OpMeta {
    pub op_type: String,
    pub shape_inferer: ShapeInferFn,
    pub grad: Option<GradFn>,
    pub attr_meta: Vec<AttributeMeta>,
    /// `(input, output)` slot pairs the kernel may run with aliased buffers.
    pub in_place: Vec<(usize, usize)>,
    kernels: [Option<KernelFn>; StorageDevice::COUNT],
}

impl std::fmt::Debug for OpMeta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let devices: Vec<StorageDevice> = [StorageDevice::CPU, StorageDevice::GPU]
            .into_iter()
            .filter(|d| self.kernels[d.index()].is_some())
            .collect();
        f.debug_struct("OpMeta")
            .field("op_type", &self.op_type)
            .field("differentiable", &self.grad.is_some())
            .field("attr_meta", &self.attr_meta)
            .field("in_place", &self.in_place)
            .field("kernels", &devices)
            .finish()
    }
}

impl OpMeta {
    pub fn new(op_type: impl Into<String>, shape_inferer: ShapeInferFn) -> Self {
        OpMeta {
            op_type: op_type.into(),
            shape_inferer,
            grad: None,
            attr_meta: Vec::new(),
            in_place: Vec::new(),
            kernels: [None; StorageDevice::COUNT],
        }
    }

    pub fn with_kernel(mut self, device: StorageDevice, kernel: KernelFn) -> Self {
        self.kernels[device.index()] = Some(kernel);
        self
    }

    pub fn with_grad(mut self, grad: GradFn) -> Self {
        self.grad = Some(grad);
        self
    }

    pub fn with_attr(mut self, meta: AttributeMeta) -> Self {
        self.attr_meta.push(meta);
        self
    }

    /// Declares that output `output` may share the buffer of input `input`.
    pub fn with_in_place(mut self, input: usize, output: usize) -> Self {
        self.in_place.push((input, output));
        self
    }

    pub fn allows_in_place(&self, input: usize, output: usize) -> bool {
        self.in_place.contains(&(input, output))
    }

    pub fn is_differentiable(&self) -> bool {
        self.grad.is_some()
    }

    pub fn kernel(&self, device: StorageDevice) -> Result<KernelFn, OpGraphError> {
        self.kernels[device.index()].ok_or_else(|| OpGraphError::MissingKernel {
            op_type: self.op_type.clone(),
            device,
        })
    }

    /// Runs every attribute meta's check against `attrs`.
    pub fn check_attrs(&self, attrs: &mut AttrMap) -> Result<(), OpGraphError> {
        for meta in &self.attr_meta {
            meta.check(&self.op_type, attrs)?;
        }
        Ok(())
    }
}

/// Maps op type names to their [`OpMeta`].
#[derive(Debug, Clone, Default)]
pub struct OpRegistry {
    metas: HashMap<String, OpMeta>,
}

impl OpRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        OpRegistry::default()
    }

    /// A registry holding the built-in operator library.
    pub fn with_default_ops() -> Self {
        let mut registry = OpRegistry::new();
        crate::ops::register_all(&mut registry);
        registry
    }

    /// Registers `meta` under its type name. Re-registering a name replaces
    /// the previous entry.
    pub fn register(&mut self, meta: OpMeta) {
        log::debug!("Registering op '{}'", meta.op_type);
        if self.metas.insert(meta.op_type.clone(), meta).is_some() {
            log::debug!("Op was already registered; previous meta replaced");
        }
    }

    pub fn lookup(&self, op_type: &str) -> Result<&OpMeta, OpGraphError> {
        self.metas
            .get(op_type)
            .ok_or_else(|| OpGraphError::UnknownOpType(op_type.to_string()))
    }

    pub fn contains(&self, op_type: &str) -> bool {
        self.metas.contains_key(op_type)
    }

    pub fn len(&self) -> usize {
        self.metas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metas.is_empty()
    }

    /// Registered type names, sorted.
    pub fn op_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.metas.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Validates that `op` has a registered type and default-fills/checks its
    /// attributes. Called once per op before it joins a graph.
    pub fn finalize_op(&self, op: &mut Op) -> Result<(), OpGraphError> {
        let meta = self.lookup(&op.op_type)?;
        meta.check_attrs(&mut op.attrs)
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
