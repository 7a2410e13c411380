//! # Execution engine
//!
//! The [`Engine`] owns a compiled [`Graph`] and the [`Workspace`] holding its
//! buffers, and runs the op list front to back on the CPU.
//!
//! Each [`Engine::run`] first re-runs shape inference and resource requests,
//! so input batch sizes may change between runs: resize the input
//! descriptors, write the new data and run again.

use std::ops::Range;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Uniform};

use crate::compiler::{infer_shapes, request_resources};
use crate::device::StorageDevice;
use crate::error::OpGraphError;
use crate::graph::{Graph, Op, VarId, VariableAttr};
use crate::registry::{OpMeta, OpRegistry};
use crate::tensor::Tensor;
use crate::types::DType;
use crate::workspace::Workspace;

/// Engine settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineConfig {
    /// Trace every executed op at debug level.
    pub debug: bool,
    /// Seed for [`Engine::randomize`]. `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl EngineConfig {
    pub fn new() -> Self {
        EngineConfig::default()
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Default filter of [`Engine::randomize_params`]: trainable parameters.
pub fn is_param(attr: &VariableAttr) -> bool {
    attr.is_param()
}

/// Default filter of [`Engine::reset_gradients`] and
/// [`Engine::print_gradient_means`]: gradient descriptors.
pub fn is_grad(attr: &VariableAttr) -> bool {
    attr.is_grad()
}

/// Kernels lock inputs for reading and outputs for writing, so a buffer bound
/// to two slots is only legal for the in-place pairs the op declares.
fn check_aliasing(
    meta: &OpMeta,
    inputs: &[Option<Tensor>],
    outputs: &[Option<Tensor>],
) -> Result<(), OpGraphError> {
    let aliased = |name: &str, first: String, second: String| OpGraphError::AliasedOperands {
        op_type: meta.op_type.clone(),
        name: name.to_string(),
        first,
        second,
    };
    for (o, out) in outputs.iter().enumerate() {
        let Some(out) = out else { continue };
        for (i, input) in inputs.iter().enumerate() {
            if let Some(input) = input {
                if out.shares_buffer(input) && !meta.allows_in_place(i, o) {
                    return Err(aliased(out.name(), format!("input {}", i), format!("output {}", o)));
                }
            }
        }
        for (other_index, other) in outputs.iter().enumerate().skip(o + 1) {
            if let Some(other) = other {
                if out.shares_buffer(other) {
                    return Err(aliased(
                        out.name(),
                        format!("output {}", o),
                        format!("output {}", other_index),
                    ));
                }
            }
        }
    }
    Ok(())
}

pub struct Engine {
    registry: Arc<OpRegistry>,
    graph: Graph,
    workspace: Workspace,
    config: EngineConfig,
    rng: StdRng,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("num_ops", &self.graph.num_ops())
            .field("num_vars", &self.graph.num_vars())
            .field("buffers", &self.workspace.len())
            .field("config", &self.config)
            .finish()
    }
}

impl Engine {
    pub fn new(graph: Graph, registry: Arc<OpRegistry>) -> Self {
        Engine::with_config(graph, registry, EngineConfig::default())
    }

    pub fn with_config(graph: Graph, registry: Arc<OpRegistry>, config: EngineConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Engine {
            registry,
            graph,
            workspace: Workspace::new(),
            config,
            rng,
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn workspace_mut(&mut self) -> &mut Workspace {
        &mut self.workspace
    }

    pub fn registry(&self) -> &Arc<OpRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn into_parts(self) -> (Graph, Workspace) {
        (self.graph, self.workspace)
    }

    /// Recomputes all shapes and makes sure every descriptor has a buffer.
    pub fn prepare(&mut self) -> Result<(), OpGraphError> {
        infer_shapes(&mut self.graph, &self.registry)?;
        request_resources(&self.graph, &mut self.workspace)
    }

    /// Runs the whole program.
    pub fn run(&mut self) -> Result<(), OpGraphError> {
        let num_ops = self.graph.num_ops();
        self.run_ops(0..num_ops)
    }

    /// Runs the ops in `range` after preparing the whole graph.
    pub fn run_ops(&mut self, range: Range<usize>) -> Result<(), OpGraphError> {
        self.prepare()?;
        let ops = self.graph.ops().get(range.clone()).ok_or_else(|| {
            OpGraphError::IndexOutOfBounds {
                index: range.end as i64,
                size: self.graph.num_ops(),
                operation: "Engine::run_ops".to_string(),
            }
        })?;
        for (offset, op) in ops.iter().enumerate() {
            self.execute(range.start + offset, op)?;
        }
        Ok(())
    }

    fn bind(&self, slots: &[Option<VarId>]) -> Result<Vec<Option<Tensor>>, OpGraphError> {
        slots
            .iter()
            .map(|slot| {
                slot.map(|id| self.workspace.tensor(self.graph.var(id)))
                    .transpose()
            })
            .collect()
    }

    fn execute(&self, index: usize, op: &Op) -> Result<(), OpGraphError> {
        let meta = self.registry.lookup(&op.op_type)?;
        let kernel = meta.kernel(StorageDevice::CPU)?;
        let inputs = self.bind(&op.inputs)?;
        let outputs = self.bind(&op.outputs)?;
        check_aliasing(meta, &inputs, &outputs)?;
        if self.config.debug {
            log::debug!(
                "op #{} '{}': {:?} -> {:?}",
                index,
                op.op_type,
                inputs.iter().map(|t| t.as_ref().map(Tensor::name)).collect::<Vec<_>>(),
                outputs.iter().map(|t| t.as_ref().map(Tensor::name)).collect::<Vec<_>>()
            );
        }
        kernel(&inputs, &outputs, &op.attrs)
    }

    /// Matching descriptors in name order.
    fn matching(&self, filter: &dyn Fn(&VariableAttr) -> bool) -> Vec<VariableAttr> {
        self.graph
            .sorted_names()
            .iter()
            .filter_map(|name| self.graph.var_by_name(name).ok())
            .filter(|attr| filter(*attr))
            .cloned()
            .collect()
    }

    /// Fills the buffers of matching F32 descriptors with uniform noise in
    /// `[-1, 1]`, creating them if needed. Returns how many were filled.
    pub fn randomize(&mut self, filter: impl Fn(&VariableAttr) -> bool) -> Result<usize, OpGraphError> {
        let dist = Uniform::new_inclusive(-1.0f32, 1.0f32);
        let mut count = 0;
        for attr in self.matching(&filter) {
            if attr.dtype != DType::F32 {
                log::warn!("randomize: skipping non-F32 tensor '{}'", attr.name);
                continue;
            }
            let tensor = self.workspace.get_tensor(&attr)?;
            let mut guard = tensor.write_data()?;
            for value in guard.as_mut_slice::<f32>()?.iter_mut() {
                *value = dist.sample(&mut self.rng);
            }
            count += 1;
        }
        log::info!("Randomized {} tensor(s)", count);
        Ok(count)
    }

    /// [`Engine::randomize`] over every trainable parameter.
    pub fn randomize_params(&mut self) -> Result<usize, OpGraphError> {
        self.randomize(is_param)
    }

    /// Creates or resizes the buffers of matching descriptors, then runs each
    /// descriptor's special reset or zero-fills it.
    pub fn reset_or_create_gradient(
        &mut self,
        filter: impl Fn(&VariableAttr) -> bool,
    ) -> Result<usize, OpGraphError> {
        let matched = self.matching(&filter);
        for attr in &matched {
            let tensor = self.workspace.get_tensor(attr)?;
            match &attr.special_reset {
                Some(reset) => reset(&tensor)?,
                None => tensor.write_data()?.fill_zero(),
            }
        }
        Ok(matched.len())
    }

    /// [`Engine::reset_or_create_gradient`] over every gradient descriptor.
    pub fn reset_gradients(&mut self) -> Result<usize, OpGraphError> {
        self.reset_or_create_gradient(is_grad)
    }

    /// Logs and returns the mean of every matching F32 buffer.
    pub fn print_mean(
        &self,
        filter: impl Fn(&VariableAttr) -> bool,
    ) -> Result<Vec<(String, f32)>, OpGraphError> {
        let mut means = Vec::new();
        for attr in self.matching(&filter) {
            if attr.dtype != DType::F32 {
                log::warn!("print_mean: skipping non-F32 tensor '{}'", attr.name);
                continue;
            }
            let values = match self.workspace.read_f32(&attr.name) {
                Ok(values) => values,
                Err(OpGraphError::MissingBuffer(_)) => continue,
                Err(e) => return Err(e),
            };
            let mean = if values.is_empty() {
                0.0
            } else {
                values.iter().sum::<f32>() / values.len() as f32
            };
            log::info!("{} = {}", attr.name, mean);
            means.push((attr.name, mean));
        }
        Ok(means)
    }

    /// [`Engine::print_mean`] over every gradient.
    pub fn print_gradient_means(&self) -> Result<Vec<(String, f32)>, OpGraphError> {
        self.print_mean(is_grad)
    }

    /// The tensor bound to `name`.
    pub fn tensor(&self, name: &str) -> Result<Tensor, OpGraphError> {
        self.workspace.tensor(self.graph.var_by_name(name)?)
    }

    pub fn read_f32(&self, name: &str) -> Result<Vec<f32>, OpGraphError> {
        self.workspace.read_f32(name)
    }

    /// Writes F32 data into the buffer of `name`, creating it from the
    /// descriptor's current dims if needed.
    pub fn write_f32(&mut self, name: &str, data: &[f32]) -> Result<(), OpGraphError> {
        let attr = self.graph.var_by_name(name)?.clone();
        self.workspace.get_or_create_buffer(&attr)?;
        self.workspace.write_f32(name, data)
    }

    pub fn write_i32(&mut self, name: &str, data: &[i32]) -> Result<(), OpGraphError> {
        let attr = self.graph.var_by_name(name)?.clone();
        self.workspace.get_or_create_buffer(&attr)?;
        self.workspace.write_i32(name, data)
    }

    /// Mean of the scalar-or-vector buffer `name`.
    pub fn mean_of(&self, name: &str) -> Result<f32, OpGraphError> {
        let values = self.read_f32(name)?;
        if values.is_empty() {
            return Ok(0.0);
        }
        Ok(values.iter().sum::<f32>() / values.len() as f32)
    }
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod tests;
