//! Symbolic computation graphs with reverse-mode autodiff compiled into the
//! graph itself, executed op by op on CPU buffers.
//!
//! Typical flow: build a [`Graph`] with a [`GraphBuilder`], append gradient
//! and optimizer ops, hand it to an [`Engine`], randomize parameters, reset
//! gradients and [`Engine::run`] once per step.

pub mod attr;
pub mod buffer;
pub mod builder;
pub mod compiler;
pub mod device;
pub mod engine;
pub mod grad_check;
pub mod graph;
pub mod ops;
pub mod registry;
pub mod tensor;
pub mod types;
pub mod workspace;

pub mod error;
pub use error::OpGraphError;

#[cfg(test)]
pub(crate) mod test_utils;

pub use attr::{AttrKind, AttrMap, AttrValue, AttributeMeta};
pub use builder::{Activation, GraphBuilder};
pub use compiler::{compile_graph, CompilerRegistry, PassContext};
pub use device::StorageDevice;
pub use engine::{Engine, EngineConfig};
pub use grad_check::{check_gradient, check_gradient_elements, GradCheckReport};
pub use graph::{Graph, Op, VarId, VariableAttr};
pub use registry::{OpMeta, OpRegistry};
pub use tensor::Tensor;
pub use types::DType;
pub use workspace::Workspace;
