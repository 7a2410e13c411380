//! # Graph compiler passes
//!
//! A compiler pass is a named function that rewrites a [`Graph`] in place:
//! shape inference, gradient-op generation, optimizer injection and buffer
//! allocation. Passes are looked up by name in a [`CompilerRegistry`] and run
//! in sequence by [`CompilerRegistry::compile_graph`].
//!
//! Every pass receives a [`PassContext`] carrying the op registry, an
//! attribute bag (e.g. `loss_name` for `backward`) and, for
//! `request_resource`, the workspace to allocate into.

use std::collections::HashMap;

use crate::attr::{AttrMap, AttrValue};
use crate::error::OpGraphError;
use crate::graph::Graph;
use crate::registry::OpRegistry;
use crate::workspace::Workspace;

pub mod backward;
pub mod optimizer;
pub mod resource;
pub mod shape;

pub use backward::build_backward;
pub use optimizer::add_optimizer_ops;
pub use resource::request_resources;
pub use shape::infer_shapes;

pub const INFER_SHAPE: &str = "infer_shape";
pub const BACKWARD: &str = "backward";
pub const OPTIMIZER: &str = "optimizer";
pub const REQUEST_RESOURCE: &str = "request_resource";

/// A graph rewriting pass.
pub type CompilerFn = fn(&mut Graph, &mut PassContext<'_>) -> Result<(), OpGraphError>;

/// Everything a pass may consult besides the graph itself.
pub struct PassContext<'a> {
    pub registry: &'a OpRegistry,
    pub attrs: AttrMap,
    workspace: Option<&'a mut Workspace>,
}

impl<'a> PassContext<'a> {
    pub fn new(registry: &'a OpRegistry) -> Self {
        PassContext {
            registry,
            attrs: AttrMap::new(),
            workspace: None,
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn with_attrs(mut self, attrs: AttrMap) -> Self {
        self.attrs.extend(attrs);
        self
    }

    pub fn with_workspace(mut self, workspace: &'a mut Workspace) -> Self {
        self.workspace = Some(workspace);
        self
    }

    /// The workspace, required by `pass`.
    pub fn workspace_mut(&mut self, pass: &str) -> Result<&mut Workspace, OpGraphError> {
        self.workspace
            .as_deref_mut()
            .ok_or_else(|| OpGraphError::MissingWorkspace(pass.to_string()))
    }
}

/// Named compiler passes.
#[derive(Clone, Default)]
pub struct CompilerRegistry {
    passes: HashMap<String, CompilerFn>,
}

impl std::fmt::Debug for CompilerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompilerRegistry")
            .field("passes", &self.names())
            .finish()
    }
}

impl CompilerRegistry {
    pub fn new() -> Self {
        CompilerRegistry::default()
    }

    /// A registry with `infer_shape`, `backward`, `optimizer` and
    /// `request_resource`.
    pub fn with_default_passes() -> Self {
        let mut registry = CompilerRegistry::new();
        registry.register(INFER_SHAPE, shape::infer_shape_pass);
        registry.register(BACKWARD, backward::backward_pass);
        registry.register(OPTIMIZER, optimizer::optimizer_pass);
        registry.register(REQUEST_RESOURCE, resource::request_resource_pass);
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, pass: CompilerFn) {
        let name = name.into();
        log::debug!("Registering compiler pass '{}'", name);
        self.passes.insert(name, pass);
    }

    pub fn lookup(&self, name: &str) -> Result<CompilerFn, OpGraphError> {
        self.passes
            .get(name)
            .copied()
            .ok_or_else(|| OpGraphError::UnknownCompilerPass(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.passes.contains_key(name)
    }

    /// Registered pass names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.passes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Runs the named passes in order. Every name is resolved before the
    /// first pass runs, so an unknown name leaves the graph untouched.
    pub fn compile_graph(
        &self,
        graph: &mut Graph,
        names: &[&str],
        ctx: &mut PassContext<'_>,
    ) -> Result<(), OpGraphError> {
        let passes = names
            .iter()
            .map(|name| self.lookup(name).map(|pass| (*name, pass)))
            .collect::<Result<Vec<_>, _>>()?;
        for (name, pass) in passes {
            log::debug!("Running compiler pass '{}' on {} ops", name, graph.num_ops());
            pass(graph, ctx)?;
        }
        Ok(())
    }
}

/// Runs the named built-in passes in order.
pub fn compile_graph(
    graph: &mut Graph,
    names: &[&str],
    ctx: &mut PassContext<'_>,
) -> Result<(), OpGraphError> {
    CompilerRegistry::with_default_passes().compile_graph(graph, names, ctx)
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
