//! Symbolic data model: tensor descriptors, op invocations and the graph that
//! owns both.
//!
//! Descriptors live in an arena inside [`Graph`] and are addressed by a stable
//! [`VarId`]. Ops only store ids, so the same descriptor can appear in many op
//! slots (a parameter read by `fc` and rewritten by `sgd`, a gradient written by
//! one grad op and read by the next) without any shared ownership.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::attr::{AttrMap, AttrValue};
use crate::error::OpGraphError;
use crate::tensor::Tensor;
use crate::types::{numel, DType};

/// Suffix appended to a descriptor name to name its gradient.
pub const GRAD_SUFFIX: &str = ".grad";
/// Marker that identifies trainable parameters by name.
pub const PARAM_MARKER: &str = ".param";

/// Overrides the default zero-fill applied by `Engine::reset_or_create_gradient`.
pub type ResetFn = Arc<dyn Fn(&Tensor) -> Result<(), OpGraphError> + Send + Sync>;

/// Stable index of a descriptor in its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub(crate) usize);

impl VarId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Symbolic tensor descriptor: name, shape, element type and whether gradients
/// flow through it. Holds no storage.
#[derive(Clone)]
pub struct VariableAttr {
    pub name: String,
    pub dims: Vec<usize>,
    pub dtype: DType,
    pub need_backward: bool,
    pub special_reset: Option<ResetFn>,
}

impl VariableAttr {
    pub fn new(name: impl Into<String>, dims: Vec<usize>, dtype: DType, need_backward: bool) -> Self {
        VariableAttr {
            name: name.into(),
            dims,
            dtype,
            need_backward,
            special_reset: None,
        }
    }

    pub fn numel(&self) -> usize {
        numel(&self.dims)
    }

    pub fn same_name_and_type(&self, other: &VariableAttr) -> bool {
        self.name == other.name && self.dtype == other.dtype
    }

    pub fn is_param(&self) -> bool {
        is_param_name(&self.name)
    }

    pub fn is_grad(&self) -> bool {
        is_grad_name(&self.name)
    }
}

impl fmt::Debug for VariableAttr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariableAttr")
            .field("name", &self.name)
            .field("dims", &self.dims)
            .field("dtype", &self.dtype)
            .field("need_backward", &self.need_backward)
            .field("special_reset", &self.special_reset.is_some())
            .finish()
    }
}

impl PartialEq for VariableAttr {
    /// Two descriptors are equal when name, type and dims agree. The reset
    /// override is not part of the identity.
    fn eq(&self, other: &Self) -> bool {
        self.same_name_and_type(other) && self.dims == other.dims
    }
}

/// Name of the gradient descriptor of `name`.
pub fn grad_name(name: &str) -> String {
    format!("{}{}", name, GRAD_SUFFIX)
}

/// Trainable parameter (not its gradient).
pub fn is_param_name(name: &str) -> bool {
    name.contains(PARAM_MARKER) && !name.contains(GRAD_SUFFIX)
}

pub fn is_grad_name(name: &str) -> bool {
    name.contains(GRAD_SUFFIX)
}

/// One operator invocation. `None` in a slot means the optional operand is
/// absent (e.g. `fc` without bias).
#[derive(Debug, Clone, PartialEq)]
pub struct Op {
    pub op_type: String,
    pub inputs: Vec<Option<VarId>>,
    pub outputs: Vec<Option<VarId>>,
    pub attrs: AttrMap,
}

impl Op {
    pub fn new(
        op_type: impl Into<String>,
        inputs: Vec<Option<VarId>>,
        outputs: Vec<Option<VarId>>,
    ) -> Self {
        Op {
            op_type: op_type.into(),
            inputs,
            outputs,
            attrs: AttrMap::new(),
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
}

/// The computation graph: a descriptor arena plus an ordered op list.
///
/// The op list is the program. Producers must precede consumers; nothing in the
/// graph reorders ops.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    vars: Vec<VariableAttr>,
    index: HashMap<String, VarId>,
    ops: Vec<Op>,
}

impl Graph {
    pub fn new() -> Self {
        Graph::default()
    }

    /// Creates a descriptor, or returns the existing one with its dims
    /// overwritten.
    ///
    /// # Errors
    /// `TensorTypeMismatch` if a descriptor with this name exists with another
    /// dtype.
    pub fn create_or_get_var(
        &mut self,
        name: &str,
        dims: Vec<usize>,
        need_backward: bool,
        dtype: DType,
    ) -> Result<VarId, OpGraphError> {
        self.create_or_get_var_impl(name, dims, need_backward, dtype, false)
    }

    /// Like [`Graph::create_or_get_var`] but an existing descriptor must already
    /// have exactly `dims`.
    ///
    /// # Errors
    /// `ShapeMismatch` on a dims mismatch, `TensorTypeMismatch` on a dtype
    /// mismatch.
    pub fn create_or_get_var_strict(
        &mut self,
        name: &str,
        dims: Vec<usize>,
        need_backward: bool,
        dtype: DType,
    ) -> Result<VarId, OpGraphError> {
        self.create_or_get_var_impl(name, dims, need_backward, dtype, true)
    }

    fn create_or_get_var_impl(
        &mut self,
        name: &str,
        dims: Vec<usize>,
        need_backward: bool,
        dtype: DType,
        fail_when_mismatch_dims: bool,
    ) -> Result<VarId, OpGraphError> {
        if let Some(&id) = self.index.get(name) {
            let existing = &mut self.vars[id.0];
            if existing.dtype != dtype {
                return Err(OpGraphError::TensorTypeMismatch {
                    name: name.to_string(),
                    expected: existing.dtype,
                    actual: dtype,
                });
            }
            if fail_when_mismatch_dims {
                if existing.dims != dims {
                    return Err(OpGraphError::ShapeMismatch {
                        expected: existing.dims.clone(),
                        actual: dims,
                        operation: format!("create_or_get_var_strict({})", name),
                    });
                }
            } else {
                existing.dims = dims;
            }
            return Ok(id);
        }

        let id = VarId(self.vars.len());
        self.vars
            .push(VariableAttr::new(name, dims, dtype, need_backward));
        self.index.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn var(&self, id: VarId) -> &VariableAttr {
        &self.vars[id.0]
    }

    /// Like [`Graph::var`] but an id from another graph is an error.
    pub fn try_var(&self, id: VarId) -> Result<&VariableAttr, OpGraphError> {
        self.vars
            .get(id.0)
            .ok_or_else(|| OpGraphError::UnknownTensor(id.to_string()))
    }

    pub fn var_mut(&mut self, id: VarId) -> &mut VariableAttr {
        &mut self.vars[id.0]
    }

    /// Id of the descriptor called `name`, if any.
    pub fn var_id(&self, name: &str) -> Option<VarId> {
        self.index.get(name).copied()
    }

    /// Like [`Graph::var_id`] but an unknown name is an error.
    pub fn lookup(&self, name: &str) -> Result<VarId, OpGraphError> {
        self.var_id(name)
            .ok_or_else(|| OpGraphError::UnknownTensor(name.to_string()))
    }

    pub fn var_by_name(&self, name: &str) -> Result<&VariableAttr, OpGraphError> {
        self.lookup(name).map(|id| self.var(id))
    }

    pub fn num_vars(&self) -> usize {
        self.vars.len()
    }

    /// All descriptors in creation order.
    pub fn vars(&self) -> impl Iterator<Item = (VarId, &VariableAttr)> {
        self.vars.iter().enumerate().map(|(i, v)| (VarId(i), v))
    }

    /// Descriptor names sorted lexicographically.
    pub fn sorted_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.index.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub fn op(&self, index: usize) -> Option<&Op> {
        self.ops.get(index)
    }

    pub fn num_ops(&self) -> usize {
        self.ops.len()
    }

    /// Checks that every slot of `op` references a descriptor of this graph.
    pub fn validate_op(&self, op: &Op) -> Result<(), OpGraphError> {
        for id in op.inputs.iter().chain(op.outputs.iter()).flatten() {
            if self.try_var(*id).is_err() {
                return Err(OpGraphError::UnknownTensor(format!(
                    "{} referenced by op '{}'",
                    id, op.op_type
                )));
            }
        }
        Ok(())
    }

    /// Appends an op to the program.
    ///
    /// # Errors
    /// `UnknownTensor` if a slot references an id outside this graph.
    pub fn push_op(&mut self, op: Op) -> Result<(), OpGraphError> {
        self.validate_op(&op)?;
        self.ops.push(op);
        Ok(())
    }

    /// Snapshot of the descriptors behind a list of op slots.
    pub fn snapshot(&self, slots: &[Option<VarId>]) -> Vec<Option<VariableAttr>> {
        slots
            .iter()
            .map(|slot| slot.map(|id| self.var(id).clone()))
            .collect()
    }
}

#[cfg(test)]
#[path = "graph_test.rs"]
mod tests;
