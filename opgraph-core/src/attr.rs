//! Typed operator attributes and their constraint chains.
//!
//! Every op carries an [`AttrMap`]. The op's registered [`AttributeMeta`]s are
//! checked against that map once, when the op is finalized: missing attributes
//! get their default, present ones are type-checked and validated.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::OpGraphError;

/// A single attribute value. The set of kinds is closed on purpose: these are
/// the only kinds any operator or compiler pass consumes.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Float(f32),
    Int(i64),
    Str(String),
    Bool(bool),
}

/// The kind (type tag) of an [`AttrValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrKind {
    Float,
    Int,
    Str,
    Bool,
}

/// Named attributes of an op or of a compiler invocation.
pub type AttrMap = HashMap<String, AttrValue>;

impl AttrKind {
    /// The value inserted for an unset attribute before its rules run.
    pub fn zero_value(&self) -> AttrValue {
        match self {
            AttrKind::Float => AttrValue::Float(0.0),
            AttrKind::Int => AttrValue::Int(0),
            AttrKind::Str => AttrValue::Str(String::new()),
            AttrKind::Bool => AttrValue::Bool(false),
        }
    }
}

impl fmt::Display for AttrKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AttrKind::Float => "float",
            AttrKind::Int => "int",
            AttrKind::Str => "string",
            AttrKind::Bool => "bool",
        };
        write!(f, "{}", name)
    }
}

impl AttrValue {
    pub fn kind(&self) -> AttrKind {
        match self {
            AttrValue::Float(_) => AttrKind::Float,
            AttrValue::Int(_) => AttrKind::Int,
            AttrValue::Str(_) => AttrKind::Str,
            AttrValue::Bool(_) => AttrKind::Bool,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            AttrValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(v) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric view used by range constraints. `None` for strings and bools.
    fn as_number(&self) -> Option<f64> {
        match self {
            AttrValue::Float(v) => Some(*v as f64),
            AttrValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Float(v) => write!(f, "{}", v),
            AttrValue::Int(v) => write!(f, "{}", v),
            AttrValue::Str(v) => write!(f, "\"{}\"", v),
            AttrValue::Bool(v) => write!(f, "{}", v),
        }
    }
}

impl From<f32> for AttrValue {
    fn from(v: f32) -> Self {
        AttrValue::Float(v)
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Int(v)
    }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        AttrValue::Bool(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::Str(v.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::Str(v)
    }
}

fn typed_attr<'a, T>(
    attrs: &'a AttrMap,
    name: &str,
    expected: AttrKind,
    project: impl Fn(&'a AttrValue) -> Option<T>,
) -> Result<T, OpGraphError> {
    let value = attrs
        .get(name)
        .ok_or_else(|| OpGraphError::MissingAttribute(name.to_string()))?;
    project(value).ok_or_else(|| OpGraphError::AttributeTypeMismatch {
        attr: name.to_string(),
        expected: expected.to_string(),
        actual: value.kind().to_string(),
    })
}

/// Reads a float attribute.
pub fn attr_float(attrs: &AttrMap, name: &str) -> Result<f32, OpGraphError> {
    typed_attr(attrs, name, AttrKind::Float, AttrValue::as_float)
}

/// Reads an int attribute.
pub fn attr_int(attrs: &AttrMap, name: &str) -> Result<i64, OpGraphError> {
    typed_attr(attrs, name, AttrKind::Int, AttrValue::as_int)
}

/// Reads a string attribute.
pub fn attr_str<'a>(attrs: &'a AttrMap, name: &str) -> Result<&'a str, OpGraphError> {
    typed_attr(attrs, name, AttrKind::Str, AttrValue::as_str)
}

/// Validation rule: returns a human readable reason on failure.
pub type ValidatorFn = Arc<dyn Fn(&AttrValue) -> Result<(), String> + Send + Sync>;

#[derive(Clone)]
enum ConstraintRule {
    Default(AttrValue),
    Validate(ValidatorFn),
}

/// Metadata of one operator attribute: its name, kind and rule chain.
///
/// Rules run in the order they were added. Default rules only fire when the
/// attribute was not set by the caller.
#[derive(Clone)]
pub struct AttributeMeta {
    name: String,
    description: String,
    kind: AttrKind,
    rules: Vec<ConstraintRule>,
}

impl fmt::Debug for AttributeMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeMeta")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("rules", &self.rules.len())
            .finish()
    }
}

impl AttributeMeta {
    pub fn new(name: impl Into<String>, description: impl Into<String>, kind: AttrKind) -> Self {
        AttributeMeta {
            name: name.into(),
            description: description.into(),
            kind,
            rules: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn kind(&self) -> AttrKind {
        self.kind
    }

    /// Adds a default-value rule.
    pub fn default_value(mut self, value: impl Into<AttrValue>) -> Self {
        self.rules.push(ConstraintRule::Default(value.into()));
        self
    }

    /// Adds a custom validation rule.
    pub fn add<F>(mut self, rule: F) -> Self
    where
        F: Fn(&AttrValue) -> Result<(), String> + Send + Sync + 'static,
    {
        self.rules.push(ConstraintRule::Validate(Arc::new(rule)));
        self
    }

    /// Numeric value must be strictly greater than zero.
    pub fn positive(self) -> Self {
        self.add(|value| match value.as_number() {
            Some(v) if v > 0.0 => Ok(()),
            Some(v) => Err(format!("expected a positive value, got {}", v)),
            None => Err(format!("expected a number, got {}", value)),
        })
    }

    /// Numeric value must be zero or greater.
    pub fn non_negative(self) -> Self {
        self.add(|value| match value.as_number() {
            Some(v) if v >= 0.0 => Ok(()),
            Some(v) => Err(format!("expected a non-negative value, got {}", v)),
            None => Err(format!("expected a number, got {}", value)),
        })
    }

    /// Numeric value must lie in `[min, max]`.
    pub fn in_range(self, min: f64, max: f64) -> Self {
        self.add(move |value| match value.as_number() {
            Some(v) if v >= min && v <= max => Ok(()),
            Some(v) => Err(format!("expected a value in [{}, {}], got {}", min, max, v)),
            None => Err(format!("expected a number, got {}", value)),
        })
    }

    /// Checks (and default-fills) this attribute in `attrs`.
    ///
    /// # Errors
    /// * `AttributeTypeMismatch` if the caller set a value of the wrong kind.
    /// * `DefaultAlreadySet` if two default rules disagree.
    /// * `AttributeConstraint` if a validation rule rejects the value.
    pub fn check(&self, op_type: &str, attrs: &mut AttrMap) -> Result<(), OpGraphError> {
        let already_set = match attrs.get(&self.name) {
            Some(value) => {
                if value.kind() != self.kind {
                    return Err(OpGraphError::AttributeTypeMismatch {
                        attr: self.name.clone(),
                        expected: self.kind.to_string(),
                        actual: value.kind().to_string(),
                    });
                }
                true
            }
            None => {
                attrs.insert(self.name.clone(), self.kind.zero_value());
                false
            }
        };

        let mut applied_default: Option<&AttrValue> = None;
        for rule in &self.rules {
            match rule {
                ConstraintRule::Default(value) => {
                    if already_set {
                        continue;
                    }
                    if value.kind() != self.kind {
                        return Err(OpGraphError::AttributeTypeMismatch {
                            attr: self.name.clone(),
                            expected: self.kind.to_string(),
                            actual: value.kind().to_string(),
                        });
                    }
                    if let Some(previous) = applied_default {
                        if previous != value {
                            return Err(OpGraphError::DefaultAlreadySet {
                                attr: self.name.clone(),
                                previous: previous.to_string(),
                            });
                        }
                    }
                    attrs.insert(self.name.clone(), value.clone());
                    applied_default = Some(value);
                }
                ConstraintRule::Validate(validate) => {
                    let value = attrs.get(&self.name).ok_or_else(|| {
                        OpGraphError::InternalError(format!(
                            "attribute '{}' vanished during check",
                            self.name
                        ))
                    })?;
                    validate(value).map_err(|reason| OpGraphError::AttributeConstraint {
                        op_type: op_type.to_string(),
                        attr: self.name.clone(),
                        reason,
                    })?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "attr_test.rs"]
mod tests;
